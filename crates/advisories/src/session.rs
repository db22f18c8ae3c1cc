//! Durable storage for the authenticated session.
//!
//! Holds the bearer token and the user profile between CLI invocations in a
//! small SQLite key/value table.

use crate::error::ClientResult;
use crate::model::user::User;
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS session (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";

/// A token plus the user it was issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSession {
    pub token: String,
    pub user: User,
}

pub struct SessionStore {
    db: Mutex<Connection>,
}

impl SessionStore {
    /// Opens (creating if needed) the session database at `path`.
    pub fn open(path: &Path) -> ClientResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Session store that lives only as long as the value.
    pub fn open_in_memory() -> ClientResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> ClientResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Persists the session, replacing any previous one.
    pub fn save(&self, session: &SavedSession) -> ClientResult<()> {
        let user_json = serde_json::to_string(&session.user)?;
        let mut db = self.lock();
        let tx = db.transaction()?;
        for (key, value) in [(TOKEN_KEY, session.token.as_str()), (USER_KEY, user_json.as_str())] {
            tx.execute(
                "INSERT INTO session (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                (key, value),
            )?;
        }
        tx.commit()?;
        debug!(session = %TokenFingerprint::of(&session.token), "Session saved");
        Ok(())
    }

    /// Returns the saved session, if both token and user are present and readable.
    pub fn load(&self) -> ClientResult<Option<SavedSession>> {
        let db = self.lock();
        let read = |key: &str| -> ClientResult<Option<String>> {
            Ok(db
                .query_row("SELECT value FROM session WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?)
        };

        let (Some(token), Some(user_json)) = (read(TOKEN_KEY)?, read(USER_KEY)?) else {
            return Ok(None);
        };
        match serde_json::from_str::<User>(&user_json) {
            Ok(user) => Ok(Some(SavedSession { token, user })),
            Err(e) => {
                debug!(error = %e, "Stored user is unreadable, ignoring saved session");
                Ok(None)
            }
        }
    }

    /// Removes every stored session value.
    pub fn clear(&self) -> ClientResult<()> {
        self.lock().execute("DELETE FROM session", [])?;
        debug!("Session cleared");
        Ok(())
    }
}

/// A short, non-reversible tag for a token, safe to put in logs.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct TokenFingerprint(String);

impl TokenFingerprint {
    pub fn of(token: &str) -> Self {
        let digest = Sha256::digest(token.as_bytes());
        Self(digest[..8].iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}...", &self.0[..8.min(self.0.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::user::Role;

    fn session(token: &str) -> SavedSession {
        SavedSession {
            token: token.to_string(),
            user: User {
                id: 1,
                email: "ana@up.edu.mx".into(),
                name: "Ana".into(),
                role: Role::Student,
                student: None,
                professor: None,
            },
        }
    }

    #[test]
    fn test_save_load_clear() {
        let store = SessionStore::open_in_memory().unwrap();
        assert_eq!(store.load().unwrap(), None);

        store.save(&session("t1")).unwrap();
        store.save(&session("t2")).unwrap();
        assert_eq!(store.load().unwrap(), Some(session("t2")));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_fingerprint_hides_token() {
        let a = TokenFingerprint::of("secret-token");
        assert_eq!(a, TokenFingerprint::of("secret-token"));
        assert_ne!(a, TokenFingerprint::of("other"));
        assert!(!a.to_string().contains("secret"));
        assert_eq!(a.as_str().len(), 16);
    }
}
