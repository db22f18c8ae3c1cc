/// Client configuration: API location, timeouts, session storage, schedule bounds
use crate::error::ClientError;
use crate::model::schedule::{TimeOfDay, TimeRange};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default backend location used by the university deployment.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Environment variable overriding [`ClientConfig::api_base_url`].
pub const API_URL_ENV: &str = "ADVISORIES_API_URL";
/// Environment variable overriding [`ClientConfig::session_db_path`].
pub const SESSION_DB_ENV: &str = "ADVISORIES_SESSION_DB";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to
    pub api_base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// SQLite file holding the persisted session
    pub session_db_path: PathBuf,
    /// Earliest start and latest end a schedule window may have
    pub schedule_bounds: ScheduleBounds,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScheduleBounds {
    pub earliest: TimeOfDay,
    pub latest: TimeOfDay,
}

impl ScheduleBounds {
    pub fn as_range(&self) -> TimeRange {
        TimeRange::new(self.earliest, self.latest)
    }
}

impl Default for ScheduleBounds {
    fn default() -> Self {
        Self {
            earliest: TimeOfDay::hm(7, 0),
            latest: TimeOfDay::hm(18, 0),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            user_agent: concat!("advisories/", env!("CARGO_PKG_VERSION")).to_string(),
            session_db_path: PathBuf::from("advisories-session.db"),
            schedule_bounds: ScheduleBounds::default(),
        }
    }
}

impl ClientConfig {
    /// Loads the configuration.
    ///
    /// # Arguments
    /// * `path` - Optional JSON file; missing keys take their defaults
    ///
    /// # Returns
    /// * `Ok(ClientConfig)` - With environment overrides applied and validated
    /// * `Err` - If the file can't be read or parsed, or the URL is invalid
    pub fn load(path: Option<&Path>) -> Result<Self, ClientError> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                serde_json::from_str(&content).map_err(|e| ClientError::Validation {
                    message: format!("invalid config file {}: {}", path.display(), e),
                })?
            }
            None => ClientConfig::default(),
        };

        if let Ok(url) = env::var(API_URL_ENV) {
            config.api_base_url = url;
        }
        if let Ok(db) = env::var(SESSION_DB_ENV) {
            config.session_db_path = PathBuf::from(db);
        }

        config.validate()?;
        Ok(config)
    }

    /// Config pointing at `base_url` with every other value defaulted.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let url = Url::parse(&self.api_base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::validation(format!(
                "API base URL must be http(s), got {}",
                url.scheme()
            )));
        }
        if !self.schedule_bounds.as_range().is_valid() {
            return Err(ClientError::validation(format!(
                "schedule bounds {} are empty",
                self.schedule_bounds.as_range()
            )));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
