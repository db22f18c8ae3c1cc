//! The authenticated application context: one per session.
//!
//! Built by [`AppContext::login`] or [`AppContext::restore`], torn down by
//! [`AppContext::logout`]. Everything a dashboard needs hangs off it.

use crate::advisory::AdvisoryController;
use crate::api::dto::{LoginData, LoginRequest};
use crate::api::{paths, ApiClient};
use crate::availability::AvailabilityManager;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::model::advisory::{AdvisoryRequest, WireAdvisory};
use crate::model::schedule::ScheduleWindow;
use crate::model::user::{Professor, Role, User};
use crate::session::{SavedSession, SessionStore, TokenFingerprint};
use crate::store::DataStore;
use crate::views::Dashboard;
use tracing::{error, info, warn};

/// Sizes of the collections after [`AppContext::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub requests: usize,
    pub windows: usize,
    pub professors: usize,
}

pub struct AppContext {
    config: ClientConfig,
    api: ApiClient,
    user: User,
    store: DataStore,
    session: SessionStore,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("api", &self.api)
            .field("user", &self.user.email)
            .field("role", &self.user.role)
            .finish()
    }
}

impl AppContext {
    /// Authenticates and persists the session.
    ///
    /// # Arguments
    /// * `expected` - Role picked on the login form; an account of another
    ///   role is refused and nothing is stored
    ///
    /// # Returns
    /// * `Ok(AppContext)` - Logged in, collections still empty
    /// * `Err(ClientError::RoleMismatch)` - Credentials valid, wrong role
    /// * `Err(ClientError::Api)` - Credentials rejected
    pub async fn login(
        config: ClientConfig,
        session: SessionStore,
        email: &str,
        password: &str,
        expected: Role,
    ) -> ClientResult<Self> {
        let api = ApiClient::new(&config)?;
        info!(email = %email, role = %expected, "Logging in");

        let body = LoginRequest { email, password };
        let data: LoginData = api.post(paths::LOGIN, &body).await.map_err(|e| match e {
            ClientError::SessionExpired { message } => ClientError::Api {
                status: 401,
                message,
            },
            other => other,
        })?;

        if data.user.role != expected {
            warn!(
                expected = %expected,
                actual = %data.user.role,
                "Login refused: account role differs from the selected one"
            );
            return Err(ClientError::RoleMismatch {
                expected: expected.to_string(),
                actual: data.user.role.to_string(),
            });
        }

        let saved = SavedSession {
            token: data.token,
            user: data.user,
        };
        session.save(&saved)?;
        info!(
            session = %TokenFingerprint::of(&saved.token),
            user_id = saved.user.id,
            "Logged in"
        );

        Ok(Self {
            api: api.with_token(&saved.token),
            config,
            user: saved.user,
            store: DataStore::new(),
            session,
        })
    }

    /// Resumes a persisted session after checking it with `/auth/me`.
    ///
    /// Returns `Ok(None)` when nothing is stored or the server no longer
    /// accepts the token; in the latter case the stored session is cleared.
    pub async fn restore(config: ClientConfig, session: SessionStore) -> ClientResult<Option<Self>> {
        let Some(saved) = session.load()? else {
            return Ok(None);
        };
        let fingerprint = TokenFingerprint::of(&saved.token);
        let api = ApiClient::new(&config)?.with_token(&saved.token);

        match api.get::<User>(paths::ME).await {
            Ok(user) => {
                info!(session = %fingerprint, user_id = user.id, "Session restored");
                if user != saved.user {
                    session.save(&SavedSession {
                        token: saved.token,
                        user: user.clone(),
                    })?;
                }
                Ok(Some(Self {
                    config,
                    api,
                    user,
                    store: DataStore::new(),
                    session,
                }))
            }
            Err(e) => {
                warn!(session = %fingerprint, error = %e, "Stored session rejected, clearing it");
                session.clear()?;
                Ok(None)
            }
        }
    }

    /// Ends the session. The server call is best effort; local state is
    /// always cleared.
    pub async fn logout(self) -> ClientResult<()> {
        if let Err(e) = self.api.post_empty(paths::LOGOUT).await {
            warn!(error = %e, "Logout request failed, clearing local session anyway");
        }
        self.store.clear();
        self.session.clear()?;
        info!(user_id = self.user.id, "Logged out");
        Ok(())
    }

    /// Drops the persisted session and all loaded data without calling the
    /// server. Used when a request reports the session as expired.
    pub fn invalidate(&self) -> ClientResult<()> {
        self.store.clear();
        self.session.clear()
    }

    /// Fetches the role's collections concurrently.
    ///
    /// A failing fetch is logged and its collection left empty, except that
    /// an expired session aborts with `SessionExpired`.
    pub async fn load(&self) -> ClientResult<LoadSummary> {
        let (windows, requests, professors) = futures::join!(
            self.fetch_windows(),
            self.fetch_requests(),
            self.fetch_professors()
        );

        let mut summary = LoadSummary::default();
        let mut expired = None;

        match windows {
            Ok(Some((professor_id, windows))) => {
                summary.windows = windows.len();
                self.store.replace_windows(professor_id, windows);
            }
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "Failed to load schedule windows");
                if let Some(professor_id) = self.user.professor_id() {
                    self.store.replace_windows(professor_id, Vec::new());
                }
                if e.needs_reauth() {
                    expired = Some(e);
                }
            }
        }
        match requests {
            Ok(requests) => {
                summary.requests = requests.len();
                self.store.replace_requests(requests);
            }
            Err(e) => {
                error!(error = %e, "Failed to load advisory requests");
                self.store.replace_requests(Vec::new());
                if e.needs_reauth() {
                    expired = Some(e);
                }
            }
        }
        match professors {
            Ok(professors) => {
                summary.professors = professors.len();
                self.store.replace_professors(professors);
            }
            Err(e) => {
                error!(error = %e, "Failed to load professor directory");
                self.store.replace_professors(Vec::new());
                if e.needs_reauth() {
                    expired = Some(e);
                }
            }
        }

        if let Some(e) = expired {
            return Err(e);
        }
        info!(
            requests = summary.requests,
            windows = summary.windows,
            professors = summary.professors,
            "Data loaded"
        );
        Ok(summary)
    }

    async fn fetch_windows(&self) -> ClientResult<Option<(i64, Vec<ScheduleWindow>)>> {
        if self.user.role != Role::Professor {
            return Ok(None);
        }
        let Some(professor_id) = self.user.professor_id() else {
            warn!(user_id = self.user.id, "Professor account has no professor profile");
            return Ok(None);
        };
        let windows = self.api.get_list(paths::MY_SCHEDULES).await?;
        Ok(Some((professor_id, windows)))
    }

    async fn fetch_requests(&self) -> ClientResult<Vec<AdvisoryRequest>> {
        let path = match self.user.role {
            Role::Student => match self.user.student_id() {
                Some(id) => paths::student_advisories(id),
                None => {
                    warn!(user_id = self.user.id, "Student account has no student profile");
                    return Ok(Vec::new());
                }
            },
            Role::Professor => match self.user.professor_id() {
                Some(id) => paths::professor_advisories(id),
                None => return Ok(Vec::new()),
            },
            Role::Director => paths::DIRECTOR_HISTORY.to_string(),
        };

        let wire: Vec<WireAdvisory> = self.api.get_list(&path).await?;
        let mut requests = Vec::with_capacity(wire.len());
        for record in wire {
            match AdvisoryRequest::from_wire(record) {
                Ok(request) => requests.push(request),
                Err(e) => warn!(error = %e, "Skipping unusable advisory record"),
            }
        }
        Ok(requests)
    }

    async fn fetch_professors(&self) -> ClientResult<Vec<Professor>> {
        self.api.get_list(paths::PROFESSORS).await
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn advisories(&self) -> AdvisoryController<'_> {
        AdvisoryController::new(&self.api, &self.store)
    }

    pub fn availability(&self) -> AvailabilityManager<'_> {
        AvailabilityManager::new(&self.api, &self.store, self.config.schedule_bounds)
    }

    /// The dashboard for the logged-in role.
    pub fn dashboard(&self) -> ClientResult<Dashboard<'_>> {
        Dashboard::for_context(self)
    }
}
