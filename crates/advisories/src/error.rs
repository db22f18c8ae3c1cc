//! Error types for the advisory client.

use crate::lifecycle::TransitionError;
use crate::model::schedule::{DayOfWeek, TimeRange};
use thiserror::Error;

/// Errors that can occur while talking to the advisory API or validating
/// an action before it is sent.
#[derive(Debug, Error, Clone)]
pub enum ClientError {
    /// Input rejected before any network call
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The requested status change is not allowed from the current status
    #[error("Invalid transition: {0}")]
    Transition(#[from] TransitionError),

    /// A new schedule window overlaps an existing one
    #[error("Schedule conflict on {day}: {requested} overlaps existing window {existing_id} ({existing})")]
    ScheduleConflict {
        day: DayOfWeek,
        requested: TimeRange,
        existing_id: i64,
        existing: TimeRange,
    },

    /// Window start is not before its end, or falls outside the allowed hours
    #[error("Invalid time range {range}: {reason}")]
    InvalidTimeRange { range: TimeRange, reason: String },

    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Server answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Server returned a body we could not make sense of
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// A mutation for the same entity is still waiting on the server
    #[error("Operation already in progress for {entity}")]
    OperationInProgress { entity: String },

    /// The stored token was rejected by the server
    #[error("Session expired: {message}")]
    SessionExpired { message: String },

    /// No authenticated session is available
    #[error("No active session")]
    NoSession,

    /// Credentials belong to a different role than the one selected at login
    #[error("Wrong user type: selected {expected}, account is {actual}")]
    RoleMismatch { expected: String, actual: String },

    /// The authenticated user lacks a profile required for the operation
    #[error("Missing profile: {message}")]
    MissingProfile { message: String },

    /// Local persistence (session database, report files) failed
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation {
            message: message.into(),
        }
    }

    /// Returns true if this error was raised before reaching the network.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ClientError::Validation { .. }
                | ClientError::Transition(_)
                | ClientError::ScheduleConflict { .. }
                | ClientError::InvalidTimeRange { .. }
        )
    }

    /// Returns true if this error means the session must be discarded and the
    /// user must log in again.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            ClientError::SessionExpired { .. } | ClientError::NoSession
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ClientError::UnexpectedResponse {
                message: err.to_string(),
            };
        }
        ClientError::Network {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Validation {
            message: format!("invalid URL: {}", err),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::UnexpectedResponse {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for ClientError {
    fn from(err: rusqlite::Error) -> Self {
        ClientError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for ClientError {
    fn from(err: csv::Error) -> Self {
        ClientError::Storage {
            message: err.to_string(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(ClientError::validation("empty").is_validation());
        assert!(ClientError::Transition(TransitionError::MissingObservations).is_validation());
        assert!(!ClientError::Network {
            message: "refused".into()
        }
        .is_validation());
    }

    #[test]
    fn test_needs_reauth() {
        assert!(ClientError::NoSession.needs_reauth());
        assert!(ClientError::SessionExpired {
            message: "401".into()
        }
        .needs_reauth());
        assert!(!ClientError::Api {
            status: 500,
            message: "boom".into()
        }
        .needs_reauth());
    }
}
