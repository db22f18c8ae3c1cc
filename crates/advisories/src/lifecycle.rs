//! Advisory request state machine.
//!
//! ```text
//! pending     --accept-->     accepted
//! pending     --reject-->     rejected    (terminal)
//! accepted    --cancel-->     rejected    (terminal)
//! accepted    --reschedule--> rescheduled
//! accepted    --complete-->   completed   (terminal)
//! rescheduled --reschedule--> rescheduled
//! rescheduled --cancel-->     rejected    (terminal)
//! rescheduled --complete-->   completed   (terminal)
//! ```
//!
//! [`next_state`] is pure; the controller calls it before building any patch.

use crate::model::advisory::AdvisoryStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use thiserror::Error;

/// Annotation sent when a professor reschedules without giving a motive.
pub const DEFAULT_RESCHEDULE_MOTIVE: &str = "Rescheduled by the professor";

/// A slot picked from a reschedule draft's latest candidate list.
///
/// Only [`RescheduleDraft::to_action`](crate::availability::RescheduleDraft::to_action)
/// builds one, so a reschedule always names a slot the server offered for
/// that advisory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChosenSlot {
    advisory_id: i64,
    time_slot: String,
}

impl ChosenSlot {
    pub(crate) fn new(advisory_id: i64, time_slot: impl Into<String>) -> Self {
        Self {
            advisory_id,
            time_slot: time_slot.into(),
        }
    }

    /// The advisory whose draft produced this slot.
    pub fn advisory_id(&self) -> i64 {
        self.advisory_id
    }

    pub fn as_str(&self) -> &str {
        &self.time_slot
    }
}

impl Display for ChosenSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.pad(&self.time_slot)
    }
}

/// A status change requested by a user, with the payload it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Accept,
    /// Decline a pending request; the reason is optional
    Reject { reason: Option<String> },
    /// Call off a scheduled session; the reason is required
    Cancel { reason: String },
    Reschedule {
        date: NaiveDate,
        time_slot: ChosenSlot,
        motive: Option<String>,
    },
    Complete { observations: String },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Accept => "accept",
            Action::Reject { .. } => "reject",
            Action::Cancel { .. } => "cancel",
            Action::Reschedule { .. } => "reschedule",
            Action::Complete { .. } => "complete",
        }
    }

    /// Builds the body for `PUT /advisories/{id}/status`.
    ///
    /// Call only after [`next_state`] accepted the action; the patch carries
    /// the resulting status.
    pub fn to_patch(&self, status: AdvisoryStatus) -> StatusPatch {
        let mut patch = StatusPatch {
            status,
            date: None,
            time_slot: None,
            rejection_reason: None,
        };
        match self {
            Action::Accept => {}
            Action::Reject { reason } => {
                patch.rejection_reason = reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string);
            }
            Action::Cancel { reason } => patch.rejection_reason = Some(reason.trim().to_string()),
            Action::Reschedule {
                date,
                time_slot,
                motive,
            } => {
                patch.date = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
                patch.time_slot = Some(time_slot.as_str().to_string());
                patch.rejection_reason = Some(
                    motive
                        .as_deref()
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .unwrap_or(DEFAULT_RESCHEDULE_MOTIVE)
                        .to_string(),
                );
            }
            Action::Complete { observations } => {
                patch.rejection_reason = Some(observations.trim().to_string())
            }
        }
        patch
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// Body of a status update. The annotation travels as `rejectionReason`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPatch {
    pub status: AdvisoryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("request is {0} and can no longer change")]
    Terminal(AdvisoryStatus),

    #[error("cannot {action} a request that is {from}")]
    NotAllowed {
        from: AdvisoryStatus,
        action: &'static str,
    },

    #[error("a cancellation reason is required")]
    MissingReason,

    #[error("observations are required to complete an advisory")]
    MissingObservations,

    #[error("a time slot must be selected to reschedule")]
    MissingSlot,

    #[error("a request that is {from} cannot become {to}")]
    InvalidTarget {
        from: AdvisoryStatus,
        to: AdvisoryStatus,
    },
}

/// Computes the status an action leads to, or why it is not allowed.
pub fn next_state(
    current: AdvisoryStatus,
    action: &Action,
) -> Result<AdvisoryStatus, TransitionError> {
    use AdvisoryStatus::*;

    if current.is_terminal() {
        return Err(TransitionError::Terminal(current));
    }

    match (current, action) {
        (Pending, Action::Accept) => Ok(Accepted),
        (Pending, Action::Reject { .. }) => Ok(Rejected),
        (Accepted | Rescheduled, Action::Cancel { reason }) => {
            if reason.trim().is_empty() {
                Err(TransitionError::MissingReason)
            } else {
                Ok(Rejected)
            }
        }
        (Accepted | Rescheduled, Action::Reschedule { time_slot, .. }) => {
            if time_slot.as_str().trim().is_empty() {
                Err(TransitionError::MissingSlot)
            } else {
                Ok(Rescheduled)
            }
        }
        (Accepted | Rescheduled, Action::Complete { observations }) => {
            if observations.trim().is_empty() {
                Err(TransitionError::MissingObservations)
            } else {
                Ok(Completed)
            }
        }
        (from, action) => Err(TransitionError::NotAllowed {
            from,
            action: action.name(),
        }),
    }
}

/// Whether a request may move from `from` to `to` through some action.
pub fn can_transition(from: AdvisoryStatus, to: AdvisoryStatus) -> bool {
    use AdvisoryStatus::*;

    matches!(
        (from, to),
        (Pending, Accepted | Rejected) | (Accepted | Rescheduled, Rescheduled | Completed | Rejected)
    )
}

/// Actions a user could attempt from `status`, for menus and CLI help.
pub fn available_actions(status: AdvisoryStatus) -> &'static [&'static str] {
    match status {
        AdvisoryStatus::Pending => &["accept", "reject"],
        AdvisoryStatus::Accepted | AdvisoryStatus::Rescheduled => {
            &["reschedule", "complete", "cancel"]
        }
        AdvisoryStatus::Rejected | AdvisoryStatus::Completed => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AdvisoryStatus::*;

    fn reschedule() -> Action {
        Action::Reschedule {
            date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
            time_slot: ChosenSlot::new(10, "09:00 - 10:00"),
            motive: None,
        }
    }

    fn complete(text: &str) -> Action {
        Action::Complete {
            observations: text.to_string(),
        }
    }

    #[test]
    fn test_pending_transitions() {
        assert_eq!(next_state(Pending, &Action::Accept), Ok(Accepted));
        assert_eq!(
            next_state(
                Pending,
                &Action::Reject {
                    reason: Some("Conflicto de horario".into())
                }
            ),
            Ok(Rejected)
        );
        assert!(matches!(
            next_state(Pending, &complete("done")),
            Err(TransitionError::NotAllowed { .. })
        ));
        assert!(matches!(
            next_state(Pending, &reschedule()),
            Err(TransitionError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_scheduled_transitions() {
        for from in [Accepted, Rescheduled] {
            assert_eq!(next_state(from, &reschedule()), Ok(Rescheduled));
            assert_eq!(next_state(from, &complete("Temas vistos")), Ok(Completed));
            assert_eq!(
                next_state(
                    from,
                    &Action::Cancel {
                        reason: "Enfermedad".into()
                    }
                ),
                Ok(Rejected)
            );
            assert!(matches!(
                next_state(from, &Action::Accept),
                Err(TransitionError::NotAllowed { .. })
            ));
        }
    }

    #[test]
    fn test_terminal_states_never_move() {
        let actions = [
            Action::Accept,
            Action::Reject { reason: None },
            Action::Cancel {
                reason: "x".into(),
            },
            reschedule(),
            complete("x"),
        ];
        for from in [Completed, Rejected] {
            for action in &actions {
                assert_eq!(next_state(from, action), Err(TransitionError::Terminal(from)));
            }
        }
    }

    #[test]
    fn test_payload_validation() {
        assert_eq!(
            next_state(Accepted, &complete("   \n")),
            Err(TransitionError::MissingObservations)
        );
        assert_eq!(
            next_state(Accepted, &Action::Cancel { reason: "".into() }),
            Err(TransitionError::MissingReason)
        );
        let no_slot = Action::Reschedule {
            date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
            time_slot: ChosenSlot::new(10, " "),
            motive: None,
        };
        assert_eq!(next_state(Rescheduled, &no_slot), Err(TransitionError::MissingSlot));
    }

    #[test]
    fn test_status_targets() {
        assert!(can_transition(Pending, Accepted));
        assert!(can_transition(Pending, Rejected));
        assert!(can_transition(Rescheduled, Rescheduled));
        assert!(!can_transition(Pending, Completed));
        assert!(!can_transition(Accepted, Pending));
        for to in [Pending, Accepted, Rejected, Rescheduled, Completed] {
            assert!(!can_transition(Completed, to));
            assert!(!can_transition(Rejected, to));
        }
    }

    #[test]
    fn test_reschedule_patch_uses_utc_midnight_and_default_motive() {
        let patch = reschedule().to_patch(Rescheduled);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["status"], "rescheduled");
        assert_eq!(json["date"], "2030-01-07T00:00:00Z");
        assert_eq!(json["timeSlot"], "09:00 - 10:00");
        assert_eq!(json["rejectionReason"], DEFAULT_RESCHEDULE_MOTIVE);
    }

    #[test]
    fn test_accept_patch_is_status_only() {
        let json = serde_json::to_value(Action::Accept.to_patch(Accepted)).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "accepted" }));
    }
}
