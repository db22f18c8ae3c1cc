//! Advisory request mutations: creation, status changes, manual entries.

use crate::api::dto::{ManualAdvisory, NewAdvisory};
use crate::api::{paths, ApiClient};
use crate::availability::RescheduleDraft;
use crate::error::{ClientError, ClientResult};
use crate::lifecycle::{can_transition, next_state, Action, StatusPatch, TransitionError};
use crate::model::advisory::{AdvisoryRequest, AdvisoryStatus, AdvisoryType, WireAdvisory, NOT_AVAILABLE};
use crate::model::schedule::{TimeOfDay, TimeRange};
use crate::store::{DataStore, EntityKey};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

/// An advisory a professor already gave and wants on record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualEntry {
    pub date: Option<NaiveDate>,
    pub start: Option<TimeOfDay>,
    pub end: Option<TimeOfDay>,
    pub subject: String,
    pub topic: String,
    pub kind: AdvisoryType,
    pub description: String,
    pub student_name: String,
    pub student_email: String,
}

impl ManualEntry {
    /// Checks the entry as of `today` and builds the request body.
    pub fn validate(&self, today: NaiveDate) -> ClientResult<ManualAdvisory> {
        let (Some(date), Some(start), Some(end)) = (self.date, self.start, self.end) else {
            return Err(ClientError::validation("please complete all required fields"));
        };
        if [&self.subject, &self.topic, &self.student_name]
            .iter()
            .any(|s| s.trim().is_empty())
        {
            return Err(ClientError::validation("please complete all required fields"));
        }

        let range = TimeRange::new(start, end);
        if !range.is_valid() {
            return Err(ClientError::InvalidTimeRange {
                range,
                reason: "start time must be before end time".to_string(),
            });
        }
        if date > today {
            return Err(ClientError::validation(
                "a manual entry cannot be dated in the future",
            ));
        }

        Ok(ManualAdvisory {
            date,
            time_slot: range.to_string(),
            subject: self.subject.trim().to_string(),
            topic: self.topic.trim().to_string(),
            kind: self.kind,
            description: self.description.trim().to_string(),
            student_name: self.student_name.trim().to_string(),
            student_email: self.student_email.trim().to_string(),
            status: AdvisoryStatus::Completed.as_str(),
            is_manual_entry: true,
        })
    }
}

/// Mediates every advisory mutation and keeps the store in step with the
/// server's answers.
pub struct AdvisoryController<'a> {
    api: &'a ApiClient,
    store: &'a DataStore,
}

impl<'a> AdvisoryController<'a> {
    pub fn new(api: &'a ApiClient, store: &'a DataStore) -> Self {
        Self { api, store }
    }

    /// Submits a new request. On success the store gains one entry; on
    /// failure it is left as it was.
    pub async fn create_request(&self, payload: &NewAdvisory) -> ClientResult<AdvisoryRequest> {
        if payload.subject.trim().is_empty() || payload.topic.trim().is_empty() {
            return Err(ClientError::validation("subject and topic are required"));
        }
        let slot: TimeRange = payload
            .time_slot
            .parse()
            .map_err(ClientError::validation)?;
        if !slot.is_valid() {
            return Err(ClientError::InvalidTimeRange {
                range: slot,
                reason: "start time must be before end time".to_string(),
            });
        }

        let _guard = self.store.begin(EntityKey::NewAdvisory)?;
        info!(
            professor_id = payload.professor_id,
            date = %payload.date,
            time_slot = %payload.time_slot,
            "Creating advisory request"
        );

        let wire: WireAdvisory = self.api.post(paths::ADVISORIES, payload).await?;
        let mut request = AdvisoryRequest::from_wire(wire)?;
        if request.professor_name == NOT_AVAILABLE {
            if let Some(professor) = self.store.professor(payload.professor_id) {
                request.professor_name = professor.name;
            }
        }
        if request.professor_id.is_none() {
            request.professor_id = Some(payload.professor_id);
        }

        self.store.insert_request(request.clone());
        info!(advisory_id = request.id, status = %request.status, "Advisory request created");
        Ok(request)
    }

    /// Sends a status patch and merges the server's answer into the store.
    ///
    /// The stored request must exist and `patch.status` must be reachable
    /// from its current status; otherwise nothing is sent. Display fields the
    /// answer omits keep their previous values, and an answer without a
    /// record falls back to the patch itself. Nothing is rolled back on
    /// failure.
    pub async fn update_request(&self, id: i64, patch: &StatusPatch) -> ClientResult<AdvisoryRequest> {
        let _guard = self.store.begin(EntityKey::Advisory(id))?;
        let current = self.stored(id)?;
        if current.status.is_terminal() {
            return Err(TransitionError::Terminal(current.status).into());
        }
        if !can_transition(current.status, patch.status) {
            return Err(TransitionError::InvalidTarget {
                from: current.status,
                to: patch.status,
            }
            .into());
        }
        debug!(advisory_id = id, ?patch, "Sending status patch");

        let response: Value = self.api.put(&paths::advisory_status(id), patch).await?;
        let mut wire = if response.is_null() {
            debug!(advisory_id = id, "Status update acknowledged without a record");
            WireAdvisory::default()
        } else {
            serde_json::from_value(response)?
        };
        fill_from_patch(&mut wire, patch);

        let updated = self.store.merge_request(id, &wire).ok_or_else(|| {
            ClientError::validation(format!("advisory {id} was dropped while updating"))
        })?;
        info!(advisory_id = id, status = %updated.status, "Advisory updated");
        Ok(updated)
    }

    /// Checks `action` against the stored status, then patches the server.
    ///
    /// Every rejected transition fails before any network call.
    pub async fn apply(&self, id: i64, action: Action) -> ClientResult<AdvisoryRequest> {
        let current = self.stored(id)?;

        if let Action::Reschedule { time_slot, .. } = &action {
            if time_slot.advisory_id() != id {
                return Err(ClientError::validation(format!(
                    "slot {time_slot} was offered for advisory {}, not {id}",
                    time_slot.advisory_id()
                )));
            }
        }

        let next = next_state(current.status, &action).map_err(|e| {
            debug!(advisory_id = id, action = action.name(), error = %e, "Transition refused");
            ClientError::from(e)
        })?;

        info!(
            advisory_id = id,
            action = action.name(),
            from = %current.status,
            to = %next,
            "Applying advisory action"
        );
        self.update_request(id, &action.to_patch(next)).await
    }

    /// Submits a reschedule built from `draft`.
    pub async fn reschedule(
        &self,
        draft: &RescheduleDraft,
        motive: Option<String>,
    ) -> ClientResult<AdvisoryRequest> {
        let action = draft.to_action(motive, Utc::now().date_naive())?;
        self.apply(draft.advisory_id(), action).await
    }

    /// Records an advisory that already took place.
    ///
    /// Returns the stored record when the server echoes one back.
    pub async fn register_manual(&self, entry: &ManualEntry) -> ClientResult<Option<AdvisoryRequest>> {
        let body = entry.validate(Utc::now().date_naive())?;
        info!(date = %body.date, subject = %body.subject, "Registering manual advisory");

        let response: Value = self.api.post(paths::MANUAL_ADVISORY, &body).await?;
        let created = match serde_json::from_value::<WireAdvisory>(response) {
            Ok(wire) if wire.id.is_some() => match AdvisoryRequest::from_wire(wire) {
                Ok(request) => Some(request),
                Err(e) => {
                    warn!(error = %e, "Manual advisory saved but the response was unusable");
                    None
                }
            },
            _ => None,
        };

        if let Some(request) = &created {
            self.store.insert_request(request.clone());
        }
        Ok(created)
    }

    fn stored(&self, id: i64) -> ClientResult<AdvisoryRequest> {
        self.store
            .request(id)
            .ok_or_else(|| ClientError::validation(format!("unknown advisory {id}")))
    }
}

/// Fills what the server's answer left out with what was sent.
fn fill_from_patch(wire: &mut WireAdvisory, patch: &StatusPatch) {
    wire.status.get_or_insert(patch.status);
    if wire.date.is_none() {
        wire.date = patch.date.map(|d| d.to_rfc3339());
    }
    if wire.time_slot.is_none() {
        wire.time_slot = patch.time_slot.clone();
    }
    if wire.rejection_reason.is_none() {
        wire.rejection_reason = patch.rejection_reason.clone();
    }
}
