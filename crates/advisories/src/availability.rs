//! Professor availability: weekly windows and the per-date slot list used
//! when rescheduling.

use crate::api::dto::{AvailabilityBody, NewWindowBody};
use crate::api::{paths, ApiClient};
use crate::config::ScheduleBounds;
use crate::error::{ClientError, ClientResult};
use crate::lifecycle::{Action, ChosenSlot, TransitionError};
use crate::model::advisory::AdvisoryRequest;
use crate::model::schedule::{AvailableSlot, NewWindow, ScheduleWindow};
use crate::store::{DataStore, EntityKey};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

/// Caller's answer to "delete this window?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// Checks a new window against the professor's existing ones.
///
/// Rejects an empty or inverted range, a range outside `bounds`, and any
/// overlap with a window on the same day (paused windows included).
pub fn check_new_window(
    existing: &[ScheduleWindow],
    window: &NewWindow,
    bounds: &ScheduleBounds,
) -> ClientResult<()> {
    if !window.range.is_valid() {
        return Err(ClientError::InvalidTimeRange {
            range: window.range,
            reason: "start time must be before end time".to_string(),
        });
    }
    if !bounds.as_range().contains(&window.range) {
        return Err(ClientError::InvalidTimeRange {
            range: window.range,
            reason: format!("windows must fall within {}", bounds.as_range()),
        });
    }

    match existing
        .iter()
        .find(|w| w.day == window.day && w.range().overlaps(&window.range))
    {
        Some(conflict) => Err(ClientError::ScheduleConflict {
            day: window.day,
            requested: window.range,
            existing_id: conflict.id,
            existing: conflict.range(),
        }),
        None => Ok(()),
    }
}

/// Window and slot operations for one session.
pub struct AvailabilityManager<'a> {
    api: &'a ApiClient,
    store: &'a DataStore,
    bounds: ScheduleBounds,
}

impl<'a> AvailabilityManager<'a> {
    pub fn new(api: &'a ApiClient, store: &'a DataStore, bounds: ScheduleBounds) -> Self {
        Self { api, store, bounds }
    }

    /// Validates, persists, and records a new window.
    ///
    /// Validation and conflict failures never reach the server and leave the
    /// store untouched.
    pub async fn add_window(
        &self,
        professor_id: i64,
        window: NewWindow,
    ) -> ClientResult<ScheduleWindow> {
        check_new_window(&self.store.windows_for(professor_id), &window, &self.bounds)?;

        let _guard = self.store.begin(EntityKey::NewWindow(professor_id))?;
        info!(
            professor_id,
            day = %window.day,
            range = %window.range,
            "Adding schedule window"
        );

        let body = NewWindowBody {
            professor_id,
            day_of_week: window.day,
            start_time: window.range.start,
            end_time: window.range.end,
            is_available: window.is_available,
        };
        let mut created: ScheduleWindow = self.api.post(paths::SCHEDULES, &body).await?;
        created.professor_id = professor_id;

        self.store.push_window(created.clone());
        info!(professor_id, window_id = created.id, "Schedule window added");
        Ok(created)
    }

    /// Deletes a window after explicit confirmation.
    ///
    /// Returns `Ok(false)` when the caller declined.
    pub async fn remove_window(
        &self,
        professor_id: i64,
        window_id: i64,
        confirmation: Confirmation,
    ) -> ClientResult<bool> {
        if confirmation == Confirmation::Declined {
            debug!(professor_id, window_id, "Window removal declined");
            return Ok(false);
        }

        let _guard = self.store.begin(EntityKey::Window(window_id))?;
        self.api.delete(&paths::schedule(window_id)).await?;
        self.store.remove_window(professor_id, window_id);
        info!(professor_id, window_id, "Schedule window removed");
        Ok(true)
    }

    /// Flips a window's availability.
    ///
    /// Returns the new flag, or `None` if the window is unknown, busy, or the
    /// server call failed. Failures are only logged and the local copy keeps
    /// its previous value.
    pub async fn toggle_availability(&self, professor_id: i64, window_id: i64) -> Option<bool> {
        let current = self.store.window(professor_id, window_id)?;
        let target = !current.is_available;

        let _guard = match self.store.begin(EntityKey::Window(window_id)) {
            Ok(guard) => guard,
            Err(e) => {
                warn!(window_id, error = %e, "Availability toggle skipped");
                return None;
            }
        };

        let body = AvailabilityBody {
            is_available: target,
        };
        match self
            .api
            .put_unit(&paths::schedule_availability(window_id), &body)
            .await
        {
            Ok(()) => {
                self.store
                    .set_window_availability(professor_id, window_id, target);
                info!(window_id, available = target, "Window availability changed");
                Some(target)
            }
            Err(e) => {
                warn!(window_id, error = %e, "Failed to update window availability");
                None
            }
        }
    }

    /// Open slots for a professor on one date, as resolved by the server.
    pub async fn available_slots_for(
        &self,
        professor_id: i64,
        date: NaiveDate,
    ) -> ClientResult<Vec<AvailableSlot>> {
        let slots: Vec<AvailableSlot> = self
            .api
            .get_list(&paths::available_slots(professor_id, date))
            .await?;
        debug!(professor_id, %date, count = slots.len(), "Fetched available slots");
        Ok(slots)
    }

    /// Reloads the draft's candidate list for its current professor and date.
    ///
    /// The selection is cleared first; on failure the list stays empty.
    pub async fn refresh_draft(&self, draft: &mut RescheduleDraft) -> ClientResult<usize> {
        draft.clear_candidates();
        let date = draft.date;
        let slots = self.available_slots_for(draft.professor_id, date).await?;
        draft.set_candidates(date, slots);
        Ok(draft.candidates().len())
    }
}

/// In-progress reschedule of one advisory.
///
/// The slot must come from the candidate list fetched for the draft's
/// current date; changing the date invalidates list and selection.
#[derive(Debug, Clone)]
pub struct RescheduleDraft {
    advisory_id: i64,
    professor_id: i64,
    date: NaiveDate,
    candidates: Vec<AvailableSlot>,
    fetched_for: Option<NaiveDate>,
    selected: Option<i64>,
}

impl RescheduleDraft {
    /// Starts a draft on the request's current date.
    pub fn new(request: &AdvisoryRequest) -> ClientResult<Self> {
        let professor_id = request.professor_id.ok_or_else(|| {
            ClientError::validation(format!("advisory {} has no professor", request.id))
        })?;
        Ok(Self {
            advisory_id: request.id,
            professor_id,
            date: request.date,
            candidates: Vec::new(),
            fetched_for: None,
            selected: None,
        })
    }

    pub fn advisory_id(&self) -> i64 {
        self.advisory_id
    }

    pub fn professor_id(&self) -> i64 {
        self.professor_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn candidates(&self) -> &[AvailableSlot] {
        &self.candidates
    }

    pub fn selected(&self) -> Option<&AvailableSlot> {
        self.selected
            .and_then(|id| self.candidates.iter().find(|s| s.id == id))
    }

    /// Moves the draft to another date; candidates must be fetched again.
    pub fn set_date(&mut self, date: NaiveDate) {
        if date != self.date {
            self.date = date;
            self.clear_candidates();
        }
    }

    fn clear_candidates(&mut self) {
        self.candidates.clear();
        self.fetched_for = None;
        self.selected = None;
    }

    /// Installs a fetched list. Lists for a date other than the current one
    /// are stale and ignored.
    pub fn set_candidates(&mut self, date: NaiveDate, slots: Vec<AvailableSlot>) {
        if date != self.date {
            debug!(%date, current = %self.date, "Discarding stale slot list");
            return;
        }
        self.candidates = slots;
        self.fetched_for = Some(date);
        self.selected = None;
    }

    /// Picks a slot by id from the current candidate list.
    pub fn select(&mut self, slot_id: i64) -> ClientResult<&AvailableSlot> {
        if self.fetched_for != Some(self.date) {
            return Err(ClientError::validation(
                "available slots have not been loaded for the selected date",
            ));
        }
        let slot = self
            .candidates
            .iter()
            .find(|s| s.id == slot_id)
            .ok_or_else(|| {
                ClientError::validation(format!(
                    "slot {slot_id} is not available on {}",
                    self.date
                ))
            })?;
        self.selected = Some(slot.id);
        Ok(slot)
    }

    /// Whether the reschedule action is enabled.
    pub fn can_submit(&self) -> bool {
        self.fetched_for == Some(self.date) && self.selected().is_some()
    }

    /// Builds the reschedule action, or the validation error that keeps it disabled.
    ///
    /// The target date may not be before `today`.
    pub fn to_action(&self, motive: Option<String>, today: NaiveDate) -> ClientResult<Action> {
        if self.date < today {
            return Err(ClientError::validation(format!(
                "cannot reschedule to a past date ({})",
                self.date
            )));
        }
        let slot = match (self.can_submit(), self.selected()) {
            (true, Some(slot)) => slot,
            _ => return Err(ClientError::Transition(TransitionError::MissingSlot)),
        };
        Ok(Action::Reschedule {
            date: self.date,
            time_slot: ChosenSlot::new(self.advisory_id, slot.time_slot()),
            motive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::advisory::{AdvisoryStatus, AdvisoryType};
    use crate::model::schedule::{DayOfWeek, TimeOfDay};

    fn existing(id: i64, day: DayOfWeek, start: (u16, u16), end: (u16, u16)) -> ScheduleWindow {
        ScheduleWindow {
            id,
            professor_id: 3,
            day,
            start: TimeOfDay::hm(start.0, start.1),
            end: TimeOfDay::hm(end.0, end.1),
            is_available: true,
        }
    }

    fn new(day: DayOfWeek, start: (u16, u16), end: (u16, u16)) -> NewWindow {
        NewWindow::new(
            day,
            TimeOfDay::hm(start.0, start.1),
            TimeOfDay::hm(end.0, end.1),
        )
    }

    fn slot(id: i64, hour: u16) -> AvailableSlot {
        AvailableSlot {
            id,
            day: Some(DayOfWeek::Monday),
            start: TimeOfDay::hm(hour, 0),
            end: TimeOfDay::hm(hour + 1, 0),
        }
    }

    fn request() -> AdvisoryRequest {
        AdvisoryRequest {
            id: 10,
            student_id: Some(1),
            student_name: "Ana".into(),
            student_code: "213456".into(),
            professor_id: Some(3),
            professor_name: "Luis".into(),
            date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
            time_slot: "09:00 - 10:00".into(),
            subject: "Cálculo".into(),
            topic: "Integrales".into(),
            kind: AdvisoryType::Individual,
            status: AdvisoryStatus::Accepted,
            annotation: String::new(),
            created_at: None,
        }
    }

    #[test]
    fn test_overlapping_window_is_rejected() {
        let windows = vec![existing(1, DayOfWeek::Monday, (9, 0), (10, 0))];
        let bounds = ScheduleBounds::default();

        let err = check_new_window(&windows, &new(DayOfWeek::Monday, (9, 30), (10, 30)), &bounds)
            .unwrap_err();
        assert!(matches!(err, ClientError::ScheduleConflict { existing_id: 1, .. }));

        assert!(check_new_window(&windows, &new(DayOfWeek::Monday, (10, 0), (11, 0)), &bounds).is_ok());
        assert!(check_new_window(&windows, &new(DayOfWeek::Tuesday, (9, 0), (10, 0)), &bounds).is_ok());
        assert!(check_new_window(&windows, &new(DayOfWeek::Monday, (8, 0), (11, 0)), &bounds).is_err());
        assert!(check_new_window(&windows, &new(DayOfWeek::Monday, (9, 0), (10, 0)), &bounds).is_err());
    }

    #[test]
    fn test_paused_windows_still_conflict() {
        let mut paused = existing(1, DayOfWeek::Friday, (12, 0), (14, 0));
        paused.is_available = false;
        assert!(check_new_window(
            &[paused],
            &new(DayOfWeek::Friday, (13, 0), (15, 0)),
            &ScheduleBounds::default()
        )
        .is_err());
    }

    #[test]
    fn test_invalid_ranges() {
        let bounds = ScheduleBounds::default();
        for (start, end) in [((10, 0), (10, 0)), ((11, 0), (10, 0))] {
            assert!(matches!(
                check_new_window(&[], &new(DayOfWeek::Monday, start, end), &bounds),
                Err(ClientError::InvalidTimeRange { .. })
            ));
        }
        assert!(matches!(
            check_new_window(&[], &new(DayOfWeek::Monday, (6, 0), (8, 0)), &bounds),
            Err(ClientError::InvalidTimeRange { .. })
        ));
        assert!(check_new_window(&[], &new(DayOfWeek::Monday, (17, 0), (18, 0)), &bounds).is_ok());
    }

    #[test]
    fn test_draft_requires_slot_from_latest_list() {
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let mut draft = RescheduleDraft::new(&request()).unwrap();
        assert!(!draft.can_submit());
        assert!(draft.select(1).is_err());

        draft.set_candidates(draft.date(), vec![slot(1, 9), slot(2, 11)]);
        assert!(draft.select(7).is_err());
        draft.select(2).unwrap();
        assert!(draft.can_submit());

        match draft.to_action(None, today).unwrap() {
            Action::Reschedule { time_slot, .. } => {
                assert_eq!(time_slot.as_str(), "11:00 - 12:00");
                assert_eq!(time_slot.advisory_id(), 10);
            }
            other => panic!("unexpected action {other:?}"),
        }

        draft.set_date(NaiveDate::from_ymd_opt(2030, 1, 8).unwrap());
        assert!(!draft.can_submit());
        assert!(draft.candidates().is_empty());
        assert!(draft.to_action(None, today).is_err());
    }

    #[test]
    fn test_empty_slot_list_keeps_action_disabled() {
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let mut draft = RescheduleDraft::new(&request()).unwrap();
        draft.set_candidates(draft.date(), Vec::new());
        assert!(!draft.can_submit());
        assert!(matches!(
            draft.to_action(Some("motivo".into()), today),
            Err(ClientError::Transition(_))
        ));
    }

    #[test]
    fn test_stale_list_is_ignored() {
        let mut draft = RescheduleDraft::new(&request()).unwrap();
        let old_date = draft.date();
        draft.set_date(NaiveDate::from_ymd_opt(2030, 1, 14).unwrap());
        draft.set_candidates(old_date, vec![slot(1, 9)]);
        assert!(draft.candidates().is_empty());
    }

    #[test]
    fn test_past_date_is_rejected() {
        let mut draft = RescheduleDraft::new(&request()).unwrap();
        draft.set_candidates(draft.date(), vec![slot(1, 9)]);
        draft.select(1).unwrap();
        let later = NaiveDate::from_ymd_opt(2031, 1, 1).unwrap();
        assert!(matches!(
            draft.to_action(None, later),
            Err(ClientError::Validation { .. })
        ));
    }
}
