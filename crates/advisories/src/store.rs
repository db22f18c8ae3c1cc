//! Session-scoped, in-memory mirror of the server's data.
//!
//! Only the advisory controller and the availability manager write here;
//! views read snapshots.

use crate::error::{ClientError, ClientResult};
use crate::model::advisory::{AdvisoryRequest, WireAdvisory};
use crate::model::schedule::ScheduleWindow;
use crate::model::user::Professor;
use dashmap::{DashMap, DashSet};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// An entity that can have a mutation waiting on the server.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum EntityKey {
    Advisory(i64),
    Window(i64),
    /// Window creation for a professor, before an id exists
    NewWindow(i64),
    /// Advisory creation by the current user, before an id exists
    NewAdvisory,
}

impl Display for EntityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            EntityKey::Advisory(id) => write!(f, "advisory {id}"),
            EntityKey::Window(id) => write!(f, "schedule window {id}"),
            EntityKey::NewWindow(professor) => write!(f, "new window for professor {professor}"),
            EntityKey::NewAdvisory => f.write_str("new advisory"),
        }
    }
}

/// Marks an entity busy until dropped.
pub struct InFlightGuard<'a> {
    set: &'a DashSet<EntityKey>,
    key: EntityKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}

#[derive(Default)]
pub struct DataStore {
    requests: DashMap<i64, AdvisoryRequest>,
    windows: DashMap<i64, Vec<ScheduleWindow>>,
    professors: DashMap<i64, Professor>,
    in_flight: DashSet<EntityKey>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key` for one network exchange.
    ///
    /// Fails with `OperationInProgress` while another guard for the same key
    /// is alive.
    pub fn begin(&self, key: EntityKey) -> ClientResult<InFlightGuard<'_>> {
        if !self.in_flight.insert(key) {
            return Err(ClientError::OperationInProgress {
                entity: key.to_string(),
            });
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            key,
        })
    }

    pub fn is_in_flight(&self, key: EntityKey) -> bool {
        self.in_flight.contains(&key)
    }

    // --- advisory requests ---

    pub fn replace_requests(&self, requests: Vec<AdvisoryRequest>) {
        self.requests.clear();
        for request in requests {
            self.requests.insert(request.id, request);
        }
    }

    pub fn insert_request(&self, request: AdvisoryRequest) {
        self.requests.insert(request.id, request);
    }

    /// Merges a server response into the stored record and returns the result.
    pub fn merge_request(&self, id: i64, wire: &WireAdvisory) -> Option<AdvisoryRequest> {
        self.requests.get_mut(&id).map(|mut entry| {
            entry.merge(wire);
            entry.value().clone()
        })
    }

    pub fn request(&self, id: i64) -> Option<AdvisoryRequest> {
        self.requests.get(&id).map(|entry| entry.value().clone())
    }

    /// All requests, ordered by date then id.
    pub fn requests(&self) -> Vec<AdvisoryRequest> {
        self.requests_where(|_| true)
    }

    pub fn requests_where<F>(&self, predicate: F) -> Vec<AdvisoryRequest>
    where
        F: Fn(&AdvisoryRequest) -> bool,
    {
        let mut out: Vec<AdvisoryRequest> = self
            .requests
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by_key(|r| (r.date, r.id));
        out
    }

    // --- schedule windows ---

    pub fn replace_windows(&self, professor_id: i64, mut windows: Vec<ScheduleWindow>) {
        for window in &mut windows {
            window.professor_id = professor_id;
        }
        self.windows.insert(professor_id, windows);
    }

    /// The professor's windows, ordered by day then start time.
    pub fn windows_for(&self, professor_id: i64) -> Vec<ScheduleWindow> {
        let mut windows = self
            .windows
            .get(&professor_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        windows.sort_by_key(|w| (w.day, w.start));
        windows
    }

    pub fn window(&self, professor_id: i64, window_id: i64) -> Option<ScheduleWindow> {
        self.windows
            .get(&professor_id)
            .and_then(|entry| entry.iter().find(|w| w.id == window_id).cloned())
    }

    pub fn push_window(&self, window: ScheduleWindow) {
        self.windows
            .entry(window.professor_id)
            .or_default()
            .push(window);
    }

    /// Returns true if the window existed.
    pub fn remove_window(&self, professor_id: i64, window_id: i64) -> bool {
        self.windows
            .get_mut(&professor_id)
            .map(|mut entry| {
                let before = entry.len();
                entry.retain(|w| w.id != window_id);
                entry.len() != before
            })
            .unwrap_or(false)
    }

    /// Returns true if the window existed.
    pub fn set_window_availability(&self, professor_id: i64, window_id: i64, available: bool) -> bool {
        self.windows
            .get_mut(&professor_id)
            .and_then(|mut entry| {
                entry.iter_mut().find(|w| w.id == window_id).map(|w| {
                    w.is_available = available;
                })
            })
            .is_some()
    }

    // --- professor directory ---

    pub fn replace_professors(&self, professors: Vec<Professor>) {
        self.professors.clear();
        for professor in professors {
            self.professors.insert(professor.id, professor);
        }
    }

    /// The directory, ordered by name.
    pub fn professors(&self) -> Vec<Professor> {
        let mut out: Vec<Professor> = self.professors.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        out
    }

    pub fn professor(&self, id: i64) -> Option<Professor> {
        self.professors.get(&id).map(|e| e.value().clone())
    }

    /// Drops everything; used when the session ends.
    pub fn clear(&self) {
        self.requests.clear();
        self.windows.clear();
        self.professors.clear();
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schedule::{DayOfWeek, TimeOfDay};

    fn window(id: i64, day: DayOfWeek, start: u16) -> ScheduleWindow {
        ScheduleWindow {
            id,
            professor_id: 0,
            day,
            start: TimeOfDay::hm(start, 0),
            end: TimeOfDay::hm(start + 1, 0),
            is_available: true,
        }
    }

    #[test]
    fn test_in_flight_guard_blocks_second_claim() {
        let store = DataStore::new();
        let guard = store.begin(EntityKey::Advisory(1)).unwrap();
        assert!(matches!(
            store.begin(EntityKey::Advisory(1)),
            Err(ClientError::OperationInProgress { .. })
        ));
        assert!(store.begin(EntityKey::Advisory(2)).is_ok());
        drop(guard);
        assert!(!store.is_in_flight(EntityKey::Advisory(1)));
        assert!(store.begin(EntityKey::Advisory(1)).is_ok());
    }

    #[test]
    fn test_window_bookkeeping() {
        let store = DataStore::new();
        store.replace_windows(
            3,
            vec![window(2, DayOfWeek::Tuesday, 9), window(1, DayOfWeek::Monday, 11)],
        );
        let ids: Vec<i64> = store.windows_for(3).iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(store.windows_for(3).iter().all(|w| w.professor_id == 3));

        assert!(store.set_window_availability(3, 2, false));
        assert!(!store.window(3, 2).unwrap().is_available);
        assert!(!store.set_window_availability(3, 99, false));

        assert!(store.remove_window(3, 1));
        assert!(!store.remove_window(3, 1));
        assert!(store.windows_for(4).is_empty());
    }
}
