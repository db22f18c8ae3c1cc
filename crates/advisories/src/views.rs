//! Role dashboards. Each view exposes only what its role may do.

use crate::advisory::ManualEntry;
use crate::api::dto::NewAdvisory;
use crate::availability::{Confirmation, RescheduleDraft};
use crate::context::AppContext;
use crate::error::{ClientError, ClientResult};
use crate::lifecycle::Action;
use crate::model::advisory::{AdvisoryRequest, AdvisoryStatus};
use crate::model::schedule::{AvailableSlot, NewWindow, ScheduleWindow};
use crate::model::user::{Professor, Role};
use crate::reports::{
    export_history_csv, DateRange, DirectorStats, HistoryFilter, ProfessorStats, ReportClient,
};
use chrono::NaiveDate;
use std::io::Write;

pub enum Dashboard<'a> {
    Student(StudentView<'a>),
    Professor(ProfessorView<'a>),
    Director(DirectorView<'a>),
}

impl<'a> Dashboard<'a> {
    /// Picks the view for the context's role.
    ///
    /// Fails with `MissingProfile` when a student or professor account lacks
    /// the profile the view is keyed on.
    pub fn for_context(ctx: &'a AppContext) -> ClientResult<Self> {
        let user = ctx.user();
        match user.role {
            Role::Student => {
                let student_id = user.student_id().ok_or_else(|| ClientError::MissingProfile {
                    message: format!("user {} has no student profile", user.id),
                })?;
                Ok(Dashboard::Student(StudentView { ctx, student_id }))
            }
            Role::Professor => {
                let professor_id =
                    user.professor_id().ok_or_else(|| ClientError::MissingProfile {
                        message: format!("user {} has no professor profile", user.id),
                    })?;
                Ok(Dashboard::Professor(ProfessorView { ctx, professor_id }))
            }
            Role::Director => Ok(Dashboard::Director(DirectorView { ctx })),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Dashboard::Student(_) => Role::Student,
            Dashboard::Professor(_) => Role::Professor,
            Dashboard::Director(_) => Role::Director,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Dashboard::Student(_) => "Student dashboard",
            Dashboard::Professor(_) => "Professor dashboard",
            Dashboard::Director(_) => "Director dashboard",
        }
    }
}

pub struct StudentView<'a> {
    ctx: &'a AppContext,
    student_id: i64,
}

impl StudentView<'_> {
    pub fn student_id(&self) -> i64 {
        self.student_id
    }

    pub fn my_requests(&self) -> Vec<AdvisoryRequest> {
        let id = self.student_id;
        self.ctx
            .store()
            .requests_where(|r| r.student_id.map_or(true, |s| s == id))
    }

    /// Requests the professor has answered (accepted, rejected, rescheduled).
    pub fn answered(&self) -> Vec<AdvisoryRequest> {
        self.my_requests()
            .into_iter()
            .filter(|r| {
                matches!(
                    r.status,
                    AdvisoryStatus::Accepted | AdvisoryStatus::Rejected | AdvisoryStatus::Rescheduled
                )
            })
            .collect()
    }

    pub fn history(&self) -> Vec<AdvisoryRequest> {
        self.my_requests()
            .into_iter()
            .filter(|r| r.status.is_terminal())
            .collect()
    }

    pub fn professors(&self) -> Vec<Professor> {
        self.ctx.store().professors()
    }

    pub async fn request_advisory(&self, payload: &NewAdvisory) -> ClientResult<AdvisoryRequest> {
        self.ctx.advisories().create_request(payload).await
    }
}

pub struct ProfessorView<'a> {
    ctx: &'a AppContext,
    professor_id: i64,
}

impl ProfessorView<'_> {
    pub fn professor_id(&self) -> i64 {
        self.professor_id
    }

    fn own_where<F>(&self, predicate: F) -> Vec<AdvisoryRequest>
    where
        F: Fn(&AdvisoryRequest) -> bool,
    {
        let id = self.professor_id;
        self.ctx
            .store()
            .requests_where(|r| r.professor_id == Some(id) && predicate(r))
    }

    /// Pending requests awaiting an answer.
    pub fn received(&self) -> Vec<AdvisoryRequest> {
        self.own_where(|r| r.status == AdvisoryStatus::Pending)
    }

    /// Accepted or rescheduled sessions.
    pub fn scheduled(&self) -> Vec<AdvisoryRequest> {
        self.own_where(|r| r.status.is_scheduled())
    }

    /// Completed or rejected requests.
    pub fn history(&self) -> Vec<AdvisoryRequest> {
        self.own_where(|r| r.status.is_terminal())
    }

    fn own_request(&self, id: i64) -> ClientResult<AdvisoryRequest> {
        match self.ctx.store().request(id) {
            Some(r) if r.professor_id == Some(self.professor_id) => Ok(r),
            _ => Err(ClientError::validation(format!(
                "advisory {id} is not one of your requests"
            ))),
        }
    }

    async fn act(&self, id: i64, action: Action) -> ClientResult<AdvisoryRequest> {
        self.own_request(id)?;
        self.ctx.advisories().apply(id, action).await
    }

    pub async fn accept(&self, id: i64) -> ClientResult<AdvisoryRequest> {
        self.act(id, Action::Accept).await
    }

    pub async fn reject(&self, id: i64, reason: Option<String>) -> ClientResult<AdvisoryRequest> {
        self.act(id, Action::Reject { reason }).await
    }

    pub async fn cancel(&self, id: i64, reason: String) -> ClientResult<AdvisoryRequest> {
        self.act(id, Action::Cancel { reason }).await
    }

    pub async fn complete(&self, id: i64, observations: String) -> ClientResult<AdvisoryRequest> {
        self.act(id, Action::Complete { observations }).await
    }

    /// Opens a reschedule draft for one of this professor's requests.
    pub fn start_reschedule(&self, id: i64) -> ClientResult<RescheduleDraft> {
        RescheduleDraft::new(&self.own_request(id)?)
    }

    /// Loads the draft's slots for its current date.
    pub async fn refresh_slots(&self, draft: &mut RescheduleDraft) -> ClientResult<usize> {
        self.ctx.availability().refresh_draft(draft).await
    }

    pub async fn reschedule(
        &self,
        draft: &RescheduleDraft,
        motive: Option<String>,
    ) -> ClientResult<AdvisoryRequest> {
        self.own_request(draft.advisory_id())?;
        self.ctx.advisories().reschedule(draft, motive).await
    }

    pub fn windows(&self) -> Vec<ScheduleWindow> {
        self.ctx.store().windows_for(self.professor_id)
    }

    pub async fn add_window(&self, window: NewWindow) -> ClientResult<ScheduleWindow> {
        self.ctx
            .availability()
            .add_window(self.professor_id, window)
            .await
    }

    pub async fn remove_window(&self, window_id: i64, confirmation: Confirmation) -> ClientResult<bool> {
        self.ctx
            .availability()
            .remove_window(self.professor_id, window_id, confirmation)
            .await
    }

    pub async fn toggle_window(&self, window_id: i64) -> Option<bool> {
        self.ctx
            .availability()
            .toggle_availability(self.professor_id, window_id)
            .await
    }

    pub async fn slots_on(&self, date: NaiveDate) -> ClientResult<Vec<AvailableSlot>> {
        self.ctx
            .availability()
            .available_slots_for(self.professor_id, date)
            .await
    }

    pub async fn register_manual(&self, entry: &ManualEntry) -> ClientResult<Option<AdvisoryRequest>> {
        self.ctx.advisories().register_manual(entry).await
    }

    pub fn stats(&self, range: Option<DateRange>) -> ProfessorStats {
        ProfessorStats::compute(&self.ctx.store().requests(), self.professor_id, range)
    }

    pub fn export_history<W: Write>(&self, writer: W) -> ClientResult<usize> {
        export_history_csv(&self.history(), writer)
    }
}

pub struct DirectorView<'a> {
    ctx: &'a AppContext,
}

impl DirectorView<'_> {
    pub fn history(&self, filter: &HistoryFilter) -> Vec<AdvisoryRequest> {
        self.ctx.store().requests_where(|r| filter.matches(r))
    }

    pub fn stats(&self) -> DirectorStats {
        DirectorStats::compute(&self.ctx.store().requests())
    }

    pub fn professors(&self) -> Vec<Professor> {
        self.ctx.store().professors()
    }

    pub fn reports(&self) -> ReportClient<'_> {
        ReportClient::new(self.ctx.api())
    }

    pub fn export_history<W: Write>(&self, filter: &HistoryFilter, writer: W) -> ClientResult<usize> {
        export_history_csv(&self.history(filter), writer)
    }
}
