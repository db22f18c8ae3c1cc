/// Request bodies and response shapes that only exist on the wire
use crate::model::advisory::AdvisoryType;
use crate::model::schedule::{DayOfWeek, TimeOfDay};
use crate::model::user::User;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `data` of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub user: User,
    pub token: String,
}

/// Body of `POST /advisories`, sent by a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdvisory {
    pub professor_id: i64,
    pub date: NaiveDate,
    pub time_slot: String,
    pub subject: String,
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: AdvisoryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `POST /advisories/manual`: an advisory a professor already gave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAdvisory {
    pub date: NaiveDate,
    pub time_slot: String,
    pub subject: String,
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: AdvisoryType,
    pub description: String,
    pub student_name: String,
    pub student_email: String,
    pub status: &'static str,
    pub is_manual_entry: bool,
}

/// Body of `POST /schedules`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWindowBody {
    pub professor_id: i64,
    pub day_of_week: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub is_available: bool,
}

/// Body of `PUT /schedules/{id}/availability`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityBody {
    pub is_available: bool,
}

/// Endpoint paths, relative to the configured base URL.
pub mod paths {
    use chrono::NaiveDate;

    pub const LOGIN: &str = "/auth/login";
    pub const ME: &str = "/auth/me";
    pub const LOGOUT: &str = "/auth/logout";
    pub const ADVISORIES: &str = "/advisories";
    pub const MANUAL_ADVISORY: &str = "/advisories/manual";
    pub const DIRECTOR_HISTORY: &str = "/advisories/history/director";
    pub const MY_SCHEDULES: &str = "/schedules/my-schedules";
    pub const SCHEDULES: &str = "/schedules";
    pub const PROFESSORS: &str = "/users/professors";
    pub const REPORT_RANGE: &str = "/reports/advisories";
    pub const REPORT_COMPLETE: &str = "/reports/advisories/complete";

    pub fn student_advisories(student_id: i64) -> String {
        format!("/advisories/student/{student_id}")
    }

    pub fn professor_advisories(professor_id: i64) -> String {
        format!("/advisories/professor/{professor_id}")
    }

    pub fn advisory_status(id: i64) -> String {
        format!("/advisories/{id}/status")
    }

    pub fn schedule(id: i64) -> String {
        format!("/schedules/{id}")
    }

    pub fn schedule_availability(id: i64) -> String {
        format!("/schedules/{id}/availability")
    }

    pub fn available_slots(professor_id: i64, date: NaiveDate) -> String {
        format!("/schedules/available/{professor_id}/{}", date.format("%Y-%m-%d"))
    }
}
