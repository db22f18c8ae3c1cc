//! Advisory requests and the loose JSON shapes the API returns for them.
//!
//! The backend nests student and professor profiles inconsistently across
//! endpoints, so every response goes through [`WireAdvisory`] and is
//! flattened into an [`AdvisoryRequest`] with display fallbacks resolved.

use crate::error::ClientError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Placeholder shown when a display field cannot be resolved.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryStatus {
    Pending,
    Accepted,
    Rejected,
    Rescheduled,
    Completed,
}

impl AdvisoryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AdvisoryStatus::Pending => "pending",
            AdvisoryStatus::Accepted => "accepted",
            AdvisoryStatus::Rejected => "rejected",
            AdvisoryStatus::Rescheduled => "rescheduled",
            AdvisoryStatus::Completed => "completed",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, AdvisoryStatus::Completed | AdvisoryStatus::Rejected)
    }

    /// Accepted or rescheduled: the session is on the calendar.
    pub fn is_scheduled(self) -> bool {
        matches!(self, AdvisoryStatus::Accepted | AdvisoryStatus::Rescheduled)
    }
}

impl Display for AdvisoryStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.pad(self.as_str())
    }
}

impl FromStr for AdvisoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(AdvisoryStatus::Pending),
            "accepted" => Ok(AdvisoryStatus::Accepted),
            "rejected" => Ok(AdvisoryStatus::Rejected),
            "rescheduled" => Ok(AdvisoryStatus::Rescheduled),
            "completed" => Ok(AdvisoryStatus::Completed),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AdvisoryType {
    #[default]
    #[serde(rename = "individual")]
    Individual,
    #[serde(rename = "grupal", alias = "group")]
    Group,
}

impl AdvisoryType {
    pub fn as_str(self) -> &'static str {
        match self {
            AdvisoryType::Individual => "individual",
            AdvisoryType::Group => "grupal",
        }
    }
}

impl Display for AdvisoryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.pad(match self {
            AdvisoryType::Individual => "Individual",
            AdvisoryType::Group => "Group",
        })
    }
}

impl FromStr for AdvisoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "individual" => Ok(AdvisoryType::Individual),
            "grupal" | "group" => Ok(AdvisoryType::Group),
            other => Err(format!("unknown advisory type: {other}")),
        }
    }
}

/// A flattened advisory request as held in the client store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisoryRequest {
    pub id: i64,
    pub student_id: Option<i64>,
    pub student_name: String,
    /// Matrícula, or `EST-{id}` / `N/A` when the API does not send one
    pub student_code: String,
    pub professor_id: Option<i64>,
    pub professor_name: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub subject: String,
    pub topic: String,
    pub kind: AdvisoryType,
    pub status: AdvisoryStatus,
    /// Rejection reason, reschedule motive, or completion observations
    pub annotation: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl AdvisoryRequest {
    /// Flattens an API record. Fails only when the id or date is unusable.
    pub fn from_wire(wire: WireAdvisory) -> Result<Self, ClientError> {
        let id = wire.id.ok_or_else(|| ClientError::UnexpectedResponse {
            message: "advisory without id".to_string(),
        })?;
        let date = wire
            .date
            .as_deref()
            .and_then(parse_api_date)
            .ok_or_else(|| ClientError::UnexpectedResponse {
                message: format!("advisory {id} has no usable date: {:?}", wire.date),
            })?;

        Ok(AdvisoryRequest {
            id,
            student_id: wire.resolve_student_id(),
            student_name: wire
                .resolve_student_name()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            student_code: wire
                .resolve_student_code()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            professor_id: wire.resolve_professor_id(),
            professor_name: wire
                .resolve_professor_name()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            date,
            time_slot: wire.time_slot.clone().unwrap_or_default(),
            subject: wire.subject.clone().unwrap_or_default(),
            topic: wire.topic.clone().unwrap_or_default(),
            kind: wire.kind.unwrap_or_default(),
            status: wire.status.unwrap_or(AdvisoryStatus::Pending),
            annotation: wire.resolve_annotation().unwrap_or_default(),
            created_at: wire.created_at.as_deref().and_then(parse_api_timestamp),
        })
    }

    /// Merges a server response into this record.
    ///
    /// Fields the response carries overwrite; display fields it omits keep
    /// their current values.
    pub fn merge(&mut self, wire: &WireAdvisory) {
        if let Some(status) = wire.status {
            self.status = status;
        }
        if let Some(date) = wire.date.as_deref().and_then(parse_api_date) {
            self.date = date;
        }
        if let Some(slot) = &wire.time_slot {
            self.time_slot = slot.clone();
        }
        if let Some(subject) = &wire.subject {
            self.subject = subject.clone();
        }
        if let Some(topic) = &wire.topic {
            self.topic = topic.clone();
        }
        if let Some(kind) = wire.kind {
            self.kind = kind;
        }
        if let Some(annotation) = wire.resolve_annotation() {
            self.annotation = annotation;
        }
        if let Some(code) = wire.resolve_student_code() {
            self.student_code = code;
        }
        if let Some(name) = wire.resolve_student_name() {
            self.student_name = name;
        }
        if let Some(name) = wire.resolve_professor_name() {
            self.professor_name = name;
        }
        if let Some(id) = wire.resolve_student_id() {
            self.student_id = Some(id);
        }
        if let Some(id) = wire.resolve_professor_id() {
            self.professor_id = Some(id);
        }
    }

    pub fn parsed_time_slot(&self) -> Option<crate::model::schedule::TimeRange> {
        self.time_slot.parse().ok()
    }
}

/// Advisory record exactly as the API sends it; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireAdvisory {
    pub id: Option<i64>,
    pub student_id: Option<i64>,
    pub professor_id: Option<i64>,
    pub student: Option<WireStudent>,
    pub professor: Option<WireProfessor>,
    pub student_name: Option<String>,
    pub professor_name: Option<String>,
    pub student_matricula: Option<String>,
    pub date: Option<String>,
    pub time_slot: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<AdvisoryType>,
    pub status: Option<AdvisoryStatus>,
    pub observations: Option<String>,
    pub observaciones: Option<String>,
    pub description: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireStudent {
    pub id: Option<i64>,
    pub student_code: Option<String>,
    pub matricula: Option<String>,
    pub enrollment: Option<String>,
    pub user: Option<WireUserRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireProfessor {
    pub id: Option<i64>,
    pub user: Option<WireUserRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireUserRef {
    pub name: Option<String>,
    pub matricula: Option<String>,
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl WireAdvisory {
    fn resolve_student_code(&self) -> Option<String> {
        let student = self.student.as_ref();
        non_blank(student.and_then(|s| s.student_code.as_ref()))
            .or_else(|| non_blank(student.and_then(|s| s.matricula.as_ref())))
            .or_else(|| {
                non_blank(
                    student
                        .and_then(|s| s.user.as_ref())
                        .and_then(|u| u.matricula.as_ref()),
                )
            })
            .or_else(|| non_blank(self.student_matricula.as_ref()))
            .or_else(|| non_blank(student.and_then(|s| s.enrollment.as_ref())))
            .or_else(|| student.and_then(|s| s.id).map(|id| format!("EST-{id}")))
    }

    fn resolve_annotation(&self) -> Option<String> {
        non_blank(self.observations.as_ref())
            .or_else(|| non_blank(self.observaciones.as_ref()))
            .or_else(|| non_blank(self.description.as_ref()))
            .or_else(|| non_blank(self.rejection_reason.as_ref()))
    }

    fn resolve_student_name(&self) -> Option<String> {
        non_blank(
            self.student
                .as_ref()
                .and_then(|s| s.user.as_ref())
                .and_then(|u| u.name.as_ref()),
        )
        .or_else(|| non_blank(self.student_name.as_ref()))
    }

    fn resolve_professor_name(&self) -> Option<String> {
        non_blank(
            self.professor
                .as_ref()
                .and_then(|p| p.user.as_ref())
                .and_then(|u| u.name.as_ref()),
        )
        .or_else(|| non_blank(self.professor_name.as_ref()))
    }

    fn resolve_student_id(&self) -> Option<i64> {
        self.student_id
            .or_else(|| self.student.as_ref().and_then(|s| s.id))
    }

    fn resolve_professor_id(&self) -> Option<i64> {
        self.professor_id
            .or_else(|| self.professor.as_ref().and_then(|p| p.id))
    }
}

/// Reads the calendar date of an API date field without local timezone drift.
///
/// Accepts `YYYY-MM-DD` and RFC 3339 timestamps (taking the UTC date).
pub fn parse_api_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

fn parse_api_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(json: &str) -> WireAdvisory {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_student_code_fallback_chain() {
        let by_code = wire(r#"{"id":1,"date":"2024-05-06","student":{"id":9,"studentCode":"213456","matricula":"X"}}"#);
        assert_eq!(AdvisoryRequest::from_wire(by_code).unwrap().student_code, "213456");

        let by_user = wire(r#"{"id":1,"date":"2024-05-06","student":{"id":9,"user":{"matricula":"U-1"}}}"#);
        assert_eq!(AdvisoryRequest::from_wire(by_user).unwrap().student_code, "U-1");

        let by_flat = wire(r#"{"id":1,"date":"2024-05-06","studentMatricula":"F-2"}"#);
        assert_eq!(AdvisoryRequest::from_wire(by_flat).unwrap().student_code, "F-2");

        let by_id = wire(r#"{"id":1,"date":"2024-05-06","student":{"id":9}}"#);
        assert_eq!(AdvisoryRequest::from_wire(by_id).unwrap().student_code, "EST-9");

        let nothing = wire(r#"{"id":1,"date":"2024-05-06"}"#);
        assert_eq!(AdvisoryRequest::from_wire(nothing).unwrap().student_code, NOT_AVAILABLE);
    }

    #[test]
    fn test_names_and_ids_from_nested_profiles() {
        let req = AdvisoryRequest::from_wire(wire(
            r#"{"id":4,"date":"2024-05-06T00:00:00.000Z","status":"accepted","type":"grupal",
                "student":{"id":2,"user":{"name":"Ana"}},
                "professor":{"id":5,"user":{"name":"Dr. Gómez"}}}"#,
        ))
        .unwrap();
        assert_eq!(req.student_id, Some(2));
        assert_eq!(req.professor_id, Some(5));
        assert_eq!(req.student_name, "Ana");
        assert_eq!(req.professor_name, "Dr. Gómez");
        assert_eq!(req.kind, AdvisoryType::Group);
        assert_eq!(req.status, AdvisoryStatus::Accepted);
    }

    #[test]
    fn test_date_is_utc_normalized() {
        assert_eq!(
            parse_api_date("2024-05-06T23:30:00-06:00"),
            NaiveDate::from_ymd_opt(2024, 5, 7)
        );
        assert_eq!(
            parse_api_date("2024-05-06"),
            NaiveDate::from_ymd_opt(2024, 5, 6)
        );
        assert_eq!(parse_api_date("soon"), None);
    }

    #[test]
    fn test_merge_keeps_display_fields() {
        let mut req = AdvisoryRequest::from_wire(wire(
            r#"{"id":4,"date":"2024-05-06","studentName":"Ana","studentMatricula":"213456","professorName":"Luis"}"#,
        ))
        .unwrap();
        req.merge(&wire(
            r#"{"id":4,"status":"rejected","rejectionReason":"Conflicto de horario"}"#,
        ));
        assert_eq!(req.status, AdvisoryStatus::Rejected);
        assert_eq!(req.annotation, "Conflicto de horario");
        assert_eq!(req.student_name, "Ana");
        assert_eq!(req.student_code, "213456");
        assert_eq!(req.professor_name, "Luis");
    }

    #[test]
    fn test_missing_id_is_unexpected() {
        let err = AdvisoryRequest::from_wire(wire(r#"{"date":"2024-05-06"}"#)).unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedResponse { .. }));
    }
}
