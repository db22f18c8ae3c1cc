//! Statistics, history filtering, and report downloads.

use crate::api::{paths, ApiClient};
use crate::error::{ClientError, ClientResult};
use crate::model::advisory::{AdvisoryRequest, AdvisoryStatus, AdvisoryType};
use crate::model::user::Professor;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ClientResult<Self> {
        if start > end {
            return Err(ClientError::validation(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Figures shown on a professor's report page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfessorStats {
    pub completed: usize,
    pub unique_students: usize,
    pub unique_subjects: usize,
    /// Completed over received, as a rounded percentage
    pub acceptance_rate: u32,
    pub by_subject: BTreeMap<String, usize>,
    pub by_type: BTreeMap<AdvisoryType, usize>,
}

impl ProfessorStats {
    /// Computes the stats for one professor, optionally limited to `range`.
    ///
    /// Completed advisories are selected by session date; the received
    /// count behind the acceptance rate uses the creation date when known.
    pub fn compute(
        requests: &[AdvisoryRequest],
        professor_id: i64,
        range: Option<DateRange>,
    ) -> Self {
        let own: Vec<&AdvisoryRequest> = requests
            .iter()
            .filter(|r| r.professor_id == Some(professor_id))
            .collect();

        let completed: Vec<&AdvisoryRequest> = own
            .iter()
            .copied()
            .filter(|r| r.status == AdvisoryStatus::Completed)
            .filter(|r| range.map_or(true, |range| range.contains(r.date)))
            .collect();

        let received: Vec<&AdvisoryRequest> = own
            .iter()
            .copied()
            .filter(|r| {
                range.map_or(true, |range| {
                    let created = r.created_at.map(|c| c.date_naive()).unwrap_or(r.date);
                    range.contains(created)
                })
            })
            .collect();
        let received_completed = received
            .iter()
            .filter(|r| r.status == AdvisoryStatus::Completed)
            .count();

        let mut stats = ProfessorStats {
            completed: completed.len(),
            unique_students: completed
                .iter()
                .map(|r| match r.student_id {
                    Some(id) => id.to_string(),
                    None => r.student_name.clone(),
                })
                .collect::<HashSet<_>>()
                .len(),
            unique_subjects: completed
                .iter()
                .map(|r| r.subject.as_str())
                .collect::<HashSet<_>>()
                .len(),
            acceptance_rate: percent(received_completed, received.len()),
            ..Default::default()
        };
        for request in &completed {
            *stats.by_subject.entry(request.subject.clone()).or_default() += 1;
            *stats.by_type.entry(request.kind).or_default() += 1;
        }
        stats
    }
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Headline numbers on the director's history page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectorStats {
    pub total: usize,
    pub completed: usize,
    pub accepted: usize,
    pub professors: usize,
}

impl DirectorStats {
    pub fn compute(requests: &[AdvisoryRequest]) -> Self {
        Self {
            total: requests.len(),
            completed: requests
                .iter()
                .filter(|r| r.status == AdvisoryStatus::Completed)
                .count(),
            accepted: requests
                .iter()
                .filter(|r| r.status == AdvisoryStatus::Accepted)
                .count(),
            professors: requests
                .iter()
                .filter_map(|r| r.professor_id)
                .collect::<HashSet<_>>()
                .len(),
        }
    }
}

/// Status filter plus free-text search over the history table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub status: Option<AdvisoryStatus>,
    /// Matched case-insensitively against professor name, student name,
    /// and student code
    pub search: Option<String>,
}

impl HistoryFilter {
    pub fn matches(&self, request: &AdvisoryRequest) -> bool {
        if let Some(status) = self.status {
            if request.status != status {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                [
                    &request.professor_name,
                    &request.student_name,
                    &request.student_code,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }

    pub fn apply<'r>(&self, requests: &'r [AdvisoryRequest]) -> Vec<&'r AdvisoryRequest> {
        requests.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Downloads server-rendered PDF reports.
pub struct ReportClient<'a> {
    api: &'a ApiClient,
}

impl<'a> ReportClient<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Report for a date range, for one professor or all of them.
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - The written file inside `dir`
    /// * `Err(ClientError::Validation)` - Before any request, if the range is inverted
    pub async fn download_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        professor: Option<&Professor>,
        dir: &Path,
    ) -> ClientResult<PathBuf> {
        let range = DateRange::new(start, end)?;

        let mut query = vec![
            ("startDate", range.start.format("%Y-%m-%d").to_string()),
            ("endDate", range.end.format("%Y-%m-%d").to_string()),
        ];
        if let Some(professor) = professor {
            query.push(("professorId", professor.id.to_string()));
        }

        let bytes = self.api.get_bytes(paths::REPORT_RANGE, &query).await?;
        let path = dir.join(range_report_file_name(range, professor));
        write_file(&path, &bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "Report saved");
        Ok(path)
    }

    /// Report over every advisory on record.
    pub async fn download_complete(&self, today: NaiveDate, dir: &Path) -> ClientResult<PathBuf> {
        let bytes = self.api.get_bytes(paths::REPORT_COMPLETE, &[]).await?;
        let path = dir.join(format!(
            "reporte-completo-asesorias-{}.pdf",
            today.format("%Y-%m-%d")
        ));
        write_file(&path, &bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "Complete report saved");
        Ok(path)
    }
}

pub fn range_report_file_name(range: DateRange, professor: Option<&Professor>) -> String {
    let who = match professor {
        Some(p) => slug(&p.name),
        None => "todos-profesores".to_string(),
    };
    format!(
        "reporte-asesorias-{}-{}-{}.pdf",
        who,
        range.start.format("%Y-%m-%d"),
        range.end.format("%Y-%m-%d")
    )
}

fn slug(name: &str) -> String {
    let parts: Vec<String> = name
        .split_whitespace()
        .map(|part| {
            part.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        "profesor".to_string()
    } else {
        parts.join("-")
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> ClientResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Writes the history table as CSV and returns the number of rows.
pub fn export_history_csv<W: Write>(requests: &[AdvisoryRequest], writer: W) -> ClientResult<usize> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record([
        "id", "date", "time_slot", "student", "student_code", "professor", "subject", "topic",
        "type", "status", "annotation",
    ])?;
    for r in requests {
        out.write_record([
            r.id.to_string(),
            r.date.format("%Y-%m-%d").to_string(),
            r.time_slot.clone(),
            r.student_name.clone(),
            r.student_code.clone(),
            r.professor_name.clone(),
            r.subject.clone(),
            r.topic.clone(),
            r.kind.to_string(),
            r.status.to_string(),
            r.annotation.clone(),
        ])?;
    }
    out.flush()?;
    Ok(requests.len())
}
