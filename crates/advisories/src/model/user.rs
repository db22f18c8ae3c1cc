/// Users, roles, and the professor directory
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// The closed set of roles the API hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Professor,
    Director,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Professor => "professor",
            Role::Director => "director",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.pad(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" | "estudiante" => Ok(Role::Student),
            "professor" | "profesor" => Ok(Role::Professor),
            "director" => Ok(Role::Director),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: i64,
    #[serde(default)]
    pub student_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessorProfile {
    pub id: i64,
}

/// The authenticated account as returned by `/auth/login` and `/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub student: Option<StudentProfile>,
    #[serde(default)]
    pub professor: Option<ProfessorProfile>,
}

impl User {
    pub fn student_id(&self) -> Option<i64> {
        self.student.as_ref().map(|s| s.id)
    }

    pub fn professor_id(&self) -> Option<i64> {
        self.professor.as_ref().map(|p| p.id)
    }

    /// Name for headers, falling back to the email like the dashboards do.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// Entry of the professor directory used in selection lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professor {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}
