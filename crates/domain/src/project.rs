use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use qatrail_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::UserId;

/// Unique identifier for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Creates a new random project identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a project identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a project phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseId(Uuid);

impl PhaseId {
    /// Creates a new random phase identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a phase identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PhaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Engineering discipline a phase or finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    /// Electrical systems.
    Electrical,
    /// Mechanical and HVAC systems.
    Mechanical,
    /// Plumbing systems.
    Plumbing,
    /// Civil and structural work.
    Civil,
    /// Architectural work.
    Architectural,
}

impl Discipline {
    /// Returns a stable storage value for this discipline.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electrical => "electrical",
            Self::Mechanical => "mechanical",
            Self::Plumbing => "plumbing",
            Self::Civil => "civil",
            Self::Architectural => "architectural",
        }
    }
}

impl FromStr for Discipline {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "electrical" => Ok(Self::Electrical),
            "mechanical" => Ok(Self::Mechanical),
            "plumbing" => Ok(Self::Plumbing),
            "civil" => Ok(Self::Civil),
            "architectural" => Ok(Self::Architectural),
            _ => Err(AppError::Validation(format!(
                "unknown discipline '{value}'"
            ))),
        }
    }
}

/// Durable engineering project record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Stable project identifier.
    pub id: ProjectId,
    /// Project name.
    pub name: String,
    /// Free-form project description.
    pub description: Option<String>,
    /// Client name, if recorded.
    pub client: Option<String>,
    /// Free-form project status label.
    pub status: Option<String>,
    /// Planned start date.
    pub start_date: Option<NaiveDate>,
    /// Planned end date.
    pub end_date: Option<NaiveDate>,
    /// User who created the project.
    pub created_by: Option<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Phase of work within a project, scoped to one discipline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPhase {
    /// Stable phase identifier.
    pub id: PhaseId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Phase name.
    pub name: String,
    /// Free-form phase description.
    pub description: Option<String>,
    /// Discipline the phase covers.
    pub discipline: Discipline,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}
