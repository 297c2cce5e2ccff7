use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use qatrail_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::activity::{ActivityLogEntry, ActivityType};
use crate::profile::UserId;
use crate::project::{Discipline, PhaseId, ProjectId};
use crate::status::QaStatus;

/// Unique identifier for a QA item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QaItemId(Uuid);

impl QaItemId {
    /// Creates a new random item identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an item identifier from an existing UUID value.
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

impl Default for QaItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QaItemId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Severity of a QA finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks occupancy or safety sign-off.
    Critical,
    /// Must be fixed before the phase completes.
    High,
    /// Should be fixed; does not block.
    Medium,
    /// Cosmetic or advisory.
    Low,
}

impl Severity {
    /// Returns a stable storage value for this severity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl FromStr for Severity {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(AppError::Validation(format!("unknown severity '{value}'"))),
        }
    }
}

/// Durable QA finding tracked through the reviewed lifecycle.
///
/// `updated_at` doubles as the optimistic-concurrency version stamp; the
/// phase timestamps are a cache derivable by replaying the item's activity
/// log and are only ever written through [`QaItem::apply_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaItem {
    /// Stable item identifier.
    pub id: QaItemId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Phase the finding belongs to, if assigned.
    pub phase_id: Option<PhaseId>,
    /// Human-facing item number, e.g. `QA-2026-014`.
    pub item_number: String,
    /// Short title of the finding.
    pub title: String,
    /// Longer description of the finding.
    pub description: Option<String>,
    /// Free-form category label.
    pub category: Option<String>,
    /// Discipline the finding belongs to.
    pub discipline: Discipline,
    /// Finding severity.
    pub severity: Severity,
    /// Current lifecycle status.
    pub status: QaStatus,
    /// Assigned user, if any.
    pub assigned_to: Option<UserId>,
    /// Due date, if set.
    pub due_date: Option<NaiveDate>,
    /// When work started (item first entered `open`).
    pub started_at: Option<DateTime<Utc>>,
    /// When the item first entered `resolved`.
    pub resolved_at: Option<DateTime<Utc>>,
    /// When the item first entered `verified`.
    pub verified_at: Option<DateTime<Utc>>,
    /// When the item first entered `closed`.
    pub closed_at: Option<DateTime<Utc>>,
    /// User who recorded the finding.
    pub created_by: Option<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp; also the version stamp.
    pub updated_at: DateTime<Utc>,
}

impl QaItem {
    /// Returns the optimistic-concurrency version stamp.
    #[must_use]
    pub fn version(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves the item into `status` at `at`, stamping the matching phase
    /// timestamp if it has never been set, and bumping the version stamp.
    ///
    /// Edge and role validity are the transition engine's concern; this
    /// only maintains the timestamp invariants.
    pub fn apply_status(&mut self, status: QaStatus, at: DateTime<Utc>) {
        self.status = status;
        let slot = match status {
            QaStatus::Open => Some(&mut self.started_at),
            QaStatus::Resolved => Some(&mut self.resolved_at),
            QaStatus::Verified => Some(&mut self.verified_at),
            QaStatus::Closed => Some(&mut self.closed_at),
            QaStatus::Noted => None,
        };
        if let Some(slot) = slot {
            if slot.is_none() {
                *slot = Some(at);
            }
        }
        self.updated_at = at;
    }
}

/// Lifecycle state reconstructed from an item's activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayedLifecycle {
    /// Status after applying every `status_change` entry.
    pub status: QaStatus,
    /// First time the item entered `open`.
    pub started_at: Option<DateTime<Utc>>,
    /// First time the item entered `resolved`.
    pub resolved_at: Option<DateTime<Utc>>,
    /// First time the item entered `verified`.
    pub verified_at: Option<DateTime<Utc>>,
    /// First time the item entered `closed`.
    pub closed_at: Option<DateTime<Utc>>,
}

/// Deterministically reconstructs one item's status and phase timestamps
/// from its activity log entries.
///
/// The log is the source of truth; the denormalized fields on [`QaItem`]
/// must always equal the result of this replay. Entries may be passed in
/// any order; they are applied in `(created_at, id)` order.
pub fn replay_lifecycle(entries: &[ActivityLogEntry]) -> AppResult<ReplayedLifecycle> {
    let mut ordered: Vec<&ActivityLogEntry> = entries
        .iter()
        .filter(|entry| entry.activity_type == ActivityType::StatusChange)
        .collect();
    ordered.sort_by_key(|entry| entry.cursor());

    let mut replayed = ReplayedLifecycle {
        status: QaStatus::Noted,
        started_at: None,
        resolved_at: None,
        verified_at: None,
        closed_at: None,
    };

    for entry in ordered {
        let new_value = entry.new_value.as_deref().ok_or_else(|| {
            AppError::Internal(format!(
                "status_change entry '{}' has no new_value",
                entry.id
            ))
        })?;
        let status = QaStatus::from_str(new_value)?;

        replayed.status = status;
        let slot = match status {
            QaStatus::Open => Some(&mut replayed.started_at),
            QaStatus::Resolved => Some(&mut replayed.resolved_at),
            QaStatus::Verified => Some(&mut replayed.verified_at),
            QaStatus::Closed => Some(&mut replayed.closed_at),
            QaStatus::Noted => None,
        };
        if let Some(slot) = slot {
            if slot.is_none() {
                *slot = Some(entry.created_at);
            }
        }
    }

    Ok(replayed)
}
