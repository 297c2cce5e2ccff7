use std::str::FromStr;

use chrono::{DateTime, Utc};
use qatrail_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::profile::UserId;
use crate::project::{PhaseId, ProjectId};
use crate::qa_item::QaItemId;

/// Kind of mutation an activity log entry documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// A QA item moved between lifecycle states.
    StatusChange,
    /// A review comment was appended to an item.
    ReviewAdded,
    /// The attachment collaborator stored a file for an item.
    AttachmentUploaded,
    /// The attachment collaborator removed a file from an item.
    AttachmentDeleted,
    /// Item fields were edited without a status change.
    ItemEdited,
    /// A bulk import ran against a project.
    ImportPerformed,
}

impl ActivityType {
    /// Returns a stable storage value for this activity type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusChange => "status_change",
            Self::ReviewAdded => "review_added",
            Self::AttachmentUploaded => "attachment_uploaded",
            Self::AttachmentDeleted => "attachment_deleted",
            Self::ItemEdited => "item_edited",
            Self::ImportPerformed => "import_performed",
        }
    }

    /// Returns all known activity types.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ActivityType] = &[
            ActivityType::StatusChange,
            ActivityType::ReviewAdded,
            ActivityType::AttachmentUploaded,
            ActivityType::AttachmentDeleted,
            ActivityType::ItemEdited,
            ActivityType::ImportPerformed,
        ];

        ALL
    }
}

impl FromStr for ActivityType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "status_change" => Ok(Self::StatusChange),
            "review_added" => Ok(Self::ReviewAdded),
            "attachment_uploaded" => Ok(Self::AttachmentUploaded),
            "attachment_deleted" => Ok(Self::AttachmentDeleted),
            "item_edited" => Ok(Self::ItemEdited),
            "import_performed" => Ok(Self::ImportPerformed),
            _ => Err(AppError::Validation(format!(
                "unknown activity type '{value}'"
            ))),
        }
    }
}

/// Unique identifier for an activity log entry.
///
/// Generated server-side as a UUIDv7 so identities sort with creation time
/// and total-order concurrent writers on the same item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityId(Uuid);

impl ActivityId {
    /// Creates a fresh time-ordered entry identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates an entry identifier from an existing UUID value.
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

impl std::fmt::Display for ActivityId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// One committed, immutable audit record.
///
/// Entries hold scalar old/new values and foreign keys only; display data
/// is joined at read time so the log stays normalized and bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    /// Stable entry identifier.
    pub id: ActivityId,
    /// Kind of mutation documented.
    pub activity_type: ActivityType,
    /// Human-readable description.
    pub description: String,
    /// Scalar value before the mutation, when meaningful.
    pub old_value: Option<String>,
    /// Scalar value after the mutation, when meaningful.
    pub new_value: Option<String>,
    /// Structured metadata (e.g. attachment name/size/type).
    pub metadata: Option<Value>,
    /// Referenced project, if any.
    pub project_id: Option<ProjectId>,
    /// Referenced phase, if any.
    pub phase_id: Option<PhaseId>,
    /// Referenced QA item, if any.
    pub qa_item_id: Option<QaItemId>,
    /// User who performed the mutation, if any.
    pub user_id: Option<UserId>,
    /// Commit timestamp.
    pub created_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    /// Returns the feed cursor positioned at this entry.
    #[must_use]
    pub fn cursor(&self) -> FeedCursor {
        FeedCursor {
            created_at: self.created_at,
            entry_id: self.id,
        }
    }
}

/// Position in the activity log total order.
///
/// Entries order by `(created_at, id)`; a cursor names the last entry a
/// reader has seen so it can backfill everything after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeedCursor {
    /// Commit timestamp of the last seen entry.
    pub created_at: DateTime<Utc>,
    /// Identity of the last seen entry, breaking timestamp ties.
    pub entry_id: ActivityId,
}

impl FeedCursor {
    /// Renders the cursor as an opaque token for transport.
    #[must_use]
    pub fn as_token(&self) -> String {
        format!(
            "{}:{}",
            self.created_at.timestamp_micros(),
            self.entry_id.as_uuid()
        )
    }

    /// Parses a token previously produced by [`FeedCursor::as_token`].
    pub fn parse_token(token: &str) -> AppResult<Self> {
        let (micros, id) = token
            .split_once(':')
            .ok_or_else(|| AppError::Validation(format!("malformed cursor token '{token}'")))?;

        let micros = micros
            .parse::<i64>()
            .map_err(|_| AppError::Validation(format!("malformed cursor token '{token}'")))?;
        let created_at = DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| AppError::Validation(format!("cursor timestamp out of range in '{token}'")))?;
        let entry_id = Uuid::parse_str(id)
            .map(ActivityId::from_uuid)
            .map_err(|_| AppError::Validation(format!("malformed cursor token '{token}'")))?;

        Ok(Self {
            created_at,
            entry_id,
        })
    }
}

/// File metadata the attachment collaborator reports for audit purposes.
///
/// The collaborator owns the bytes and the storage path; only these fields
/// ever enter the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    /// Original file name.
    pub file_name: String,
    /// File size in bytes, when reported.
    pub file_size: Option<i64>,
    /// MIME type, when reported.
    pub file_type: Option<String>,
}
