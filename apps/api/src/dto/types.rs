use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    /// Fixed `"ok"` marker.
    pub status: &'static str,
}

/// Request to move an item to a new status.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/transition-request.ts"
)]
pub struct TransitionRequest {
    /// Target status code.
    pub proposed_status: String,
    /// Item version observed by the caller (RFC3339).
    pub expected_version: String,
}

/// Request to submit a review.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/submit-review-request.ts"
)]
pub struct SubmitReviewRequest {
    /// Status the reviewer proposes.
    pub proposed_status: String,
    /// Review comment; required.
    pub comment: String,
}

/// Request to edit item fields without touching the status.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/edit-item-request.ts"
)]
pub struct EditItemRequest {
    /// Item version observed by the caller (RFC3339).
    pub expected_version: String,
    /// New title, if changing.
    pub title: Option<String>,
    /// New description, if changing.
    pub description: Option<String>,
    /// New category, if changing.
    pub category: Option<String>,
    /// New discipline code, if changing.
    pub discipline: Option<String>,
    /// New severity code, if changing.
    pub severity: Option<String>,
    /// New phase id, if changing.
    pub phase_id: Option<String>,
    /// New assignee id, if changing.
    pub assigned_to: Option<String>,
    /// New due date (`YYYY-MM-DD`), if changing.
    pub due_date: Option<String>,
}

/// Attachment event reported by the attachment-storage collaborator.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/attachment-event-request.ts"
)]
pub struct AttachmentEventRequest {
    /// Original file name.
    pub file_name: String,
    /// File size in bytes, when known.
    pub file_size: Option<i64>,
    /// MIME type, when known.
    pub file_type: Option<String>,
}

/// One row of a bulk import request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/import-item-request.ts"
)]
pub struct ImportItemRequest {
    /// Existing item number to update, or absent to create.
    pub item_number: Option<String>,
    /// Finding title.
    pub title: String,
    /// Finding description.
    pub description: Option<String>,
    /// Category label.
    pub category: Option<String>,
    /// Discipline code.
    pub discipline: String,
    /// Severity code.
    pub severity: String,
    /// Status code; new items default to `noted`.
    pub status: Option<String>,
    /// Phase id, if any.
    pub phase_id: Option<String>,
    /// Assignee id, if any.
    pub assigned_to: Option<String>,
    /// Due date (`YYYY-MM-DD`), if any.
    pub due_date: Option<String>,
}

/// Bulk import request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/import-request.ts"
)]
pub struct ImportRequest {
    /// Items to create or update.
    pub items: Vec<ImportItemRequest>,
}

/// API representation of a QA item.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/qa-item-response.ts"
)]
pub struct QaItemResponse {
    /// Item id.
    pub id: String,
    /// Owning project id.
    pub project_id: String,
    /// Phase id, if assigned.
    pub phase_id: Option<String>,
    /// Human-facing item number.
    pub item_number: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Category label.
    pub category: Option<String>,
    /// Discipline code.
    pub discipline: String,
    /// Severity code.
    pub severity: String,
    /// Status code.
    pub status: String,
    /// Assignee id, if any.
    pub assigned_to: Option<String>,
    /// Due date, if set.
    pub due_date: Option<String>,
    /// When work started.
    pub started_at: Option<String>,
    /// When first resolved.
    pub resolved_at: Option<String>,
    /// When first verified.
    pub verified_at: Option<String>,
    /// When first closed.
    pub closed_at: Option<String>,
    /// Creator id, if known.
    pub created_by: Option<String>,
    /// Creation timestamp (RFC3339).
    pub created_at: String,
    /// Version stamp (RFC3339); echo as `expected_version` on mutations.
    pub updated_at: String,
}

/// API representation of a review.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/review-response.ts"
)]
pub struct ReviewResponse {
    /// Review id.
    pub id: String,
    /// Reviewed item id.
    pub qa_item_id: String,
    /// Reviewer id.
    pub reviewer_id: String,
    /// Reviewer role at submission time.
    pub reviewer_role: String,
    /// Proposed status code.
    pub proposed_status: String,
    /// Review comment.
    pub comment: String,
    /// Submission timestamp (RFC3339).
    pub created_at: String,
}

/// Result of a review submission.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/review-submission-response.ts"
)]
pub struct ReviewSubmissionResponse {
    /// The persisted review.
    pub review: ReviewResponse,
    /// Whether the proposed transition committed.
    pub transition_applied: bool,
    /// Status after the submission, when the transition committed.
    pub status: Option<String>,
    /// Why the transition did not apply, when it lost a race.
    pub reason: Option<String>,
}

/// API representation of one activity log entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/activity-entry-response.ts"
)]
pub struct ActivityEntryResponse {
    /// Entry id.
    pub id: String,
    /// Activity type code.
    pub activity_type: String,
    /// Human-readable description.
    pub description: String,
    /// Scalar value before the mutation.
    pub old_value: Option<String>,
    /// Scalar value after the mutation.
    pub new_value: Option<String>,
    /// Structured metadata.
    pub metadata: Option<Value>,
    /// Referenced project id.
    pub project_id: Option<String>,
    /// Referenced phase id.
    pub phase_id: Option<String>,
    /// Referenced item id.
    pub qa_item_id: Option<String>,
    /// Acting user id.
    pub user_id: Option<String>,
    /// Commit timestamp (RFC3339).
    pub created_at: String,
    /// Opaque cursor positioned at this entry.
    pub cursor: String,
}

/// Resolved user reference on a display entry.
#[derive(Debug, Serialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/user-ref-response.ts"
)]
pub enum UserRefResponse {
    /// The user still exists.
    Resolved {
        /// User id.
        id: String,
        /// Display name.
        full_name: Option<String>,
        /// Email.
        email: Option<String>,
    },
    /// The reference dangles.
    Unknown,
}

/// Resolved QA item reference on a display entry.
#[derive(Debug, Serialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/qa-item-ref-response.ts"
)]
pub enum QaItemRefResponse {
    /// The item still exists.
    Resolved {
        /// Item id.
        id: String,
        /// Item number.
        item_number: String,
        /// Item title.
        title: String,
    },
    /// The reference dangles.
    Unknown,
}

/// Resolved project reference on a display entry.
#[derive(Debug, Serialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/project-ref-response.ts"
)]
pub enum ProjectRefResponse {
    /// The project still exists.
    Resolved {
        /// Project id.
        id: String,
        /// Project name.
        name: String,
    },
    /// The reference dangles.
    Unknown,
}

/// One enriched timeline entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/display-entry-response.ts"
)]
pub struct DisplayEntryResponse {
    /// The raw entry.
    pub entry: ActivityEntryResponse,
    /// Acting user, when referenced.
    pub user: Option<UserRefResponse>,
    /// Referenced item, when referenced.
    pub qa_item: Option<QaItemRefResponse>,
    /// Referenced project, when referenced.
    pub project: Option<ProjectRefResponse>,
}

/// One page of the enriched timeline.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/timeline-page-response.ts"
)]
pub struct TimelinePageResponse {
    /// Entries, newest first.
    pub entries: Vec<DisplayEntryResponse>,
    /// Cursor for the next page, absent on the last page.
    pub next_cursor: Option<String>,
}

/// Long-poll feed response.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/feed-response.ts"
)]
pub struct FeedResponse {
    /// Entries after the request cursor, oldest first.
    pub entries: Vec<ActivityEntryResponse>,
    /// Cursor to resume from on the next poll.
    pub cursor: Option<String>,
}

/// Result of a bulk import run.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/import-summary-response.ts"
)]
pub struct ImportSummaryResponse {
    /// Items newly created.
    pub created: usize,
    /// Existing items altered.
    pub updated: usize,
    /// The `import_performed` summary entry.
    pub summary_entry: ActivityEntryResponse,
}

/// API representation of a project.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/project-response.ts"
)]
pub struct ProjectResponse {
    /// Project id.
    pub id: String,
    /// Project name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Client name.
    pub client: Option<String>,
    /// Free-form status label.
    pub status: Option<String>,
    /// Planned start date.
    pub start_date: Option<String>,
    /// Planned end date.
    pub end_date: Option<String>,
    /// Creation timestamp (RFC3339).
    pub created_at: String,
}

/// API representation of a project phase.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/phase-response.ts"
)]
pub struct PhaseResponse {
    /// Phase id.
    pub id: String,
    /// Owning project id.
    pub project_id: String,
    /// Phase name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Discipline code.
    pub discipline: String,
}

/// API representation of a user profile.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/profile-response.ts"
)]
pub struct ProfileResponse {
    /// Profile id.
    pub id: String,
    /// Display name.
    pub full_name: Option<String>,
    /// Email.
    pub email: Option<String>,
    /// Avatar URL.
    pub avatar_url: Option<String>,
    /// Assigned roles.
    pub roles: Vec<String>,
}
