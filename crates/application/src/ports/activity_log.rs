use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qatrail_core::AppResult;
use qatrail_domain::{
    ActivityLogEntry, ActivityType, FeedCursor, PhaseId, ProjectId, QaItemId, UserId,
};
use serde_json::Value;

/// Input for one audit record, produced inside the same atomic unit as the
/// mutation it documents.
///
/// Identity and commit timestamp are generated by the adapter at append
/// time so entries total-order by `(created_at, id)` even under concurrent
/// writers. Old/new values are plain scalars, never serialized entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivityEntry {
    /// Kind of mutation documented.
    pub activity_type: ActivityType,
    /// Human-readable description.
    pub description: String,
    /// Scalar value before the mutation, when meaningful.
    pub old_value: Option<String>,
    /// Scalar value after the mutation, when meaningful.
    pub new_value: Option<String>,
    /// Structured metadata payload.
    pub metadata: Option<Value>,
    /// Referenced project, if any.
    pub project_id: Option<ProjectId>,
    /// Referenced phase, if any.
    pub phase_id: Option<PhaseId>,
    /// Referenced QA item, if any.
    pub qa_item_id: Option<QaItemId>,
    /// User who performed the mutation, if any.
    pub user_id: Option<UserId>,
}

/// Subset of the activity log a feed subscriber observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// Every committed entry.
    All,
    /// Entries referencing one project.
    Project(ProjectId),
    /// Entries referencing one QA item.
    Item(QaItemId),
}

impl FeedScope {
    /// Returns whether an entry falls inside this scope.
    #[must_use]
    pub fn matches(&self, entry: &ActivityLogEntry) -> bool {
        match self {
            Self::All => true,
            Self::Project(project_id) => entry.project_id == Some(*project_id),
            Self::Item(qa_item_id) => entry.qa_item_id == Some(*qa_item_id),
        }
    }
}

/// Conjunctive predicates for the timeline read path.
#[derive(Debug, Clone, Default)]
pub struct TimelineFilter {
    /// Case-insensitive text matched against entry descriptions.
    pub free_text: Option<String>,
    /// Item ids whose entries also satisfy the free-text predicate (the
    /// text matched their item number or title); ORed with the
    /// description match, ANDed with everything else.
    pub matching_item_ids: Vec<QaItemId>,
    /// Restrict to one activity type.
    pub activity_type: Option<ActivityType>,
    /// Restrict to one project.
    pub project_id: Option<ProjectId>,
    /// Inclusive lower bound on creation time.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time.
    pub until: Option<DateTime<Utc>>,
    /// Keyset bound: only entries strictly older than this cursor.
    pub before: Option<FeedCursor>,
    /// Maximum rows returned.
    pub limit: usize,
}

/// Port for the append-only activity log.
///
/// There is deliberately no update or delete operation; entries are
/// immutable once visible.
#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    /// Appends one entry, assigning identity and commit timestamp.
    async fn append(&self, entry: NewActivityEntry) -> AppResult<ActivityLogEntry>;

    /// Returns every entry referencing one item, oldest first.
    async fn entries_for_item(&self, qa_item_id: QaItemId) -> AppResult<Vec<ActivityLogEntry>>;

    /// Returns up to `limit` entries after `cursor` (or from the start of
    /// the log) inside `scope`, oldest first. This is the feed backfill
    /// mechanism for reconnecting subscribers.
    async fn entries_since(
        &self,
        scope: &FeedScope,
        cursor: Option<FeedCursor>,
        limit: usize,
    ) -> AppResult<Vec<ActivityLogEntry>>;

    /// Returns entries matching `filter`, newest first.
    async fn query(&self, filter: TimelineFilter) -> AppResult<Vec<ActivityLogEntry>>;
}
