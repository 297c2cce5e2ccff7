use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use qatrail_core::AppResult;
use qatrail_domain::{
    ActivityLogEntry, Discipline, PhaseId, ProjectId, QaItem, QaItemId, QaStatus, Severity,
    UserId,
};

use super::activity_log::NewActivityEntry;

/// Fields for a new QA item row, written by the import path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaItemDraft {
    /// Owning project.
    pub project_id: ProjectId,
    /// Phase the finding belongs to, if assigned.
    pub phase_id: Option<PhaseId>,
    /// Human-facing item number.
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
    /// Initial lifecycle status.
    pub status: QaStatus,
    /// Assigned user, if any.
    pub assigned_to: Option<UserId>,
    /// Due date, if set.
    pub due_date: Option<NaiveDate>,
    /// User recording the finding.
    pub created_by: Option<UserId>,
}

/// Partial update of item fields that never touches the status.
///
/// `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QaItemEdit {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category label.
    pub category: Option<String>,
    /// New discipline.
    pub discipline: Option<Discipline>,
    /// New severity.
    pub severity: Option<Severity>,
    /// New phase assignment.
    pub phase_id: Option<PhaseId>,
    /// New assignee.
    pub assigned_to: Option<UserId>,
    /// New due date.
    pub due_date: Option<NaiveDate>,
}

impl QaItemEdit {
    /// Returns whether the edit changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A committed item mutation together with its audit entry.
///
/// The two are produced by one atomic unit; neither exists without the
/// other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMutation {
    /// Item state after the mutation.
    pub item: QaItem,
    /// Audit entry committed with it.
    pub entry: ActivityLogEntry,
}

/// Port for QA item persistence.
///
/// `apply_transition` and `apply_edit` are the engine's atomic units: the
/// adapter re-checks `expected_version` against the stored row inside its
/// transaction (or write-lock critical section), and either commits the
/// row update together with the audit entry or writes nothing and returns
/// `Conflict`.
#[async_trait]
pub trait QaItemRepository: Send + Sync {
    /// Looks up one item by identifier.
    async fn find_item(&self, qa_item_id: QaItemId) -> AppResult<Option<QaItem>>;

    /// Looks up many items at once; missing ids are simply absent.
    async fn find_items(&self, qa_item_ids: &[QaItemId]) -> AppResult<Vec<QaItem>>;

    /// Lists a project's items ordered by item number.
    async fn list_project_items(&self, project_id: ProjectId) -> AppResult<Vec<QaItem>>;

    /// Looks up an item by its human-facing number within a project.
    async fn find_by_item_number(
        &self,
        project_id: ProjectId,
        item_number: &str,
    ) -> AppResult<Option<QaItem>>;

    /// Returns ids of items whose number or title contains `free_text`,
    /// case-insensitively.
    async fn search_item_ids(&self, free_text: &str) -> AppResult<Vec<QaItemId>>;

    /// Returns the next item-number sequence value for a project.
    async fn next_item_sequence(&self, project_id: ProjectId) -> AppResult<u32>;

    /// Inserts a new item row.
    async fn insert_item(&self, draft: QaItemDraft) -> AppResult<QaItem>;

    /// Atomically moves an item to `target` and appends `entry`.
    ///
    /// Fails with `Conflict` (writing nothing) when the stored version no
    /// longer equals `expected_version`.
    async fn apply_transition(
        &self,
        qa_item_id: QaItemId,
        expected_version: DateTime<Utc>,
        target: QaStatus,
        entry: NewActivityEntry,
    ) -> AppResult<ItemMutation>;

    /// Atomically applies a field edit and appends `entry`, under the same
    /// version rules as [`QaItemRepository::apply_transition`].
    async fn apply_edit(
        &self,
        qa_item_id: QaItemId,
        expected_version: DateTime<Utc>,
        edit: QaItemEdit,
        entry: NewActivityEntry,
    ) -> AppResult<ItemMutation>;
}
