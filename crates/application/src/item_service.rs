use std::sync::Arc;

use chrono::{DateTime, Utc};
use qatrail_core::{AppError, AppResult};
use qatrail_domain::{ActivityType, Actor, ProjectId, QaItem, QaItemId};

use crate::change_feed::ChangeFeed;
use crate::ports::{NewActivityEntry, QaItemEdit, QaItemRepository};
use crate::transition_service::TransitionOutcome;

/// Read access and status-preserving edits for QA items.
#[derive(Clone)]
pub struct QaItemService {
    items: Arc<dyn QaItemRepository>,
    feed: ChangeFeed,
}

impl QaItemService {
    /// Creates the service from the item repository and change feed.
    #[must_use]
    pub fn new(items: Arc<dyn QaItemRepository>, feed: ChangeFeed) -> Self {
        Self { items, feed }
    }

    /// Fetches one item.
    pub async fn get_item(&self, qa_item_id: QaItemId) -> AppResult<QaItem> {
        self.items
            .find_item(qa_item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("QA item '{qa_item_id}' does not exist")))
    }

    /// Lists a project's items ordered by item number.
    pub async fn list_project_items(&self, project_id: ProjectId) -> AppResult<Vec<QaItem>> {
        self.items.list_project_items(project_id).await
    }

    /// Applies a field edit that never touches the status.
    ///
    /// The edit, the version bump and one `item_edited` entry commit
    /// atomically under the same optimistic version check as transitions.
    pub async fn edit_item(
        &self,
        actor: &Actor,
        qa_item_id: QaItemId,
        expected_version: DateTime<Utc>,
        edit: QaItemEdit,
    ) -> AppResult<TransitionOutcome> {
        if edit.is_empty() {
            return Err(AppError::Validation(
                "edit must change at least one field".to_owned(),
            ));
        }

        let item = self
            .items
            .find_item(qa_item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("QA item '{qa_item_id}' does not exist")))?;

        if item.version() != expected_version {
            return Err(AppError::Conflict(format!(
                "QA item '{qa_item_id}' changed since it was read; re-read and retry"
            )));
        }

        let entry = NewActivityEntry {
            activity_type: ActivityType::ItemEdited,
            description: "Updated item details".to_owned(),
            old_value: None,
            new_value: None,
            metadata: None,
            project_id: Some(item.project_id),
            phase_id: item.phase_id,
            qa_item_id: Some(item.id),
            user_id: Some(actor.user_id),
        };

        let mutation = self
            .items
            .apply_edit(qa_item_id, expected_version, edit, entry)
            .await?;

        self.feed.publish(&mutation.entry);

        Ok(TransitionOutcome {
            item: mutation.item,
            entry: mutation.entry,
        })
    }
}
