use std::sync::Arc;

use qatrail_core::{AppError, AppResult};
use qatrail_domain::{
    ActivityLogEntry, ActivityType, Actor, AttachmentMetadata, ProjectId, QaItemId,
};
use serde_json::json;

use crate::change_feed::ChangeFeed;
use crate::ports::{ActivityLogRepository, NewActivityEntry, QaItemRepository};

/// Append-only recorder for mutations owned by external collaborators.
///
/// Status changes, reviews and edits write their entries inside the same
/// atomic unit as the mutation; the attachment-storage and import
/// collaborators have no row of their own to mutate here, so their events
/// append through this recorder directly. Every committed entry is pushed
/// to the change feed.
#[derive(Clone)]
pub struct ActivityRecorder {
    log: Arc<dyn ActivityLogRepository>,
    items: Arc<dyn QaItemRepository>,
    feed: ChangeFeed,
}

impl ActivityRecorder {
    /// Creates the recorder from the log, item lookups and change feed.
    #[must_use]
    pub fn new(
        log: Arc<dyn ActivityLogRepository>,
        items: Arc<dyn QaItemRepository>,
        feed: ChangeFeed,
    ) -> Self {
        Self { log, items, feed }
    }

    /// Records that the attachment collaborator stored a file for an item.
    ///
    /// Only the file's name/size/type metadata enters the log; the
    /// collaborator owns the bytes and the storage path.
    pub async fn record_attachment_uploaded(
        &self,
        actor: &Actor,
        qa_item_id: QaItemId,
        attachment: &AttachmentMetadata,
    ) -> AppResult<ActivityLogEntry> {
        self.record_attachment(
            actor,
            qa_item_id,
            attachment,
            ActivityType::AttachmentUploaded,
        )
        .await
    }

    /// Records that the attachment collaborator removed a file from an item.
    pub async fn record_attachment_deleted(
        &self,
        actor: &Actor,
        qa_item_id: QaItemId,
        attachment: &AttachmentMetadata,
    ) -> AppResult<ActivityLogEntry> {
        self.record_attachment(
            actor,
            qa_item_id,
            attachment,
            ActivityType::AttachmentDeleted,
        )
        .await
    }

    /// Records one bulk-import summary for a project.
    ///
    /// `imported` is the number of items the import processed, independent
    /// of how many rows it wrote; per-item entries are the import's own
    /// concern.
    pub async fn record_import(
        &self,
        actor: &Actor,
        project_id: ProjectId,
        imported: usize,
    ) -> AppResult<ActivityLogEntry> {
        let entry = self
            .log
            .append(NewActivityEntry {
                activity_type: ActivityType::ImportPerformed,
                description: format!("Imported {imported} QA items"),
                old_value: None,
                new_value: Some(format!("{imported} items")),
                metadata: None,
                project_id: Some(project_id),
                phase_id: None,
                qa_item_id: None,
                user_id: Some(actor.user_id),
            })
            .await?;
        self.feed.publish(&entry);
        Ok(entry)
    }

    async fn record_attachment(
        &self,
        actor: &Actor,
        qa_item_id: QaItemId,
        attachment: &AttachmentMetadata,
        activity_type: ActivityType,
    ) -> AppResult<ActivityLogEntry> {
        let item = self
            .items
            .find_item(qa_item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("QA item '{qa_item_id}' does not exist")))?;

        let verb = match activity_type {
            ActivityType::AttachmentDeleted => "Deleted",
            _ => "Uploaded",
        };

        let entry = self
            .log
            .append(NewActivityEntry {
                activity_type,
                description: format!("{verb} attachment: {}", attachment.file_name),
                old_value: None,
                new_value: None,
                metadata: Some(json!({
                    "file_name": attachment.file_name,
                    "file_size": attachment.file_size,
                    "file_type": attachment.file_type,
                })),
                project_id: Some(item.project_id),
                phase_id: item.phase_id,
                qa_item_id: Some(item.id),
                user_id: Some(actor.user_id),
            })
            .await?;
        self.feed.publish(&entry);
        Ok(entry)
    }
}
