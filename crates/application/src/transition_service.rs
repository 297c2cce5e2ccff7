use std::sync::Arc;

use chrono::{DateTime, Utc};
use qatrail_core::{AppError, AppResult};
use qatrail_domain::{ActivityLogEntry, ActivityType, Actor, QaItem, QaItemId, QaStatus};

use crate::change_feed::ChangeFeed;
use crate::ports::{NewActivityEntry, QaItemRepository};

/// A committed status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// Item state after the transition.
    pub item: QaItem,
    /// The `status_change` audit entry committed with it.
    pub entry: ActivityLogEntry,
}

/// Validates and applies QA item status changes.
///
/// A request passes three gates in order: the edge must exist in the
/// transition graph, the actor's role must meet the edge's minimum, and
/// the caller's expected version must match the item's current version.
/// The status update, phase timestamp, version bump and audit entry then
/// commit as one atomic unit; on any failure nothing is written.
#[derive(Clone)]
pub struct TransitionService {
    items: Arc<dyn QaItemRepository>,
    feed: ChangeFeed,
}

impl TransitionService {
    /// Creates the engine from the item repository and change feed.
    #[must_use]
    pub fn new(items: Arc<dyn QaItemRepository>, feed: ChangeFeed) -> Self {
        Self { items, feed }
    }

    /// Attempts to move an item to `proposed` on behalf of `actor`.
    pub async fn attempt_transition(
        &self,
        actor: &Actor,
        qa_item_id: QaItemId,
        proposed: QaStatus,
        expected_version: DateTime<Utc>,
    ) -> AppResult<TransitionOutcome> {
        let item = self
            .items
            .find_item(qa_item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("QA item '{qa_item_id}' does not exist")))?;

        // Role floor for the target state fires before the edge check, so
        // an under-privileged actor sees Forbidden rather than Conflict
        // even when no edge exists. Corrective edges can demand more than
        // the floor, never less; the rule check below covers them.
        if !actor.role.at_least(proposed.minimum_entry_role()) {
            return Err(AppError::Forbidden(format!(
                "role '{}' may not move an item into '{}'",
                actor.role.as_str(),
                proposed.as_str()
            )));
        }

        let rule = item.status.transition_to(proposed).ok_or_else(|| {
            AppError::Conflict(format!(
                "no transition from '{}' to '{}'",
                item.status.as_str(),
                proposed.as_str()
            ))
        })?;

        if !actor.role.at_least(rule.required_role()) {
            return Err(AppError::Forbidden(format!(
                "role '{}' may not move an item from '{}' to '{}'",
                actor.role.as_str(),
                item.status.as_str(),
                proposed.as_str()
            )));
        }

        if item.version() != expected_version {
            return Err(AppError::Conflict(format!(
                "QA item '{qa_item_id}' changed since it was read; re-read and retry"
            )));
        }

        let entry = NewActivityEntry {
            activity_type: ActivityType::StatusChange,
            description: format!(
                "Changed status from {} to {}",
                item.status.display_name(),
                proposed.display_name()
            ),
            old_value: Some(item.status.as_str().to_owned()),
            new_value: Some(proposed.as_str().to_owned()),
            metadata: None,
            project_id: Some(item.project_id),
            phase_id: item.phase_id,
            qa_item_id: Some(item.id),
            user_id: Some(actor.user_id),
        };

        let mutation = self
            .items
            .apply_transition(qa_item_id, expected_version, proposed, entry)
            .await?;

        self.feed.publish(&mutation.entry);

        Ok(TransitionOutcome {
            item: mutation.item,
            entry: mutation.entry,
        })
    }
}
