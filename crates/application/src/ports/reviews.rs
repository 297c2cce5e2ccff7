use async_trait::async_trait;
use qatrail_core::AppResult;
use qatrail_domain::{ActivityLogEntry, QaItemId, Review};

use super::activity_log::NewActivityEntry;

/// Port for the append-only review ledger.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Atomically persists a review together with its `review_added` audit
    /// entry. Reviews never mutate after this point.
    async fn append_review(
        &self,
        review: Review,
        entry: NewActivityEntry,
    ) -> AppResult<(Review, ActivityLogEntry)>;

    /// Lists an item's reviews, newest first.
    async fn list_reviews(&self, qa_item_id: QaItemId) -> AppResult<Vec<Review>>;
}
