use std::sync::Arc;

use qatrail_core::AppResult;
use qatrail_domain::{ActivityLogEntry, FeedCursor};
use tokio::sync::broadcast;
use tracing::trace;

use crate::ports::{ActivityLogRepository, FeedScope};

/// Publish/subscribe channel for newly committed activity log entries.
///
/// The live push is a low-latency, lossy hint: delivery is at-least-once
/// per subscriber and a slow subscriber may be lapped. Correctness comes
/// from [`ChangeFeed::backfill`], which replays the log from a cursor; the
/// log itself is the single source of truth. Consumers deduplicate by
/// entry identity.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ActivityLogEntry>,
    log: Arc<dyn ActivityLogRepository>,
}

impl ChangeFeed {
    /// Creates a feed buffering up to `capacity` undelivered entries per
    /// subscriber before older pushes are dropped.
    #[must_use]
    pub fn new(log: Arc<dyn ActivityLogRepository>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, log }
    }

    /// Registers a live subscriber observing `scope`.
    ///
    /// The returned handle only sees entries committed after this call;
    /// reconnecting subscribers bridge the gap with
    /// [`ChangeFeed::backfill`] before (or while) draining pushes.
    #[must_use]
    pub fn subscribe(&self, scope: FeedScope) -> FeedSubscription {
        FeedSubscription {
            scope,
            receiver: self.sender.subscribe(),
        }
    }

    /// Returns up to `limit` committed entries after `cursor` inside
    /// `scope`, oldest first.
    pub async fn backfill(
        &self,
        scope: &FeedScope,
        cursor: Option<FeedCursor>,
        limit: usize,
    ) -> AppResult<Vec<ActivityLogEntry>> {
        self.log.entries_since(scope, cursor, limit).await
    }

    /// Pushes a committed entry to live subscribers.
    ///
    /// Never fails the mutation that produced the entry: with no live
    /// subscribers the push is a no-op, and missed pushes are recovered by
    /// the next backfill.
    pub(crate) fn publish(&self, entry: &ActivityLogEntry) {
        if self.sender.send(entry.clone()).is_err() {
            trace!(entry_id = %entry.id, "no live feed subscribers");
        }
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Cancellable handle to one live feed subscription.
///
/// Dropping the handle (or calling [`FeedSubscription::close`]) releases
/// the subscription slot; the publisher is never blocked by a slow or
/// departed subscriber.
pub struct FeedSubscription {
    scope: FeedScope,
    receiver: broadcast::Receiver<ActivityLogEntry>,
}

impl FeedSubscription {
    /// Waits for the next pushed entry inside this subscription's scope.
    ///
    /// Returns `None` once the feed is shut down. If the subscriber fell
    /// behind and pushes were dropped, delivery simply continues with
    /// newer entries; the subscriber should backfill from its last cursor
    /// to recover the gap.
    pub async fn next(&mut self) -> Option<ActivityLogEntry> {
        loop {
            match self.receiver.recv().await {
                Ok(entry) if self.scope.matches(&entry) => return Some(entry),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(skipped, "feed subscriber lagged; cursor backfill required");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the scope this subscription observes.
    #[must_use]
    pub fn scope(&self) -> FeedScope {
        self.scope
    }

    /// Deterministically stops receiving and releases the slot.
    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use qatrail_domain::{ActivityType, QaItemId, QaStatus};

    use super::ChangeFeed;
    use crate::ports::{ActivityLogRepository, FeedScope, NewActivityEntry};
    use crate::test_support::TestStore;

    async fn append_numbered(
        store: &Arc<TestStore>,
        qa_item_id: QaItemId,
        number: usize,
    ) -> qatrail_domain::ActivityLogEntry {
        let entry = store
            .append(NewActivityEntry {
                activity_type: ActivityType::ItemEdited,
                description: format!("entry {number}"),
                old_value: None,
                new_value: None,
                metadata: None,
                project_id: None,
                phase_id: None,
                qa_item_id: Some(qa_item_id),
                user_id: None,
            })
            .await;
        assert!(entry.is_ok());
        entry.unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn backfill_returns_exactly_the_missed_entries_in_order() {
        let store = Arc::new(TestStore::new());
        let item = store.seed_item(QaStatus::Open).await;
        let feed = ChangeFeed::new(store.clone(), 16);

        let mut appended = Vec::new();
        for number in 1..=15 {
            appended.push(append_numbered(&store, item.id, number).await);
        }

        // A subscriber saw entries 1..=9, then disconnected through 15.
        let cursor = appended[8].cursor();
        let recovered = feed
            .backfill(&FeedScope::Item(item.id), Some(cursor), 100)
            .await;
        assert!(recovered.is_ok());
        let recovered = recovered.unwrap_or_default();

        assert_eq!(recovered.len(), 6);
        for (offset, entry) in recovered.iter().enumerate() {
            assert_eq!(entry.description, format!("entry {}", offset + 10));
        }
    }

    #[tokio::test]
    async fn backfill_without_cursor_starts_at_the_beginning() {
        let store = Arc::new(TestStore::new());
        let item = store.seed_item(QaStatus::Open).await;
        let feed = ChangeFeed::new(store.clone(), 16);

        for number in 1..=3 {
            append_numbered(&store, item.id, number).await;
        }

        let all = feed.backfill(&FeedScope::Item(item.id), None, 100).await;
        assert!(all.is_ok());
        assert_eq!(all.unwrap_or_default().len(), 3);
    }

    #[tokio::test]
    async fn subscription_filters_by_scope() {
        let store = Arc::new(TestStore::new());
        let watched = store.seed_item(QaStatus::Open).await;
        let other = store.seed_item(QaStatus::Open).await;
        let feed = ChangeFeed::new(store.clone(), 16);

        let mut subscription = feed.subscribe(FeedScope::Item(watched.id));

        let noise = append_numbered(&store, other.id, 1).await;
        feed.publish(&noise);
        let wanted = append_numbered(&store, watched.id, 2).await;
        feed.publish(&wanted);

        let received = subscription.next().await;
        assert_eq!(received.map(|entry| entry.id), Some(wanted.id));
    }

    #[tokio::test]
    async fn lagged_subscriber_recovers_the_gap_by_cursor() {
        let store = Arc::new(TestStore::new());
        let item = store.seed_item(QaStatus::Open).await;
        // Tiny buffer so the slow subscriber gets lapped.
        let feed = ChangeFeed::new(store.clone(), 2);

        let mut subscription = feed.subscribe(FeedScope::Item(item.id));

        let mut published = Vec::new();
        for number in 1..=5 {
            let entry = append_numbered(&store, item.id, number).await;
            feed.publish(&entry);
            published.push(entry);
        }

        // The push path skips what was lapped and resumes with newer
        // entries instead of failing.
        let next = subscription.next().await;
        assert!(next.is_some());
        let next = next.unwrap_or_else(|| unreachable!());
        assert_ne!(next.description, "entry 1");

        // Dedup-by-identity plus backfill recovers the full sequence.
        let recovered = feed
            .backfill(&FeedScope::Item(item.id), None, 100)
            .await
            .unwrap_or_default();
        assert_eq!(recovered.len(), 5);
        let ids: Vec<_> = recovered.iter().map(|entry| entry.id).collect();
        assert!(published.iter().all(|entry| ids.contains(&entry.id)));
    }

    #[tokio::test]
    async fn closing_a_subscription_releases_its_slot() {
        let store = Arc::new(TestStore::new());
        let feed = ChangeFeed::new(store.clone(), 16);

        let subscription = feed.subscribe(FeedScope::All);
        assert_eq!(feed.subscriber_count(), 1);

        subscription.close();
        assert_eq!(feed.subscriber_count(), 0);
    }
}
