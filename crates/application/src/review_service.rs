use std::sync::Arc;

use chrono::Utc;
use qatrail_core::{AppError, AppResult};
use qatrail_domain::{ActivityType, Actor, QaItemId, QaStatus, Review};

use crate::change_feed::ChangeFeed;
use crate::ports::{NewActivityEntry, QaItemRepository, ReviewRepository};
use crate::transition_service::{TransitionOutcome, TransitionService};

/// What happened to the status transition a review proposed.
#[derive(Debug)]
pub enum ReviewTransition {
    /// The proposed transition committed.
    Applied(TransitionOutcome),
    /// A concurrent mutation won the race; the review is retained as a
    /// historical comment and the status is unchanged.
    Superseded {
        /// Why the transition was not applied.
        reason: String,
    },
}

/// Result of a review submission: the persisted comment plus the fate of
/// its proposed transition.
#[derive(Debug)]
pub struct ReviewSubmission {
    /// The persisted, immutable review.
    pub review: Review,
    /// Outcome of the proposed status change.
    pub transition: ReviewTransition,
}

/// Append-only ledger of reviewer comments; reviews are the triggering
/// input to the transition engine.
#[derive(Clone)]
pub struct ReviewService {
    items: Arc<dyn QaItemRepository>,
    reviews: Arc<dyn ReviewRepository>,
    transitions: TransitionService,
    feed: ChangeFeed,
}

impl ReviewService {
    /// Creates the ledger from its collaborators.
    #[must_use]
    pub fn new(
        items: Arc<dyn QaItemRepository>,
        reviews: Arc<dyn ReviewRepository>,
        transitions: TransitionService,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            items,
            reviews,
            transitions,
            feed,
        }
    }

    /// Submits a review proposing `proposed` for the item.
    ///
    /// The proposal must be one transition-graph edge away from the item's
    /// current status and within the actor's role, evaluated at submission
    /// time; rejected proposals are not persisted. Accepted reviews commit
    /// in two steps: the review row (with its `review_added` entry) first,
    /// then the transition. A transition lost to a concurrent mutation
    /// leaves the review in place and reports
    /// [`ReviewTransition::Superseded`].
    pub async fn submit_review(
        &self,
        actor: &Actor,
        qa_item_id: QaItemId,
        proposed: QaStatus,
        comment: impl Into<String>,
    ) -> AppResult<ReviewSubmission> {
        let item = self
            .items
            .find_item(qa_item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("QA item '{qa_item_id}' does not exist")))?;

        // Same gate ordering as the transition engine: role floor for the
        // target, then edge reachability, then the edge's own role rule.
        if !actor.role.at_least(proposed.minimum_entry_role()) {
            return Err(AppError::Forbidden(format!(
                "role '{}' may not propose moving an item into '{}'",
                actor.role.as_str(),
                proposed.as_str()
            )));
        }

        let rule = item.status.transition_to(proposed).ok_or_else(|| {
            AppError::Conflict(format!(
                "review proposes '{}' which is not reachable from '{}'",
                proposed.as_str(),
                item.status.as_str()
            ))
        })?;

        if !actor.role.at_least(rule.required_role()) {
            return Err(AppError::Forbidden(format!(
                "role '{}' may not propose moving an item from '{}' to '{}'",
                actor.role.as_str(),
                item.status.as_str(),
                proposed.as_str()
            )));
        }

        let review = Review::new(
            qa_item_id,
            actor.user_id,
            actor.role,
            proposed,
            comment,
            Utc::now(),
        )?;

        let entry = NewActivityEntry {
            activity_type: ActivityType::ReviewAdded,
            description: "Added review comment on QA item".to_owned(),
            old_value: None,
            new_value: Some(proposed.as_str().to_owned()),
            metadata: None,
            project_id: Some(item.project_id),
            phase_id: item.phase_id,
            qa_item_id: Some(item.id),
            user_id: Some(actor.user_id),
        };

        let (review, entry) = self.reviews.append_review(review, entry).await?;
        self.feed.publish(&entry);

        let transition = match self
            .transitions
            .attempt_transition(actor, qa_item_id, proposed, item.version())
            .await
        {
            Ok(outcome) => ReviewTransition::Applied(outcome),
            Err(
                error @ (AppError::Conflict(_) | AppError::Forbidden(_) | AppError::NotFound(_)),
            ) => ReviewTransition::Superseded {
                reason: error.to_string(),
            },
            Err(error) => return Err(error),
        };

        Ok(ReviewSubmission { review, transition })
    }

    /// Lists an item's review ledger, newest first.
    pub async fn list_reviews(&self, qa_item_id: QaItemId) -> AppResult<Vec<Review>> {
        if self.items.find_item(qa_item_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "QA item '{qa_item_id}' does not exist"
            )));
        }

        self.reviews.list_reviews(qa_item_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use qatrail_domain::{ActivityType, Actor, QaStatus, Role, UserId};

    use super::{ReviewService, ReviewTransition};
    use crate::change_feed::ChangeFeed;
    use crate::test_support::TestStore;
    use crate::transition_service::TransitionService;

    fn service(store: &Arc<TestStore>) -> ReviewService {
        let feed = ChangeFeed::new(store.clone(), 16);
        let transitions = TransitionService::new(store.clone(), feed.clone());
        ReviewService::new(store.clone(), store.clone(), transitions, feed)
    }

    #[tokio::test]
    async fn accepted_review_persists_and_transitions() {
        let store = Arc::new(TestStore::new());
        let item = store.seed_item(QaStatus::Open).await;
        let service = service(&store);
        let senior = Actor::new(UserId::new(), Role::SeniorEngineer);

        let submission = service
            .submit_review(&senior, item.id, QaStatus::Resolved, "rework complete")
            .await;
        assert!(submission.is_ok());
        let submission = submission.unwrap_or_else(|_| unreachable!());

        assert!(matches!(
            submission.transition,
            ReviewTransition::Applied(_)
        ));
        assert_eq!(submission.review.proposed_status(), QaStatus::Resolved);
        assert_eq!(submission.review.reviewer_role(), Role::SeniorEngineer);

        let updated = store.item(item.id).await;
        assert_eq!(updated.status, QaStatus::Resolved);
        assert!(updated.resolved_at.is_some());

        // Exactly one review_added and one status_change entry.
        let entries = store.entries_for(item.id).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].activity_type, ActivityType::ReviewAdded);
        assert_eq!(entries[1].activity_type, ActivityType::StatusChange);
        assert_eq!(entries[1].old_value.as_deref(), Some("open"));
        assert_eq!(entries[1].new_value.as_deref(), Some("resolved"));
    }

    #[tokio::test]
    async fn losing_reviewer_keeps_comment_without_second_transition() {
        let store = Arc::new(TestStore::new());
        let item = store.seed_item(QaStatus::Open).await;
        let service = service(&store);
        let first = Actor::new(UserId::new(), Role::SeniorEngineer);
        let second = Actor::new(UserId::new(), Role::SeniorEngineer);

        let winner = service
            .submit_review(&first, item.id, QaStatus::Resolved, "fixed on site")
            .await;
        assert!(winner.is_ok());

        // The engine re-reads current state, so the second proposal now
        // targets a status that is no longer one edge away.
        let loser = service
            .submit_review(&second, item.id, QaStatus::Resolved, "confirmed fixed")
            .await;
        assert!(loser.is_err());

        // Rejected at validation, so the loser's comment is not persisted.
        let reviews = store.all_reviews().await;
        assert_eq!(reviews.len(), 1);

        let status_changes = store
            .entries_for(item.id)
            .await
            .into_iter()
            .filter(|entry| entry.activity_type == ActivityType::StatusChange)
            .count();
        assert_eq!(status_changes, 1);
    }

    #[tokio::test]
    async fn review_losing_the_version_race_retains_comment() {
        use async_trait::async_trait;
        use qatrail_core::AppResult;
        use qatrail_domain::{ActivityLogEntry, QaItemId, Review};

        use crate::ports::{NewActivityEntry, QaItemRepository, ReviewRepository};

        /// Delegates review appends, but commits a rival transition
        /// between the review persist and the review's own transition, so
        /// the reviewer deterministically holds a stale version.
        struct RacingReviews {
            store: Arc<TestStore>,
            item_id: QaItemId,
        }

        #[async_trait]
        impl ReviewRepository for RacingReviews {
            async fn append_review(
                &self,
                review: Review,
                entry: NewActivityEntry,
            ) -> AppResult<(Review, ActivityLogEntry)> {
                let persisted = self.store.append_review(review, entry).await?;

                let current = self.store.item(self.item_id).await;
                let rival_entry = NewActivityEntry {
                    activity_type: ActivityType::StatusChange,
                    description: "Changed status from Open to Resolved".to_owned(),
                    old_value: Some("open".to_owned()),
                    new_value: Some("resolved".to_owned()),
                    metadata: None,
                    project_id: Some(current.project_id),
                    phase_id: None,
                    qa_item_id: Some(current.id),
                    user_id: None,
                };
                let raced = self
                    .store
                    .apply_transition(
                        current.id,
                        current.version(),
                        QaStatus::Resolved,
                        rival_entry,
                    )
                    .await;
                assert!(raced.is_ok());

                Ok(persisted)
            }

            async fn list_reviews(&self, qa_item_id: QaItemId) -> AppResult<Vec<Review>> {
                self.store.list_reviews(qa_item_id).await
            }
        }

        let store = Arc::new(TestStore::new());
        let item = store.seed_item(QaStatus::Open).await;

        let feed = ChangeFeed::new(store.clone(), 16);
        let transitions = TransitionService::new(store.clone(), feed.clone());
        let racing = Arc::new(RacingReviews {
            store: store.clone(),
            item_id: item.id,
        });
        let service = ReviewService::new(store.clone(), racing, transitions, feed);

        let reviewer = Actor::new(UserId::new(), Role::SeniorEngineer);
        let submission = service
            .submit_review(&reviewer, item.id, QaStatus::Resolved, "confirmed fixed")
            .await;
        assert!(submission.is_ok());
        let submission = submission.unwrap_or_else(|_| unreachable!());

        // The rival's commit won; the review stands as a comment only.
        assert!(matches!(
            submission.transition,
            ReviewTransition::Superseded { .. }
        ));

        assert_eq!(store.all_reviews().await.len(), 1);
        let status_changes = store
            .entries_for(item.id)
            .await
            .into_iter()
            .filter(|entry| entry.activity_type == ActivityType::StatusChange)
            .count();
        assert_eq!(status_changes, 1);

        let current = store.item(item.id).await;
        assert_eq!(current.status, QaStatus::Resolved);
    }

    #[tokio::test]
    async fn unreachable_proposal_is_rejected_and_not_persisted() {
        let store = Arc::new(TestStore::new());
        let item = store.seed_item(QaStatus::Noted).await;
        let service = service(&store);
        let pm = Actor::new(UserId::new(), Role::Pm);

        let result = service
            .submit_review(&pm, item.id, QaStatus::Verified, "skipping ahead")
            .await;
        assert!(matches!(result, Err(qatrail_core::AppError::Conflict(_))));

        assert!(store.all_reviews().await.is_empty());
        assert!(store.entries_for(item.id).await.is_empty());
    }

    #[tokio::test]
    async fn insufficient_role_is_rejected_and_not_persisted() {
        let store = Arc::new(TestStore::new());
        let item = store.seed_item(QaStatus::Open).await;
        let service = service(&store);
        let junior = Actor::new(UserId::new(), Role::JuniorEngineer);

        let result = service
            .submit_review(&junior, item.id, QaStatus::Resolved, "done I think")
            .await;
        assert!(matches!(result, Err(qatrail_core::AppError::Forbidden(_))));
        assert!(store.all_reviews().await.is_empty());
    }

    #[tokio::test]
    async fn empty_comment_is_rejected() {
        let store = Arc::new(TestStore::new());
        let item = store.seed_item(QaStatus::Noted).await;
        let service = service(&store);
        let junior = Actor::new(UserId::new(), Role::JuniorEngineer);

        let result = service
            .submit_review(&junior, item.id, QaStatus::Open, "  ")
            .await;
        assert!(matches!(
            result,
            Err(qatrail_core::AppError::Validation(_))
        ));
        assert!(store.all_reviews().await.is_empty());
    }
}
