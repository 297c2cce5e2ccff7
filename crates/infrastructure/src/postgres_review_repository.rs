use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use qatrail_application::{NewActivityEntry, ReviewRepository};
use qatrail_core::{AppError, AppResult};
use qatrail_domain::{ActivityLogEntry, QaItemId, Review, ReviewId, Role, QaStatus, UserId};

use crate::activity_entry::append_entry_tx;
use crate::store_error::store_error;

/// PostgreSQL-backed repository for the review ledger.
#[derive(Clone)]
pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReviewRow {
    id: Uuid,
    qa_item_id: Uuid,
    reviewer_id: Uuid,
    reviewer_role: String,
    status: String,
    comment: String,
    created_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_domain(self) -> AppResult<Review> {
        Review::from_parts(
            ReviewId::from_uuid(self.id),
            QaItemId::from_uuid(self.qa_item_id),
            UserId::from_uuid(self.reviewer_id),
            Role::from_str(&self.reviewer_role)
                .map_err(|error| AppError::Internal(error.to_string()))?,
            QaStatus::from_str(&self.status)
                .map_err(|error| AppError::Internal(error.to_string()))?,
            self.comment,
            self.created_at,
        )
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    async fn append_review(
        &self,
        review: Review,
        entry: NewActivityEntry,
    ) -> AppResult<(Review, ActivityLogEntry)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| store_error("failed to begin transaction", error))?;

        sqlx::query(
            r"
            INSERT INTO qa_reviews
                (id, qa_item_id, reviewer_id, reviewer_role, status, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(review.id().as_uuid())
        .bind(review.qa_item_id().as_uuid())
        .bind(review.reviewer_id().as_uuid())
        .bind(review.reviewer_role().as_str())
        .bind(review.proposed_status().as_str())
        .bind(review.comment())
        .bind(review.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|error| store_error("failed to insert review", error))?;

        let entry = append_entry_tx(&mut tx, entry, review.created_at()).await?;

        tx.commit()
            .await
            .map_err(|error| store_error("failed to commit review", error))?;

        Ok((review, entry))
    }

    async fn list_reviews(&self, qa_item_id: QaItemId) -> AppResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT id, qa_item_id, reviewer_id, reviewer_role, status, comment, created_at
            FROM qa_reviews
            WHERE qa_item_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(qa_item_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list reviews", error))?;

        rows.into_iter().map(ReviewRow::into_domain).collect()
    }
}
