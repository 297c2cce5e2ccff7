use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use qatrail_application::{ActivityLogRepository, FeedScope, NewActivityEntry, TimelineFilter};
use qatrail_core::{AppError, AppResult};
use qatrail_domain::{
    ActivityId, ActivityLogEntry, ActivityType, FeedCursor, PhaseId, ProjectId, QaItemId, UserId,
};

use crate::activity_entry::append_entry_tx;
use crate::store_error::store_error;

const SELECT_ENTRY: &str = r"
    SELECT id, activity_type, description, old_value, new_value, metadata,
           project_id, phase_id, qa_item_id, user_id, created_at
    FROM activity_log
";

/// PostgreSQL-backed repository for the append-only activity log.
#[derive(Clone)]
pub struct PostgresActivityLogRepository {
    pool: PgPool,
}

impl PostgresActivityLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    id: Uuid,
    activity_type: String,
    description: String,
    old_value: Option<String>,
    new_value: Option<String>,
    metadata: Option<Value>,
    project_id: Option<Uuid>,
    phase_id: Option<Uuid>,
    qa_item_id: Option<Uuid>,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl ActivityRow {
    fn into_domain(self) -> AppResult<ActivityLogEntry> {
        Ok(ActivityLogEntry {
            id: ActivityId::from_uuid(self.id),
            activity_type: ActivityType::from_str(&self.activity_type)
                .map_err(|error| AppError::Internal(error.to_string()))?,
            description: self.description,
            old_value: self.old_value,
            new_value: self.new_value,
            metadata: self.metadata,
            project_id: self.project_id.map(ProjectId::from_uuid),
            phase_id: self.phase_id.map(PhaseId::from_uuid),
            qa_item_id: self.qa_item_id.map(QaItemId::from_uuid),
            user_id: self.user_id.map(UserId::from_uuid),
            created_at: self.created_at,
        })
    }
}

fn scope_binds(scope: &FeedScope) -> (Option<Uuid>, Option<Uuid>) {
    match scope {
        FeedScope::All => (None, None),
        FeedScope::Project(project_id) => (Some(project_id.as_uuid()), None),
        FeedScope::Item(qa_item_id) => (None, Some(qa_item_id.as_uuid())),
    }
}

#[async_trait]
impl ActivityLogRepository for PostgresActivityLogRepository {
    async fn append(&self, entry: NewActivityEntry) -> AppResult<ActivityLogEntry> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| store_error("failed to begin transaction", error))?;

        let entry = append_entry_tx(&mut tx, entry, Utc::now()).await?;

        tx.commit()
            .await
            .map_err(|error| store_error("failed to commit activity entry", error))?;

        Ok(entry)
    }

    async fn entries_for_item(&self, qa_item_id: QaItemId) -> AppResult<Vec<ActivityLogEntry>> {
        let rows = sqlx::query_as::<_, ActivityRow>(&format!(
            "{SELECT_ENTRY} WHERE qa_item_id = $1 ORDER BY created_at, id"
        ))
        .bind(qa_item_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to load item activity", error))?;

        rows.into_iter().map(ActivityRow::into_domain).collect()
    }

    async fn entries_since(
        &self,
        scope: &FeedScope,
        cursor: Option<FeedCursor>,
        limit: usize,
    ) -> AppResult<Vec<ActivityLogEntry>> {
        let (project_id, qa_item_id) = scope_binds(scope);
        let rows = sqlx::query_as::<_, ActivityRow>(&format!(
            r"
            {SELECT_ENTRY}
            WHERE ($1::UUID IS NULL OR project_id = $1)
              AND ($2::UUID IS NULL OR qa_item_id = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR (created_at, id) > ($3, $4))
            ORDER BY created_at, id
            LIMIT $5
            "
        ))
        .bind(project_id)
        .bind(qa_item_id)
        .bind(cursor.map(|cursor| cursor.created_at))
        .bind(cursor.map(|cursor| cursor.entry_id.as_uuid()))
        .bind(limit.min(1_000) as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to backfill activity entries", error))?;

        rows.into_iter().map(ActivityRow::into_domain).collect()
    }

    async fn query(&self, filter: TimelineFilter) -> AppResult<Vec<ActivityLogEntry>> {
        let needle = filter
            .free_text
            .as_deref()
            .map(|text| format!("%{}%", text.to_lowercase()));
        let matching_ids: Vec<Uuid> = filter
            .matching_item_ids
            .iter()
            .map(|id| id.as_uuid())
            .collect();

        let rows = sqlx::query_as::<_, ActivityRow>(&format!(
            r"
            {SELECT_ENTRY}
            WHERE ($1::TEXT IS NULL
                   OR lower(description) LIKE $1
                   OR qa_item_id = ANY($2))
              AND ($3::TEXT IS NULL OR activity_type = $3)
              AND ($4::UUID IS NULL OR project_id = $4)
              AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5)
              AND ($6::TIMESTAMPTZ IS NULL OR created_at <= $6)
              AND ($7::TIMESTAMPTZ IS NULL OR (created_at, id) < ($7, $8))
            ORDER BY created_at DESC, id DESC
            LIMIT $9
            "
        ))
        .bind(needle)
        .bind(&matching_ids)
        .bind(filter.activity_type.map(|activity_type| activity_type.as_str()))
        .bind(filter.project_id.map(|project_id| project_id.as_uuid()))
        .bind(filter.from)
        .bind(filter.until)
        .bind(filter.before.map(|before| before.created_at))
        .bind(filter.before.map(|before| before.entry_id.as_uuid()))
        .bind(filter.limit.clamp(1, 1_000) as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to query activity timeline", error))?;

        rows.into_iter().map(ActivityRow::into_domain).collect()
    }
}
