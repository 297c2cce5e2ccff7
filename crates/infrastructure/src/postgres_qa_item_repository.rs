use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use qatrail_application::{
    ItemMutation, NewActivityEntry, QaItemDraft, QaItemEdit, QaItemRepository,
};
use qatrail_core::{AppError, AppResult};
use qatrail_domain::{
    Discipline, PhaseId, ProjectId, QaItem, QaItemId, QaStatus, Severity, UserId,
};

use crate::activity_entry::append_entry_tx;
use crate::store_error::store_error;

const SELECT_ITEM: &str = r"
    SELECT id, project_id, phase_id, item_number, title, description, category,
           discipline, severity, status, assigned_to, due_date,
           started_at, resolved_at, verified_at, closed_at,
           created_by, created_at, updated_at
    FROM qa_items
";

/// PostgreSQL-backed repository for QA items.
///
/// The mutation methods run one transaction covering the row update and
/// the audit entry; a version mismatch rolls back with `Conflict` and
/// nothing becomes visible.
#[derive(Clone)]
pub struct PostgresQaItemRepository {
    pool: PgPool,
}

impl PostgresQaItemRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        qa_item_id: QaItemId,
        expected_version: DateTime<Utc>,
    ) -> AppResult<QaItem> {
        let row = sqlx::query_as::<_, QaItemRow>(&format!("{SELECT_ITEM} WHERE id = $1 FOR UPDATE"))
            .bind(qa_item_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|error| store_error("failed to lock QA item", error))?;

        let item = row
            .ok_or_else(|| AppError::NotFound(format!("QA item '{qa_item_id}' does not exist")))?
            .into_domain()?;

        if item.updated_at != expected_version {
            return Err(AppError::Conflict(format!(
                "QA item '{qa_item_id}' changed since it was read; re-read and retry"
            )));
        }

        Ok(item)
    }

    async fn store_item(
        tx: &mut Transaction<'_, Postgres>,
        item: &QaItem,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE qa_items
            SET phase_id = $2, title = $3, description = $4, category = $5,
                discipline = $6, severity = $7, status = $8, assigned_to = $9,
                due_date = $10, started_at = $11, resolved_at = $12,
                verified_at = $13, closed_at = $14, updated_at = $15
            WHERE id = $1
            ",
        )
        .bind(item.id.as_uuid())
        .bind(item.phase_id.map(|id| id.as_uuid()))
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.category)
        .bind(item.discipline.as_str())
        .bind(item.severity.as_str())
        .bind(item.status.as_str())
        .bind(item.assigned_to.map(|id| id.as_uuid()))
        .bind(item.due_date)
        .bind(item.started_at)
        .bind(item.resolved_at)
        .bind(item.verified_at)
        .bind(item.closed_at)
        .bind(item.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|error| store_error("failed to update QA item", error))?;

        Ok(())
    }

}

#[derive(Debug, FromRow)]
struct QaItemRow {
    id: Uuid,
    project_id: Uuid,
    phase_id: Option<Uuid>,
    item_number: String,
    title: String,
    description: Option<String>,
    category: Option<String>,
    discipline: String,
    severity: String,
    status: String,
    assigned_to: Option<Uuid>,
    due_date: Option<NaiveDate>,
    started_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl QaItemRow {
    fn into_domain(self) -> AppResult<QaItem> {
        Ok(QaItem {
            id: QaItemId::from_uuid(self.id),
            project_id: ProjectId::from_uuid(self.project_id),
            phase_id: self.phase_id.map(PhaseId::from_uuid),
            item_number: self.item_number,
            title: self.title,
            description: self.description,
            category: self.category,
            discipline: Discipline::from_str(&self.discipline)
                .map_err(|error| AppError::Internal(error.to_string()))?,
            severity: Severity::from_str(&self.severity)
                .map_err(|error| AppError::Internal(error.to_string()))?,
            status: QaStatus::from_str(&self.status)
                .map_err(|error| AppError::Internal(error.to_string()))?,
            assigned_to: self.assigned_to.map(UserId::from_uuid),
            due_date: self.due_date,
            started_at: self.started_at,
            resolved_at: self.resolved_at,
            verified_at: self.verified_at,
            closed_at: self.closed_at,
            created_by: self.created_by.map(UserId::from_uuid),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl QaItemRepository for PostgresQaItemRepository {
    async fn find_item(&self, qa_item_id: QaItemId) -> AppResult<Option<QaItem>> {
        let row = sqlx::query_as::<_, QaItemRow>(&format!("{SELECT_ITEM} WHERE id = $1"))
            .bind(qa_item_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| store_error("failed to load QA item", error))?;

        row.map(QaItemRow::into_domain).transpose()
    }

    async fn find_items(&self, qa_item_ids: &[QaItemId]) -> AppResult<Vec<QaItem>> {
        let ids: Vec<Uuid> = qa_item_ids.iter().map(QaItemId::as_uuid).collect();
        let rows = sqlx::query_as::<_, QaItemRow>(&format!("{SELECT_ITEM} WHERE id = ANY($1)"))
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| store_error("failed to load QA items", error))?;

        rows.into_iter().map(QaItemRow::into_domain).collect()
    }

    async fn list_project_items(&self, project_id: ProjectId) -> AppResult<Vec<QaItem>> {
        let rows = sqlx::query_as::<_, QaItemRow>(&format!(
            "{SELECT_ITEM} WHERE project_id = $1 ORDER BY item_number"
        ))
        .bind(project_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list QA items", error))?;

        rows.into_iter().map(QaItemRow::into_domain).collect()
    }

    async fn find_by_item_number(
        &self,
        project_id: ProjectId,
        item_number: &str,
    ) -> AppResult<Option<QaItem>> {
        let row = sqlx::query_as::<_, QaItemRow>(&format!(
            "{SELECT_ITEM} WHERE project_id = $1 AND item_number = $2"
        ))
        .bind(project_id.as_uuid())
        .bind(item_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to look up QA item by number", error))?;

        row.map(QaItemRow::into_domain).transpose()
    }

    async fn search_item_ids(&self, free_text: &str) -> AppResult<Vec<QaItemId>> {
        let needle = format!("%{}%", free_text.to_lowercase());
        let rows = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM qa_items WHERE lower(item_number) LIKE $1 OR lower(title) LIKE $1",
        )
        .bind(&needle)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to search QA items", error))?;

        Ok(rows.into_iter().map(QaItemId::from_uuid).collect())
    }

    async fn next_item_sequence(&self, project_id: ProjectId) -> AppResult<u32> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM qa_items WHERE project_id = $1",
        )
        .bind(project_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| store_error("failed to count QA items", error))?;

        Ok(count as u32 + 1)
    }

    async fn insert_item(&self, draft: QaItemDraft) -> AppResult<QaItem> {
        let row = sqlx::query_as::<_, QaItemRow>(
            r"
            INSERT INTO qa_items
                (id, project_id, phase_id, item_number, title, description,
                 category, discipline, severity, status, assigned_to, due_date,
                 created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, project_id, phase_id, item_number, title, description,
                      category, discipline, severity, status, assigned_to,
                      due_date, started_at, resolved_at, verified_at, closed_at,
                      created_by, created_at, updated_at
            ",
        )
        .bind(QaItemId::new().as_uuid())
        .bind(draft.project_id.as_uuid())
        .bind(draft.phase_id.map(|id| id.as_uuid()))
        .bind(&draft.item_number)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(draft.discipline.as_str())
        .bind(draft.severity.as_str())
        .bind(draft.status.as_str())
        .bind(draft.assigned_to.map(|id| id.as_uuid()))
        .bind(draft.due_date)
        .bind(draft.created_by.map(|id| id.as_uuid()))
        .fetch_one(&self.pool)
        .await
        .map_err(|error| match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(format!(
                "item number '{}' already exists in project '{}'",
                draft.item_number, draft.project_id
            )),
            _ => store_error("failed to insert QA item", error),
        })?;

        row.into_domain()
    }

    async fn apply_transition(
        &self,
        qa_item_id: QaItemId,
        expected_version: DateTime<Utc>,
        target: QaStatus,
        entry: NewActivityEntry,
    ) -> AppResult<ItemMutation> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| store_error("failed to begin transaction", error))?;

        let mut item = self.lock_item(&mut tx, qa_item_id, expected_version).await?;
        let at = Utc::now();
        item.apply_status(target, at);

        Self::store_item(&mut tx, &item).await?;
        let entry = append_entry_tx(&mut tx, entry, at).await?;

        tx.commit()
            .await
            .map_err(|error| store_error("failed to commit transition", error))?;

        Ok(ItemMutation { item, entry })
    }

    async fn apply_edit(
        &self,
        qa_item_id: QaItemId,
        expected_version: DateTime<Utc>,
        edit: QaItemEdit,
        entry: NewActivityEntry,
    ) -> AppResult<ItemMutation> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| store_error("failed to begin transaction", error))?;

        let mut item = self.lock_item(&mut tx, qa_item_id, expected_version).await?;
        let at = Utc::now();

        if let Some(title) = edit.title {
            item.title = title;
        }
        if let Some(description) = edit.description {
            item.description = Some(description);
        }
        if let Some(category) = edit.category {
            item.category = Some(category);
        }
        if let Some(discipline) = edit.discipline {
            item.discipline = discipline;
        }
        if let Some(severity) = edit.severity {
            item.severity = severity;
        }
        if let Some(phase_id) = edit.phase_id {
            item.phase_id = Some(phase_id);
        }
        if let Some(assigned_to) = edit.assigned_to {
            item.assigned_to = Some(assigned_to);
        }
        if let Some(due_date) = edit.due_date {
            item.due_date = Some(due_date);
        }
        item.updated_at = at;

        Self::store_item(&mut tx, &item).await?;
        let entry = append_entry_tx(&mut tx, entry, at).await?;

        tx.commit()
            .await
            .map_err(|error| store_error("failed to commit edit", error))?;

        Ok(ItemMutation { item, entry })
    }
}
