use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};

use qatrail_application::NewActivityEntry;
use qatrail_core::AppResult;
use qatrail_domain::{ActivityId, ActivityLogEntry};

use crate::store_error::store_error;

/// Appends one activity entry inside the caller's transaction.
///
/// Identity is generated here; `at` is the commit instant of the mutation
/// the entry documents, so row timestamps and the log always agree.
pub(crate) async fn append_entry_tx(
    tx: &mut Transaction<'_, Postgres>,
    entry: NewActivityEntry,
    at: DateTime<Utc>,
) -> AppResult<ActivityLogEntry> {
    let entry = ActivityLogEntry {
        id: ActivityId::generate(),
        activity_type: entry.activity_type,
        description: entry.description,
        old_value: entry.old_value,
        new_value: entry.new_value,
        metadata: entry.metadata,
        project_id: entry.project_id,
        phase_id: entry.phase_id,
        qa_item_id: entry.qa_item_id,
        user_id: entry.user_id,
        created_at: at,
    };

    sqlx::query(
        r"
        INSERT INTO activity_log
            (id, activity_type, description, old_value, new_value, metadata,
             project_id, phase_id, qa_item_id, user_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ",
    )
    .bind(entry.id.as_uuid())
    .bind(entry.activity_type.as_str())
    .bind(&entry.description)
    .bind(&entry.old_value)
    .bind(&entry.new_value)
    .bind(&entry.metadata)
    .bind(entry.project_id.map(|id| id.as_uuid()))
    .bind(entry.phase_id.map(|id| id.as_uuid()))
    .bind(entry.qa_item_id.map(|id| id.as_uuid()))
    .bind(entry.user_id.map(|id| id.as_uuid()))
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|error| store_error("failed to append activity entry", error))?;

    Ok(entry)
}
