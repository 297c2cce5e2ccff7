use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use qatrail_application::FeedScope;
use qatrail_domain::FeedCursor;

use crate::dto::{ActivityEntryResponse, FeedResponse};
use crate::error::ApiResult;
use crate::handlers::items::{parse_item_id, parse_project_id};
use crate::state::AppState;

/// Longest a poll is allowed to park waiting for a push.
const MAX_WAIT_MS: u64 = 30_000;

#[derive(Debug, serde::Deserialize)]
pub struct FeedParams {
    /// Cursor of the last entry the subscriber has seen.
    pub cursor: Option<String>,
    pub project_id: Option<String>,
    pub qa_item_id: Option<String>,
    /// How long to wait for a push when the cursor is current.
    pub wait_ms: Option<u64>,
    pub limit: Option<usize>,
}

/// Long-poll endpoint for the change feed.
///
/// Pull-with-cursor is the correctness mechanism: the handler first
/// backfills entries after the caller's cursor and returns them
/// immediately. Only a caller that is already current parks on the live
/// push, and a received push merely triggers another backfill so delivery
/// is always in log order. Duplicates across reconnects are fine; clients
/// deduplicate by entry id.
pub async fn feed_handler(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> ApiResult<Json<FeedResponse>> {
    let scope = match (&params.qa_item_id, &params.project_id) {
        (Some(item_id), _) => FeedScope::Item(parse_item_id(item_id)?),
        (None, Some(project_id)) => FeedScope::Project(parse_project_id(project_id)?),
        (None, None) => FeedScope::All,
    };
    let cursor = params
        .cursor
        .as_deref()
        .map(FeedCursor::parse_token)
        .transpose()?;
    let limit = params.limit.unwrap_or(100).clamp(1, 500);

    // Subscribe before backfilling so nothing committed in between the
    // two can be missed.
    let mut subscription = state.feed.subscribe(scope);

    let entries = state.feed.backfill(&scope, cursor, limit).await?;
    if !entries.is_empty() {
        return Ok(Json(respond(entries, params.cursor)));
    }

    let wait = Duration::from_millis(params.wait_ms.unwrap_or(25_000).min(MAX_WAIT_MS));
    let pushed = tokio::time::timeout(wait, subscription.next()).await;
    subscription.close();

    let entries = match pushed {
        Ok(Some(_)) => state.feed.backfill(&scope, cursor, limit).await?,
        _ => Vec::new(),
    };

    Ok(Json(respond(entries, params.cursor)))
}

fn respond(
    entries: Vec<qatrail_domain::ActivityLogEntry>,
    request_cursor: Option<String>,
) -> FeedResponse {
    let cursor = entries
        .last()
        .map(|entry| entry.cursor().as_token())
        .or(request_cursor);
    FeedResponse {
        entries: entries
            .into_iter()
            .map(ActivityEntryResponse::from)
            .collect(),
        cursor,
    }
}
