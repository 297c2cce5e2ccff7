use std::str::FromStr;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use qatrail_application::TimelineQuery;
use qatrail_core::AppError;
use qatrail_domain::ActivityType;

use crate::dto::TimelinePageResponse;
use crate::error::ApiResult;
use crate::handlers::items::parse_project_id;
use crate::state::AppState;

#[derive(Debug, serde::Deserialize)]
pub struct TimelineParams {
    /// Free-text search over descriptions and item numbers/titles.
    pub q: Option<String>,
    pub activity_type: Option<String>,
    pub project_id: Option<String>,
    pub from: Option<String>,
    pub until: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

fn parse_bound(label: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|stamp| stamp.with_timezone(&Utc))
        .map_err(|_| AppError::Validation(format!("{label} '{value}' is not an RFC3339 timestamp")))
}

/// Queries the enriched activity timeline.
pub async fn timeline_handler(
    State(state): State<AppState>,
    Query(params): Query<TimelineParams>,
) -> ApiResult<Json<TimelinePageResponse>> {
    let page = state
        .timeline_service
        .query(TimelineQuery {
            free_text: params.q,
            activity_type: params
                .activity_type
                .as_deref()
                .map(ActivityType::from_str)
                .transpose()?,
            project_id: params
                .project_id
                .as_deref()
                .map(parse_project_id)
                .transpose()?,
            from: params
                .from
                .as_deref()
                .map(|value| parse_bound("from", value))
                .transpose()?,
            until: params
                .until
                .as_deref()
                .map(|value| parse_bound("until", value))
                .transpose()?,
            cursor: params.cursor,
            limit: params.limit.unwrap_or(50),
        })
        .await?;

    Ok(Json(TimelinePageResponse {
        entries: page.entries.into_iter().map(Into::into).collect(),
        next_cursor: page.next_cursor,
    }))
}
