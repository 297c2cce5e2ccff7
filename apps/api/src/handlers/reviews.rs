use axum::Json;
use axum::extract::{Extension, Path, State};
use qatrail_application::ReviewTransition;
use qatrail_domain::Actor;

use crate::dto::{ReviewResponse, ReviewSubmissionResponse, SubmitReviewRequest, parse_status};
use crate::error::ApiResult;
use crate::handlers::items::parse_item_id;
use crate::state::AppState;

/// Submits a review for an item.
pub async fn submit_review_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(item_id): Path<String>,
    Json(request): Json<SubmitReviewRequest>,
) -> ApiResult<Json<ReviewSubmissionResponse>> {
    let submission = state
        .review_service
        .submit_review(
            &actor,
            parse_item_id(&item_id)?,
            parse_status(&request.proposed_status)?,
            request.comment,
        )
        .await?;

    let (transition_applied, status, reason) = match submission.transition {
        ReviewTransition::Applied(outcome) => {
            (true, Some(outcome.item.status.as_str().to_owned()), None)
        }
        ReviewTransition::Superseded { reason } => (false, None, Some(reason)),
    };

    Ok(Json(ReviewSubmissionResponse {
        review: submission.review.into(),
        transition_applied,
        status,
        reason,
    }))
}

/// Lists an item's reviews, newest first.
pub async fn list_reviews_handler(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> ApiResult<Json<Vec<ReviewResponse>>> {
    let reviews = state
        .review_service
        .list_reviews(parse_item_id(&item_id)?)
        .await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}
