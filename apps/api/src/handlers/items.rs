use axum::Json;
use axum::extract::{Extension, Path, State};
use qatrail_application::QaItemEdit;
use qatrail_core::AppError;
use qatrail_domain::{Actor, AttachmentMetadata, ProjectId, QaItemId};
use uuid::Uuid;

use crate::dto::{
    ActivityEntryResponse, AttachmentEventRequest, EditItemRequest, QaItemResponse,
    TransitionRequest, parse_date, parse_discipline, parse_phase_id, parse_severity,
    parse_status, parse_user_id, parse_version,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub(crate) fn parse_item_id(value: &str) -> Result<QaItemId, AppError> {
    Uuid::parse_str(value)
        .map(QaItemId::from_uuid)
        .map_err(|_| AppError::Validation(format!("item id '{value}' is not a UUID")))
}

pub(crate) fn parse_project_id(value: &str) -> Result<ProjectId, AppError> {
    Uuid::parse_str(value)
        .map(ProjectId::from_uuid)
        .map_err(|_| AppError::Validation(format!("project id '{value}' is not a UUID")))
}

/// Fetches one QA item.
pub async fn get_item_handler(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> ApiResult<Json<QaItemResponse>> {
    let item = state.item_service.get_item(parse_item_id(&item_id)?).await?;
    Ok(Json(item.into()))
}

/// Lists a project's QA items.
pub async fn list_project_items_handler(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<QaItemResponse>>> {
    let items = state
        .item_service
        .list_project_items(parse_project_id(&project_id)?)
        .await?;
    Ok(Json(items.into_iter().map(QaItemResponse::from).collect()))
}

/// Returns an item's full activity history, oldest first.
pub async fn item_activity_handler(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> ApiResult<Json<Vec<ActivityEntryResponse>>> {
    let item_id = parse_item_id(&item_id)?;
    // 404 for unknown items rather than an empty history.
    state.item_service.get_item(item_id).await?;

    let entries = state
        .feed
        .backfill(&qatrail_application::FeedScope::Item(item_id), None, 1_000)
        .await?;
    Ok(Json(
        entries.into_iter().map(ActivityEntryResponse::from).collect(),
    ))
}

/// Attempts a status transition.
pub async fn transition_item_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(item_id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> ApiResult<Json<QaItemResponse>> {
    let outcome = state
        .transition_service
        .attempt_transition(
            &actor,
            parse_item_id(&item_id)?,
            parse_status(&request.proposed_status)?,
            parse_version(&request.expected_version)?,
        )
        .await?;
    Ok(Json(outcome.item.into()))
}

/// Applies a status-preserving field edit.
pub async fn edit_item_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(item_id): Path<String>,
    Json(request): Json<EditItemRequest>,
) -> ApiResult<Json<QaItemResponse>> {
    let edit = QaItemEdit {
        title: request.title,
        description: request.description,
        category: request.category,
        discipline: request
            .discipline
            .as_deref()
            .map(parse_discipline)
            .transpose()?,
        severity: request.severity.as_deref().map(parse_severity).transpose()?,
        phase_id: request.phase_id.as_deref().map(parse_phase_id).transpose()?,
        assigned_to: request
            .assigned_to
            .as_deref()
            .map(parse_user_id)
            .transpose()?,
        due_date: request.due_date.as_deref().map(parse_date).transpose()?,
    };

    let outcome = state
        .item_service
        .edit_item(
            &actor,
            parse_item_id(&item_id)?,
            parse_version(&request.expected_version)?,
            edit,
        )
        .await?;
    Ok(Json(outcome.item.into()))
}

/// Ingests an attachment-uploaded event from the storage collaborator.
pub async fn attachment_uploaded_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(item_id): Path<String>,
    Json(request): Json<AttachmentEventRequest>,
) -> ApiResult<Json<ActivityEntryResponse>> {
    let entry = state
        .recorder
        .record_attachment_uploaded(
            &actor,
            parse_item_id(&item_id)?,
            &AttachmentMetadata {
                file_name: request.file_name,
                file_size: request.file_size,
                file_type: request.file_type,
            },
        )
        .await?;
    Ok(Json(entry.into()))
}

/// Ingests an attachment-deleted event from the storage collaborator.
pub async fn attachment_deleted_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(item_id): Path<String>,
    Json(request): Json<AttachmentEventRequest>,
) -> ApiResult<Json<ActivityEntryResponse>> {
    let entry = state
        .recorder
        .record_attachment_deleted(
            &actor,
            parse_item_id(&item_id)?,
            &AttachmentMetadata {
                file_name: request.file_name,
                file_size: request.file_size,
                file_type: request.file_type,
            },
        )
        .await?;
    Ok(Json(entry.into()))
}
