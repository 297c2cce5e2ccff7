use axum::Json;
use axum::extract::{Extension, Path, State};
use qatrail_application::ImportItemInput;
use qatrail_domain::Actor;

use crate::dto::{
    ImportRequest, ImportSummaryResponse, PhaseResponse, ProjectResponse, parse_date,
    parse_discipline, parse_phase_id, parse_severity, parse_status, parse_user_id,
};
use crate::error::ApiResult;
use crate::handlers::items::parse_project_id;
use crate::state::AppState;

/// Lists all projects.
pub async fn list_projects_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProjectResponse>>> {
    let projects = state.projects.list_projects().await?;
    Ok(Json(
        projects.into_iter().map(ProjectResponse::from).collect(),
    ))
}

/// Fetches one project.
pub async fn get_project_handler(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectResponse>> {
    let project_id = parse_project_id(&project_id)?;
    let project = state
        .projects
        .find_project(project_id)
        .await?
        .ok_or_else(|| {
            qatrail_core::AppError::NotFound(format!("project '{project_id}' does not exist"))
        })?;
    Ok(Json(project.into()))
}

/// Lists a project's phases.
pub async fn list_phases_handler(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<PhaseResponse>>> {
    let phases = state
        .projects
        .list_project_phases(parse_project_id(&project_id)?)
        .await?;
    Ok(Json(phases.into_iter().map(PhaseResponse::from).collect()))
}

/// Runs a bulk import into one project.
pub async fn import_items_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(project_id): Path<String>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportSummaryResponse>> {
    let mut inputs = Vec::with_capacity(request.items.len());
    for item in request.items {
        inputs.push(ImportItemInput {
            item_number: item.item_number,
            title: item.title,
            description: item.description,
            category: item.category,
            discipline: parse_discipline(&item.discipline)?,
            severity: parse_severity(&item.severity)?,
            status: item.status.as_deref().map(parse_status).transpose()?,
            phase_id: item.phase_id.as_deref().map(parse_phase_id).transpose()?,
            assigned_to: item
                .assigned_to
                .as_deref()
                .map(parse_user_id)
                .transpose()?,
            due_date: item.due_date.as_deref().map(parse_date).transpose()?,
        });
    }

    let summary = state
        .import_service
        .import_items(&actor, parse_project_id(&project_id)?, inputs)
        .await?;

    Ok(Json(ImportSummaryResponse {
        created: summary.created,
        updated: summary.updated,
        summary_entry: summary.summary_entry.into(),
    }))
}
