use axum::Json;
use axum::extract::{Path, State};
use qatrail_core::AppError;
use qatrail_domain::UserId;
use uuid::Uuid;

use crate::dto::ProfileResponse;
use crate::error::ApiResult;
use crate::state::AppState;

fn parse_profile_id(value: &str) -> Result<UserId, AppError> {
    Uuid::parse_str(value)
        .map(UserId::from_uuid)
        .map_err(|_| AppError::Validation(format!("profile id '{value}' is not a UUID")))
}

/// Lists all profiles with their resolved roles.
pub async fn list_profiles_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProfileResponse>>> {
    let profiles = state.profiles.list_profiles().await?;

    let mut responses = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let roles = state
            .profiles
            .list_user_roles(profile.id)
            .await?
            .into_iter()
            .map(|assignment| assignment.role)
            .collect();
        responses.push(ProfileResponse::from_profile_with_roles(profile, roles));
    }

    Ok(Json(responses))
}

/// Fetches one profile with its resolved roles.
pub async fn get_profile_handler(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile_id = parse_profile_id(&profile_id)?;
    let profile = state
        .profiles
        .find_profile(profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("profile '{profile_id}' does not exist")))?;

    let roles = state
        .profiles
        .list_user_roles(profile.id)
        .await?
        .into_iter()
        .map(|assignment| assignment.role)
        .collect();

    Ok(Json(ProfileResponse::from_profile_with_roles(
        profile, roles,
    )))
}
