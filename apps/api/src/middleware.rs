use std::str::FromStr;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use qatrail_core::AppError;
use qatrail_domain::{Actor, Role, UserId};
use uuid::Uuid;

use crate::error::ApiResult;

/// Builds the request [`Actor`] from the identity headers supplied by the
/// authentication collaborator.
///
/// The engine trusts this resolved identity and performs no credential
/// verification of its own; deployments must ensure these headers are only
/// ever set by the gateway. Missing headers are `Unauthorized`; a role
/// outside the closed set is a rejected request.
pub async fn require_identity(mut request: Request, next: Next) -> ApiResult<Response> {
    let headers = request.headers();

    let user_id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("x-user-id header is required".to_owned()))?;
    let role = headers
        .get("x-user-role")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("x-user-role header is required".to_owned()))?;

    let user_id = Uuid::parse_str(user_id)
        .map(UserId::from_uuid)
        .map_err(|_| AppError::Unauthorized("x-user-id must be a UUID".to_owned()))?;
    let role = Role::from_str(role)?;

    request.extensions_mut().insert(Actor::new(user_id, role));
    Ok(next.run(request).await)
}
