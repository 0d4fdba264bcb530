use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use quill_auth::ProfileUpdate;
use quill_core::UserId;
use quill_infra::auth_actions::USER_CREATE_FAILED;

use crate::app::dto;
use crate::app::errors::{self, json_error};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::SessionContext;

fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse::<UserId>()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

/// `POST /api/users`: `201` with the row, or `500 {"error": "Failed to create user"}`.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateUserRequest>,
) -> axum::response::Response {
    let id = match parse_user_id(&body.id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.actions.create_profile(id, &body.email, body.name).await {
        Ok(profile) => (StatusCode::CREATED, Json(profile)).into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": USER_CREATE_FAILED })),
        )
            .into_response(),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.actions.user_by_id(&id).await {
        Some(profile) => (StatusCode::OK, Json(profile)).into_response(),
        None => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<ProfileUpdate>,
) -> axum::response::Response {
    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if let Err(resp) = authz::require_owner_or_admin(&services.actions, &session, &id).await {
        return resp;
    }

    match services.actions.update_profile(&id, body).await {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => errors::action_error_response("profile_update_failed", err),
    }
}
