use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::app::dto;
use crate::app::errors::{self, json_error};
use crate::app::routes::system;
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset", post(reset_password))
        .route("/me", get(me))
        .route("/roles", get(system::roles))
        .route("/roles/check", get(check_role))
        .route("/roles/admin", get(is_admin))
        .route("/roles/editor", get(is_editor_or_admin))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    let result = services
        .actions
        .register(&body.email, &body.password, body.name)
        .await;
    errors::action_result_response(result)
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    errors::action_result_response(services.actions.login(&body.email, &body.password).await)
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> axum::response::Response {
    errors::action_result_response(services.actions.logout(session.token()).await)
}

pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ForgotPasswordRequest>,
) -> axum::response::Response {
    errors::action_result_response(services.actions.request_password_reset(&body.email).await)
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<dto::ResetPasswordRequest>,
) -> axum::response::Response {
    let result = services
        .actions
        .complete_password_reset(session.token(), &body.password)
        .await;
    errors::action_result_response(result)
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> axum::response::Response {
    match services.actions.current_user(session.token()).await {
        Some(user) => (StatusCode::OK, Json(user)).into_response(),
        None => json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "no active session"),
    }
}

pub async fn check_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<dto::RoleCheckQuery>,
) -> axum::response::Response {
    match services
        .actions
        .check_user_role_named(session.token(), &query.role)
        .await
    {
        Ok(allowed) => Json(dto::RoleCheckResponse { allowed }).into_response(),
        Err(e) => json_error(StatusCode::BAD_REQUEST, "invalid_role", e.to_string()),
    }
}

pub async fn is_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> impl IntoResponse {
    let allowed = services.actions.is_admin(session.token()).await;
    Json(dto::RoleCheckResponse { allowed })
}

pub async fn is_editor_or_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> impl IntoResponse {
    let allowed = services.actions.is_editor_or_admin(session.token()).await;
    Json(dto::RoleCheckResponse { allowed })
}
