use axum::{http::StatusCode, response::IntoResponse, Json};

use quill_auth::role_registry;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// The role table, highest rank first.
pub async fn roles() -> impl IntoResponse {
    Json(serde_json::json!({ "roles": role_registry() }))
}
