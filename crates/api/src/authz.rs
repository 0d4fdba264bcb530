//! API-side guards for profile mutations.
//!
//! Role decisions come from `quill-auth`; this module only resolves the
//! caller and turns a denial into a response.

use axum::http::StatusCode;

use quill_auth::{Role, UserProfile, explain, is_admin_exact};
use quill_core::UserId;
use quill_infra::AuthActions;

use crate::app::errors::json_error;
use crate::context::SessionContext;

/// The caller may edit `target` if it is their own profile or they are an
/// administrator. Returns the caller's profile.
pub async fn require_owner_or_admin(
    actions: &AuthActions,
    session: &SessionContext,
    target: &UserId,
) -> Result<UserProfile, axum::response::Response> {
    let caller = actions
        .current_user(session.token())
        .await
        .ok_or_else(|| {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "sign in required")
        })?;

    if caller.id == *target || is_admin_exact(caller.role) {
        return Ok(caller);
    }

    let decision = explain(caller.role, Role::Admin);
    tracing::info!(
        user_id = %caller.id,
        target = %target,
        reason = %decision.reason,
        "profile update denied"
    );
    Err(json_error(
        StatusCode::FORBIDDEN,
        "forbidden",
        format!("only the owner or an administrator may edit this profile; {}", decision.reason),
    ))
}
