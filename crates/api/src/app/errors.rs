use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use quill_infra::{ActionError, ActionResult, ErrorOrigin};

fn status_for(origin: ErrorOrigin) -> StatusCode {
    match origin {
        ErrorOrigin::Provider => StatusCode::BAD_REQUEST,
        ErrorOrigin::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorOrigin::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorOrigin::NotFound => StatusCode::NOT_FOUND,
    }
}

/// Render a coordinator result with its own body shape.
pub fn action_result_response(result: ActionResult) -> axum::response::Response {
    let status = match &result {
        ActionResult::Error(err) => status_for(err.origin),
        _ => StatusCode::OK,
    };
    (status, axum::Json(result)).into_response()
}

pub fn action_error_response(code: &'static str, err: ActionError) -> axum::response::Response {
    json_error(status_for(err.origin), code, err.message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_map_to_statuses() {
        assert_eq!(status_for(ErrorOrigin::Provider), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorOrigin::Storage), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ErrorOrigin::Unauthenticated), StatusCode::UNAUTHORIZED);

        let resp =
            action_result_response(ActionError::storage("Failed to create user profile").into());
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(action_result_response(ActionResult::Success).status(), StatusCode::OK);
    }
}
