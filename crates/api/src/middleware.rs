use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use quill_auth::AccessToken;

use crate::context::SessionContext;

/// Attach a [`SessionContext`] to every request.
///
/// No `Authorization` header means an anonymous caller. A header that is
/// present but not a usable bearer token is rejected outright.
pub async fn session_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let context = match extract_bearer(req.headers())? {
        Some(token) => SessionContext::with_token(AccessToken::new(token)),
        None => SessionContext::anonymous(),
    };

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, StatusCode> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?
        .trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(Some(token))
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(extract_bearer(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn bearer_token_is_trimmed() {
        assert_eq!(extract_bearer(&headers("Bearer  abc ")), Ok(Some("abc")));
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert_eq!(extract_bearer(&headers("Basic abc")), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract_bearer(&headers("Bearer ")), Err(StatusCode::UNAUTHORIZED));
    }
}
