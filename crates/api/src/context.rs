use quill_auth::AccessToken;

/// Session context for a request.
///
/// Carries the caller's bearer token when one was sent. Resolving it to a
/// user is left to the handlers, since most routes work for anonymous
/// callers too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    token: Option<AccessToken>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self { token: Some(token) }
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }
}
