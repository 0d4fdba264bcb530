use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use quill_core::UserId;

/// Opaque bearer token issued by the identity provider.
///
/// The token format belongs to the provider; this crate only carries it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// The authenticated subject of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSubject {
    /// Subject id; equal to the profile row id.
    pub id: UserId,
    pub email: String,
}

/// A provider session, as observed by this system (never persisted here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: AccessToken,
    pub user: SessionSubject,
    /// `None` when the provider did not report an expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn subject_id(&self) -> UserId {
        self.user.id
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionValidationError {
    #[error("session has expired")]
    Expired,

    #[error("session has an empty access token")]
    EmptyToken,
}

/// Deterministically validate a session's shape and time window.
///
/// Token verification is the provider's job; this only rejects sessions that
/// are unusable on their face.
pub fn validate_session(
    session: &Session,
    now: DateTime<Utc>,
) -> Result<(), SessionValidationError> {
    if session.access_token.as_str().trim().is_empty() {
        return Err(SessionValidationError::EmptyToken);
    }
    if session.is_expired(now) {
        return Err(SessionValidationError::Expired);
    }
    Ok(())
}

/// Kind of session transition pushed by the provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// A session-change notification.
///
/// `session` is `None` exactly when the change leaves no active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionChange {
    pub event: SessionEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    pub fn signed_in(session: Session) -> Self {
        Self {
            event: SessionEvent::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            event: SessionEvent::SignedOut,
            session: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: Option<DateTime<Utc>>) -> Session {
        Session {
            access_token: AccessToken::new("tok"),
            user: SessionSubject {
                id: UserId::new(),
                email: "ada@example.com".to_string(),
            },
            expires_at,
        }
    }

    #[test]
    fn session_without_expiry_never_expires() {
        let s = session(None);
        assert!(validate_session(&s, Utc::now()).is_ok());
    }

    #[test]
    fn expired_session_is_rejected() {
        let now = Utc::now();
        let s = session(Some(now - Duration::seconds(1)));
        assert_eq!(validate_session(&s, now), Err(SessionValidationError::Expired));

        let s = session(Some(now));
        assert!(s.is_expired(now));
    }

    #[test]
    fn blank_token_is_rejected() {
        let mut s = session(None);
        s.access_token = AccessToken::new("  ");
        assert_eq!(validate_session(&s, Utc::now()), Err(SessionValidationError::EmptyToken));
    }

    #[test]
    fn token_is_redacted_in_debug_output() {
        let s = session(None);
        let rendered = format!("{s:?}");
        assert!(!rendered.contains("\"tok\""));
        assert!(rendered.contains("AccessToken(***)"));
    }
}
