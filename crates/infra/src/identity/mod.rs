//! Identity provider adapter.
//!
//! Credential storage, password hashing, token issuance and reset-email
//! delivery all belong to the external provider. This module only states the
//! operations the rest of the system consumes and ships two implementations:
//! an in-memory provider for tests/dev and a GoTrue-compatible REST client.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;

use quill_auth::{AccessToken, Session, SessionChange, SessionSubject};

pub mod gotrue;
pub mod in_memory;

pub use gotrue::{GoTrueConfig, GoTrueIdentityProvider};
pub use in_memory::{InMemoryIdentityProvider, RecoveryEmail};

/// Generic message shown when the provider could not be reached at all.
pub const PROVIDER_UNAVAILABLE_MESSAGE: &str =
    "Authentication service is unavailable. Please try again.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The provider refused the request. The message is user-facing and is
    /// passed through verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("identity service unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected identity service response: {0}")]
    InvalidResponse(String),
}

impl IdentityError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Message safe to show to the caller.
    pub fn user_message(&self) -> String {
        match self {
            IdentityError::Rejected(msg) => msg.clone(),
            IdentityError::Unavailable(_) | IdentityError::InvalidResponse(_) => {
                PROVIDER_UNAVAILABLE_MESSAGE.to_string()
            }
        }
    }
}

/// Attributes accepted by [`IdentityProvider::update_user`].
#[derive(Clone, Default)]
pub struct UserAttributes {
    pub password: Option<String>,
}

impl UserAttributes {
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
        }
    }
}

impl core::fmt::Debug for UserAttributes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserAttributes")
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Operations consumed from the external identity provider.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a credential record. The returned subject id is stable and is
    /// the join key to the profile row.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SessionSubject, IdentityError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError>;

    async fn sign_out(&self, token: &AccessToken) -> Result<(), IdentityError>;

    /// Resolve a token to its live session. `Ok(None)` for unknown, revoked or
    /// expired tokens.
    async fn get_session(&self, token: &AccessToken) -> Result<Option<Session>, IdentityError>;

    /// Ask the provider to email a reset link pointing at `redirect_to`.
    /// Providers answer the same way whether or not the address is registered.
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityError>;

    /// Update the credential record behind `token` (which may be a recovery
    /// session established through a reset link).
    async fn update_user(
        &self,
        token: &AccessToken,
        attributes: UserAttributes,
    ) -> Result<(), IdentityError>;

    /// Session-change notifications (sign-in, sign-out, refresh, updates).
    /// Dropping the receiver releases the subscription.
    fn on_session_change(&self) -> broadcast::Receiver<SessionChange>;
}

#[async_trait::async_trait]
impl<P> IdentityProvider for Arc<P>
where
    P: IdentityProvider + ?Sized,
{
    async fn sign_up(&self, email: &str, password: &str) -> Result<SessionSubject, IdentityError> {
        (**self).sign_up(email, password).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        (**self).sign_in_with_password(email, password).await
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), IdentityError> {
        (**self).sign_out(token).await
    }

    async fn get_session(&self, token: &AccessToken) -> Result<Option<Session>, IdentityError> {
        (**self).get_session(token).await
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityError> {
        (**self).reset_password_for_email(email, redirect_to).await
    }

    async fn update_user(
        &self,
        token: &AccessToken,
        attributes: UserAttributes,
    ) -> Result<(), IdentityError> {
        (**self).update_user(token, attributes).await
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionChange> {
        (**self).on_session_change()
    }
}
