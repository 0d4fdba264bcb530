use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;

use quill_auth::{Session, SessionChange, UserProfile};
use quill_core::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The server refused the request with a user-facing message.
    #[error("{0}")]
    Rejected(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Where the observer gets sessions from.
#[async_trait::async_trait]
pub trait SessionSource: Send + Sync {
    /// The session already established, if any.
    async fn current_session(&self) -> Result<Option<Session>, FetchError>;

    /// Session-change notifications from now on.
    fn subscribe(&self) -> broadcast::Receiver<SessionChange>;
}

/// Profile read used to refresh the current user.
#[async_trait::async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// `Ok(None)` when no profile exists for `id`.
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<UserProfile>, FetchError>;
}

#[async_trait::async_trait]
impl<S> SessionSource for Arc<S>
where
    S: SessionSource + ?Sized,
{
    async fn current_session(&self) -> Result<Option<Session>, FetchError> {
        (**self).current_session().await
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        (**self).subscribe()
    }
}

#[async_trait::async_trait]
impl<F> ProfileFetcher for Arc<F>
where
    F: ProfileFetcher + ?Sized,
{
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<UserProfile>, FetchError> {
        (**self).fetch_profile(id).await
    }
}
