//! Profile store adapter: CRUD against the local profile table.
//!
//! Rows are keyed by the identity provider's subject id. The store never
//! deletes a profile; removal is out of scope for this system.

use std::sync::Arc;

use thiserror::Error;

use quill_auth::{InvalidRoleError, NewProfile, ProfileUpdate, UserProfile};
use quill_core::UserId;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryProfileStore;
pub use postgres::PostgresProfileStore;

#[derive(Debug, Error)]
pub enum ProfileStoreError {
    /// Unique constraint violation (duplicate id or email).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("profile not found")]
    NotFound,

    /// A stored role value does not map to a known role.
    #[error("corrupt profile row: {0}")]
    InvalidRole(#[from] InvalidRoleError),

    /// Connectivity or engine failure.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage operations the rest of the system relies on.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert a new row. Fails with `Conflict` if the id or email exists.
    async fn create(&self, profile: NewProfile) -> Result<UserProfile, ProfileStoreError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, ProfileStoreError>;

    /// Write only the supplied fields. An empty update returns the row as is.
    async fn update(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, ProfileStoreError>;
}

#[async_trait::async_trait]
impl<S> ProfileStore for Arc<S>
where
    S: ProfileStore + ?Sized,
{
    async fn create(&self, profile: NewProfile) -> Result<UserProfile, ProfileStoreError> {
        (**self).create(profile).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, ProfileStoreError> {
        (**self).find_by_id(id).await
    }

    async fn update(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, ProfileStoreError> {
        (**self).update(id, update).await
    }
}
