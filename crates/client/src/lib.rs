//! `quill-client`: client-side session tracking.
//!
//! The [`SessionObserver`] keeps a "current user" view in step with the
//! identity provider's session notifications. [`ApiClient`] is the HTTP
//! implementation of the two seams it needs.

pub mod api_client;
pub mod session_observer;
pub mod source;

pub use api_client::ApiClient;
pub use session_observer::{CurrentUser, ObserverHandle, SessionObserver};
pub use source::{FetchError, ProfileFetcher, SessionSource};
