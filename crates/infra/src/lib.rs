//! Infrastructure layer: identity provider, profile storage, and the action
//! coordinator that spans both.

pub mod auth_actions;
pub mod identity;
pub mod profile_store;
pub mod view;

pub use auth_actions::{ActionError, ActionResult, AuthActions, ErrorOrigin, RegistrationOutcome};
pub use identity::{
    GoTrueConfig, GoTrueIdentityProvider, IdentityError, IdentityProvider, InMemoryIdentityProvider,
    UserAttributes,
};
pub use profile_store::{
    InMemoryProfileStore, PostgresProfileStore, ProfileStore, ProfileStoreError,
};
pub use view::{LoggingInvalidator, RecordingInvalidator, ViewInvalidator, ViewScope};
