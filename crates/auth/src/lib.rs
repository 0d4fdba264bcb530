//! `quill-auth`: role policy, session and profile types.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod roles;
pub mod session;
pub mod user;

pub use authorize::{
    AuthorizationExplanation, AuthzError, RoleDefinition, at_least_editor, authorize,
    authorize_named, explain, is_admin_exact, is_authorized, role_registry,
};
pub use roles::{InvalidRoleError, Role};
pub use session::{
    AccessToken, Session, SessionChange, SessionEvent, SessionSubject, SessionValidationError,
    validate_session,
};
pub use user::{NewProfile, ProfileUpdate, UserProfile};
