//! Auth action coordinator.
//!
//! Orchestrates the flows that touch both the identity provider and the
//! profile store, and owns the partial-failure policy between them:
//!
//! ```text
//! register:  provider.sign_up ──ok──▶ profiles.create ──ok──▶ {success}
//!                 │                         │
//!                 └─err─▶ {error: <provider message>}
//!                                           └─err─▶ {error: "Failed to create user profile"}
//!                                                   (identity stays, orphaned)
//! ```
//!
//! Every action returns a value; nothing here panics or propagates an error
//! to the caller. Storage errors are logged and replaced by fixed messages.

use std::sync::Arc;

use chrono::Utc;

use quill_auth::{
    AccessToken, InvalidRoleError, NewProfile, ProfileUpdate, Role, UserProfile, at_least_editor,
    is_admin_exact, is_authorized, validate_session,
};
use quill_core::UserId;

use crate::identity::{IdentityProvider, UserAttributes};
use crate::profile_store::{ProfileStore, ProfileStoreError};
use crate::view::{ViewInvalidator, ViewScope};

mod result;

pub use result::{ActionError, ActionResult, ErrorOrigin, RegistrationOutcome};

pub const PROFILE_CREATE_FAILED: &str = "Failed to create user profile";
pub const RESET_EMAIL_SENT: &str = "Password reset email sent. Check your inbox.";
pub const PASSWORD_UPDATED: &str = "Password updated successfully";
pub const PROFILE_UPDATE_FAILED: &str = "Failed to update profile";
pub const USER_CREATE_FAILED: &str = "Failed to create user";
pub const SESSION_MISSING: &str = "Auth session missing!";

/// Landing area after a successful login.
pub const LOGIN_REDIRECT: &str = "/admin";
/// Where logout sends the caller.
pub const LOGOUT_REDIRECT: &str = "/login";
/// Path appended to the public base URL for reset links.
pub const RESET_CALLBACK_PATH: &str = "/reset-password";

#[derive(Clone)]
pub struct AuthActions {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    views: Arc<dyn ViewInvalidator>,
    reset_redirect: String,
}

impl AuthActions {
    /// `app_url` is the public base URL; reset links point at
    /// `{app_url}/reset-password`.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        views: Arc<dyn ViewInvalidator>,
        app_url: &str,
    ) -> Self {
        Self {
            identity,
            profiles,
            views,
            reset_redirect: format!("{}{RESET_CALLBACK_PATH}", app_url.trim_end_matches('/')),
        }
    }

    pub fn reset_redirect(&self) -> &str {
        &self.reset_redirect
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutating flows
    // ─────────────────────────────────────────────────────────────────────

    /// Run the registration saga and report exactly how far it got.
    pub async fn register_detailed(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> RegistrationOutcome {
        let email = email.trim();
        let subject = match self.identity.sign_up(email, password).await {
            Ok(subject) => subject,
            Err(err) => {
                tracing::info!(error = %err, "sign-up rejected by identity provider");
                return RegistrationOutcome::IdentityRejected(err);
            }
        };

        let name = name.filter(|n| !n.trim().is_empty());
        let profile = NewProfile::for_registration(subject.id, email, name);

        match self.profiles.create(profile).await {
            Ok(profile) => {
                tracing::info!(user_id = %profile.id, "user registered");
                RegistrationOutcome::Complete(profile)
            }
            Err(error) => {
                tracing::error!(
                    user_id = %subject.id,
                    error = %error,
                    "profile creation failed after sign-up; identity left without profile"
                );
                RegistrationOutcome::OrphanedIdentity { subject, error }
            }
        }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> ActionResult {
        match self.register_detailed(email, password, name).await {
            RegistrationOutcome::Complete(_) => ActionResult::Success,
            RegistrationOutcome::IdentityRejected(err) => ActionError::provider(&err).into(),
            RegistrationOutcome::OrphanedIdentity { .. } => {
                ActionError::storage(PROFILE_CREATE_FAILED).into()
            }
        }
    }

    /// Verify credentials and hand the session back with a redirect to the
    /// landing area. Profile existence is not checked here.
    pub async fn login(&self, email: &str, password: &str) -> ActionResult {
        match self.identity.sign_in_with_password(email, password).await {
            Ok(session) => {
                tracing::info!(user_id = %session.subject_id(), "user signed in");
                self.views.invalidate(&ViewScope::root_layout());
                ActionResult::redirect(LOGIN_REDIRECT, Some(session))
            }
            Err(err) => {
                tracing::info!(error = %err, "sign-in rejected");
                ActionError::provider(&err).into()
            }
        }
    }

    pub async fn logout(&self, token: Option<&AccessToken>) -> ActionResult {
        let Some(token) = token else {
            return ActionError::new(ErrorOrigin::Unauthenticated, SESSION_MISSING).into();
        };

        match self.identity.sign_out(token).await {
            Ok(()) => {
                tracing::info!("user signed out");
                self.views.invalidate(&ViewScope::root_layout());
                ActionResult::redirect(LOGOUT_REDIRECT, None)
            }
            Err(err) => {
                tracing::warn!(error = %err, "sign-out failed");
                ActionError::provider(&err).into()
            }
        }
    }

    /// Same answer whether or not `email` is registered.
    pub async fn request_password_reset(&self, email: &str) -> ActionResult {
        match self
            .identity
            .reset_password_for_email(email.trim(), &self.reset_redirect)
            .await
        {
            Ok(()) => ActionResult::message(RESET_EMAIL_SENT),
            Err(err) => {
                tracing::warn!(error = %err, "password reset request failed");
                ActionError::provider(&err).into()
            }
        }
    }

    /// Set a new password using the recovery session from a reset link.
    /// The profile row is not touched.
    pub async fn complete_password_reset(
        &self,
        reset_session: Option<&AccessToken>,
        new_password: &str,
    ) -> ActionResult {
        let Some(token) = reset_session else {
            return ActionError::new(ErrorOrigin::Unauthenticated, SESSION_MISSING).into();
        };

        match self
            .identity
            .update_user(token, UserAttributes::password(new_password))
            .await
        {
            Ok(()) => ActionResult::message(PASSWORD_UPDATED),
            Err(err) => {
                tracing::info!(error = %err, "password update rejected");
                ActionError::provider(&err).into()
            }
        }
    }

    /// Create a profile row for an existing identity. The role is always the
    /// default; callers cannot pick one.
    pub async fn create_profile(
        &self,
        id: UserId,
        email: &str,
        name: Option<String>,
    ) -> Result<UserProfile, ActionError> {
        let name = name.filter(|n| !n.trim().is_empty());
        self.profiles
            .create(NewProfile::for_registration(id, email.trim(), name))
            .await
            .map_err(|err| {
                tracing::error!(user_id = %id, error = %err, "profile creation failed");
                ActionError::storage(USER_CREATE_FAILED)
            })
    }

    /// Partial update; then the profile page is invalidated.
    pub async fn update_profile(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, ActionError> {
        match self.profiles.update(id, update.normalized()).await {
            Ok(profile) => {
                tracing::info!(user_id = %id, "profile updated");
                self.views.invalidate(&ViewScope::profile_page());
                Ok(profile)
            }
            Err(ProfileStoreError::NotFound) => {
                Err(ActionError::new(ErrorOrigin::NotFound, PROFILE_UPDATE_FAILED))
            }
            Err(err) => {
                tracing::error!(user_id = %id, error = %err, "profile update failed");
                Err(ActionError::storage(PROFILE_UPDATE_FAILED))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Profile behind a session, or `None` when there is no live session or
    /// the identity has no profile row.
    pub async fn current_user(&self, token: Option<&AccessToken>) -> Option<UserProfile> {
        let token = token?;
        let session = match self.identity.get_session(token).await {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "session lookup failed");
                return None;
            }
        };

        if let Err(err) = validate_session(&session, Utc::now()) {
            tracing::debug!(error = %err, "ignoring unusable session");
            return None;
        }

        let profile = self.user_by_id(&session.subject_id()).await;
        if profile.is_none() {
            tracing::debug!(
                user_id = %session.subject_id(),
                "session has no profile; treating as signed out"
            );
        }
        profile
    }

    pub async fn user_by_id(&self, id: &UserId) -> Option<UserProfile> {
        match self.profiles.find_by_id(id).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::error!(user_id = %id, error = %err, "profile lookup failed");
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Role checks
    // ─────────────────────────────────────────────────────────────────────

    pub async fn check_user_role(&self, token: Option<&AccessToken>, required: Role) -> bool {
        self.current_user(token)
            .await
            .is_some_and(|user| is_authorized(user.role, required))
    }

    /// Like [`check_user_role`](Self::check_user_role) with the required
    /// role given by name. Unknown names are an error, not a denial.
    pub async fn check_user_role_named(
        &self,
        token: Option<&AccessToken>,
        required: &str,
    ) -> Result<bool, InvalidRoleError> {
        let required: Role = required.parse()?;
        Ok(self.check_user_role(token, required).await)
    }

    pub async fn is_admin(&self, token: Option<&AccessToken>) -> bool {
        self.current_user(token)
            .await
            .is_some_and(|user| is_admin_exact(user.role))
    }

    pub async fn is_editor_or_admin(&self, token: Option<&AccessToken>) -> bool {
        self.current_user(token)
            .await
            .is_some_and(|user| at_least_editor(user.role))
    }
}
