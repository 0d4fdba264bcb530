use serde::ser::{Serialize, SerializeMap, Serializer};

use quill_auth::{Session, SessionSubject, UserProfile};

use crate::identity::IdentityError;
use crate::profile_store::ProfileStoreError;

/// Where a failed action broke down.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// The identity provider refused or could not be reached.
    Provider,
    /// The profile store failed. Details are logged, never returned.
    Storage,
    /// The action needs a session and none was supplied.
    Unauthenticated,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    pub message: String,
    pub origin: ErrorOrigin,
}

impl ActionError {
    pub fn new(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin,
        }
    }

    pub fn provider(err: &IdentityError) -> Self {
        Self::new(ErrorOrigin::Provider, err.user_message())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorOrigin::Storage, message)
    }
}

impl core::fmt::Display for ActionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Tagged outcome of a coordinator action.
///
/// Serializes to exactly one of the shapes callers key on:
///
/// ```text
/// {"success": true}
/// {"success": true, "message": "..."}
/// {"success": true, "redirect": "/admin", "session": {...}}
/// {"error": "..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Success,
    SuccessWithMessage(String),
    /// Control moves elsewhere; `session` is handed back on sign-in.
    Redirect {
        location: String,
        session: Option<Session>,
    },
    Error(ActionError),
}

impl ActionResult {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::SuccessWithMessage(msg.into())
    }

    pub fn redirect(location: impl Into<String>, session: Option<Session>) -> Self {
        Self::Redirect {
            location: location.into(),
            session,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, ActionResult::Error(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ActionResult::Error(e) => Some(&e.message),
            _ => None,
        }
    }

    pub fn success_message(&self) -> Option<&str> {
        match self {
            ActionResult::SuccessWithMessage(m) => Some(m),
            _ => None,
        }
    }
}

impl From<ActionError> for ActionResult {
    fn from(err: ActionError) -> Self {
        ActionResult::Error(err)
    }
}

impl Serialize for ActionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ActionResult::Success => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("success", &true)?;
                map.end()
            }
            ActionResult::SuccessWithMessage(message) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("message", message)?;
                map.end()
            }
            ActionResult::Redirect { location, session } => {
                let len = if session.is_some() { 3 } else { 2 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("redirect", location)?;
                if let Some(session) = session {
                    map.serialize_entry("session", session)?;
                }
                map.end()
            }
            ActionResult::Error(err) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", &err.message)?;
                map.end()
            }
        }
    }
}

/// Outcome of the two-step registration saga.
///
/// Step one creates the identity record, step two the profile row. The steps
/// are not atomic and nothing is compensated, so the in-between state is an
/// outcome of its own.
#[derive(Debug)]
pub enum RegistrationOutcome {
    Complete(UserProfile),
    /// The provider refused the sign-up; nothing was written.
    IdentityRejected(IdentityError),
    /// The identity exists but its profile row could not be written. The
    /// subject will read as signed out until a profile is created for it.
    OrphanedIdentity {
        subject: SessionSubject,
        error: ProfileStoreError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_auth::AccessToken;
    use quill_core::UserId;
    use serde_json::json;

    #[test]
    fn success_shapes() {
        assert_eq!(serde_json::to_value(ActionResult::Success).unwrap(), json!({"success": true}));
        assert_eq!(
            serde_json::to_value(ActionResult::message("done")).unwrap(),
            json!({"success": true, "message": "done"})
        );
        assert_eq!(
            serde_json::to_value(ActionResult::redirect("/login", None)).unwrap(),
            json!({"success": true, "redirect": "/login"})
        );
    }

    #[test]
    fn redirect_carries_session() {
        let session = Session {
            access_token: AccessToken::new("tok"),
            user: SessionSubject {
                id: UserId::new(),
                email: "ada@example.com".to_string(),
            },
            expires_at: None,
        };
        let v = serde_json::to_value(ActionResult::redirect("/admin", Some(session))).unwrap();
        assert_eq!(v["redirect"], "/admin");
        assert_eq!(v["session"]["access_token"], "tok");
    }

    #[test]
    fn errors_only_expose_the_message() {
        let r = ActionResult::from(ActionError::storage("Failed to create user profile"));
        assert!(!r.is_success());
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"error": "Failed to create user profile"})
        );
    }
}
