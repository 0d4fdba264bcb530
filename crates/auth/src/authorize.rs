use serde::Serialize;
use thiserror::Error;

use crate::roles::{InvalidRoleError, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{actual}' is below required role '{required}'")]
    Forbidden { required: Role, actual: Role },

    #[error(transparent)]
    InvalidRole(#[from] InvalidRoleError),
}

/// Hierarchy check: does `subject` hold at least `required`?
///
/// - No IO
/// - No panics
/// - Total over the defined roles
pub fn is_authorized(subject: Role, required: Role) -> bool {
    subject.rank() >= required.rank()
}

/// Exact-match admin check.
///
/// This is deliberately NOT `is_authorized(role, Role::Admin)`; the two
/// coincide today only because ADMIN is the top of the hierarchy.
pub fn is_admin_exact(role: Role) -> bool {
    role == Role::Admin
}

/// Hierarchy check against EDITOR.
pub fn at_least_editor(role: Role) -> bool {
    is_authorized(role, Role::Editor)
}

/// Result-returning form of [`is_authorized`] for use with `?`.
pub fn authorize(subject: Role, required: Role) -> Result<(), AuthzError> {
    if is_authorized(subject, required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            required,
            actual: subject,
        })
    }
}

/// Authorize from raw role names (database column, query parameter).
///
/// An unmapped name on either side fails with [`AuthzError::InvalidRole`];
/// there is no default-permit or default-deny fallback.
pub fn authorize_named(subject: &str, required: &str) -> Result<(), AuthzError> {
    let subject: Role = subject.parse()?;
    let required: Role = required.parse()?;
    authorize(subject, required)
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of a role decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationExplanation {
    pub subject_role: Role,
    pub subject_rank: u8,
    pub required_role: Role,
    pub required_rank: u8,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
}

/// Explain why a role decision was made (or would be made).
pub fn explain(subject: Role, required: Role) -> AuthorizationExplanation {
    let granted = is_authorized(subject, required);
    let reason = if subject == required {
        format!("role '{subject}' matches the required role exactly")
    } else if granted {
        format!(
            "role '{subject}' (rank {}) outranks required role '{required}' (rank {})",
            subject.rank(),
            required.rank()
        )
    } else {
        format!(
            "role '{subject}' (rank {}) is below required role '{required}' (rank {})",
            subject.rank(),
            required.rank()
        )
    };

    AuthorizationExplanation {
        subject_role: subject,
        subject_rank: subject.rank(),
        required_role: required,
        required_rank: required.rank(),
        granted,
        reason,
    }
}

/// Role definition (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub name: Role,
    pub rank: u8,
    pub description: &'static str,
    /// Roles this role satisfies when used as a requirement.
    pub satisfies: Vec<Role>,
}

/// The full role table, highest rank first.
pub fn role_registry() -> Vec<RoleDefinition> {
    Role::ALL
        .into_iter()
        .map(|role| RoleDefinition {
            name: role,
            rank: role.rank(),
            description: role.description(),
            satisfies: Role::ALL
                .into_iter()
                .filter(|required| is_authorized(role, *required))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Admin), Just(Role::Editor), Just(Role::Author)]
    }

    #[test]
    fn hierarchy_examples() {
        assert!(is_authorized(Role::Admin, Role::Editor));
        assert!(!is_authorized(Role::Author, Role::Editor));
        assert!(is_authorized(Role::Editor, Role::Editor));
        assert!(!is_authorized(Role::Editor, Role::Admin));
    }

    #[test]
    fn admin_check_is_exact_match() {
        assert!(is_admin_exact(Role::Admin));
        assert!(!is_admin_exact(Role::Editor));
        assert!(!is_admin_exact(Role::Author));
    }

    #[test]
    fn editor_check_is_hierarchical() {
        assert!(at_least_editor(Role::Admin));
        assert!(at_least_editor(Role::Editor));
        assert!(!at_least_editor(Role::Author));
    }

    #[test]
    fn authorize_reports_both_roles() {
        let err = authorize(Role::Author, Role::Admin).unwrap_err();
        assert_eq!(
            err,
            AuthzError::Forbidden {
                required: Role::Admin,
                actual: Role::Author
            }
        );
        assert!(err.to_string().contains("AUTHOR"));
    }

    #[test]
    fn unknown_role_names_fail_instead_of_defaulting() {
        let err = authorize_named("ADMIN", "OWNER").unwrap_err();
        assert!(matches!(err, AuthzError::InvalidRole(InvalidRoleError(ref r)) if r == "OWNER"));

        let err = authorize_named("guest", "AUTHOR").unwrap_err();
        assert!(matches!(err, AuthzError::InvalidRole(_)));

        assert!(authorize_named("EDITOR", "AUTHOR").is_ok());
    }

    #[test]
    fn explanation_matches_decision() {
        let e = explain(Role::Author, Role::Editor);
        assert!(!e.granted);
        assert_eq!((e.subject_rank, e.required_rank), (1, 2));
        assert!(e.reason.contains("below"));

        let e = explain(Role::Editor, Role::Editor);
        assert!(e.granted);
        assert!(e.reason.contains("exactly"));
    }

    #[test]
    fn registry_lists_roles_with_what_they_satisfy() {
        let registry = role_registry();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry[0].name, Role::Admin);
        assert_eq!(registry[0].satisfies, Role::ALL.to_vec());
        assert_eq!(registry[2].satisfies, vec![Role::Author]);
    }

    proptest! {
        #[test]
        fn author_is_the_floor(role in any_role()) {
            prop_assert!(is_authorized(role, Role::Author));
        }

        #[test]
        fn reflexive(role in any_role()) {
            prop_assert!(is_authorized(role, role));
        }

        #[test]
        fn transitive(a in any_role(), b in any_role(), c in any_role()) {
            if is_authorized(a, b) && is_authorized(b, c) {
                prop_assert!(is_authorized(a, c));
            }
        }

        #[test]
        fn agrees_with_total_order(a in any_role(), b in any_role()) {
            prop_assert_eq!(is_authorized(a, b), a >= b);
        }

        #[test]
        fn named_form_agrees_with_typed_form(a in any_role(), b in any_role()) {
            prop_assert_eq!(authorize_named(a.as_str(), b.as_str()).is_ok(), is_authorized(a, b));
        }
    }
}
