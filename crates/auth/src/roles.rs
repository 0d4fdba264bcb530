use core::cmp::Ordering;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a user in the content-management application.
///
/// Roles form a single flat hierarchy: `ADMIN > EDITOR > AUTHOR`. The ordering
/// implemented here follows [`Role::rank`], so `Role::Admin > Role::Editor`
/// holds regardless of declaration order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Editor,
    Author,
}

/// A role name that does not map to any known role.
///
/// This is a configuration/data error, never a policy outcome: callers must
/// deny access and surface it rather than pick a default.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid role '{0}'")]
pub struct InvalidRoleError(pub String);

impl Role {
    /// Every role, highest rank first.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Editor, Role::Author];

    /// Role assigned to every new profile.
    pub const DEFAULT: Role = Role::Author;

    /// Numeric rank used for hierarchy comparisons.
    pub const fn rank(self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::Editor => 2,
            Role::Author => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Editor => "EDITOR",
            Role::Author => "AUTHOR",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::Admin => "Full administrative access, including user management",
            Role::Editor => "Can review and publish content written by others",
            Role::Author => "Can write and manage their own content",
        }
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = InvalidRoleError;

    /// Parses the canonical upper-case names. Matching is case-insensitive so
    /// query strings like `?role=editor` work, but nothing else is guessed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| InvalidRoleError(s.to_string()))
    }
}
