//! Local user profile model.
//!
//! The profile is the application-owned half of a user's identity. Its `id`
//! is the identity provider's subject id; nothing else links the two stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quill_core::UserId;

use crate::Role;

/// Profile projection exposed to callers.
///
/// Only these fields ever leave the store; credential data lives with the
/// identity provider and has no field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a profile row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

impl NewProfile {
    /// A profile for a freshly registered identity. The role is always the
    /// default; callers cannot choose it at sign-up.
    pub fn for_registration(id: UserId, email: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id,
            email: email.into(),
            name,
            role: Role::DEFAULT,
        }
    }

    pub fn into_profile(self, now: DateTime<Utc>) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email,
            name: self.name,
            role: self.role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update. Absent fields are left untouched, never nulled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Drop empty-string fields; a blank form field means "not supplied".
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.filter(|n| !n.is_empty()),
            email: self.email.filter(|e| !e.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }

    /// Apply to a profile in place. Returns whether anything was written;
    /// `updated_at` only moves when something was.
    pub fn apply_to(&self, profile: &mut UserProfile, now: DateTime<Utc>) -> bool {
        let update = self.clone().normalized();
        if update.is_empty() {
            return false;
        }
        if let Some(name) = update.name {
            profile.name = Some(name);
        }
        if let Some(email) = update.email {
            profile.email = email;
        }
        profile.updated_at = now;
        true
    }
}
