use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use quill_auth::{NewProfile, ProfileUpdate, UserProfile};
use quill_core::UserId;

use super::{ProfileStore, ProfileStoreError};

/// In-memory profile store for tests/dev.
///
/// `set_unavailable(true)` makes every call fail like a lost database
/// connection, which is how tests reach the orphaned-identity state.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    rows: RwLock<HashMap<UserId, UserProfile>>,
    unavailable: AtomicBool,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert or replace a row directly, bypassing uniqueness checks.
    /// Used to seed fixtures such as an initial admin.
    pub fn seed(&self, profile: UserProfile) {
        if let Ok(mut rows) = self.rows.write() {
            rows.insert(profile.id, profile);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), ProfileStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProfileStoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

fn poisoned() -> ProfileStoreError {
    ProfileStoreError::Unavailable("lock poisoned".to_string())
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn create(&self, profile: NewProfile) -> Result<UserProfile, ProfileStoreError> {
        self.check_available()?;
        let mut rows = self.rows.write().map_err(|_| poisoned())?;

        if rows.contains_key(&profile.id) {
            return Err(ProfileStoreError::Conflict(format!("id {} already exists", profile.id)));
        }
        if rows.values().any(|r| r.email == profile.email) {
            return Err(ProfileStoreError::Conflict("email already exists".to_string()));
        }

        let row = profile.into_profile(Utc::now());
        rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, ProfileStoreError> {
        self.check_available()?;
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(id).cloned())
    }

    async fn update(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, ProfileStoreError> {
        self.check_available()?;
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let update = update.normalized();

        if let Some(email) = &update.email {
            if rows.values().any(|r| r.id != *id && &r.email == email) {
                return Err(ProfileStoreError::Conflict("email already exists".to_string()));
            }
        }

        let row = rows.get_mut(id).ok_or(ProfileStoreError::NotFound)?;
        update.apply_to(row, Utc::now());
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_auth::Role;

    fn new_profile(email: &str) -> NewProfile {
        NewProfile::for_registration(UserId::new(), email, Some("Ada".to_string()))
    }

    #[tokio::test]
    async fn create_then_find() {
        let store = InMemoryProfileStore::new();
        let created = store.create(new_profile("ada@example.com")).await.unwrap();
        assert_eq!(created.role, Role::Author);
        assert_eq!(created.created_at, created.updated_at);

        let found = store.find_by_id(&created.id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn at_most_one_row_per_id() {
        let store = InMemoryProfileStore::new();
        let p = new_profile("ada@example.com");
        store.create(p.clone()).await.unwrap();

        let mut dup = p;
        dup.email = "other@example.com".to_string();
        let err = store.create(dup).await.unwrap_err();
        assert!(matches!(err, ProfileStoreError::Conflict(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn email_is_unique() {
        let store = InMemoryProfileStore::new();
        store.create(new_profile("ada@example.com")).await.unwrap();
        let err = store.create(new_profile("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, ProfileStoreError::Conflict(_)));

        let other = store.create(new_profile("grace@example.com")).await.unwrap();
        let err = store
            .update(&other.id, ProfileUpdate::default().email("ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileStoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn partial_update_touches_only_supplied_fields() {
        let store = InMemoryProfileStore::new();
        let created = store.create(new_profile("ada@example.com")).await.unwrap();

        let updated = store
            .update(&created.id, ProfileUpdate::default().name("Countess"))
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Countess"));
        assert_eq!(updated.email, "ada@example.com");

        let unchanged = store.update(&created.id, ProfileUpdate::default()).await.unwrap();
        assert_eq!(unchanged, updated);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let store = InMemoryProfileStore::new();
        let err = store
            .update(&UserId::new(), ProfileUpdate::default().name("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileStoreError::NotFound));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryProfileStore::new();
        store.set_unavailable(true);
        assert!(store.create(new_profile("ada@example.com")).await.is_err());
        assert!(store.find_by_id(&UserId::new()).await.is_err());
        store.set_unavailable(false);
        assert!(store.find_by_id(&UserId::new()).await.unwrap().is_none());
    }
}
