//! Postgres-backed profile store.
//!
//! ## Table
//!
//! One row per identity subject id in `profiles`. Uniqueness of `id` and
//! `email` is enforced by the engine; violations surface as
//! `ProfileStoreError::Conflict`.
//!
//! ## Roles
//!
//! Roles are stored as text. A value that does not parse back into a role is a
//! data error and is reported, never mapped to a default.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use quill_auth::{NewProfile, ProfileUpdate, Role, UserProfile};
use quill_core::UserId;

use super::{ProfileStore, ProfileStoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    id          UUID PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    name        TEXT NULL,
    role        TEXT NOT NULL DEFAULT 'AUTHOR',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

pub struct PostgresProfileStore {
    pool: Arc<PgPool>,
}

impl PostgresProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect and make sure the `profiles` table exists.
    pub async fn connect(database_url: &str) -> Result<Self, ProfileStoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), ProfileStoreError> {
        sqlx::query(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> ProfileStoreError {
    match err {
        sqlx::Error::RowNotFound => ProfileStoreError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ProfileStoreError::Conflict(db.constraint().unwrap_or("profiles").to_string())
        }
        other => {
            tracing::error!(operation, error = %other, "profile store query failed");
            ProfileStoreError::Unavailable(format!("{operation}: {other}"))
        }
    }
}

fn row_to_profile(row: &PgRow) -> Result<UserProfile, ProfileStoreError> {
    let get_err = |e: sqlx::Error| map_sqlx_error("decode_profile", e);

    let id: uuid::Uuid = row.try_get("id").map_err(get_err)?;
    let role: String = row.try_get("role").map_err(get_err)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(get_err)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(get_err)?;

    Ok(UserProfile {
        id: UserId::from_uuid(id),
        email: row.try_get("email").map_err(get_err)?,
        name: row.try_get("name").map_err(get_err)?,
        role: role.parse::<Role>()?,
        created_at,
        updated_at,
    })
}

#[async_trait::async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn create(&self, profile: NewProfile) -> Result<UserProfile, ProfileStoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO profiles (id, email, name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, role, created_at, updated_at
            "#,
        )
        .bind(profile.id.as_uuid())
        .bind(&profile.email)
        .bind(profile.name.as_deref())
        .bind(profile.role.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_profile", e))?;

        row_to_profile(&row)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, ProfileStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, role, created_at, updated_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_profile", e))?;

        row.as_ref().map(row_to_profile).transpose()
    }

    async fn update(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, ProfileStoreError> {
        let update = update.normalized();
        if update.is_empty() {
            return self.find_by_id(id).await?.ok_or(ProfileStoreError::NotFound);
        }

        let row = sqlx::query(
            r#"
            UPDATE profiles
            SET
                name = COALESCE($2::text, name),
                email = COALESCE($3::text, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, name, role, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(update.name.as_deref())
        .bind(update.email.as_deref())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_profile", e))?;

        match row {
            Some(row) => row_to_profile(&row),
            None => Err(ProfileStoreError::NotFound),
        }
    }
}
