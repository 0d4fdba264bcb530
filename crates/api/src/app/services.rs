//! Backend selection and wiring.
//!
//! `DATABASE_URL` picks Postgres for profiles, `IDENTITY_URL` picks the
//! GoTrue client for identity. Either falls back to its in-memory
//! implementation when unset.

use std::sync::Arc;

use anyhow::Context;

use quill_infra::{
    AuthActions, GoTrueIdentityProvider, IdentityProvider, InMemoryIdentityProvider,
    InMemoryProfileStore,
    LoggingInvalidator, PostgresProfileStore, ProfileStore,
};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppServices {
    pub actions: AuthActions,
}

impl AppServices {
    pub fn new(actions: AuthActions) -> Self {
        Self { actions }
    }
}

/// In-memory services with direct handles on both backends.
pub struct InMemoryServices {
    pub services: AppServices,
    pub identity: Arc<InMemoryIdentityProvider>,
    pub profiles: Arc<InMemoryProfileStore>,
}

pub fn in_memory_services(app_url: &str) -> InMemoryServices {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let profiles = Arc::new(InMemoryProfileStore::new());
    let actions = AuthActions::new(
        identity.clone(),
        profiles.clone(),
        Arc::new(LoggingInvalidator),
        app_url,
    );

    InMemoryServices {
        services: AppServices::new(actions),
        identity,
        profiles,
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let identity: Arc<dyn IdentityProvider> = match &config.identity {
        Some(gotrue) => {
            tracing::info!(base_url = %gotrue.base_url, "using GoTrue identity provider");
            Arc::new(GoTrueIdentityProvider::new(gotrue.clone()))
        }
        None => {
            tracing::warn!("no identity provider configured; using in-memory provider");
            Arc::new(InMemoryIdentityProvider::new())
        }
    };

    let profiles: Arc<dyn ProfileStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresProfileStore::connect(url)
                .await
                .context("failed to connect profile store")?;
            tracing::info!("using postgres profile store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory profile store");
            Arc::new(InMemoryProfileStore::new())
        }
    };

    Ok(AppServices::new(AuthActions::new(
        identity,
        profiles,
        Arc::new(LoggingInvalidator),
        &config.app_url,
    )))
}
