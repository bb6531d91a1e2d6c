//! Application state shared across handlers.

use std::sync::Arc;

use thiserror::Error;

use crate::config::{AdminConfig, ConfigError, StoreKind};
use crate::db::{self, MemoryStore, PgStore, Store};
use crate::services::{CatalogService, CustomerService, OrderService};

/// Errors raised while building the state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    store: Arc<dyn Store>,
}

impl AppState {
    /// Build state around an existing store.
    #[must_use]
    pub fn new(config: AdminConfig, store: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Open the store selected by `config.store`.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the database URL is missing or the pool
    /// cannot connect.
    pub async fn connect(config: AdminConfig) -> Result<Self, StateError> {
        let store: Arc<dyn Store> = match config.store {
            StoreKind::Postgres => {
                let url = config.database_url.as_ref().ok_or_else(|| {
                    ConfigError::MissingEnvVar("SHOPDESK_DATABASE_URL".to_string())
                })?;
                let pool = db::create_pool(url).await?;
                tracing::info!("Database pool created");
                Arc::new(PgStore::new(pool))
            }
            StoreKind::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(config, store))
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.store())
    }

    #[must_use]
    pub fn customers(&self) -> CustomerService<'_> {
        CustomerService::new(self.store())
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("backend", &self.inner.store.backend())
            .finish()
    }
}
