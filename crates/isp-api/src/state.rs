//! # Application State
//!
//! Shared state passed to all route handlers via the `State` extractor. It
//! owns the service graph and, when running on Postgres, the pool (used by
//! the readiness probe). Nothing here is global: tests build as many
//! independent states as they like.

use std::sync::Arc;

use isp_core::{RandomTokenSource, TokenSource};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;

use crate::memory::MemoryStore;
use crate::repository::Repositories;
use crate::service::Services;

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    /// Present when storage is Postgres.
    pub db_pool: Option<PgPool>,
    /// Present when the Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("db_pool", &self.db_pool.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build a state over arbitrary repositories.
    pub fn new(repos: Repositories, token_source: Arc<dyn TokenSource>) -> Self {
        Self {
            services: Arc::new(Services::new(repos, token_source)),
            db_pool: None,
            metrics: None,
        }
    }

    /// A fresh, empty in-memory backend.
    pub fn in_memory() -> Self {
        Self::with_memory_store(&MemoryStore::new())
    }

    /// State over an existing in-memory store, sharing its tables.
    pub fn with_memory_store(store: &MemoryStore) -> Self {
        Self::new(store.repositories(), Arc::new(RandomTokenSource))
    }

    /// State over Postgres.
    pub fn with_pool(pool: PgPool) -> Self {
        let mut state = Self::new(crate::db::repositories(pool.clone()), Arc::new(RandomTokenSource));
        state.db_pool = Some(pool);
        state
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory()
    }
}
