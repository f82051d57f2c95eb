//! HTTP server assembly for Recall: configuration and the top-level router.

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use recall_api::{ApiState, SchedulingConfig, UserDirectory, UserEntry, api_router};
use recall_core::store::CatalogStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `RECALL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub users:      Vec<UserEntry>,
  #[serde(default)]
  pub scheduling: SchedulingConfig,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8787 }

impl ServerConfig {
  /// Build the API state for `store` from this configuration.
  pub fn api_state<S>(&self, store: S) -> ApiState<S> {
    ApiState {
      store:      Arc::new(store),
      users:      Arc::new(UserDirectory::new(self.users.clone())),
      scheduling: self.scheduling,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: the JSON API under `/api` and an unauthenticated
/// health check at `/health`, with request tracing.
pub fn router<S>(state: ApiState<S>) -> Router
where
  S: CatalogStore + 'static,
{
  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}
