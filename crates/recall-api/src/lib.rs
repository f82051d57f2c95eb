//! JSON REST API for Recall.
//!
//! Exposes an axum [`Router`] backed by any [`CatalogStore`]. Every route
//! except the public deck listing requires HTTP Basic credentials; TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", recall_api::api_router(state))
//! ```

pub mod auth;
pub mod cards;
pub mod decks;
pub mod error;
pub mod review;
pub mod sessions;
pub mod stats;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use recall_core::{
  access::{Access, authorize},
  catalog::{Card, Deck},
  session::DEFAULT_MAX_ATTEMPTS,
  store::CatalogStore,
};
use serde::Deserialize;
use uuid::Uuid;

pub use auth::{Caller, UserDirectory, UserEntry};
pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Scheduling knobs applied when a request leaves them unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
  pub default_batch_limit: usize,
  pub new_card_ratio:      f64,
  pub max_write_attempts:  u32,
}

impl Default for SchedulingConfig {
  fn default() -> Self {
    Self {
      default_batch_limit: 20,
      new_card_ratio:      0.2,
      max_write_attempts:  DEFAULT_MAX_ATTEMPTS,
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:      Arc<S>,
  pub users:      Arc<UserDirectory>,
  pub scheduling: SchedulingConfig,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      users:      Arc::clone(&self.users),
      scheduling: self.scheduling,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: CatalogStore + 'static,
{
  Router::new()
    // Decks
    .route("/decks", get(decks::list::<S>).post(decks::create::<S>))
    .route("/decks/public", get(decks::list_public::<S>))
    .route(
      "/decks/{deck_id}",
      get(decks::get_one::<S>)
        .put(decks::update_one::<S>)
        .delete(decks::delete_one::<S>),
    )
    // Cards
    .route(
      "/decks/{deck_id}/cards",
      get(cards::list::<S>).post(cards::create::<S>),
    )
    .route(
      "/cards/{card_id}",
      get(cards::get_one::<S>)
        .put(cards::update_one::<S>)
        .delete(cards::delete_one::<S>),
    )
    // Scheduling
    .route("/decks/{deck_id}/queue", get(review::queue::<S>))
    .route("/decks/{deck_id}/cards/{card_id}/review", post(review::review::<S>))
    .route("/decks/{deck_id}/cards/{card_id}/progress", get(review::progress::<S>))
    // Sessions
    .route("/sessions", get(sessions::list::<S>).post(sessions::create::<S>))
    .route("/sessions/{session_id}", get(sessions::get_one::<S>))
    .route("/sessions/{session_id}/reviews", post(sessions::record_review::<S>))
    .route("/sessions/{session_id}/finish", post(sessions::finish::<S>))
    // Stats
    .route("/stats", get(stats::handler::<S>))
    .with_state(state)
}

// ─── Lookup helpers ──────────────────────────────────────────────────────────

/// Fetch a deck and check `access` for `caller`.
pub(crate) async fn load_deck<S>(
  store: &S,
  caller: &Caller,
  deck_id: Uuid,
  access: Access,
) -> Result<Deck, ApiError>
where
  S: CatalogStore,
{
  let deck = store
    .get_deck(deck_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("deck {deck_id} not found")))?;
  authorize(&caller.0, &deck, access)?;
  Ok(deck)
}

/// Fetch a card, requiring it to live in `deck_id`.
pub(crate) async fn load_card_in<S>(
  store: &S,
  deck_id: Uuid,
  card_id: Uuid,
) -> Result<Card, ApiError>
where
  S: CatalogStore,
{
  store
    .get_card(card_id)
    .await
    .map_err(ApiError::store)?
    .filter(|card| card.deck_id == deck_id)
    .ok_or_else(|| ApiError::NotFound(format!("card {card_id} not found in deck {deck_id}")))
}
