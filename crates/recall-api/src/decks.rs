//! Handlers for `/decks` endpoints.
//!
//! | Method   | Path               | Notes |
//! |----------|--------------------|-------|
//! | `GET`    | `/decks`           | Caller's decks, newest first |
//! | `POST`   | `/decks`           | Body: `{"name":"…","description":"…","is_public":false}` |
//! | `GET`    | `/decks/public`    | Public decks of every user; no credentials needed |
//! | `GET`    | `/decks/{deck_id}` | Owner, or anyone if public |
//! | `PUT`    | `/decks/{deck_id}` | Owner only; body fields are optional |
//! | `DELETE` | `/decks/{deck_id}` | Owner only; removes cards, progress and sessions |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use recall_core::{
  access::Access,
  catalog::{Deck, DeckPatch, NewDeck},
  store::CatalogStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, Caller, error::ApiError, load_deck};

/// Upper bound on `GET /decks/public`.
pub const PUBLIC_DECK_LIMIT: usize = 50;

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /decks`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
) -> Result<Json<Vec<Deck>>, ApiError>
where
  S: CatalogStore,
{
  let decks = state
    .store
    .list_decks(caller.user_id())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(decks))
}

/// `GET /decks/public`
pub async fn list_public<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Deck>>, ApiError>
where
  S: CatalogStore,
{
  let decks = state
    .store
    .list_public_decks(PUBLIC_DECK_LIMIT)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(decks))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:        String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub is_public:   bool,
}

/// `POST /decks`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore,
{
  let Json(body) = body?;
  let name = body.name.trim();
  if name.is_empty() {
    return Err(ApiError::BadRequest("deck name must not be empty".into()));
  }

  let deck = state
    .store
    .create_deck(NewDeck {
      user_id:     caller.user_id(),
      name:        name.to_owned(),
      description: body.description,
      is_public:   body.is_public,
    })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(deck_id = %deck.deck_id, user_id = %deck.user_id, "deck created");
  Ok((StatusCode::CREATED, Json(deck)))
}

// ─── Get / update / delete one ────────────────────────────────────────────────────────

/// `GET /decks/{deck_id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(deck_id): Path<Uuid>,
) -> Result<Json<Deck>, ApiError>
where
  S: CatalogStore,
{
  let deck = load_deck(&*state.store, &caller, deck_id, Access::Read).await?;
  Ok(Json(deck))
}

/// `PUT /decks/{deck_id}`
pub async fn update_one<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(deck_id): Path<Uuid>,
  body: Result<Json<DeckPatch>, JsonRejection>,
) -> Result<Json<Deck>, ApiError>
where
  S: CatalogStore,
{
  let Json(mut patch) = body?;
  if let Some(name) = patch.name.take() {
    let name = name.trim().to_owned();
    if name.is_empty() {
      return Err(ApiError::BadRequest("deck name must not be empty".into()));
    }
    patch.name = Some(name);
  }

  load_deck(&*state.store, &caller, deck_id, Access::Write).await?;
  let deck = state
    .store
    .update_deck(deck_id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("deck {deck_id} not found")))?;

  tracing::info!(%deck_id, "deck updated");
  Ok(Json(deck))
}

/// `DELETE /decks/{deck_id}`
pub async fn delete_one<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(deck_id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore,
{
  load_deck(&*state.store, &caller, deck_id, Access::Write).await?;
  state.store.delete_deck(deck_id).await.map_err(ApiError::store)?;
  tracing::info!(%deck_id, "deck deleted");
  Ok(StatusCode::NO_CONTENT)
}
