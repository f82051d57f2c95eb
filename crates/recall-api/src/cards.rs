//! Handlers for card endpoints.
//!
//! | Method   | Path                     | Notes |
//! |----------|--------------------------|-------|
//! | `GET`    | `/decks/{deck_id}/cards` | Oldest first |
//! | `POST`   | `/decks/{deck_id}/cards` | Body: `{"front":"…","back":"…","pronunciation":"…"}` |
//! | `GET`    | `/cards/{card_id}`       | Readable if its deck is |
//! | `PUT`    | `/cards/{card_id}`       | Deck owner only; body fields are optional |
//! | `DELETE` | `/cards/{card_id}`       | Deck owner only |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use recall_core::{
  access::Access,
  catalog::{Card, CardPatch, NewCard},
  store::CatalogStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, Caller, error::ApiError, load_deck};

/// `GET /decks/{deck_id}/cards`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(deck_id): Path<Uuid>,
) -> Result<Json<Vec<Card>>, ApiError>
where
  S: CatalogStore,
{
  load_deck(&*state.store, &caller, deck_id, Access::Read).await?;
  let cards = state
    .store
    .list_cards(deck_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(cards))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub front:         String,
  pub back:          String,
  #[serde(default)]
  pub pronunciation: String,
}

/// `POST /decks/{deck_id}/cards`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(deck_id): Path<Uuid>,
  body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore,
{
  let Json(body) = body?;
  if body.front.trim().is_empty() || body.back.trim().is_empty() {
    return Err(ApiError::BadRequest("card front and back must not be empty".into()));
  }

  load_deck(&*state.store, &caller, deck_id, Access::Write).await?;
  let card = state
    .store
    .create_card(NewCard {
      deck_id,
      front: body.front,
      back: body.back,
      pronunciation: body.pronunciation,
    })
    .await
    .map_err(ApiError::store)?;

  tracing::debug!(card_id = %card.card_id, %deck_id, "card created");
  Ok((StatusCode::CREATED, Json(card)))
}

/// Fetch a card and check `access` on its deck.
async fn load_card<S>(
  state: &ApiState<S>,
  caller: &Caller,
  card_id: Uuid,
  access: Access,
) -> Result<Card, ApiError>
where
  S: CatalogStore,
{
  let card = state
    .store
    .get_card(card_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("card {card_id} not found")))?;
  load_deck(&*state.store, caller, card.deck_id, access).await?;
  Ok(card)
}

/// `GET /cards/{card_id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(card_id): Path<Uuid>,
) -> Result<Json<Card>, ApiError>
where
  S: CatalogStore,
{
  Ok(Json(load_card(&state, &caller, card_id, Access::Read).await?))
}

/// `PUT /cards/{card_id}`
pub async fn update_one<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(card_id): Path<Uuid>,
  body: Result<Json<CardPatch>, JsonRejection>,
) -> Result<Json<Card>, ApiError>
where
  S: CatalogStore,
{
  let Json(patch) = body?;
  let blank = |side: &Option<String>| side.as_deref().is_some_and(|s| s.trim().is_empty());
  if blank(&patch.front) || blank(&patch.back) {
    return Err(ApiError::BadRequest("card front and back must not be empty".into()));
  }

  load_card(&state, &caller, card_id, Access::Write).await?;
  let card = state
    .store
    .update_card(card_id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("card {card_id} not found")))?;

  tracing::debug!(%card_id, "card updated");
  Ok(Json(card))
}

/// `DELETE /cards/{card_id}`
pub async fn delete_one<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(card_id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore,
{
  load_card(&state, &caller, card_id, Access::Write).await?;
  state.store.delete_card(card_id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
