//! `GET /stats`: deck, card-mastery and session counts for the caller.

use axum::{Json, extract::State};
use recall_core::{classify::MasteryCounts, store::CatalogStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, Caller, error::ApiError};

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
  pub decks:    usize,
  pub cards:    MasteryCounts,
  pub sessions: usize,
}

/// `GET /stats`
///
/// Card counts cover the caller's own decks.
pub async fn handler<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
) -> Result<Json<StatsResponse>, ApiError>
where
  S: CatalogStore,
{
  let user_id = caller.user_id();
  let decks = state
    .store
    .list_decks(user_id)
    .await
    .map_err(ApiError::store)?;

  let mut cards = MasteryCounts::default();
  for deck in &decks {
    let card_ids: Vec<Uuid> = state
      .store
      .list_cards(deck.deck_id)
      .await
      .map_err(ApiError::store)?
      .into_iter()
      .map(|c| c.card_id)
      .collect();
    let progress = state
      .store
      .list_progress(user_id, deck.deck_id)
      .await
      .map_err(ApiError::store)?;
    cards += MasteryCounts::tally(&card_ids, &progress);
  }

  let sessions = state
    .store
    .count_sessions(user_id)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(StatsResponse { decks: decks.len(), cards, sessions }))
}
