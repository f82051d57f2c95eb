//! Scheduling endpoints: the due queue, grading a review, and per-card
//! progress.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/decks/{deck_id}/queue` | `?limit=<n>&new_card_ratio=<0..1>` |
//! | `POST` | `/decks/{deck_id}/cards/{card_id}/review` | Body: `{"quality":4}` or `{"correct":true}` |
//! | `GET`  | `/decks/{deck_id}/cards/{card_id}/progress` | Stored record and mastery |

use axum::{
  Json,
  extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
};
use chrono::{DateTime, Utc};
use recall_core::{
  ProgressRecord, Quality,
  access::Access,
  classify::{Mastery, classify},
  queue::next_batch,
  session::{Reviewed, review_card},
  store::CatalogStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, Caller, error::ApiError, load_card_in, load_deck};

// ─── Request / response bodies ───────────────────────────────────────────────

/// A graded answer: an explicit `quality` in `0..=5`, or a binary
/// `correct` flag. `quality` wins when both are present.
#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub quality: Option<i64>,
  pub correct: Option<bool>,
}

impl ReviewBody {
  pub fn quality(&self) -> Result<Quality, ApiError> {
    match (self.quality, self.correct) {
      (Some(q), _) => Ok(Quality::new(q)?),
      (None, Some(correct)) => Ok(Quality::from_correct(correct)),
      (None, None) => Err(ApiError::BadRequest(
        "either `quality` or `correct` is required".into(),
      )),
    }
  }
}

/// The updated schedule of a reviewed card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
  pub card_id:         Uuid,
  pub easiness_factor: f64,
  pub repetitions:     u32,
  pub interval_days:   u32,
  pub due_at:          DateTime<Utc>,
}

impl From<&ProgressRecord> for ReviewResponse {
  fn from(record: &ProgressRecord) -> Self {
    Self {
      card_id:         record.card_id,
      easiness_factor: record.easiness_factor,
      repetitions:     record.repetitions,
      interval_days:   record.interval_days,
      due_at:          record.due_at,
    }
  }
}

// ─── Queue ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QueueParams {
  pub limit:          Option<usize>,
  pub new_card_ratio: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueResponse {
  pub deck_id:  Uuid,
  pub card_ids: Vec<Uuid>,
}

/// `GET /decks/{deck_id}/queue`
pub async fn queue<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(deck_id): Path<Uuid>,
  params: Result<Query<QueueParams>, QueryRejection>,
) -> Result<Json<QueueResponse>, ApiError>
where
  S: CatalogStore,
{
  let Query(params) = params?;
  load_deck(&*state.store, &caller, deck_id, Access::Read).await?;

  let limit = params.limit.unwrap_or(state.scheduling.default_batch_limit);
  let ratio = params
    .new_card_ratio
    .unwrap_or(state.scheduling.new_card_ratio);

  let card_ids = next_batch(
    &*state.store,
    caller.user_id(),
    deck_id,
    Utc::now(),
    limit,
    ratio,
  )
  .await?
  .collect();

  Ok(Json(QueueResponse { deck_id, card_ids }))
}

// ─── Review ──────────────────────────────────────────────────────────────────

/// Grade and commit one review of `card_id` by `caller`.
pub(crate) async fn commit<S>(
  state: &ApiState<S>,
  caller: &Caller,
  card_id: Uuid,
  quality: Quality,
) -> Result<Reviewed, ApiError>
where
  S: CatalogStore,
{
  let reviewed = review_card(
    &*state.store,
    caller.user_id(),
    card_id,
    quality,
    Utc::now(),
    state.scheduling.max_write_attempts,
  )
  .await?;

  tracing::info!(
    user_id = %caller.user_id(),
    %card_id,
    quality = quality.value(),
    interval_days = reviewed.record.interval_days,
    attempts = reviewed.attempts,
    "review committed",
  );
  Ok(reviewed)
}

/// `POST /decks/{deck_id}/cards/{card_id}/review`
pub async fn review<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path((deck_id, card_id)): Path<(Uuid, Uuid)>,
  body: Result<Json<ReviewBody>, JsonRejection>,
) -> Result<Json<ReviewResponse>, ApiError>
where
  S: CatalogStore,
{
  let Json(body) = body?;
  // Validated before the deck is even looked up.
  let quality = body.quality()?;

  load_deck(&*state.store, &caller, deck_id, Access::Read).await?;
  load_card_in(&*state.store, deck_id, card_id).await?;

  let reviewed = commit(&state, &caller, card_id, quality).await?;
  Ok(Json(ReviewResponse::from(&reviewed.record)))
}

// ─── Progress ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
  pub card_id:  Uuid,
  pub mastery:  Mastery,
  /// `None` for a card the caller has never reviewed.
  pub progress: Option<ProgressRecord>,
}

/// `GET /decks/{deck_id}/cards/{card_id}/progress`
pub async fn progress<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path((deck_id, card_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ProgressResponse>, ApiError>
where
  S: CatalogStore,
{
  load_deck(&*state.store, &caller, deck_id, Access::Read).await?;
  load_card_in(&*state.store, deck_id, card_id).await?;

  let (record, _) = state
    .store
    .get_progress(caller.user_id(), card_id)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(ProgressResponse {
    card_id,
    mastery: classify(record.as_ref()),
    progress: record,
  }))
}
