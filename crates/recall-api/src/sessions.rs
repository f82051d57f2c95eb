//! Handlers for `/sessions` endpoints.
//!
//! A session's running counters are incremented in the store after every
//! committed review, so a session survives across requests and server
//! restarts. Sessions are private to the user who started them; other users
//! get a 404.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/sessions` | 50 most recent |
//! | `POST` | `/sessions` | Body: `{"deck_id":"…"}` |
//! | `GET`  | `/sessions/{session_id}` | Session with summary |
//! | `POST` | `/sessions/{session_id}/reviews` | Body: `{"card_id":"…","quality":4}` |
//! | `POST` | `/sessions/{session_id}/finish` | Final summary |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use recall_core::{
  access::Access,
  catalog::StudySession,
  session::{SessionAggregator, SessionSummary},
  store::CatalogStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  ApiState, Caller,
  error::ApiError,
  load_card_in, load_deck,
  review::{ReviewBody, ReviewResponse},
};

/// Upper bound on `GET /sessions`.
pub const RECENT_SESSION_LIMIT: usize = 50;

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
  #[serde(flatten)]
  pub session: StudySession,
  pub summary: SessionSummary,
}

impl From<StudySession> for SessionView {
  fn from(session: StudySession) -> Self {
    let summary = session.tally.summary();
    Self { session, summary }
  }
}

/// Fetch a session owned by `caller`.
async fn load_session<S>(
  store: &S,
  caller: &Caller,
  session_id: Uuid,
) -> Result<StudySession, ApiError>
where
  S: CatalogStore,
{
  store
    .get_session(session_id)
    .await
    .map_err(ApiError::store)?
    .filter(|s| s.user_id == caller.user_id())
    .ok_or_else(|| ApiError::NotFound(format!("session {session_id} not found")))
}

// ─── List / create / get ─────────────────────────────────────────────────────

/// `GET /sessions`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
) -> Result<Json<Vec<SessionView>>, ApiError>
where
  S: CatalogStore,
{
  let sessions = state
    .store
    .list_sessions(caller.user_id(), RECENT_SESSION_LIMIT)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(sessions.into_iter().map(SessionView::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub deck_id: Uuid,
}

/// `POST /sessions`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore,
{
  let Json(body) = body?;
  load_deck(&*state.store, &caller, body.deck_id, Access::Read).await?;

  let session = state
    .store
    .create_session(caller.user_id(), body.deck_id)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(
    session_id = %session.session_id,
    deck_id = %session.deck_id,
    user_id = %session.user_id,
    "study session started",
  );
  Ok((StatusCode::CREATED, Json(SessionView::from(session))))
}

/// `GET /sessions/{session_id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError>
where
  S: CatalogStore,
{
  let session = load_session(&*state.store, &caller, session_id).await?;
  Ok(Json(SessionView::from(session)))
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SessionReviewBody {
  pub card_id: Uuid,
  #[serde(flatten)]
  pub answer:  ReviewBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionReviewResponse {
  pub review:  ReviewResponse,
  pub summary: SessionSummary,
}

/// `POST /sessions/{session_id}/reviews`
pub async fn record_review<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(session_id): Path<Uuid>,
  body: Result<Json<SessionReviewBody>, JsonRejection>,
) -> Result<Json<SessionReviewResponse>, ApiError>
where
  S: CatalogStore,
{
  let Json(body) = body?;
  let quality = body.answer.quality()?;

  let session = load_session(&*state.store, &caller, session_id).await?;
  if !session.is_open() {
    return Err(ApiError::Conflict(format!("session {session_id} is already finished")));
  }
  load_deck(&*state.store, &caller, session.deck_id, Access::Read).await?;
  load_card_in(&*state.store, session.deck_id, body.card_id).await?;

  let mut aggregator =
    SessionAggregator::resume(&*state.store, caller.user_id(), session.tally)
      .with_max_attempts(state.scheduling.max_write_attempts);
  let reviewed = aggregator.submit(body.card_id, quality, Utc::now()).await?;

  // The review is committed at this point. Counting it is best effort: an
  // error here must not invite the client to grade the card again.
  let summary = match state.store.record_session_review(session_id, quality).await {
    Ok(Some(tally)) => tally.summary(),
    Ok(None) => {
      tracing::warn!(
        %session_id,
        card_id = %body.card_id,
        "session finished before review was counted",
      );
      aggregator.summary()
    }
    Err(error) => {
      tracing::warn!(
        %session_id,
        card_id = %body.card_id,
        %error,
        "failed to count session review",
      );
      aggregator.summary()
    }
  };

  tracing::debug!(
    %session_id,
    card_id = %body.card_id,
    studied = summary.cards_studied,
    "session review recorded",
  );
  Ok(Json(SessionReviewResponse {
    review: ReviewResponse::from(&reviewed.record),
    summary,
  }))
}

// ─── Finish ──────────────────────────────────────────────────────────────────

/// `POST /sessions/{session_id}/finish`
pub async fn finish<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSummary>, ApiError>
where
  S: CatalogStore,
{
  load_session(&*state.store, &caller, session_id).await?;
  let session = state
    .store
    .finish_session(session_id, Utc::now())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("session {session_id} not found")))?;

  let summary =
    SessionAggregator::resume(&*state.store, caller.user_id(), session.tally).finish();

  tracing::info!(
    %session_id,
    cards_studied = summary.cards_studied,
    accuracy = summary.accuracy,
    "study session finished",
  );
  Ok(Json(summary))
}
