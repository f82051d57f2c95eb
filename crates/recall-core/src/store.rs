//! Repository traits the scheduling core is written against.
//!
//! [`ProgressRepository`] is the narrow interface the scheduler, the session
//! driver and the classifier consume. [`CatalogStore`] extends it with the
//! decks, cards and study sessions of the surrounding application. Both are
//! implemented by storage backends (e.g. `recall-store-sqlite`) and passed
//! in explicitly; nothing in this crate reaches for a global client.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  catalog::{Card, CardPatch, Deck, DeckPatch, NewCard, NewDeck, StudySession},
  progress::{ProgressRecord, Quality, Version},
  session::SessionTally,
};

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  /// The record was stored; this is its new version.
  Committed(Version),
  /// The stored version no longer matched the expected one. Nothing was
  /// written.
  Conflict { current: Version },
}

// ─── Progress ────────────────────────────────────────────────────────────────

/// Keyed storage of [`ProgressRecord`]s with optimistic concurrency.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ProgressRepository: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The stored record for `(user_id, card_id)`, if any, and its version.
  /// An absent record is reported with [`Version::ABSENT`].
  fn get_progress(
    &self,
    user_id: Uuid,
    card_id: Uuid,
  ) -> impl Future<Output = Result<(Option<ProgressRecord>, Version), Self::Error>>
  + Send
  + '_;

  /// Store `record` if and only if the stored version still equals
  /// `expected`. Passing [`Version::ABSENT`] inserts a first record and
  /// conflicts if one already exists.
  fn put_progress<'a>(
    &'a self,
    record: &'a ProgressRecord,
    expected: Version,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// Records for cards in `deck_id` whose `due_at <= now`.
  fn list_due(
    &self,
    user_id: Uuid,
    deck_id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<ProgressRecord>, Self::Error>> + Send + '_;

  /// Cards in `deck_id` with no stored record for `user_id`, in deck order.
  fn list_fresh(
    &self,
    user_id: Uuid,
    deck_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Every stored record for cards in `deck_id`.
  fn list_progress(
    &self,
    user_id: Uuid,
    deck_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ProgressRecord>, Self::Error>> + Send + '_;
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Decks, cards and study sessions, sharing the progress store's backend
/// and error type.
///
/// Deleting a deck or card cascades to the progress records (and, for decks,
/// sessions) that hang off it.
pub trait CatalogStore: ProgressRepository {
  // ── Decks ─────────────────────────────────────────────────────────────

  fn create_deck(
    &self,
    input: NewDeck,
  ) -> impl Future<Output = Result<Deck, Self::Error>> + Send + '_;

  fn get_deck(
    &self,
    deck_id: Uuid,
  ) -> impl Future<Output = Result<Option<Deck>, Self::Error>> + Send + '_;

  /// Decks owned by `user_id`, newest first.
  fn list_decks(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Deck>, Self::Error>> + Send + '_;

  /// Public decks, newest first.
  fn list_public_decks(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Deck>, Self::Error>> + Send + '_;

  /// Apply `patch` and return the updated deck, or `None` if it does not
  /// exist.
  fn update_deck(
    &self,
    deck_id: Uuid,
    patch: DeckPatch,
  ) -> impl Future<Output = Result<Option<Deck>, Self::Error>> + Send + '_;

  /// Returns `false` if the deck did not exist.
  fn delete_deck(
    &self,
    deck_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Cards ─────────────────────────────────────────────────────────────

  fn create_card(
    &self,
    input: NewCard,
  ) -> impl Future<Output = Result<Card, Self::Error>> + Send + '_;

  fn get_card(
    &self,
    card_id: Uuid,
  ) -> impl Future<Output = Result<Option<Card>, Self::Error>> + Send + '_;

  /// Cards in `deck_id`, oldest first.
  fn list_cards(
    &self,
    deck_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Card>, Self::Error>> + Send + '_;

  fn update_card(
    &self,
    card_id: Uuid,
    patch: CardPatch,
  ) -> impl Future<Output = Result<Option<Card>, Self::Error>> + Send + '_;

  /// Returns `false` if the card did not exist.
  fn delete_card(
    &self,
    card_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Study sessions ────────────────────────────────────────────────────

  fn create_session(
    &self,
    user_id: Uuid,
    deck_id: Uuid,
  ) -> impl Future<Output = Result<StudySession, Self::Error>> + Send + '_;

  fn get_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Option<StudySession>, Self::Error>> + Send + '_;

  /// Sessions of `user_id`, newest first.
  fn list_sessions(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<StudySession>, Self::Error>> + Send + '_;

  fn count_sessions(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Count one committed review of `quality` against an open session, in a
  /// single atomic increment. Returns the updated counters, or `None` if
  /// the session does not exist or is already finished.
  fn record_session_review(
    &self,
    session_id: Uuid,
    quality: Quality,
  ) -> impl Future<Output = Result<Option<SessionTally>, Self::Error>> + Send + '_;

  /// Stamp `ended_at` on a session and return it. Finishing an already
  /// finished session keeps its original `ended_at`.
  fn finish_session(
    &self,
    session_id: Uuid,
    ended_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<StudySession>, Self::Error>> + Send + '_;
}
