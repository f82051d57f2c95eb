//! The records the scheduler works over.
//!
//! These are owned by the surrounding application. Scheduling only needs
//! their identities and who may see them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionTally;

// ─── Decks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
  pub deck_id:     Uuid,
  /// Owner; the only principal allowed to modify the deck.
  pub user_id:     Uuid,
  pub name:        String,
  pub description: String,
  /// Public decks are readable (and studyable) by every user.
  pub is_public:   bool,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::CatalogStore::create_deck`].
#[derive(Debug, Clone)]
pub struct NewDeck {
  pub user_id:     Uuid,
  pub name:        String,
  pub description: String,
  pub is_public:   bool,
}

impl NewDeck {
  pub fn new(user_id: Uuid, name: impl Into<String>) -> Self {
    Self {
      user_id,
      name: name.into(),
      description: String::new(),
      is_public: false,
    }
  }
}

/// Partial update for [`crate::store::CatalogStore::update_deck`]. `None`
/// leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeckPatch {
  pub name:        Option<String>,
  pub description: Option<String>,
  pub is_public:   Option<bool>,
}

// ─── Cards ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
  pub card_id:       Uuid,
  pub deck_id:       Uuid,
  pub front:         String,
  pub back:          String,
  pub pronunciation: String,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::CatalogStore::create_card`].
#[derive(Debug, Clone)]
pub struct NewCard {
  pub deck_id:       Uuid,
  pub front:         String,
  pub back:          String,
  pub pronunciation: String,
}

impl NewCard {
  pub fn new(
    deck_id: Uuid,
    front: impl Into<String>,
    back: impl Into<String>,
  ) -> Self {
    Self {
      deck_id,
      front: front.into(),
      back: back.into(),
      pronunciation: String::new(),
    }
  }
}

/// Partial update for [`crate::store::CatalogStore::update_card`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CardPatch {
  pub front:         Option<String>,
  pub back:          Option<String>,
  pub pronunciation: Option<String>,
}

// ─── Study sessions ──────────────────────────────────────────────────────────

/// A persisted study session. The running counters are the
/// [`SessionTally`] of the session's aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
  pub session_id: Uuid,
  pub user_id:    Uuid,
  pub deck_id:    Uuid,
  pub started_at: DateTime<Utc>,
  /// `None` while the session is still open.
  pub ended_at:   Option<DateTime<Utc>>,
  pub tally:      SessionTally,
}

impl StudySession {
  pub fn is_open(&self) -> bool { self.ended_at.is_none() }
}
