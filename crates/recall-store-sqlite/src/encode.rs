//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that text comparison orders them
//! chronologically. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use recall_core::{
  ProgressRecord, Version,
  catalog::{Card, Deck, StudySession},
  session::SessionTally,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_version(v: Version) -> Result<i64> {
  i64::try_from(v.raw()).map_err(|_| Error::VersionRange(v.raw()))
}

pub fn decode_version(raw: i64) -> Result<Version> {
  u64::try_from(raw)
    .map(Version::from_raw)
    .map_err(|_| Error::Corrupt { column: "version", value: raw })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `decks` row.
pub struct RawDeck {
  pub deck_id:     String,
  pub user_id:     String,
  pub name:        String,
  pub description: String,
  pub is_public:   bool,
  pub created_at:  String,
}

impl RawDeck {
  pub const COLUMNS: &'static str =
    "deck_id, user_id, name, description, is_public, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      deck_id:     row.get(0)?,
      user_id:     row.get(1)?,
      name:        row.get(2)?,
      description: row.get(3)?,
      is_public:   row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_deck(self) -> Result<Deck> {
    Ok(Deck {
      deck_id:     decode_uuid(&self.deck_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      name:        self.name,
      description: self.description,
      is_public:   self.is_public,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `cards` row.
pub struct RawCard {
  pub card_id:       String,
  pub deck_id:       String,
  pub front:         String,
  pub back:          String,
  pub pronunciation: String,
  pub created_at:    String,
}

impl RawCard {
  pub const COLUMNS: &'static str =
    "card_id, deck_id, front, back, pronunciation, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      card_id:       row.get(0)?,
      deck_id:       row.get(1)?,
      front:         row.get(2)?,
      back:          row.get(3)?,
      pronunciation: row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_card(self) -> Result<Card> {
    Ok(Card {
      card_id:       decode_uuid(&self.card_id)?,
      deck_id:       decode_uuid(&self.deck_id)?,
      front:         self.front,
      back:          self.back,
      pronunciation: self.pronunciation,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Column values of a `card_progress` row, used in both directions.
pub struct RawProgress {
  pub user_id:          String,
  pub card_id:          String,
  pub easiness_factor:  f64,
  pub repetitions:      u32,
  pub interval_days:    u32,
  pub due_at:           String,
  pub last_reviewed_at: Option<String>,
  pub lapses:           u32,
  pub version:          i64,
}

impl RawProgress {
  /// Column list with a `p.` table alias, for joins against `cards c`.
  pub const COLUMNS: &'static str = "p.user_id, p.card_id, p.easiness_factor, \
     p.repetitions, p.interval_days, p.due_at, p.last_reviewed_at, p.lapses, \
     p.version";

  pub fn from_record(record: &ProgressRecord, version: Version) -> Result<Self> {
    Ok(Self {
      user_id:          encode_uuid(record.user_id),
      card_id:          encode_uuid(record.card_id),
      easiness_factor:  record.easiness_factor,
      repetitions:      record.repetitions,
      interval_days:    record.interval_days,
      due_at:           encode_dt(record.due_at),
      last_reviewed_at: record.last_reviewed_at.map(encode_dt),
      lapses:           record.lapses,
      version:          encode_version(version)?,
    })
  }

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:          row.get(0)?,
      card_id:          row.get(1)?,
      easiness_factor:  row.get(2)?,
      repetitions:      row.get(3)?,
      interval_days:    row.get(4)?,
      due_at:           row.get(5)?,
      last_reviewed_at: row.get(6)?,
      lapses:           row.get(7)?,
      version:          row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<(ProgressRecord, Version)> {
    let record = ProgressRecord {
      user_id:          decode_uuid(&self.user_id)?,
      card_id:          decode_uuid(&self.card_id)?,
      easiness_factor:  self.easiness_factor,
      repetitions:      self.repetitions,
      interval_days:    self.interval_days,
      due_at:           decode_dt(&self.due_at)?,
      last_reviewed_at: self
        .last_reviewed_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      lapses:           self.lapses,
    };
    Ok((record, decode_version(self.version)?))
  }
}

/// Raw values read directly from a `study_sessions` row.
pub struct RawSession {
  pub session_id:    String,
  pub user_id:       String,
  pub deck_id:       String,
  pub started_at:    String,
  pub ended_at:      Option<String>,
  pub cards_studied: u32,
  pub cards_correct: u32,
  pub cards_lapsed:  u32,
}

impl RawSession {
  pub const COLUMNS: &'static str = "session_id, user_id, deck_id, started_at, \
     ended_at, cards_studied, cards_correct, cards_lapsed";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:    row.get(0)?,
      user_id:       row.get(1)?,
      deck_id:       row.get(2)?,
      started_at:    row.get(3)?,
      ended_at:      row.get(4)?,
      cards_studied: row.get(5)?,
      cards_correct: row.get(6)?,
      cards_lapsed:  row.get(7)?,
    })
  }

  pub fn into_session(self) -> Result<StudySession> {
    Ok(StudySession {
      session_id: decode_uuid(&self.session_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      deck_id:    decode_uuid(&self.deck_id)?,
      started_at: decode_dt(&self.started_at)?,
      ended_at:   self.ended_at.as_deref().map(decode_dt).transpose()?,
      tally:      SessionTally {
        cards_studied: self.cards_studied,
        cards_correct: self.cards_correct,
        cards_lapsed:  self.cards_lapsed,
      },
    })
  }
}
