//! [`SqliteStore`], the SQLite implementation of [`ProgressRepository`] and
//! [`CatalogStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, Row, types::Value};
use uuid::Uuid;

use recall_core::{
  ProgressRecord, Version,
  Quality,
  catalog::{Card, CardPatch, Deck, DeckPatch, NewCard, NewDeck, StudySession},
  session::SessionTally,
  store::{CatalogStore, ProgressRepository, WriteOutcome},
};

use crate::{
  Error, Result,
  encode::{
    RawCard, RawDeck, RawProgress, RawSession, decode_uuid, decode_version,
    encode_dt, encode_uuid, encode_version, now,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Recall store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection handle is shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::info!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a query and map every row with `map`.
  async fn select<T, F>(&self, sql: String, args: Vec<Value>, map: F) -> Result<Vec<T>>
  where
    T: Send + 'static,
    F: Fn(&Row<'_>) -> rusqlite::Result<T> + Send + 'static,
  {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), |row| map(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  /// Run a statement, returning the number of affected rows.
  async fn execute(&self, sql: &'static str, args: Vec<Value>) -> Result<usize> {
    let affected = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, rusqlite::params_from_iter(args))?))
      .await?;
    Ok(affected)
  }

  async fn progress_rows(
    &self,
    sql: String,
    args: Vec<Value>,
  ) -> Result<Vec<ProgressRecord>> {
    self
      .select(sql, args, RawProgress::from_row)
      .await?
      .into_iter()
      .map(|raw| raw.into_record().map(|(record, _)| record))
      .collect()
  }

  async fn session_rows(&self, sql: String, args: Vec<Value>) -> Result<Vec<StudySession>> {
    self
      .select(sql, args, RawSession::from_row)
      .await?
      .into_iter()
      .map(RawSession::into_session)
      .collect()
  }

  async fn deck_rows(&self, sql: String, args: Vec<Value>) -> Result<Vec<Deck>> {
    self
      .select(sql, args, RawDeck::from_row)
      .await?
      .into_iter()
      .map(RawDeck::into_deck)
      .collect()
  }
}

fn id(id: Uuid) -> Value { Value::from(encode_uuid(id)) }

fn limit(n: usize) -> Value { Value::from(i64::try_from(n).unwrap_or(i64::MAX)) }

// ─── ProgressRepository impl ─────────────────────────────────────────────────

impl ProgressRepository for SqliteStore {
  type Error = Error;

  async fn get_progress(
    &self,
    user_id: Uuid,
    card_id: Uuid,
  ) -> Result<(Option<ProgressRecord>, Version)> {
    let sql = format!(
      "SELECT {} FROM card_progress p WHERE p.user_id = ?1 AND p.card_id = ?2",
      RawProgress::COLUMNS
    );
    let raw = self
      .select(sql, vec![id(user_id), id(card_id)], RawProgress::from_row)
      .await?
      .into_iter()
      .next();

    match raw {
      Some(raw) => {
        let (record, version) = raw.into_record()?;
        Ok((Some(record), version))
      }
      None => Ok((None, Version::ABSENT)),
    }
  }

  async fn put_progress(
    &self,
    record: &ProgressRecord,
    expected: Version,
  ) -> Result<WriteOutcome> {
    let next = expected.next();
    let raw = RawProgress::from_record(record, next)?;
    let expected_raw = encode_version(expected)?;
    let insert = expected.is_absent();

    let (affected, current): (usize, Option<i64>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let affected = if insert {
          tx.execute(
            "INSERT INTO card_progress (
               user_id, card_id, easiness_factor, repetitions, interval_days,
               due_at, last_reviewed_at, lapses, version
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (user_id, card_id) DO NOTHING",
            rusqlite::params![
              raw.user_id,
              raw.card_id,
              raw.easiness_factor,
              raw.repetitions,
              raw.interval_days,
              raw.due_at,
              raw.last_reviewed_at,
              raw.lapses,
              raw.version,
            ],
          )?
        } else {
          tx.execute(
            "UPDATE card_progress
             SET easiness_factor = ?3, repetitions = ?4, interval_days = ?5,
                 due_at = ?6, last_reviewed_at = ?7, lapses = ?8, version = ?9
             WHERE user_id = ?1 AND card_id = ?2 AND version = ?10",
            rusqlite::params![
              raw.user_id,
              raw.card_id,
              raw.easiness_factor,
              raw.repetitions,
              raw.interval_days,
              raw.due_at,
              raw.last_reviewed_at,
              raw.lapses,
              raw.version,
              expected_raw,
            ],
          )?
        };

        let current = if affected == 0 {
          tx.query_row(
            "SELECT version FROM card_progress WHERE user_id = ?1 AND card_id = ?2",
            rusqlite::params![raw.user_id, raw.card_id],
            |row| row.get(0),
          )
          .optional()?
        } else {
          None
        };

        tx.commit()?;
        Ok((affected, current))
      })
      .await?;

    if affected > 0 {
      return Ok(WriteOutcome::Committed(next));
    }

    let current = current.map(decode_version).transpose()?.unwrap_or(Version::ABSENT);
    tracing::debug!(
      user_id = %record.user_id,
      card_id = %record.card_id,
      expected = expected.raw(),
      current = current.raw(),
      "conditional progress write rejected",
    );
    Ok(WriteOutcome::Conflict { current })
  }

  async fn list_due(
    &self,
    user_id: Uuid,
    deck_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Vec<ProgressRecord>> {
    let sql = format!(
      "SELECT {}
       FROM card_progress p
       JOIN cards c ON c.card_id = p.card_id
       WHERE c.deck_id = ?1 AND p.user_id = ?2 AND p.due_at <= ?3
       ORDER BY p.due_at, p.card_id",
      RawProgress::COLUMNS
    );
    self
      .progress_rows(sql, vec![id(deck_id), id(user_id), Value::from(encode_dt(now))])
      .await
  }

  async fn list_fresh(&self, user_id: Uuid, deck_id: Uuid) -> Result<Vec<Uuid>> {
    let ids = self
      .select(
        "SELECT c.card_id FROM cards c
         WHERE c.deck_id = ?1
           AND NOT EXISTS (
             SELECT 1 FROM card_progress p
             WHERE p.user_id = ?2 AND p.card_id = c.card_id
           )
         ORDER BY c.created_at, c.rowid"
          .to_owned(),
        vec![id(deck_id), id(user_id)],
        |row| row.get::<_, String>(0),
      )
      .await?;
    ids.iter().map(String::as_str).map(decode_uuid).collect()
  }

  async fn list_progress(
    &self,
    user_id: Uuid,
    deck_id: Uuid,
  ) -> Result<Vec<ProgressRecord>> {
    let sql = format!(
      "SELECT {}
       FROM card_progress p
       JOIN cards c ON c.card_id = p.card_id
       WHERE c.deck_id = ?1 AND p.user_id = ?2
       ORDER BY c.created_at, c.rowid",
      RawProgress::COLUMNS
    );
    self.progress_rows(sql, vec![id(deck_id), id(user_id)]).await
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  // ── Decks ─────────────────────────────────────────────────────────────────

  async fn create_deck(&self, input: NewDeck) -> Result<Deck> {
    let deck = Deck {
      deck_id:     Uuid::new_v4(),
      user_id:     input.user_id,
      name:        input.name,
      description: input.description,
      is_public:   input.is_public,
      created_at:  now(),
    };

    self
      .execute(
        "INSERT INTO decks (deck_id, user_id, name, description, is_public, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        vec![
          id(deck.deck_id),
          id(deck.user_id),
          Value::from(deck.name.clone()),
          Value::from(deck.description.clone()),
          Value::from(deck.is_public),
          Value::from(encode_dt(deck.created_at)),
        ],
      )
      .await?;

    Ok(deck)
  }

  async fn get_deck(&self, deck_id: Uuid) -> Result<Option<Deck>> {
    let sql = format!("SELECT {} FROM decks WHERE deck_id = ?1", RawDeck::COLUMNS);
    Ok(self.deck_rows(sql, vec![id(deck_id)]).await?.into_iter().next())
  }

  async fn list_decks(&self, user_id: Uuid) -> Result<Vec<Deck>> {
    let sql = format!(
      "SELECT {} FROM decks WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
      RawDeck::COLUMNS
    );
    self.deck_rows(sql, vec![id(user_id)]).await
  }

  async fn list_public_decks(&self, max: usize) -> Result<Vec<Deck>> {
    let sql = format!(
      "SELECT {} FROM decks WHERE is_public = 1
       ORDER BY created_at DESC, rowid DESC LIMIT ?1",
      RawDeck::COLUMNS
    );
    self.deck_rows(sql, vec![limit(max)]).await
  }

  async fn update_deck(&self, deck_id: Uuid, patch: DeckPatch) -> Result<Option<Deck>> {
    self
      .execute(
        "UPDATE decks
         SET name = COALESCE(?2, name),
             description = COALESCE(?3, description),
             is_public = COALESCE(?4, is_public)
         WHERE deck_id = ?1",
        vec![
          id(deck_id),
          Value::from(patch.name),
          Value::from(patch.description),
          Value::from(patch.is_public),
        ],
      )
      .await?;
    self.get_deck(deck_id).await
  }

  async fn delete_deck(&self, deck_id: Uuid) -> Result<bool> {
    let affected = self
      .execute("DELETE FROM decks WHERE deck_id = ?1", vec![id(deck_id)])
      .await?;
    Ok(affected > 0)
  }

  // ── Cards ─────────────────────────────────────────────────────────────────

  async fn create_card(&self, input: NewCard) -> Result<Card> {
    let card = Card {
      card_id:       Uuid::new_v4(),
      deck_id:       input.deck_id,
      front:         input.front,
      back:          input.back,
      pronunciation: input.pronunciation,
      created_at:    now(),
    };

    self
      .execute(
        "INSERT INTO cards (card_id, deck_id, front, back, pronunciation, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        vec![
          id(card.card_id),
          id(card.deck_id),
          Value::from(card.front.clone()),
          Value::from(card.back.clone()),
          Value::from(card.pronunciation.clone()),
          Value::from(encode_dt(card.created_at)),
        ],
      )
      .await?;

    Ok(card)
  }

  async fn get_card(&self, card_id: Uuid) -> Result<Option<Card>> {
    let sql = format!("SELECT {} FROM cards WHERE card_id = ?1", RawCard::COLUMNS);
    self
      .select(sql, vec![id(card_id)], RawCard::from_row)
      .await?
      .into_iter()
      .next()
      .map(RawCard::into_card)
      .transpose()
  }

  async fn list_cards(&self, deck_id: Uuid) -> Result<Vec<Card>> {
    let sql = format!(
      "SELECT {} FROM cards WHERE deck_id = ?1 ORDER BY created_at, rowid",
      RawCard::COLUMNS
    );
    self
      .select(sql, vec![id(deck_id)], RawCard::from_row)
      .await?
      .into_iter()
      .map(RawCard::into_card)
      .collect()
  }

  async fn update_card(&self, card_id: Uuid, patch: CardPatch) -> Result<Option<Card>> {
    self
      .execute(
        "UPDATE cards
         SET front = COALESCE(?2, front),
             back = COALESCE(?3, back),
             pronunciation = COALESCE(?4, pronunciation)
         WHERE card_id = ?1",
        vec![
          id(card_id),
          Value::from(patch.front),
          Value::from(patch.back),
          Value::from(patch.pronunciation),
        ],
      )
      .await?;
    self.get_card(card_id).await
  }

  async fn delete_card(&self, card_id: Uuid) -> Result<bool> {
    let affected = self
      .execute("DELETE FROM cards WHERE card_id = ?1", vec![id(card_id)])
      .await?;
    Ok(affected > 0)
  }

  // ── Study sessions ────────────────────────────────────────────────────────

  async fn create_session(&self, user_id: Uuid, deck_id: Uuid) -> Result<StudySession> {
    let session = StudySession {
      session_id: Uuid::new_v4(),
      user_id,
      deck_id,
      started_at: now(),
      ended_at: None,
      tally: SessionTally::default(),
    };

    self
      .execute(
        "INSERT INTO study_sessions (session_id, user_id, deck_id, started_at)
         VALUES (?1, ?2, ?3, ?4)",
        vec![
          id(session.session_id),
          id(user_id),
          id(deck_id),
          Value::from(encode_dt(session.started_at)),
        ],
      )
      .await?;

    Ok(session)
  }

  async fn get_session(&self, session_id: Uuid) -> Result<Option<StudySession>> {
    let sql = format!(
      "SELECT {} FROM study_sessions WHERE session_id = ?1",
      RawSession::COLUMNS
    );
    Ok(self.session_rows(sql, vec![id(session_id)]).await?.into_iter().next())
  }

  async fn list_sessions(&self, user_id: Uuid, max: usize) -> Result<Vec<StudySession>> {
    let sql = format!(
      "SELECT {} FROM study_sessions WHERE user_id = ?1
       ORDER BY started_at DESC, rowid DESC LIMIT ?2",
      RawSession::COLUMNS
    );
    self.session_rows(sql, vec![id(user_id), limit(max)]).await
  }

  async fn count_sessions(&self, user_id: Uuid) -> Result<usize> {
    let counts = self
      .select(
        "SELECT COUNT(*) FROM study_sessions WHERE user_id = ?1".to_owned(),
        vec![id(user_id)],
        |row| row.get::<_, i64>(0),
      )
      .await?;
    let n = counts.into_iter().next().unwrap_or(0);
    usize::try_from(n).map_err(|_| Error::Corrupt { column: "count", value: n })
  }

  async fn record_session_review(
    &self,
    session_id: Uuid,
    quality: Quality,
  ) -> Result<Option<SessionTally>> {
    let correct = i64::from(quality.is_success());
    let tally = self
      .select(
        "UPDATE study_sessions
         SET cards_studied = cards_studied + 1,
             cards_correct = cards_correct + ?2,
             cards_lapsed = cards_lapsed + ?3
         WHERE session_id = ?1 AND ended_at IS NULL
         RETURNING cards_studied, cards_correct, cards_lapsed"
          .to_owned(),
        vec![id(session_id), Value::from(correct), Value::from(1 - correct)],
        |row| {
          Ok(SessionTally {
            cards_studied: row.get(0)?,
            cards_correct: row.get(1)?,
            cards_lapsed:  row.get(2)?,
          })
        },
      )
      .await?;
    Ok(tally.into_iter().next())
  }

  async fn finish_session(
    &self,
    session_id: Uuid,
    ended_at: DateTime<Utc>,
  ) -> Result<Option<StudySession>> {
    self
      .execute(
        "UPDATE study_sessions SET ended_at = COALESCE(ended_at, ?2)
         WHERE session_id = ?1",
        vec![id(session_id), Value::from(encode_dt(ended_at))],
      )
      .await?;
    self.get_session(session_id).await
  }
}
