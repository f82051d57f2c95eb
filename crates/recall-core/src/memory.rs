//! In-process [`ProgressRepository`] backed by a mutex-guarded map.
//!
//! Useful for tests and for embedding the scheduler without a database. The
//! deck layout (which cards belong to which deck) is registered up front
//! with [`MemoryStore::add_card`].

use std::{
  collections::HashMap,
  sync::{
    Mutex, MutexGuard,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  progress::{ProgressRecord, Version},
  store::{ProgressRepository, WriteOutcome},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("memory store lock poisoned")]
  Poisoned,

  #[error("memory store marked unavailable")]
  Unavailable,
}

#[derive(Debug, Default)]
struct Inner {
  /// deck_id → card ids in insertion order.
  decks:    HashMap<Uuid, Vec<Uuid>>,
  /// (user_id, card_id) → stored record and its version.
  progress: HashMap<(Uuid, Uuid), (ProgressRecord, Version)>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  inner:       Mutex<Inner>,
  unavailable: AtomicBool,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Register `card_id` as the next card of `deck_id`.
  pub fn add_card(&self, deck_id: Uuid, card_id: Uuid) -> Result<(), MemoryError> {
    let mut inner = self.inner.lock().map_err(|_| MemoryError::Poisoned)?;
    inner.decks.entry(deck_id).or_default().push(card_id);
    Ok(())
  }

  /// Store `record` unconditionally, bumping its version. Returns the new
  /// version.
  ///
  /// Seeding ignores [`MemoryStore::set_unavailable`].
  pub fn seed(&self, record: ProgressRecord) -> Result<Version, MemoryError> {
    let mut inner = self.inner.lock().map_err(|_| MemoryError::Poisoned)?;
    let key = (record.user_id, record.card_id);
    let version = inner
      .progress
      .get(&key)
      .map_or(Version::ABSENT, |(_, v)| *v)
      .next();
    inner.progress.insert(key, (record, version));
    Ok(version)
  }

  /// Make every subsequent call fail with [`MemoryError::Unavailable`].
  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  fn lock(&self) -> Result<MutexGuard<'_, Inner>, MemoryError> {
    if self.unavailable.load(Ordering::SeqCst) {
      return Err(MemoryError::Unavailable);
    }
    self.inner.lock().map_err(|_| MemoryError::Poisoned)
  }

  fn deck_records(
    &self,
    user_id: Uuid,
    deck_id: Uuid,
  ) -> Result<Vec<ProgressRecord>, MemoryError> {
    let inner = self.lock()?;
    let cards = inner.decks.get(&deck_id).map(Vec::as_slice).unwrap_or(&[]);
    Ok(
      cards
        .iter()
        .filter_map(|card_id| inner.progress.get(&(user_id, *card_id)))
        .map(|(record, _)| record.clone())
        .collect(),
    )
  }
}

impl ProgressRepository for MemoryStore {
  type Error = MemoryError;

  async fn get_progress(
    &self,
    user_id: Uuid,
    card_id: Uuid,
  ) -> Result<(Option<ProgressRecord>, Version), MemoryError> {
    let inner = self.lock()?;
    Ok(match inner.progress.get(&(user_id, card_id)) {
      Some((record, version)) => (Some(record.clone()), *version),
      None => (None, Version::ABSENT),
    })
  }

  async fn put_progress(
    &self,
    record: &ProgressRecord,
    expected: Version,
  ) -> Result<WriteOutcome, MemoryError> {
    let mut inner = self.lock()?;
    let key = (record.user_id, record.card_id);
    let current = inner
      .progress
      .get(&key)
      .map_or(Version::ABSENT, |(_, v)| *v);

    if current != expected {
      return Ok(WriteOutcome::Conflict { current });
    }

    let version = current.next();
    inner.progress.insert(key, (record.clone(), version));
    Ok(WriteOutcome::Committed(version))
  }

  async fn list_due(
    &self,
    user_id: Uuid,
    deck_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Vec<ProgressRecord>, MemoryError> {
    let mut records = self.deck_records(user_id, deck_id)?;
    records.retain(|r| r.is_due(now));
    Ok(records)
  }

  async fn list_fresh(
    &self,
    user_id: Uuid,
    deck_id: Uuid,
  ) -> Result<Vec<Uuid>, MemoryError> {
    let inner = self.lock()?;
    let cards = inner.decks.get(&deck_id).map(Vec::as_slice).unwrap_or(&[]);
    Ok(
      cards
        .iter()
        .filter(|card_id| !inner.progress.contains_key(&(user_id, **card_id)))
        .copied()
        .collect(),
    )
  }

  async fn list_progress(
    &self,
    user_id: Uuid,
    deck_id: Uuid,
  ) -> Result<Vec<ProgressRecord>, MemoryError> {
    self.deck_records(user_id, deck_id)
  }
}
