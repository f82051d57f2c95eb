//! Driving reviews through the grader and into the repository.
//!
//! A review is committed with a read → grade → conditional-write cycle. When
//! the write loses an optimistic-concurrency race the cycle is repeated
//! against the freshly stored state with the same `(quality, now)`; since
//! [`grade`] is pure this never double-applies a review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  grade::grade,
  progress::{ProgressRecord, Quality, Version},
  store::{ProgressRepository, WriteOutcome},
};

/// Write attempts per review before giving up with
/// [`Error::SchedulingUnavailable`].
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ─── Single review ───────────────────────────────────────────────────────────

/// The state a review is graded against.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
  pub record:  Option<ProgressRecord>,
  pub version: Version,
}

/// A committed review.
#[derive(Debug, Clone, PartialEq)]
pub struct Reviewed {
  pub record:   ProgressRecord,
  pub version:  Version,
  /// Write attempts it took, including the successful one.
  pub attempts: u32,
}

/// Read the current state of `(user_id, card_id)`.
pub async fn load<R>(repo: &R, user_id: Uuid, card_id: Uuid) -> Result<Snapshot>
where
  R: ProgressRepository,
{
  let (record, version) = repo
    .get_progress(user_id, card_id)
    .await
    .map_err(Error::repository)?;
  Ok(Snapshot { record, version })
}

/// Grade against `base` and write the result if `base` is still current.
///
/// Fails with [`Error::VersionConflict`] if another writer got there first;
/// the caller should [`load`] again and retry.
pub async fn commit_review<R>(
  repo: &R,
  base: &Snapshot,
  user_id: Uuid,
  card_id: Uuid,
  quality: Quality,
  now: DateTime<Utc>,
) -> Result<(ProgressRecord, Version)>
where
  R: ProgressRepository,
{
  let next = grade(base.record.as_ref(), user_id, card_id, quality, now);
  match repo
    .put_progress(&next, base.version)
    .await
    .map_err(Error::repository)?
  {
    WriteOutcome::Committed(version) => Ok((next, version)),
    WriteOutcome::Conflict { current } => {
      tracing::debug!(
        %user_id,
        %card_id,
        expected = base.version.raw(),
        current = current.raw(),
        "progress write conflicted",
      );
      Err(Error::VersionConflict { user_id, card_id })
    }
  }
}

/// Commit one review, retrying on version conflicts up to `max_attempts`
/// times. Repository failures are returned immediately.
pub async fn review_card<R>(
  repo: &R,
  user_id: Uuid,
  card_id: Uuid,
  quality: Quality,
  now: DateTime<Utc>,
  max_attempts: u32,
) -> Result<Reviewed>
where
  R: ProgressRepository,
{
  let max_attempts = max_attempts.max(1);

  for attempt in 1..=max_attempts {
    let base = load(repo, user_id, card_id).await?;
    match commit_review(repo, &base, user_id, card_id, quality, now).await {
      Ok((record, version)) => {
        return Ok(Reviewed { record, version, attempts: attempt });
      }
      Err(Error::VersionConflict { .. }) => continue,
      Err(e) => return Err(e),
    }
  }

  tracing::warn!(%user_id, %card_id, max_attempts, "giving up on contended review");
  Err(Error::SchedulingUnavailable { card_id, attempts: max_attempts })
}

// ─── Session aggregation ─────────────────────────────────────────────────────

/// Running counters of a study session. Only committed reviews are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTally {
  pub cards_studied: u32,
  /// Reviews graded `>= 3`.
  pub cards_correct: u32,
  pub cards_lapsed:  u32,
}

impl SessionTally {
  pub fn record(&mut self, quality: Quality) {
    self.cards_studied += 1;
    if quality.is_success() {
      self.cards_correct += 1;
    } else {
      self.cards_lapsed += 1;
    }
  }

  pub fn summary(&self) -> SessionSummary {
    let accuracy = if self.cards_studied == 0 {
      0.0
    } else {
      f64::from(self.cards_correct) / f64::from(self.cards_studied)
    };
    SessionSummary {
      cards_studied: self.cards_studied,
      cards_correct: self.cards_correct,
      cards_lapsed: self.cards_lapsed,
      accuracy,
    }
  }
}

/// Outcome of a study session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
  pub cards_studied: u32,
  pub cards_correct: u32,
  pub cards_lapsed:  u32,
  /// `cards_correct / cards_studied`, or `0` when nothing was studied.
  pub accuracy:      f64,
}

/// Drives a sequence of `(card_id, quality)` submissions for one user.
///
/// Each submission is independent: a failed submission leaves the counters
/// untouched and is reported to the caller, who decides whether to retry.
pub struct SessionAggregator<'a, R> {
  repo:         &'a R,
  user_id:      Uuid,
  tally:        SessionTally,
  max_attempts: u32,
}

impl<'a, R> SessionAggregator<'a, R>
where
  R: ProgressRepository,
{
  pub fn new(repo: &'a R, user_id: Uuid) -> Self {
    Self::resume(repo, user_id, SessionTally::default())
  }

  /// Continue a session whose counters were persisted earlier.
  pub fn resume(repo: &'a R, user_id: Uuid, tally: SessionTally) -> Self {
    Self { repo, user_id, tally, max_attempts: DEFAULT_MAX_ATTEMPTS }
  }

  pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
    self.max_attempts = max_attempts;
    self
  }

  /// Grade and persist one review, then count it.
  pub async fn submit(
    &mut self,
    card_id: Uuid,
    quality: Quality,
    now: DateTime<Utc>,
  ) -> Result<Reviewed> {
    let reviewed = review_card(
      self.repo,
      self.user_id,
      card_id,
      quality,
      now,
      self.max_attempts,
    )
    .await?;
    self.tally.record(quality);
    Ok(reviewed)
  }

  pub fn tally(&self) -> SessionTally { self.tally }

  pub fn summary(&self) -> SessionSummary { self.tally.summary() }

  pub fn finish(self) -> SessionSummary { self.tally.summary() }
}
