//! Per-card retention state and the inputs that mutate it.
//!
//! A [`ProgressRecord`] exists for each (user, card) pair that has been
//! reviewed at least once. A card with no stored record behaves exactly like
//! [`ProgressRecord::fresh`]; fresh records are never persisted until their
//! first review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Easiness factor assigned to a card that has never been reviewed.
pub const INITIAL_EASINESS: f64 = 2.5;

/// Lower bound on the easiness factor.
pub const MIN_EASINESS: f64 = 1.3;

/// Upper bound on a scheduled interval, in days.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

// ─── Quality ─────────────────────────────────────────────────────────────────

/// Ordinal review outcome on the 0–5 scale.
///
/// `0` is a total failure to recall and `5` perfect, immediate recall.
/// `0..=2` count as a lapse, `3..=5` as a success.
///
/// Clients that only record correct/incorrect answers go through
/// [`Quality::from_correct`], which maps incorrect to `0` and correct to `4`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
  pub const MAX: u8 = 5;

  /// Lowest quality graded as a success.
  pub const PASSING: u8 = 3;

  /// Validate a raw quality value. Out-of-range input is rejected rather than
  /// clamped.
  pub fn new(value: i64) -> Result<Self> {
    if (0..=i64::from(Self::MAX)).contains(&value) {
      Ok(Self(value as u8))
    } else {
      Err(Error::InvalidQuality(value))
    }
  }

  /// Two-point reduction for binary answers: incorrect → 0, correct → 4.
  pub fn from_correct(correct: bool) -> Self {
    if correct { Self(4) } else { Self(0) }
  }

  pub fn value(self) -> u8 { self.0 }

  pub fn is_lapse(self) -> bool { self.0 < Self::PASSING }

  pub fn is_success(self) -> bool { !self.is_lapse() }
}

impl TryFrom<i64> for Quality {
  type Error = Error;

  fn try_from(value: i64) -> Result<Self> { Self::new(value) }
}

impl From<Quality> for u8 {
  fn from(q: Quality) -> Self { q.0 }
}

// ─── Version ─────────────────────────────────────────────────────────────────

/// Optimistic-concurrency token for a stored record.
///
/// [`Version::ABSENT`] is reported for cards with no stored record; every
/// committed write moves the token forward.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
  pub const ABSENT: Self = Self(0);

  pub fn from_raw(raw: u64) -> Self { Self(raw) }

  pub fn raw(self) -> u64 { self.0 }

  pub fn is_absent(self) -> bool { self == Self::ABSENT }

  /// The token a successful write against `self` produces.
  pub fn next(self) -> Self { Self(self.0 + 1) }
}

// ─── ProgressRecord ──────────────────────────────────────────────────────────

/// Durable retention state for one (user, card) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
  pub user_id:          Uuid,
  pub card_id:          Uuid,
  /// Never below [`MIN_EASINESS`].
  pub easiness_factor:  f64,
  /// Consecutive successful recalls since the last lapse.
  pub repetitions:      u32,
  /// Days from `last_reviewed_at` until the card is due. Always `0` or `1`
  /// while `repetitions == 0`.
  pub interval_days:    u32,
  pub due_at:           DateTime<Utc>,
  pub last_reviewed_at: Option<DateTime<Utc>>,
  /// Lifetime count of failed recalls; reporting only.
  pub lapses:           u32,
}

impl ProgressRecord {
  /// The implicit state of a card that has never been reviewed: due
  /// immediately, no streak, initial easiness.
  pub fn fresh(user_id: Uuid, card_id: Uuid) -> Self {
    Self {
      user_id,
      card_id,
      easiness_factor: INITIAL_EASINESS,
      repetitions: 0,
      interval_days: 0,
      due_at: DateTime::<Utc>::UNIX_EPOCH,
      last_reviewed_at: None,
      lapses: 0,
    }
  }

  /// `true` until the first review has been recorded.
  pub fn is_fresh(&self) -> bool { self.last_reviewed_at.is_none() }

  pub fn is_due(&self, now: DateTime<Utc>) -> bool { self.due_at <= now }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quality_accepts_full_scale() {
    for q in 0..=5 {
      assert_eq!(Quality::new(q).unwrap().value() as i64, q);
    }
  }

  #[test]
  fn quality_rejects_out_of_range() {
    assert!(matches!(Quality::new(6), Err(Error::InvalidQuality(6))));
    assert!(matches!(Quality::new(-1), Err(Error::InvalidQuality(-1))));
  }

  #[test]
  fn lapse_threshold_is_three() {
    assert!(Quality::new(2).unwrap().is_lapse());
    assert!(Quality::new(3).unwrap().is_success());
  }

  #[test]
  fn binary_reduction() {
    assert_eq!(Quality::from_correct(false).value(), 0);
    assert_eq!(Quality::from_correct(true).value(), 4);
  }

  #[test]
  fn quality_deserialization_validates() {
    let q: Quality = serde_json::from_str("5").unwrap();
    assert_eq!(q.value(), 5);
    assert!(serde_json::from_str::<Quality>("7").is_err());
    assert!(serde_json::from_str::<Quality>("-2").is_err());
  }

  #[test]
  fn fresh_record_is_due_immediately() {
    let record = ProgressRecord::fresh(Uuid::new_v4(), Uuid::new_v4());
    assert!(record.is_fresh());
    assert!(record.is_due(Utc::now()));
    assert_eq!(record.easiness_factor, INITIAL_EASINESS);
    assert_eq!(record.repetitions, 0);
  }

  #[test]
  fn version_advances() {
    assert!(Version::ABSENT.is_absent());
    assert_eq!(Version::ABSENT.next().raw(), 1);
    assert!(!Version::ABSENT.next().is_absent());
  }
}
