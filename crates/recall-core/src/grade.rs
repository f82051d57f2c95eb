//! Review grading with the SM-2 update rule.
//!
//! [`grade`] is a pure function of its arguments: the same record, quality
//! and timestamp always produce a bit-identical result. Conflict retries in
//! [`crate::session::review_card`] rely on this to re-grade against fresh
//! state without double-applying a review.

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::progress::{
  MAX_INTERVAL_DAYS, MIN_EASINESS, ProgressRecord, Quality,
};

/// Interval after the first successful recall in a streak.
const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval after the second successful recall in a streak.
const SECOND_INTERVAL_DAYS: u32 = 6;

/// Interval assigned after a lapse.
const LAPSE_INTERVAL_DAYS: u32 = 1;

/// Apply one review to `record` (or to a fresh record for `card_id` when
/// `record` is `None`) and return the updated state.
///
/// - The easiness factor moves by
///   `0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)` on every review and is then
///   clamped to [`MIN_EASINESS`].
/// - A lapse (`q < 3`) resets the streak: `repetitions = 0`,
///   `interval_days = 1`, `lapses += 1`.
/// - A success increments the streak; the interval is 1 day, then 6 days,
///   then the previous interval times the new easiness factor, rounded half
///   away from zero and capped at [`MAX_INTERVAL_DAYS`].
pub fn grade(
  record: Option<&ProgressRecord>,
  user_id: Uuid,
  card_id: Uuid,
  quality: Quality,
  now: DateTime<Utc>,
) -> ProgressRecord {
  let mut next = match record {
    Some(r) => r.clone(),
    None => ProgressRecord::fresh(user_id, card_id),
  };

  next.easiness_factor = next_easiness(next.easiness_factor, quality);

  if quality.is_lapse() {
    next.repetitions = 0;
    next.interval_days = LAPSE_INTERVAL_DAYS;
    next.lapses += 1;
  } else {
    next.repetitions += 1;
    next.interval_days = match next.repetitions {
      1 => FIRST_INTERVAL_DAYS,
      2 => SECOND_INTERVAL_DAYS,
      _ => scaled_interval(next.interval_days, next.easiness_factor),
    };
  }

  next.last_reviewed_at = Some(now);
  next.due_at = now + TimeDelta::days(i64::from(next.interval_days));
  next
}

/// `ef' = max(ef + 0.1 - (5 - q) * (0.08 + (5 - q) * 0.02), 1.3)`
pub fn next_easiness(ef: f64, quality: Quality) -> f64 {
  // Evaluated in hundredths so that q = 4 leaves `ef` exactly unchanged.
  let miss = i32::from(Quality::MAX - quality.value());
  let delta = f64::from(10 - miss * (8 + miss * 2)) / 100.0;
  (ef + delta).max(MIN_EASINESS)
}

fn scaled_interval(previous: u32, ef: f64) -> u32 {
  // `f64::round` rounds half away from zero; the float-to-int cast saturates.
  let scaled = (f64::from(previous) * ef).round() as u32;
  scaled.min(MAX_INTERVAL_DAYS)
}
