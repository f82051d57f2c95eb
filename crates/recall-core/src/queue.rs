//! Due-queue selection: which cards a study session should see next.
//!
//! Overdue cards come first, most overdue first. Fresh (never reviewed)
//! cards are interleaved at a fixed stride so that neither pool starves:
//! with a stride of `k`, one fresh card follows every `k` due cards. Once a
//! pool runs dry the other fills the remaining slots.

use std::{collections::HashSet, iter::FusedIterator};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result, progress::ProgressRecord, store::ProgressRepository};

/// Select the next batch of at most `limit` cards for `user_id` in
/// `deck_id`.
///
/// `new_card_ratio` must be finite and within `0..=1`. A ratio of `0`
/// surfaces fresh cards only after every due card; otherwise one fresh card
/// is inserted after every `round(1 / ratio)` due cards.
///
/// The ratio is validated before the repository is consulted.
pub async fn next_batch<R>(
  repo: &R,
  user_id: Uuid,
  deck_id: Uuid,
  now: DateTime<Utc>,
  limit: usize,
  new_card_ratio: f64,
) -> Result<DueQueue>
where
  R: ProgressRepository,
{
  let stride = stride_for(new_card_ratio)?;

  let mut due = repo
    .list_due(user_id, deck_id, now)
    .await
    .map_err(Error::repository)?;
  due.retain(|r| r.is_due(now));

  let fresh = repo
    .list_fresh(user_id, deck_id)
    .await
    .map_err(Error::repository)?;

  Ok(DueQueue::with_stride(due, fresh, limit, stride))
}

/// Number of due cards between consecutive fresh cards; `None` means fresh
/// cards wait until the due pool is exhausted.
pub fn stride_for(new_card_ratio: f64) -> Result<Option<usize>> {
  if !new_card_ratio.is_finite() || !(0.0..=1.0).contains(&new_card_ratio) {
    return Err(Error::InvalidRatio(new_card_ratio));
  }
  if new_card_ratio == 0.0 {
    return Ok(None);
  }
  let k = (1.0 / new_card_ratio).round() as usize;
  Ok(Some(k.max(1)))
}

// ─── DueQueue ────────────────────────────────────────────────────────────────

/// A finite, single-pass sequence of card ids.
///
/// The interleave is computed lazily as the iterator is driven. No card id
/// is yielded twice, and the sequence never exceeds the batch limit.
#[derive(Debug)]
pub struct DueQueue {
  due:         std::vec::IntoIter<Uuid>,
  fresh:       std::vec::IntoIter<Uuid>,
  stride:      Option<usize>,
  since_fresh: usize,
  remaining:   usize,
}

impl DueQueue {
  /// Build a queue from raw pools. Due records are ordered by `due_at`
  /// ascending, ties broken by `card_id`; duplicate ids are dropped, with a
  /// card present in both pools kept as due.
  pub fn new(
    due: Vec<ProgressRecord>,
    fresh: Vec<Uuid>,
    limit: usize,
    new_card_ratio: f64,
  ) -> Result<Self> {
    Ok(Self::with_stride(due, fresh, limit, stride_for(new_card_ratio)?))
  }

  fn with_stride(
    mut due: Vec<ProgressRecord>,
    fresh: Vec<Uuid>,
    limit: usize,
    stride: Option<usize>,
  ) -> Self {
    due.sort_by(|a, b| a.due_at.cmp(&b.due_at).then(a.card_id.cmp(&b.card_id)));

    let mut seen = HashSet::with_capacity(due.len() + fresh.len());
    let due: Vec<Uuid> = due
      .into_iter()
      .map(|r| r.card_id)
      .filter(|id| seen.insert(*id))
      .collect();
    let fresh: Vec<Uuid> =
      fresh.into_iter().filter(|id| seen.insert(*id)).collect();

    let remaining = limit.min(due.len() + fresh.len());

    Self {
      due: due.into_iter(),
      fresh: fresh.into_iter(),
      stride,
      since_fresh: 0,
      remaining,
    }
  }

  fn pull(&mut self) -> Option<Uuid> {
    let fresh_turn = matches!(self.stride, Some(k) if self.since_fresh >= k);
    if fresh_turn && let Some(id) = self.fresh.next() {
      self.since_fresh = 0;
      return Some(id);
    }
    if let Some(id) = self.due.next() {
      self.since_fresh += 1;
      return Some(id);
    }
    self.fresh.next()
  }
}

impl Iterator for DueQueue {
  type Item = Uuid;

  fn next(&mut self) -> Option<Uuid> {
    if self.remaining == 0 {
      return None;
    }
    let id = self.pull()?;
    self.remaining -= 1;
    Some(id)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}

impl ExactSizeIterator for DueQueue {}

impl FusedIterator for DueQueue {}
