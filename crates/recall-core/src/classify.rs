//! Mastery buckets for reporting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uuid::Uuid;

use crate::progress::ProgressRecord;

/// Easiness factor at or above which a reviewed card counts as mastered.
pub const MASTERY_THRESHOLD: f64 = 2.5;

/// Coarse learning state of a card for one user.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mastery {
  /// No stored record.
  New,
  /// Stored record with easiness below [`MASTERY_THRESHOLD`].
  Learning,
  /// Stored record with easiness at or above [`MASTERY_THRESHOLD`].
  Mastered,
}

/// Total over all records; never fails.
pub fn classify(record: Option<&ProgressRecord>) -> Mastery {
  match record {
    None => Mastery::New,
    Some(r) if r.easiness_factor >= MASTERY_THRESHOLD => Mastery::Mastered,
    Some(_) => Mastery::Learning,
  }
}

/// Per-bucket card counts. `new + learning + mastered == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasteryCounts {
  pub total:    usize,
  pub mastered: usize,
  pub learning: usize,
  pub new:      usize,
}

impl MasteryCounts {
  /// Classify every card in `card_ids` against the stored `records`.
  ///
  /// Records whose card is not in `card_ids` are ignored, so the counts
  /// always partition exactly the given card set.
  pub fn tally(card_ids: &[Uuid], records: &[ProgressRecord]) -> Self {
    let by_card: HashMap<Uuid, &ProgressRecord> =
      records.iter().map(|r| (r.card_id, r)).collect();

    card_ids.iter().fold(Self::default(), |mut counts, id| {
      counts.add(classify(by_card.get(id).copied()));
      counts
    })
  }

  pub fn add(&mut self, mastery: Mastery) {
    self.total += 1;
    match mastery {
      Mastery::New => self.new += 1,
      Mastery::Learning => self.learning += 1,
      Mastery::Mastered => self.mastered += 1,
    }
  }

  pub fn get(&self, mastery: Mastery) -> usize {
    match mastery {
      Mastery::New => self.new,
      Mastery::Learning => self.learning,
      Mastery::Mastered => self.mastered,
    }
  }
}

impl std::ops::AddAssign for MasteryCounts {
  fn add_assign(&mut self, rhs: Self) {
    self.total += rhs.total;
    self.mastered += rhs.mastered;
    self.learning += rhs.learning;
    self.new += rhs.new;
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  fn with_ef(card_id: Uuid, ef: f64, repetitions: u32) -> ProgressRecord {
    ProgressRecord {
      easiness_factor: ef,
      repetitions,
      ..ProgressRecord::fresh(Uuid::nil(), card_id)
    }
  }

  #[test]
  fn absent_record_is_new() {
    assert_eq!(classify(None), Mastery::New);
  }

  #[test]
  fn threshold_is_inclusive() {
    let id = Uuid::new_v4();
    assert_eq!(classify(Some(&with_ef(id, 2.5, 1))), Mastery::Mastered);
    assert_eq!(classify(Some(&with_ef(id, 2.49, 9))), Mastery::Learning);
  }

  #[test]
  fn learning_ignores_repetitions() {
    let id = Uuid::new_v4();
    assert_eq!(classify(Some(&with_ef(id, 1.3, 0))), Mastery::Learning);
  }

  #[test]
  fn tally_partitions_the_deck() {
    let cards: Vec<Uuid> = (0..7).map(|_| Uuid::new_v4()).collect();
    let records = vec![
      with_ef(cards[0], 2.6, 3),
      with_ef(cards[1], 2.5, 1),
      with_ef(cards[2], 1.7, 0),
      // Belongs to some other deck; must not be counted.
      with_ef(Uuid::new_v4(), 2.8, 4),
    ];

    let counts = MasteryCounts::tally(&cards, &records);
    assert_eq!(counts.total, 7);
    assert_eq!(counts.mastered, 2);
    assert_eq!(counts.learning, 1);
    assert_eq!(counts.new, 4);

    let summed: usize = Mastery::iter().map(|m| counts.get(m)).sum();
    assert_eq!(summed, counts.total);
  }

  #[test]
  fn counts_accumulate() {
    let mut a = MasteryCounts::default();
    a.add(Mastery::New);
    let mut b = MasteryCounts::default();
    b.add(Mastery::Mastered);
    b.add(Mastery::Learning);
    a += b;
    assert_eq!(a, MasteryCounts { total: 3, mastered: 1, learning: 1, new: 1 });
  }

  #[test]
  fn display_matches_serde() {
    assert_eq!(Mastery::Mastered.to_string(), "mastered");
    assert_eq!(serde_json::to_string(&Mastery::New).unwrap(), "\"new\"");
  }
}
