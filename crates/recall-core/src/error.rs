//! Error types for `recall-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// A review quality outside `0..=5`. Raised before anything is read or
  /// written.
  #[error("invalid quality {0}: expected an integer in 0..=5")]
  InvalidQuality(i64),

  #[error("invalid new-card ratio {0}: expected a finite value in 0..=1")]
  InvalidRatio(f64),

  /// The stored record changed between read and write.
  #[error("progress for card {card_id} was modified concurrently")]
  VersionConflict { user_id: Uuid, card_id: Uuid },

  /// Every write attempt for a review lost the optimistic-concurrency race.
  #[error("could not commit review of card {card_id} after {attempts} attempts")]
  SchedulingUnavailable { card_id: Uuid, attempts: u32 },

  #[error("access to deck {deck_id} denied")]
  AccessDenied { deck_id: Uuid },

  #[error("repository unavailable: {0}")]
  RepositoryUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a storage-boundary failure.
  pub fn repository<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::RepositoryUnavailable(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
