//! The single capability check applied before any deck- or card-scoped
//! operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, catalog::Deck};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
  pub user_id: Uuid,
}

impl Principal {
  pub fn new(user_id: Uuid) -> Self { Self { user_id } }

  pub fn owns(&self, deck: &Deck) -> bool { deck.user_id == self.user_id }
}

/// What the caller intends to do with a deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
  /// View the deck and its cards, fetch its queue, review its cards.
  Read,
  /// Change the deck or its cards.
  Write,
}

/// Grant `access` to `deck` for `principal`, or fail with
/// [`Error::AccessDenied`].
///
/// Owners may do anything; anyone may read a public deck.
pub fn authorize(principal: &Principal, deck: &Deck, access: Access) -> Result<()> {
  let granted = match access {
    Access::Read => principal.owns(deck) || deck.is_public,
    Access::Write => principal.owns(deck),
  };

  if granted {
    Ok(())
  } else {
    Err(Error::AccessDenied { deck_id: deck.deck_id })
  }
}
