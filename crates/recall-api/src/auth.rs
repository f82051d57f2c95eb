//! HTTP Basic-auth extractor resolving credentials to a [`Principal`].

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use recall_core::access::Principal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// One account allowed to use the API.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  /// Identity the account acts as; owner of its decks and progress.
  pub user_id:       Uuid,
}

/// The accounts of this server instance.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
  users: Vec<UserEntry>,
}

impl UserDirectory {
  pub fn new(users: Vec<UserEntry>) -> Self { Self { users } }

  /// Resolve the `Authorization` header to the principal it authenticates.
  pub fn verify(&self, headers: &HeaderMap) -> Result<Principal, ApiError> {
    let encoded = headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix("Basic "))
      .ok_or(ApiError::Unauthorized)?;

    let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
    let creds = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;
    let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

    let user = self
      .users
      .iter()
      .find(|u| u.username == username)
      .ok_or(ApiError::Unauthorized)?;

    let parsed_hash =
      PasswordHash::new(&user.password_hash).map_err(|_| ApiError::Unauthorized)?;
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed_hash)
      .map_err(|_| ApiError::Unauthorized)?;

    Ok(Principal::new(user.user_id))
  }
}

/// The authenticated caller of a handler.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Principal);

impl Caller {
  pub fn user_id(&self) -> Uuid { self.0.user_id }
}

impl<S> FromRequestParts<ApiState<S>> for Caller
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    state.users.verify(&parts.headers).map(Caller)
  }
}
