//! HTTP Basic authentication against stored accounts.
//!
//! The username is the account email. Passwords are checked against the
//! argon2 PHC string on the account; accounts that have not verified their
//! email are refused with 403 even when the password matches.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{self, SaltString},
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use osas_core::{
  storage::FileStorage,
  store::ScholarshipStore,
  user::{Actor, User},
};
use rand_core::{OsRng, RngCore};

use crate::{AppState, error::ApiError};

/// The authenticated, verified caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
  pub fn actor(&self) -> Actor { self.0.actor() }

  pub fn is_staff(&self) -> bool { self.0.role.is_staff() }

  /// Admin or OSAS staff.
  pub fn require_staff(&self) -> Result<(), ApiError> {
    if self.is_staff() {
      Ok(())
    } else {
      Err(ApiError::forbidden("staff access required"))
    }
  }

  pub fn require_admin(&self) -> Result<(), ApiError> {
    if self.0.role == osas_core::user::Role::Admin {
      Ok(())
    } else {
      Err(ApiError::forbidden("admin access required"))
    }
  }

  /// Staff may see any record; a student only records whose owner is them.
  /// Someone else's record is reported as missing.
  pub fn require_owner_or_staff(&self, owner_id: uuid::Uuid, what: &str) -> Result<(), ApiError> {
    if self.is_staff() || self.0.user_id == owner_id {
      Ok(())
    } else {
      Err(ApiError::NotFound(what.to_owned()))
    }
  }
}

/// Pull `(email, password)` out of an `Authorization: Basic` header.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val.strip_prefix("Basic ").ok_or(ApiError::Unauthorized)?;
  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((email.to_owned(), password.to_owned()))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

/// Hash `password` into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// A fresh 256-bit token, hex encoded.
pub fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

impl<S, F> FromRequestParts<AppState<S, F>> for CurrentUser
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, F>,
  ) -> Result<Self, Self::Rejection> {
    let (email, password) = basic_credentials(&parts.headers)?;

    let user = state
      .store
      .find_user_by_email(&email)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&password, &user.password_hash) {
      tracing::debug!(%email, "rejected credentials");
      return Err(ApiError::Unauthorized);
    }
    if !user.is_verified() {
      return Err(ApiError::forbidden("email address is not verified"));
    }
    Ok(CurrentUser(user))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn headers(value: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    map
  }

  #[test]
  fn decodes_basic_credentials() {
    let value = format!("Basic {}", B64.encode("ana@example.edu:s3cret:with:colons"));
    let (email, password) = basic_credentials(&headers(&value)).unwrap();
    assert_eq!(email, "ana@example.edu");
    assert_eq!(password, "s3cret:with:colons");
  }

  #[test]
  fn rejects_malformed_headers() {
    assert!(matches!(basic_credentials(&HeaderMap::new()), Err(ApiError::Unauthorized)));
    assert!(matches!(
      basic_credentials(&headers("Bearer abc")),
      Err(ApiError::Unauthorized)
    ));
    assert!(matches!(
      basic_credentials(&headers("Basic !!!not-base64!!!")),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn hashes_verify() {
    let phc = hash_password("hunter2").unwrap();
    assert!(phc.starts_with("$argon2"));
    assert!(verify_password("hunter2", &phc));
    assert!(!verify_password("hunter3", &phc));
    assert!(!verify_password("hunter2", "not a phc string"));
  }

  #[test]
  fn tokens_are_unique_hex() {
    let a = new_token();
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, new_token());
  }
}
