//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Store and storage failures are boxed as-is. When rendering, the error's
//! source chain is searched for an [`osas_core::Error`]; a broken business
//! rule found there decides the status code, anything else is a 500.

use std::error::Error as StdError;

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use osas_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Domain(#[from] CoreError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn StdError + Send + Sync>),

  #[error("file storage error: {0}")]
  Storage(#[source] Box<dyn StdError + Send + Sync>),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn store<E: StdError + Send + Sync + 'static>(e: E) -> Self { Self::Store(Box::new(e)) }

  pub fn storage<E: StdError + Send + Sync + 'static>(e: E) -> Self {
    Self::Storage(Box::new(e))
  }

  pub fn forbidden(message: impl Into<String>) -> Self { Self::Forbidden(message.into()) }

  /// The domain rule behind this error, wherever it sits in the chain.
  pub fn domain(&self) -> Option<&CoreError> {
    match self {
      Self::Domain(e) => Some(e),
      Self::Store(e) | Self::Storage(e) => find_domain(e.as_ref()),
      _ => None,
    }
  }
}

fn find_domain<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a CoreError> {
  let mut current = Some(err);
  while let Some(e) = current {
    if let Some(core) = e.downcast_ref::<CoreError>() {
      return Some(core);
    }
    current = e.source();
  }
  None
}

fn domain_status(e: &CoreError) -> StatusCode {
  match e {
    CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
    CoreError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    CoreError::TransitionNotPermitted { .. } => StatusCode::FORBIDDEN,
    CoreError::InvalidVerificationToken => StatusCode::BAD_REQUEST,
    e if e.is_conflict() => StatusCode::CONFLICT,
    _ => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    if let ApiError::Unauthorized = self {
      let mut res = (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" })))
        .into_response();
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"osas-connect\""),
      );
      return res;
    }

    if let Some(domain) = self.domain() {
      let status = domain_status(domain);
      let body = match domain {
        CoreError::Validation { field, message } => {
          json!({ "error": domain.to_string(), "field": field, "message": message })
        }
        _ => json!({ "error": domain.to_string() }),
      };
      if status.is_server_error() {
        tracing::error!(error = %domain, "request failed");
      }
      return (status, Json(body)).into_response();
    }

    let (status, message) = match &self {
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      other => {
        tracing::error!(error = %other, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
