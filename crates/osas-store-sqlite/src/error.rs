//! Error type for `osas-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A business rule refused the operation.
  #[error("{0}")]
  Core(#[from] osas_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A column held text that does not decode to its domain type.
  #[error("cannot decode column {column}: {message}")]
  Decode {
    column:  &'static str,
    message: String,
  },
}

impl Error {
  pub(crate) fn decode(column: &'static str, message: impl ToString) -> Self {
    Self::Decode { column, message: message.to_string() }
  }

  /// The domain rule behind this error, if any.
  pub fn as_core(&self) -> Option<&osas_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

// Errors raised inside a `Connection::call` closure travel back boxed in
// `tokio_rusqlite::Error::Other`; unwrap them again on the way out.
impl From<Error> for tokio_rusqlite::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Sqlite(e) => tokio_rusqlite::Error::Rusqlite(e),
      other => tokio_rusqlite::Error::Other(Box::new(other)),
    }
  }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
        Ok(ours) => *ours,
        Err(inner) => Error::Database(tokio_rusqlite::Error::Other(inner)),
      },
      other => Error::Database(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
