//! The [`FileStorage`] trait: where uploaded document bytes live.

use std::future::Future;

use bytes::Bytes;

/// Blob storage keyed by a relative path.
///
/// Paths are chosen by the caller and recorded on the document row, so an
/// implementation must never rename or relocate a stored object.
pub trait FileStorage: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Write `bytes` at `path`, replacing nothing: an existing object is an
  /// error.
  fn store<'a>(
    &'a self,
    path: &'a str,
    bytes: Bytes,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// A URL a client can fetch the object from.
  fn url(&self, path: &str) -> String;

  fn exists<'a>(
    &'a self,
    path: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn delete<'a>(&'a self, path: &'a str)
  -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
