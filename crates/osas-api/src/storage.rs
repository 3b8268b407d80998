//! [`FileStorage`] on the local filesystem, plus the path and hash helpers
//! the upload handlers use.

use std::{
  io::{self, ErrorKind},
  path::{Component, Path, PathBuf},
};

use bytes::Bytes;
use osas_core::{document::DocumentOwner, storage::FileStorage};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt as _;
use uuid::Uuid;

/// Stores objects as plain files under `root`, served from `base_url`.
#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
  root:     PathBuf,
  base_url: String,
}

impl LocalDiskStorage {
  pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
    Self { root: root.into(), base_url: base_url.into() }
  }

  pub fn root(&self) -> &Path { &self.root }

  /// Resolve a relative object path, refusing anything that would escape
  /// `root`.
  fn resolve(&self, path: &str) -> io::Result<PathBuf> {
    let rel = Path::new(path);
    let clean = rel.components().all(|c| matches!(c, Component::Normal(_)));
    if !clean || path.is_empty() {
      return Err(io::Error::new(ErrorKind::InvalidInput, format!("invalid object path {path:?}")));
    }
    Ok(self.root.join(rel))
  }
}

impl FileStorage for LocalDiskStorage {
  type Error = io::Error;

  async fn store(&self, path: &str, bytes: Bytes) -> io::Result<()> {
    let full = self.resolve(path)?;
    if let Some(parent) = full.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new().write(true).create_new(true).open(&full).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    tracing::debug!(path, size = bytes.len(), "stored object");
    Ok(())
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url.trim_end_matches('/'), path)
  }

  async fn exists(&self, path: &str) -> io::Result<bool> {
    tokio::fs::try_exists(self.resolve(path)?).await
  }

  async fn delete(&self, path: &str) -> io::Result<()> {
    match tokio::fs::remove_file(self.resolve(path)?).await {
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      other => other,
    }
  }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Object path for an uploaded document:
/// `documents/{kind}/{owner_id}/{document_id}-{file name}`.
pub fn document_path(owner: DocumentOwner, document_id: Uuid, file_name: &str) -> String {
  let (kind, owner_id) = match owner {
    DocumentOwner::Application(id) => ("applications", id),
    DocumentOwner::Renewal(id) => ("renewals", id),
  };
  format!("documents/{kind}/{owner_id}/{document_id}-{}", sanitize_file_name(file_name))
}

/// Keep ASCII letters, digits, `.`, `-` and `_`; anything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
  let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
  let cleaned: String = base
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
    .collect();
  let trimmed = cleaned.trim_start_matches('.');
  if trimmed.is_empty() { "upload".to_owned() } else { trimmed.to_owned() }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String { hex::encode(Sha256::digest(bytes)) }

#[cfg(test)]
mod tests {
  use super::*;

  fn temp_storage() -> LocalDiskStorage {
    let root = std::env::temp_dir().join(format!("osas-storage-{}", Uuid::new_v4()));
    LocalDiskStorage::new(root, "http://files.test/")
  }

  #[tokio::test]
  async fn store_exists_delete() {
    let storage = temp_storage();
    let path = "documents/applications/a/b-grades.pdf";

    assert!(!storage.exists(path).await.unwrap());
    storage.store(path, Bytes::from_static(b"%PDF")).await.unwrap();
    assert!(storage.exists(path).await.unwrap());

    let err = storage.store(path, Bytes::from_static(b"again")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    storage.delete(path).await.unwrap();
    assert!(!storage.exists(path).await.unwrap());
    storage.delete(path).await.unwrap();

    let _ = std::fs::remove_dir_all(storage.root());
  }

  #[tokio::test]
  async fn escaping_paths_are_refused() {
    let storage = temp_storage();
    let err = storage.store("../outside", Bytes::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(storage.exists("/etc/passwd").await.is_err());
  }

  #[test]
  fn urls_join_cleanly() {
    assert_eq!(temp_storage().url("documents/x.pdf"), "http://files.test/documents/x.pdf");
  }

  #[test]
  fn file_names_are_sanitized() {
    assert_eq!(sanitize_file_name("My Grades (1).pdf"), "My_Grades__1_.pdf");
    assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
    assert_eq!(sanitize_file_name("..."), "upload");
    let id = Uuid::nil();
    assert_eq!(
      document_path(DocumentOwner::Renewal(id), id, "coe.pdf"),
      format!("documents/renewals/{id}/{id}-coe.pdf")
    );
  }

  #[test]
  fn hashes_are_sha256_hex() {
    assert_eq!(
      content_hash(b"abc"),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }
}
