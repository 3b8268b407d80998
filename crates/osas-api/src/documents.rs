//! Handlers for document upload and verification.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/applications/:id/documents` | Owner or staff |
//! | `POST` | `/applications/:id/documents` | Owner or staff. Body: [`UploadBody`]; returns 201 |
//! | `GET`  | `/renewals/:id/documents` | Owner or staff |
//! | `POST` | `/renewals/:id/documents` | Owner or staff. Body: [`UploadBody`]; returns 201 |
//! | `GET`  | `/documents/:id` | Metadata plus a download `url` |
//! | `POST` | `/documents/:id/review` | Staff only. Body: [`DocumentReview`] |
//!
//! Bytes are written through [`FileStorage`] before the row is recorded; if
//! recording fails the stored object is removed again.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use bytes::Bytes;
use osas_core::{
  Error as CoreError,
  document::{Document, DocumentOwner, DocumentReview, DocumentType, NewDocument},
  notification::Mail,
  storage::FileStorage,
  store::ScholarshipStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  applications::visible_application,
  auth::CurrentUser,
  error::ApiError,
  renewals::visible_renewal,
  storage::{content_hash, document_path},
};

#[derive(Debug, Serialize)]
pub struct DocumentView {
  #[serde(flatten)]
  pub document: Document,
  pub url:      String,
}

/// The student and scholarship a document belongs to, checking that the
/// caller may see it.
async fn resolve_owner<S, F>(
  state: &AppState<S, F>,
  caller: &CurrentUser,
  owner: DocumentOwner,
) -> Result<(Uuid, Uuid), ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  match owner {
    DocumentOwner::Application(id) => {
      let app = visible_application(state, caller, id).await?;
      Ok((app.student_id, app.scholarship_id))
    }
    DocumentOwner::Renewal(id) => {
      let renewal = visible_renewal(state, caller, id).await?;
      Ok((renewal.student_id, renewal.scholarship_id))
    }
  }
}

// ─── Upload ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UploadBody {
  pub document_type:  DocumentType,
  pub file_name:      String,
  #[serde(default = "default_mime")]
  pub mime_type:      String,
  /// File contents, standard base64.
  pub content_base64: String,
}

fn default_mime() -> String { "application/octet-stream".to_owned() }

/// `POST /applications/:id/documents`
pub async fn upload_for_application<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<UploadBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let document = upload(&state, &caller, DocumentOwner::Application(id), body).await?;
  Ok((StatusCode::CREATED, Json(document)))
}

/// `POST /renewals/:id/documents`
pub async fn upload_for_renewal<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<UploadBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let document = upload(&state, &caller, DocumentOwner::Renewal(id), body).await?;
  Ok((StatusCode::CREATED, Json(document)))
}

async fn upload<S, F>(
  state: &AppState<S, F>,
  caller: &CurrentUser,
  owner: DocumentOwner,
  body: UploadBody,
) -> Result<DocumentView, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  resolve_owner(state, caller, owner).await?;

  if body.file_name.trim().is_empty() {
    return Err(CoreError::validation("file_name", "must not be empty").into());
  }
  let bytes = B64
    .decode(body.content_base64.trim())
    .map_err(|_| CoreError::validation("content_base64", "is not valid base64"))?;
  if bytes.is_empty() {
    return Err(CoreError::validation("content_base64", "file is empty").into());
  }
  if bytes.len() > state.config.max_upload_bytes {
    return Err(
      CoreError::validation(
        "content_base64",
        format!("file exceeds {} bytes", state.config.max_upload_bytes),
      )
      .into(),
    );
  }

  let document_id = Uuid::new_v4();
  let storage_path = document_path(owner, document_id, &body.file_name);
  let size_bytes = bytes.len() as u64;
  let hash = content_hash(&bytes);

  state
    .files
    .store(&storage_path, Bytes::from(bytes))
    .await
    .map_err(ApiError::storage)?;

  let recorded = state
    .store
    .record_document(NewDocument {
      document_id,
      owner,
      document_type: body.document_type,
      file_name: body.file_name,
      storage_path: storage_path.clone(),
      mime_type: body.mime_type,
      size_bytes,
      content_hash: hash,
    })
    .await;

  let document = match recorded {
    Ok(document) => document,
    Err(e) => {
      if let Err(cleanup) = state.files.delete(&storage_path).await {
        tracing::warn!(path = %storage_path, error = %cleanup, "orphaned upload left behind");
      }
      return Err(ApiError::store(e));
    }
  };

  tracing::info!(
    document_id = %document.document_id,
    document_type = %document.document_type,
    size_bytes,
    "document uploaded"
  );
  let url = state.files.url(&document.storage_path);
  Ok(DocumentView { document, url })
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /applications/:id/documents`
pub async fn list_for_application<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<DocumentView>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  list(&state, &caller, DocumentOwner::Application(id)).await.map(Json)
}

/// `GET /renewals/:id/documents`
pub async fn list_for_renewal<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<DocumentView>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  list(&state, &caller, DocumentOwner::Renewal(id)).await.map(Json)
}

async fn list<S, F>(
  state: &AppState<S, F>,
  caller: &CurrentUser,
  owner: DocumentOwner,
) -> Result<Vec<DocumentView>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  resolve_owner(state, caller, owner).await?;
  let documents = state.store.list_documents(owner).await.map_err(ApiError::store)?;
  Ok(
    documents
      .into_iter()
      .map(|document| {
        let url = state.files.url(&document.storage_path);
        DocumentView { document, url }
      })
      .collect(),
  )
}

/// `GET /documents/:id`
pub async fn get_one<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<DocumentView>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let document = state
    .store
    .get_document(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("document {id}")))?;
  resolve_owner(&state, &caller, document.owner).await?;
  let url = state.files.url(&document.storage_path);
  Ok(Json(DocumentView { document, url }))
}

// ─── Review ───────────────────────────────────────────────────────────────────

/// `POST /documents/:id/review`
pub async fn review<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(review): Json<DocumentReview>,
) -> Result<Json<Document>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let document = state
    .store
    .review_document(id, review, caller.actor())
    .await
    .map_err(ApiError::store)?;

  tracing::info!(document_id = %id, status = %document.status, "document reviewed");

  let (student_id, scholarship_id) = resolve_owner(&state, &caller, document.owner).await?;
  if let Some(to) = state.recipient(student_id).await {
    state.notify(Mail::DocumentVerification {
      to,
      scholarship_name: state.scholarship_name(scholarship_id).await,
      document_type: document.document_type,
      file_name: document.file_name.clone(),
      verification_status: document.status,
      notes: document.notes.clone(),
    });
  }
  Ok(Json(document))
}
