//! Handlers for `/scholarships` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/scholarships` | Optional `status`, `include_drafts` (ignored for students) |
//! | `GET`    | `/scholarships/:id` | Students never see drafts or deleted rows |
//! | `POST`   | `/scholarships` | Admin only. Body: [`NewScholarship`]; returns 201 |
//! | `PATCH`  | `/scholarships/:id` | Admin only. Body: [`ScholarshipPatch`] |
//! | `DELETE` | `/scholarships/:id` | Admin only. Soft delete |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use osas_core::{
  scholarship::{NewScholarship, Scholarship, ScholarshipPatch, ScholarshipStatus},
  storage::FileStorage,
  store::{ScholarshipQuery, ScholarshipStore},
};
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// Whether `caller` may see `scholarship` at all.
pub(crate) fn visible_to(caller: &CurrentUser, scholarship: &Scholarship) -> bool {
  caller.is_staff()
    || (!scholarship.is_deleted() && scholarship.status != ScholarshipStatus::Draft)
}

/// `GET /scholarships`
pub async fn list<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Query(mut query): Query<ScholarshipQuery>,
) -> Result<Json<Vec<Scholarship>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  if !caller.is_staff() {
    query.include_drafts = false;
  }
  let scholarships = state.store.list_scholarships(query).await.map_err(ApiError::store)?;
  Ok(Json(scholarships))
}

/// `GET /scholarships/:id`
pub async fn get_one<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Scholarship>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let scholarship = state
    .store
    .get_scholarship(id)
    .await
    .map_err(ApiError::store)?
    .filter(|s| visible_to(&caller, s))
    .ok_or_else(|| ApiError::NotFound(format!("scholarship {id}")))?;
  Ok(Json(scholarship))
}

/// `POST /scholarships`
pub async fn create<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Json(body): Json<NewScholarship>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_admin()?;
  let scholarship = state.store.create_scholarship(body).await.map_err(ApiError::store)?;
  tracing::info!(scholarship_id = %scholarship.scholarship_id, "scholarship created");
  Ok((StatusCode::CREATED, Json(scholarship)))
}

/// `PATCH /scholarships/:id`
pub async fn update<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(patch): Json<ScholarshipPatch>,
) -> Result<Json<Scholarship>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_admin()?;
  let scholarship = state.store.update_scholarship(id, patch).await.map_err(ApiError::store)?;
  Ok(Json(scholarship))
}

/// `DELETE /scholarships/:id`
pub async fn delete<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Scholarship>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_admin()?;
  let scholarship = state.store.delete_scholarship(id).await.map_err(ApiError::store)?;
  tracing::info!(scholarship_id = %id, "scholarship deleted");
  Ok(Json(scholarship))
}
