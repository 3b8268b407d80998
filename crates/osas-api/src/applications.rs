//! Handlers for `/applications` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/applications` | Optional `scholarship_id`, `status`; students only see their own |
//! | `POST` | `/applications` | Student only. Body: `{"scholarship_id":"..."}`; returns 201 draft |
//! | `GET`  | `/applications/:id` | Owner or staff |
//! | `POST` | `/applications/:id/transition` | Body: [`TransitionBody`] |
//! | `GET`  | `/applications/:id/history` | Owner or staff, oldest first |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use osas_core::{
  application::{Application, ApplicationStatus, StatusChange, TransitionRequest},
  notification::Mail,
  storage::FileStorage,
  store::{ApplicationQuery, ScholarshipStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// Load an application the caller is allowed to see.
pub(crate) async fn visible_application<S, F>(
  state: &AppState<S, F>,
  caller: &CurrentUser,
  id: Uuid,
) -> Result<Application, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let missing = || ApiError::NotFound(format!("application {id}"));
  let application = state
    .store
    .get_application(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(missing)?;
  if !caller.is_staff() && application.student_id != caller.0.user_id {
    return Err(missing());
  }
  Ok(application)
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /applications`
pub async fn list<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Query(mut query): Query<ApplicationQuery>,
) -> Result<Json<Vec<Application>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  if !caller.is_staff() {
    query.student_id = Some(caller.0.user_id);
  }
  let applications = state.store.list_applications(query).await.map_err(ApiError::store)?;
  Ok(Json(applications))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub scholarship_id: Uuid,
}

/// `POST /applications`
pub async fn create<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let application = state
    .store
    .create_application(caller.actor(), body.scholarship_id)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(application)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /applications/:id`
pub async fn get_one<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Application>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  Ok(Json(visible_application(&state, &caller, id).await?))
}

// ─── Transition ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
  pub to:   ApplicationStatus,
  /// Recorded on the audit row and, for staff moves, shown to the student.
  pub note: Option<String>,
}

/// `POST /applications/:id/transition`
pub async fn transition<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<TransitionBody>,
) -> Result<Json<Application>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let before = visible_application(&state, &caller, id).await?;

  let application = state
    .store
    .transition_application(id, TransitionRequest {
      to:    body.to,
      actor: caller.actor(),
      note:  body.note.clone(),
    })
    .await
    .map_err(ApiError::store)?;

  notify_status_change(&state, &before, &application, body.note).await;
  Ok(Json(application))
}

/// Tell the student their application moved.
pub(crate) async fn notify_status_change<S, F>(
  state: &AppState<S, F>,
  before: &Application,
  after: &Application,
  remarks: Option<String>,
) where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  if before.status == after.status {
    return;
  }
  let Some(to) = state.recipient(after.student_id).await else { return };
  let scholarship_name = state.scholarship_name(after.scholarship_id).await;
  state.notify(Mail::StatusChanged {
    to,
    scholarship_name,
    old_status: before.status,
    new_status: after.status,
    remarks,
  });
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /applications/:id/history`
pub async fn history<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusChange>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  visible_application(&state, &caller, id).await?;
  let history = state.store.application_history(id).await.map_err(ApiError::store)?;
  Ok(Json(history))
}
