//! Handlers for student assistantship assignments, work-hour logs, and
//! payroll.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/assignments` | Staff may filter by `student_id`; students see their own |
//! | `POST` | `/assignments` | Staff only. Body: [`NewAssignment`]; returns 201 |
//! | `GET`  | `/assignments/:id` | Assistant, supervisor, or staff |
//! | `GET`  | `/assignments/:id/logs` | Assistant, supervisor, or staff |
//! | `POST` | `/assignments/:id/logs` | Assistant only. Body: [`NewWorkHourLog`]; returns 201 |
//! | `POST` | `/work-logs/:id/review` | Supervisor or staff. Body: [`WorkLogReview`] |
//! | `GET`  | `/assignments/:id/payments` | Assistant, supervisor, or staff |
//! | `POST` | `/assignments/:id/payments` | Staff only. Body: [`PaymentPeriod`]; returns 201 |
//! | `GET`  | `/payments/:id` | Assistant, supervisor, or staff |
//! | `POST` | `/payments/:id/{process,release,fail,cancel}` | Staff only |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use osas_core::{
  assistantship::{
    Assignment, AssistantshipPayment, NewAssignment, NewWorkHourLog, PaymentPeriod, WorkHourLog,
    WorkLogReview,
  },
  storage::FileStorage,
  store::ScholarshipStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::ApiError, stipends::action_status};

/// Load an assignment the caller takes part in (or any, for staff).
async fn visible_assignment<S, F>(
  state: &AppState<S, F>,
  caller: &CurrentUser,
  id: Uuid,
) -> Result<Assignment, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let missing = || ApiError::NotFound(format!("assignment {id}"));
  let assignment =
    state.store.get_assignment(id).await.map_err(ApiError::store)?.ok_or_else(missing)?;
  let me = caller.0.user_id;
  if !caller.is_staff() && assignment.student_id != me && assignment.supervisor_id != me {
    return Err(missing());
  }
  Ok(assignment)
}

// ─── Assignments ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignmentParams {
  pub student_id: Option<Uuid>,
}

/// `GET /assignments`
pub async fn list_assignments<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Query(params): Query<AssignmentParams>,
) -> Result<Json<Vec<Assignment>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let student_id = if caller.is_staff() { params.student_id } else { Some(caller.0.user_id) };
  Ok(Json(state.store.list_assignments(student_id).await.map_err(ApiError::store)?))
}

/// `POST /assignments`
pub async fn create_assignment<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Json(body): Json<NewAssignment>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let assignment = state.store.create_assignment(body).await.map_err(ApiError::store)?;
  tracing::info!(assignment_id = %assignment.assignment_id, "assignment created");
  Ok((StatusCode::CREATED, Json(assignment)))
}

/// `GET /assignments/:id`
pub async fn get_assignment<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  Ok(Json(visible_assignment(&state, &caller, id).await?))
}

// ─── Work-hour logs ───────────────────────────────────────────────────────────

/// `GET /assignments/:id/logs`
pub async fn list_logs<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<WorkHourLog>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  visible_assignment(&state, &caller, id).await?;
  Ok(Json(state.store.list_work_logs(id).await.map_err(ApiError::store)?))
}

/// `POST /assignments/:id/logs`
pub async fn log_hours<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<NewWorkHourLog>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let assignment = visible_assignment(&state, &caller, id).await?;
  if assignment.student_id != caller.0.user_id {
    return Err(ApiError::forbidden("only the assigned student may log hours"));
  }
  let log = state
    .store
    .log_work_hours(id, body, Utc::now().date_naive())
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(log)))
}

/// `POST /work-logs/:id/review`
pub async fn review_log<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(review): Json<WorkLogReview>,
) -> Result<Json<WorkHourLog>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let log = state
    .store
    .get_work_log(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("work log {id}")))?;
  let assignment = visible_assignment(&state, &caller, log.assignment_id).await?;
  if !caller.is_staff() && assignment.supervisor_id != caller.0.user_id {
    return Err(ApiError::forbidden("only the supervisor or staff may review hours"));
  }

  let log = state.store.review_work_log(id, review, caller.actor()).await.map_err(ApiError::store)?;
  tracing::info!(log_id = %id, status = %log.status, "work log reviewed");
  Ok(Json(log))
}

// ─── Payments ─────────────────────────────────────────────────────────────────

/// `GET /assignments/:id/payments`
pub async fn list_payments<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<AssistantshipPayment>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  visible_assignment(&state, &caller, id).await?;
  Ok(Json(state.store.list_payments(id).await.map_err(ApiError::store)?))
}

/// `POST /assignments/:id/payments`
pub async fn create_payment<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(period): Json<PaymentPeriod>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let payment = state.store.create_payment(id, period).await.map_err(ApiError::store)?;
  tracing::info!(
    payment_id = %payment.payment_id,
    total_hours = %payment.total_hours,
    gross_amount = %payment.gross_amount,
    "payment computed"
  );
  Ok((StatusCode::CREATED, Json(payment)))
}

/// `GET /payments/:id`
pub async fn get_payment<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<AssistantshipPayment>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let payment = state
    .store
    .get_payment(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("payment {id}")))?;
  visible_assignment(&state, &caller, payment.assignment_id)
    .await
    .map_err(|_| ApiError::NotFound(format!("payment {id}")))?;
  Ok(Json(payment))
}

/// `POST /payments/:id/:action`
pub async fn advance_payment<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path((id, action)): Path<(Uuid, String)>,
) -> Result<Json<AssistantshipPayment>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let to = action_status(&action)?;
  let payment = state.store.advance_payment(id, to, caller.actor()).await.map_err(ApiError::store)?;
  tracing::info!(payment_id = %id, status = %payment.status, "payment moved");
  Ok(Json(payment))
}
