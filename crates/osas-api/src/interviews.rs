//! Handlers for interview scheduling.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/interviews` | Staff only. Body: [`NewInterview`]; returns 201 |
//! | `GET`  | `/interviews/:id` | Applicant or staff |
//! | `POST` | `/interviews/:id/reschedule` | Staff only. Body: [`RescheduleRequest`] |
//! | `POST` | `/interviews/:id/complete` | Staff only. Body: [`InterviewEvaluation`] |
//! | `POST` | `/interviews/:id/status` | Staff only. Body: `{"status":"missed"\|"no_show"\|"cancelled"}` |
//! | `GET`  | `/applications/:id/interviews` | Applicant or staff |
//! | `POST` | `/interviews/reminders` | Staff only. Optional `?hours=`; mails every open interview in the window |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{Duration, Utc};
use osas_core::{
  Error as CoreError,
  application::Application,
  interview::{Interview, InterviewEvaluation, InterviewStatus, NewInterview, RescheduleRequest},
  notification::Mail,
  storage::FileStorage,
  store::ScholarshipStore,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  AppState,
  applications::{notify_status_change, visible_application},
  auth::CurrentUser,
  error::ApiError,
};

async fn load<S, F>(state: &AppState<S, F>, id: Uuid) -> Result<Interview, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  state
    .store
    .get_interview(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("interview {id}")))
}

/// Mail the applicant the current time and place of `interview`.
async fn send_invitation<S, F>(
  state: &AppState<S, F>,
  application: &Application,
  interview: &Interview,
  is_reminder: bool,
) where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let Some(to) = state.recipient(application.student_id).await else { return };
  let interviewer_name = match state.recipient(interview.interviewer_id).await {
    Some(r) => r.name,
    None => "OSAS staff".to_owned(),
  };
  state.notify(Mail::InterviewScheduled {
    to,
    scholarship_name: state.scholarship_name(application.scholarship_id).await,
    scheduled_at: interview.scheduled_at,
    location: interview.location.clone(),
    interviewer_name,
    is_reminder,
  });
}

// ─── Schedule ─────────────────────────────────────────────────────────────────

/// `POST /interviews`
pub async fn schedule<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Json(body): Json<NewInterview>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let before = visible_application(&state, &caller, body.application_id).await?;

  let interview =
    state.store.schedule_interview(body, caller.actor()).await.map_err(ApiError::store)?;
  tracing::info!(
    interview_id = %interview.interview_id,
    application_id = %interview.application_id,
    "interview scheduled"
  );

  let after = visible_application(&state, &caller, interview.application_id).await?;
  send_invitation(&state, &after, &interview, false).await;
  notify_status_change(&state, &before, &after, None).await;

  Ok((StatusCode::CREATED, Json(interview)))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /interviews/:id`
pub async fn get_one<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Interview>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let interview = load(&state, id).await?;
  visible_application(&state, &caller, interview.application_id)
    .await
    .map_err(|_| ApiError::NotFound(format!("interview {id}")))?;
  Ok(Json(interview))
}

/// `GET /applications/:id/interviews`
pub async fn list<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(application_id): Path<Uuid>,
) -> Result<Json<Vec<Interview>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  visible_application(&state, &caller, application_id).await?;
  let interviews = state.store.list_interviews(application_id).await.map_err(ApiError::store)?;
  Ok(Json(interviews))
}

// ─── Changes ──────────────────────────────────────────────────────────────────

/// `POST /interviews/:id/reschedule`
pub async fn reschedule<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<RescheduleRequest>,
) -> Result<Json<Interview>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let interview =
    state.store.reschedule_interview(id, body, caller.actor()).await.map_err(ApiError::store)?;
  tracing::info!(
    interview_id = %id,
    scheduled_at = %interview.scheduled_at,
    "interview rescheduled"
  );

  let application = visible_application(&state, &caller, interview.application_id).await?;
  send_invitation(&state, &application, &interview, false).await;
  Ok(Json(interview))
}

/// `POST /interviews/:id/complete`
pub async fn complete<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(evaluation): Json<InterviewEvaluation>,
) -> Result<Json<Interview>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let interview = state.store.complete_interview(id, evaluation).await.map_err(ApiError::store)?;
  Ok(Json(interview))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: InterviewStatus,
}

/// `POST /interviews/:id/status`
pub async fn set_status<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Interview>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let interview = state.store.set_interview_status(id, body.status).await.map_err(ApiError::store)?;
  Ok(Json(interview))
}

// ─── Reminders ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReminderParams {
  pub hours: Option<i64>,
}

/// `POST /interviews/reminders`
pub async fn reminders<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Query(params): Query<ReminderParams>,
) -> Result<Json<Value>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let hours = params.hours.unwrap_or(state.config.reminder_window_hours);
  if !(1..=24 * 30).contains(&hours) {
    return Err(CoreError::validation("hours", "must be between 1 and 720").into());
  }

  let from = Utc::now();
  let interviews = state
    .store
    .upcoming_interviews(from, from + Duration::hours(hours))
    .await
    .map_err(ApiError::store)?;

  let mut sent = 0usize;
  for interview in &interviews {
    let application = match state.store.get_application(interview.application_id).await {
      Ok(Some(application)) => application,
      Ok(None) => continue,
      Err(e) => {
        tracing::warn!(interview_id = %interview.interview_id, error = %e, "skipping reminder");
        continue;
      }
    };
    send_invitation(&state, &application, interview, true).await;
    sent += 1;
  }

  tracing::info!(sent, hours, "interview reminders queued");
  Ok(Json(json!({ "sent": sent, "window_hours": hours })))
}
