//! Handlers for `/renewals` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/renewals` | Optional `status`; students only see their own |
//! | `POST` | `/renewals` | Student only. Body: [`NewRenewal`]; returns 201 |
//! | `GET`  | `/renewals/:id` | Owner or staff |
//! | `GET`  | `/renewals/:id/evaluation` | Current eligibility, nothing is written |
//! | `POST` | `/renewals/:id/transition` | Body: [`TransitionBody`]; students may only withdraw |
//! | `POST` | `/renewals/reminders` | Staff only. Body: [`RenewalPeriod`] |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use osas_core::{
  notification::{Mail, Recipient},
  renewal::{EligibilityReport, NewRenewal, RenewalApplication, RenewalPeriod, RenewalStatus},
  storage::FileStorage,
  store::{RenewalQuery, ScholarshipStore},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// Load a renewal the caller is allowed to see.
pub(crate) async fn visible_renewal<S, F>(
  state: &AppState<S, F>,
  caller: &CurrentUser,
  id: Uuid,
) -> Result<RenewalApplication, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let missing = || ApiError::NotFound(format!("renewal {id}"));
  let renewal = state.store.get_renewal(id).await.map_err(ApiError::store)?.ok_or_else(missing)?;
  if !caller.is_staff() && renewal.student_id != caller.0.user_id {
    return Err(missing());
  }
  Ok(renewal)
}

/// `GET /renewals`
pub async fn list<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Query(mut query): Query<RenewalQuery>,
) -> Result<Json<Vec<RenewalApplication>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  if !caller.is_staff() {
    query.student_id = Some(caller.0.user_id);
  }
  let renewals = state.store.list_renewals(query).await.map_err(ApiError::store)?;
  Ok(Json(renewals))
}

/// `POST /renewals`
pub async fn submit<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Json(body): Json<NewRenewal>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let renewal = state.store.submit_renewal(caller.actor(), body).await.map_err(ApiError::store)?;
  tracing::info!(
    renewal_id = %renewal.renewal_id,
    period = %renewal.period,
    eligible = renewal.eligibility.eligible,
    "renewal submitted"
  );
  Ok((StatusCode::CREATED, Json(renewal)))
}

/// `GET /renewals/:id`
pub async fn get_one<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<RenewalApplication>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  Ok(Json(visible_renewal(&state, &caller, id).await?))
}

/// `GET /renewals/:id/evaluation`
pub async fn evaluation<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<EligibilityReport>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  visible_renewal(&state, &caller, id).await?;
  let report = state.store.evaluate_renewal(id).await.map_err(ApiError::store)?;
  Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
  pub to:      RenewalStatus,
  pub remarks: Option<String>,
}

/// `POST /renewals/:id/transition`
pub async fn transition<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<TransitionBody>,
) -> Result<Json<RenewalApplication>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  visible_renewal(&state, &caller, id).await?;
  let renewal = state
    .store
    .transition_renewal(id, body.to, caller.actor(), body.remarks)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(renewal_id = %id, status = %renewal.status, "renewal moved");
  Ok(Json(renewal))
}

/// `POST /renewals/reminders`
pub async fn reminders<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Json(period): Json<RenewalPeriod>,
) -> Result<Json<Value>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let candidates = state.store.renewal_candidates(period).await.map_err(ApiError::store)?;
  for candidate in &candidates {
    state.notify(Mail::RenewalReminder {
      to: Recipient {
        name:  candidate.student_name.clone(),
        email: candidate.student_email.clone(),
      },
      scholarship_name: candidate.scholarship_name.clone(),
      period,
    });
  }
  tracing::info!(sent = candidates.len(), %period, "renewal reminders queued");
  Ok(Json(json!({ "sent": candidates.len(), "period": period })))
}
