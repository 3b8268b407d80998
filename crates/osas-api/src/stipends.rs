//! Handlers for `/stipends` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/stipends` | Optional `fund_id`, `status`; students only see their own |
//! | `POST` | `/stipends` | Staff only. Body: [`NewStipend`]; returns 201 |
//! | `GET`  | `/stipends/:id` | Recipient or staff |
//! | `POST` | `/stipends/:id/{process,release,fail,cancel}` | Staff only. Optional body `{"remarks":"..."}` |

use axum::{
  Json,
  body::Bytes,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use osas_core::{
  ledger::{DisbursementStatus, NewStipend, Stipend},
  notification::Mail,
  storage::FileStorage,
  store::{ScholarshipStore, StipendQuery},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// Map a URL action onto the disbursement status it moves to.
pub(crate) fn action_status(action: &str) -> Result<DisbursementStatus, ApiError> {
  match action {
    "process" => Ok(DisbursementStatus::Processing),
    "release" => Ok(DisbursementStatus::Released),
    "fail" => Ok(DisbursementStatus::Failed),
    "cancel" => Ok(DisbursementStatus::Cancelled),
    other => Err(ApiError::NotFound(format!("unknown action {other:?}"))),
  }
}

/// `GET /stipends`
pub async fn list<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Query(mut query): Query<StipendQuery>,
) -> Result<Json<Vec<Stipend>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  if !caller.is_staff() {
    query.student_id = Some(caller.0.user_id);
  }
  Ok(Json(state.store.list_stipends(query).await.map_err(ApiError::store)?))
}

/// `POST /stipends`
pub async fn create<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Json(body): Json<NewStipend>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let stipend = state.store.create_stipend(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(stipend)))
}

/// `GET /stipends/:id`
pub async fn get_one<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Stipend>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let stipend = state
    .store
    .get_stipend(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("stipend {id}")))?;
  caller.require_owner_or_staff(stipend.student_id, &format!("stipend {id}"))?;
  Ok(Json(stipend))
}

#[derive(Debug, Default, Deserialize)]
pub struct AdvanceBody {
  pub remarks: Option<String>,
}

/// `POST /stipends/:id/:action`
pub async fn advance<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path((id, action)): Path<(Uuid, String)>,
  body: Bytes,
) -> Result<Json<Stipend>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let to = action_status(&action)?;
  let body: AdvanceBody = if body.is_empty() {
    AdvanceBody::default()
  } else {
    serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
  };

  let stipend = state
    .store
    .advance_stipend(id, to, caller.actor(), body.remarks)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    stipend_id = %id,
    status = %stipend.status,
    amount = %stipend.amount,
    "stipend moved"
  );

  if stipend.status == DisbursementStatus::Released {
    if let Some(to) = state.recipient(stipend.student_id).await {
      state.notify(Mail::StipendReleased {
        to,
        scholarship_name: state.scholarship_name(stipend.scholarship_id).await,
        amount: stipend.amount,
        period_label: stipend.period_label.clone(),
        released_at: stipend.released_at.unwrap_or_else(chrono::Utc::now),
      });
    }
  }
  Ok(Json(stipend))
}
