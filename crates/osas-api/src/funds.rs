//! Handlers for `/funds` endpoints. All are staff only; creating a fund and
//! changing its budget need an admin.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/funds` | Every live fund |
//! | `POST` | `/funds` | Admin. Body: [`NewFund`]; returns 201 |
//! | `GET`  | `/funds/summary` | Per-fund totals with disbursement counts |
//! | `GET`  | `/funds/:id` | Single fund |
//! | `PUT`  | `/funds/:id/budget` | Admin. Body: `{"total_budget": <centavos>}` |
//! | `GET`  | `/funds/:id/disbursements` | Ledger entries, oldest first |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use osas_core::{
  ledger::{Disbursement, Fund, FundSummary, NewFund},
  money::Money,
  storage::FileStorage,
  store::ScholarshipStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// `GET /funds`
pub async fn list<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
) -> Result<Json<Vec<Fund>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  Ok(Json(state.store.list_funds().await.map_err(ApiError::store)?))
}

/// `POST /funds`
pub async fn create<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Json(body): Json<NewFund>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_admin()?;
  let fund = state.store.create_fund(body).await.map_err(ApiError::store)?;
  tracing::info!(fund_id = %fund.fund_id, total_budget = %fund.total_budget, "fund created");
  Ok((StatusCode::CREATED, Json(fund)))
}

/// `GET /funds/summary`
pub async fn summary<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
) -> Result<Json<Vec<FundSummary>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  Ok(Json(state.store.fund_summary().await.map_err(ApiError::store)?))
}

/// `GET /funds/:id`
pub async fn get_one<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Fund>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let fund = state
    .store
    .get_fund(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("fund {id}")))?;
  Ok(Json(fund))
}

#[derive(Debug, Deserialize)]
pub struct BudgetBody {
  pub total_budget: Money,
}

/// `PUT /funds/:id/budget`
pub async fn adjust_budget<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<BudgetBody>,
) -> Result<Json<Fund>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_admin()?;
  let fund = state.store.adjust_fund_budget(id, body.total_budget).await.map_err(ApiError::store)?;
  tracing::info!(fund_id = %id, total_budget = %fund.total_budget, "fund budget adjusted");
  Ok(Json(fund))
}

/// `GET /funds/:id/disbursements`
pub async fn disbursements<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Disbursement>>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  Ok(Json(state.store.list_disbursements(id).await.map_err(ApiError::store)?))
}
