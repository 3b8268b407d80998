//! Handlers for accounts and student profiles.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/verify-email` | Body: `{"token":"..."}`; no credentials required |
//! | `GET`  | `/me` | The caller, with their profile if they are a student |
//! | `POST` | `/users` | Admin only. Body: [`CreateUserBody`]; returns 201 |
//! | `GET`  | `/users/:id/profile` | Owner or staff |
//! | `PUT`  | `/users/:id/profile` | Staff only. Body: [`ProfileBody`] |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use osas_core::{
  Error as CoreError,
  money::Gwa,
  notification::{Mail, Recipient},
  storage::FileStorage,
  store::ScholarshipStore,
  user::{EnrollmentStatus, NewUser, Role, StudentProfile, User},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentUser, hash_password, new_token},
  error::ApiError,
};

const MIN_PASSWORD_LEN: usize = 8;

// ─── Verification ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VerifyEmailBody {
  pub token: String,
}

/// `POST /verify-email`
pub async fn verify_email<S, F>(
  State(state): State<AppState<S, F>>,
  Json(body): Json<VerifyEmailBody>,
) -> Result<Json<User>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let user = state.store.verify_email(body.token.trim()).await.map_err(ApiError::store)?;
  tracing::info!(user_id = %user.user_id, "email verified");
  Ok(Json(user))
}

// ─── Me ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MeResponse {
  #[serde(flatten)]
  pub user:    User,
  pub profile: Option<StudentProfile>,
}

/// `GET /me`
pub async fn me<S, F>(
  State(state): State<AppState<S, F>>,
  CurrentUser(user): CurrentUser,
) -> Result<Json<MeResponse>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let profile = if user.role == Role::Student {
    state.store.get_student_profile(user.user_id).await.map_err(ApiError::store)?
  } else {
    None
  };
  Ok(Json(MeResponse { user, profile }))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
  pub name:     String,
  pub email:    String,
  pub role:     Role,
  pub password: String,
}

/// `POST /users`
///
/// Staff accounts start unverified and receive an invitation carrying their
/// verification token. Other accounts are usable immediately.
pub async fn create<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Json(body): Json<CreateUserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_admin()?;
  if body.password.chars().count() < MIN_PASSWORD_LEN {
    return Err(
      CoreError::validation("password", format!("must be at least {MIN_PASSWORD_LEN} characters"))
        .into(),
    );
  }

  let password_hash =
    hash_password(&body.password).map_err(|e| ApiError::Internal(e.to_string()))?;
  let verification_token = (body.role == Role::OsasStaff).then(new_token);

  let user = state
    .store
    .create_user(NewUser {
      name: body.name,
      email: body.email,
      role: body.role,
      password_hash,
      verification_token: verification_token.clone(),
    })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(user_id = %user.user_id, role = %user.role, "account created");

  if let Some(token) = verification_token {
    let verify_url = format!(
      "{}/verify-email?token={token}",
      state.config.public_base_url.trim_end_matches('/')
    );
    state.notify(Mail::StaffInvitation {
      to: Recipient { name: user.name.clone(), email: user.email.clone() },
      invited_by: caller.0.name.clone(),
      verification_token: token,
      verify_url,
    });
  }

  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Profiles ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProfileBody {
  pub student_number:          String,
  pub course:                  String,
  pub year_level:              u8,
  pub current_gwa:             Option<Gwa>,
  #[serde(default)]
  pub enrollment_status:       EnrollmentStatus,
  #[serde(default)]
  pub has_disciplinary_record: bool,
}

/// `GET /users/:id/profile`
pub async fn get_profile<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<StudentProfile>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_owner_or_staff(id, "profile")?;
  let profile = state
    .store
    .get_student_profile(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("profile for {id}")))?;
  Ok(Json(profile))
}

/// `PUT /users/:id/profile`
pub async fn put_profile<S, F>(
  State(state): State<AppState<S, F>>,
  caller: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<ProfileBody>,
) -> Result<Json<StudentProfile>, ApiError>
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  caller.require_staff()?;
  let profile = state
    .store
    .upsert_student_profile(StudentProfile {
      user_id:                 id,
      student_number:          body.student_number,
      course:                  body.course,
      year_level:              body.year_level,
      current_gwa:             body.current_gwa,
      enrollment_status:       body.enrollment_status,
      has_disciplinary_record: body.has_disciplinary_record,
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(profile))
}
