//! JSON REST API for OSAS Connect.
//!
//! Exposes an axum [`Router`] backed by any [`ScholarshipStore`] and
//! [`FileStorage`]. Every route under `/api` requires HTTP Basic credentials
//! of a verified account, except `/api/verify-email`. TLS and request
//! tracing are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = osas_api::router(AppState::new(store, files, mailer, config))
//!   .layer(TraceLayer::new_for_http());
//! ```

pub mod applications;
pub mod assistantship;
pub mod auth;
pub mod documents;
pub mod error;
pub mod funds;
pub mod interviews;
pub mod renewals;
pub mod scholarships;
pub mod stipends;
pub mod storage;
pub mod users;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use osas_core::{
  notification::{Mail, Mailer, Recipient},
  storage::FileStorage,
  store::ScholarshipStore,
};
use serde_json::{Value, json};
use uuid::Uuid;

pub use auth::CurrentUser;
pub use error::ApiError;
pub use storage::LocalDiskStorage;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Settings the handlers read at request time.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Externally visible origin, used in links inside outbound mail.
  pub public_base_url:       String,
  /// Default look-ahead for interview reminders.
  pub reminder_window_hours: i64,
  /// Largest decoded upload accepted by the document endpoints.
  pub max_upload_bytes:      usize,
}

impl ApiConfig {
  /// Request body limit for the upload routes: the base64 form of
  /// `max_upload_bytes` plus room for the surrounding JSON.
  pub fn upload_body_limit(&self) -> usize {
    self.max_upload_bytes.div_ceil(3) * 4 + 64 * 1024
  }
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      public_base_url:       "http://localhost:8080".to_owned(),
      reminder_window_hours: 24,
      max_upload_bytes:      10 * 1024 * 1024,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, F> {
  pub store:  Arc<S>,
  pub files:  Arc<F>,
  pub mailer: Arc<dyn Mailer>,
  pub config: Arc<ApiConfig>,
}

impl<S, F> Clone for AppState<S, F> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      files:  Arc::clone(&self.files),
      mailer: Arc::clone(&self.mailer),
      config: Arc::clone(&self.config),
    }
  }
}

impl<S, F> AppState<S, F>
where
  S: ScholarshipStore,
  F: FileStorage,
{
  pub fn new(store: S, files: F, mailer: Arc<dyn Mailer>, config: ApiConfig) -> Self {
    Self {
      store: Arc::new(store),
      files: Arc::new(files),
      mailer,
      config: Arc::new(config),
    }
  }

  /// Hand `mail` to the mailer. A failed send never fails the request.
  pub(crate) fn notify(&self, mail: Mail) {
    let kind = mail.kind();
    if let Err(e) = self.mailer.send(mail) {
      tracing::warn!(kind, error = %e, "failed to queue notification");
    }
  }

  /// Name and address of `user_id`, or `None` (logged) if it cannot be read.
  pub(crate) async fn recipient(&self, user_id: Uuid) -> Option<Recipient> {
    match self.store.get_user(user_id).await {
      Ok(Some(user)) => Some(Recipient { name: user.name, email: user.email }),
      Ok(None) => {
        tracing::warn!(%user_id, "notification recipient does not exist");
        None
      }
      Err(e) => {
        tracing::warn!(%user_id, error = %e, "could not load notification recipient");
        None
      }
    }
  }

  /// Display name of a scholarship for mail templates.
  pub(crate) async fn scholarship_name(&self, scholarship_id: Uuid) -> String {
    match self.store.get_scholarship(scholarship_id).await {
      Ok(Some(s)) => s.name,
      _ => "your scholarship".to_owned(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full router: `/health` plus every `/api` route.
pub fn router<S, F>(state: AppState<S, F>) -> Router
where
  S: ScholarshipStore + 'static,
  F: FileStorage + 'static,
{
  let upload_limit = DefaultBodyLimit::max(state.config.upload_body_limit());

  let api = Router::new()
    // Accounts
    .route("/verify-email", post(users::verify_email::<S, F>))
    .route("/me", get(users::me::<S, F>))
    .route("/users", post(users::create::<S, F>))
    .route(
      "/users/{id}/profile",
      get(users::get_profile::<S, F>).put(users::put_profile::<S, F>),
    )
    // Scholarships
    .route(
      "/scholarships",
      get(scholarships::list::<S, F>).post(scholarships::create::<S, F>),
    )
    .route(
      "/scholarships/{id}",
      get(scholarships::get_one::<S, F>)
        .patch(scholarships::update::<S, F>)
        .delete(scholarships::delete::<S, F>),
    )
    // Applications
    .route(
      "/applications",
      get(applications::list::<S, F>).post(applications::create::<S, F>),
    )
    .route("/applications/{id}", get(applications::get_one::<S, F>))
    .route("/applications/{id}/transition", post(applications::transition::<S, F>))
    .route("/applications/{id}/history", get(applications::history::<S, F>))
    .route(
      "/applications/{id}/documents",
      get(documents::list_for_application::<S, F>)
        .post(documents::upload_for_application::<S, F>)
        .layer(upload_limit.clone()),
    )
    .route("/applications/{id}/interviews", get(interviews::list::<S, F>))
    // Documents
    .route("/documents/{id}", get(documents::get_one::<S, F>))
    .route("/documents/{id}/review", post(documents::review::<S, F>))
    // Interviews
    .route("/interviews", post(interviews::schedule::<S, F>))
    .route("/interviews/reminders", post(interviews::reminders::<S, F>))
    .route("/interviews/{id}", get(interviews::get_one::<S, F>))
    .route("/interviews/{id}/reschedule", post(interviews::reschedule::<S, F>))
    .route("/interviews/{id}/complete", post(interviews::complete::<S, F>))
    .route("/interviews/{id}/status", post(interviews::set_status::<S, F>))
    // Renewals
    .route("/renewals", get(renewals::list::<S, F>).post(renewals::submit::<S, F>))
    .route("/renewals/reminders", post(renewals::reminders::<S, F>))
    .route("/renewals/{id}", get(renewals::get_one::<S, F>))
    .route("/renewals/{id}/evaluation", get(renewals::evaluation::<S, F>))
    .route("/renewals/{id}/transition", post(renewals::transition::<S, F>))
    .route(
      "/renewals/{id}/documents",
      get(documents::list_for_renewal::<S, F>)
        .post(documents::upload_for_renewal::<S, F>)
        .layer(upload_limit),
    )
    // Funds
    .route("/funds", get(funds::list::<S, F>).post(funds::create::<S, F>))
    .route("/funds/summary", get(funds::summary::<S, F>))
    .route("/funds/{id}", get(funds::get_one::<S, F>))
    .route("/funds/{id}/budget", put(funds::adjust_budget::<S, F>))
    .route("/funds/{id}/disbursements", get(funds::disbursements::<S, F>))
    // Stipends
    .route("/stipends", get(stipends::list::<S, F>).post(stipends::create::<S, F>))
    .route("/stipends/{id}", get(stipends::get_one::<S, F>))
    .route("/stipends/{id}/{action}", post(stipends::advance::<S, F>))
    // Assistantship
    .route(
      "/assignments",
      get(assistantship::list_assignments::<S, F>).post(assistantship::create_assignment::<S, F>),
    )
    .route("/assignments/{id}", get(assistantship::get_assignment::<S, F>))
    .route(
      "/assignments/{id}/logs",
      get(assistantship::list_logs::<S, F>).post(assistantship::log_hours::<S, F>),
    )
    .route(
      "/assignments/{id}/payments",
      get(assistantship::list_payments::<S, F>).post(assistantship::create_payment::<S, F>),
    )
    .route("/work-logs/{id}/review", post(assistantship::review_log::<S, F>))
    .route("/payments/{id}", get(assistantship::get_payment::<S, F>))
    .route("/payments/{id}/{action}", post(assistantship::advance_payment::<S, F>));

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .with_state(state)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }
