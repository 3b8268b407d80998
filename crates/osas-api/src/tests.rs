//! Router tests: requests go through the full axum stack against an
//! in-memory store and a throwaway storage directory.

use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version, password_hash::SaltString};
use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::{Duration, Utc};
use osas_core::{
  application::{Application, ApplicationStatus, TransitionRequest},
  document::VerificationStatus,
  interview::NewInterview,
  notification::{Mail, MemoryMailer},
  store::ScholarshipStore,
  user::{NewUser, Role, User},
};
use osas_store_sqlite::SqliteStore;
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{ApiConfig, AppState, LocalDiskStorage, router};

const PASSWORD: &str = "correct horse";

struct Harness {
  app:    Router,
  store:  Arc<SqliteStore>,
  mailer: MemoryMailer,
  admin:  User,
}

/// A deliberately cheap argon2 hash so tests do not spend their time in KDF.
fn cheap_hash(password: &str) -> String {
  let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::new(8, 1, 1, None).unwrap());
  let salt = SaltString::generate(&mut OsRng);
  argon.hash_password(password.as_bytes(), &salt).unwrap().to_string()
}

async fn harness() -> Harness {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let root = std::env::temp_dir().join(format!("osas-api-{}", Uuid::new_v4()));
  let files = LocalDiskStorage::new(root, "http://files.test");
  let mailer = MemoryMailer::default();

  let state = AppState::new(store, files, Arc::new(mailer.clone()), ApiConfig::default());
  let store = Arc::clone(&state.store);
  let admin = add_user(&store, Role::Admin, "admin@osas.test").await;

  Harness { app: router(state), store, mailer, admin }
}

async fn add_user(store: &SqliteStore, role: Role, email: &str) -> User {
  store
    .create_user(NewUser {
      name:               format!("User {email}"),
      email:              email.into(),
      role,
      password_hash:      cheap_hash(PASSWORD),
      verification_token: None,
    })
    .await
    .unwrap()
}

fn basic(email: &str, password: &str) -> String {
  format!("Basic {}", B64.encode(format!("{email}:{password}")))
}

impl Harness {
  async fn call(
    &self,
    method: Method,
    uri: &str,
    as_user: Option<&User>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(user) = as_user {
      req = req.header(header::AUTHORIZATION, basic(&user.email, PASSWORD));
    }
    let req = match body {
      Some(body) => req
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => req.body(Body::empty()).unwrap(),
    };

    let res = self.app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value =
      if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
  }

  async fn get(&self, uri: &str, as_user: &User) -> (StatusCode, Value) {
    self.call(Method::GET, uri, Some(as_user), None).await
  }

  async fn post(&self, uri: &str, as_user: &User, body: Value) -> (StatusCode, Value) {
    self.call(Method::POST, uri, Some(as_user), Some(body)).await
  }

  /// An active scholarship with no document requirements, created over HTTP.
  async fn scholarship(&self) -> Uuid {
    let deadline = (Utc::now().date_naive() + Duration::days(30)).to_string();
    let (status, body) = self
      .post(
        "/api/scholarships",
        &self.admin,
        json!({
          "name": "Academic Excellence",
          "scholarship_type": "academic_full",
          "amount": 500_000,
          "deadline": deadline,
          "slots": 5,
          "status": "active",
        }),
      )
      .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["scholarship_id"].as_str().unwrap().parse().unwrap()
  }

  async fn draft(&self, student: &User, scholarship_id: Uuid) -> Uuid {
    let (status, body) = self
      .post("/api/applications", student, json!({ "scholarship_id": scholarship_id }))
      .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["application_id"].as_str().unwrap().parse().unwrap()
  }

  /// Walk an application to `approved` directly through the store.
  async fn approve(&self, student: &User, scholarship_id: Uuid) -> Application {
    use ApplicationStatus::*;
    let id = self.draft(student, scholarship_id).await;
    let step = |to, actor| TransitionRequest { to, actor, note: None };
    let staff = self.admin.actor();
    self.store.transition_application(id, step(Submitted, student.actor())).await.unwrap();
    for to in [UnderVerification, Verified, UnderEvaluation] {
      self.store.transition_application(id, step(to, staff)).await.unwrap();
    }
    self
      .store
      .schedule_interview(
        NewInterview {
          application_id: id,
          interviewer_id: self.admin.user_id,
          scheduled_at:   Utc::now() + Duration::days(1),
          location:       "OSAS Office".into(),
        },
        staff,
      )
      .await
      .unwrap();
    self.store.transition_application(id, step(Approved, staff)).await.unwrap()
  }
}

// ─── Authentication ───────────────────────────────────────────────────────────

#[tokio::test]
async fn health_needs_no_credentials() {
  let h = harness().await;
  let (status, body) = h.call(Method::GET, "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_credentials_are_challenged() {
  let h = harness().await;
  let req = Request::builder().uri("/api/me").body(Body::empty()).unwrap();
  let res = h.app.clone().oneshot(req).await.unwrap();
  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
  let h = harness().await;
  let req = Request::builder()
    .uri("/api/me")
    .header(header::AUTHORIZATION, basic(&h.admin.email, "wrong"))
    .body(Body::empty())
    .unwrap();
  let res = h.app.clone().oneshot(req).await.unwrap();
  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invited_staff_must_verify_before_signing_in() {
  let h = harness().await;
  let (status, body) = h
    .post(
      "/api/users",
      &h.admin,
      json!({
        "name": "Maria Santos",
        "email": "maria@osas.test",
        "role": "osas_staff",
        "password": PASSWORD,
      }),
    )
    .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert!(body.get("password_hash").is_none());
  assert!(body["email_verified_at"].is_null());

  let token = match h.mailer.sent().as_slice() {
    [Mail::StaffInvitation { verification_token, to, .. }] => {
      assert_eq!(to.email, "maria@osas.test");
      verification_token.clone()
    }
    other => panic!("expected one invitation, got {other:?}"),
  };

  let staff = h.store.find_user_by_email("maria@osas.test").await.unwrap().unwrap();
  let (status, _) = h.get("/api/me", &staff).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) =
    h.call(Method::POST, "/api/verify-email", None, Some(json!({ "token": token }))).await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = h.get("/api/me", &staff).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["role"], "osas_staff");

  let (status, _) =
    h.call(Method::POST, "/api/verify-email", None, Some(json!({ "token": token }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn short_passwords_are_rejected() {
  let h = harness().await;
  let (status, body) = h
    .post(
      "/api/users",
      &h.admin,
      json!({ "name": "X", "email": "x@osas.test", "role": "student", "password": "short" }),
    )
    .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["field"], "password");
}

// ─── Authorization ────────────────────────────────────────────────────────────

#[tokio::test]
async fn students_cannot_manage_scholarships() {
  let h = harness().await;
  let student = add_user(&h.store, Role::Student, "ana@student.test").await;
  let (status, _) = h
    .post(
      "/api/scholarships",
      &student,
      json!({
        "name": "Mine",
        "scholarship_type": "others",
        "amount": 100,
        "deadline": "2030-01-01",
        "slots": 1,
      }),
    )
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_scholarship_is_422() {
  let h = harness().await;
  let (status, body) = h
    .post(
      "/api/scholarships",
      &h.admin,
      json!({
        "name": "Empty",
        "scholarship_type": "others",
        "amount": 100,
        "deadline": "2030-01-01",
        "slots": 0,
      }),
    )
    .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["field"], "slots");
}

#[tokio::test]
async fn students_only_see_their_own_applications() {
  let h = harness().await;
  let ana = add_user(&h.store, Role::Student, "ana@student.test").await;
  let ben = add_user(&h.store, Role::Student, "ben@student.test").await;
  let sch = h.scholarship().await;
  let ana_app = h.draft(&ana, sch).await;
  h.draft(&ben, sch).await;

  let (status, body) = h.get("/api/applications", &ana).await;
  assert_eq!(status, StatusCode::OK);
  let listed = body.as_array().unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0]["application_id"], ana_app.to_string());

  let (status, _) = h.get(&format!("/api/applications/{ana_app}"), &ben).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, body) = h.get("/api/applications", &h.admin).await;
  assert_eq!(body.as_array().unwrap().len(), 2);
}

// ─── Workflow ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn submission_mails_the_student_and_shortcuts_conflict() {
  let h = harness().await;
  let student = add_user(&h.store, Role::Student, "ana@student.test").await;
  let app = h.draft(&student, h.scholarship().await).await;
  let uri = format!("/api/applications/{app}/transition");

  let (status, body) = h.post(&uri, &student, json!({ "to": "submitted" })).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["status"], "submitted");
  assert!(h.mailer.sent().iter().any(|m| matches!(
    m,
    Mail::StatusChanged {
      old_status: ApplicationStatus::Draft,
      new_status: ApplicationStatus::Submitted,
      ..
    }
  )));

  let (status, body) = h.post(&uri, &h.admin, json!({ "to": "approved" })).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("submitted -> approved"));

  let (status, _) = h.post(&uri, &student, json!({ "to": "under_verification" })).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (_, history) = h.get(&format!("/api/applications/{app}/history"), &student).await;
  assert_eq!(history.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn rejected_document_mails_resubmission_steps() {
  let h = harness().await;
  let student = add_user(&h.store, Role::Student, "ana@student.test").await;
  let app = h.draft(&student, h.scholarship().await).await;

  let (status, doc) = h
    .post(
      &format!("/api/applications/{app}/documents"),
      &student,
      json!({
        "document_type": "grade_report",
        "file_name": "grades.pdf",
        "mime_type": "application/pdf",
        "content_base64": B64.encode(b"%PDF-1.7 grades"),
      }),
    )
    .await;
  assert_eq!(status, StatusCode::CREATED, "{doc}");
  assert_eq!(doc["status"], "pending");
  assert!(doc["url"].as_str().unwrap().starts_with("http://files.test/documents/"));
  let doc_id = doc["document_id"].as_str().unwrap().to_owned();
  let review = format!("/api/documents/{doc_id}/review");

  let (status, _) = h.post(&review, &student, json!({ "decision": "verified" })).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = h.post(&review, &h.admin, json!({ "decision": "rejected" })).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["field"], "notes");

  let (status, body) = h
    .post(&review, &h.admin, json!({ "decision": "rejected", "notes": "Scan is blurry" }))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["status"], "rejected");

  let mail = h
    .mailer
    .sent()
    .into_iter()
    .find(|m| matches!(m, Mail::DocumentVerification { .. }))
    .expect("verification mail");
  let Mail::DocumentVerification { verification_status, notes, to, .. } = &mail else {
    unreachable!()
  };
  assert_eq!(*verification_status, VerificationStatus::Rejected);
  assert_eq!(verification_status.title(), "Rejected");
  assert_eq!(notes.as_deref(), Some("Scan is blurry"));
  assert_eq!(to.email, "ana@student.test");
  assert!(mail.next_steps().iter().any(|s| s.contains("Resubmit")));

  let (status, _) = h.post(&review, &h.admin, json!({ "decision": "verified" })).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn bad_uploads_are_refused() {
  let h = harness().await;
  let student = add_user(&h.store, Role::Student, "ana@student.test").await;
  let other = add_user(&h.store, Role::Student, "ben@student.test").await;
  let app = h.draft(&student, h.scholarship().await).await;
  let uri = format!("/api/applications/{app}/documents");

  let (status, body) = h
    .post(
      &uri,
      &student,
      json!({ "document_type": "id_photo", "file_name": "me.jpg", "content_base64": "@@@" }),
    )
    .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["field"], "content_base64");

  let (status, _) = h
    .post(
      &uri,
      &other,
      json!({ "document_type": "id_photo", "file_name": "me.jpg", "content_base64": "AAAA" }),
    )
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_up_to_the_configured_limit_are_accepted() {
  let h = harness().await;
  let student = add_user(&h.store, Role::Student, "ana@student.test").await;
  let app = h.draft(&student, h.scholarship().await).await;
  let uri = format!("/api/applications/{app}/documents");
  let upload = |len: usize| {
    json!({
      "document_type": "certificate_of_enrollment",
      "file_name": "coe.pdf",
      "mime_type": "application/pdf",
      "content_base64": B64.encode(vec![b'%'; len]),
    })
  };

  let (status, doc) = h.post(&uri, &student, upload(3 * 1024 * 1024)).await;
  assert_eq!(status, StatusCode::CREATED, "{doc}");
  assert_eq!(doc["size_bytes"], 3 * 1024 * 1024);

  let limit = ApiConfig::default().max_upload_bytes;
  let (status, body) = h.post(&uri, &student, upload(limit + 1)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["field"], "content_base64");
}

#[tokio::test]
async fn overdraft_release_is_refused_and_ledger_unchanged() {
  let h = harness().await;
  let student = add_user(&h.store, Role::Student, "ana@student.test").await;
  let app = h.approve(&student, h.scholarship().await).await;

  let (status, fund) = h
    .post(
      "/api/funds",
      &h.admin,
      json!({
        "fund_source": "Alumni Fund",
        "source_type": "private_donor",
        "academic_year": 2026,
        "total_budget": 300_000,
      }),
    )
    .await;
  assert_eq!(status, StatusCode::CREATED, "{fund}");
  let fund_id = fund["fund_id"].as_str().unwrap().to_owned();

  let (status, stipend) = h
    .post(
      "/api/stipends",
      &h.admin,
      json!({
        "application_id": app.application_id,
        "fund_id": fund_id,
        "amount": 500_000,
        "period_label": "1st Semester AY 2026-2027",
      }),
    )
    .await;
  assert_eq!(status, StatusCode::CREATED, "{stipend}");
  let stipend_id = stipend["stipend_id"].as_str().unwrap().to_owned();

  let (status, _) = h
    .call(Method::POST, &format!("/api/stipends/{stipend_id}/process"), Some(&h.admin), None)
    .await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = h
    .call(Method::POST, &format!("/api/stipends/{stipend_id}/release"), Some(&h.admin), None)
    .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("insufficient funds"));

  let (_, fund) = h.get(&format!("/api/funds/{fund_id}"), &h.admin).await;
  assert_eq!(fund["disbursed_amount"], 0);
  assert_eq!(fund["remaining_budget"], 300_000);
  assert!(!h.mailer.sent().iter().any(|m| matches!(m, Mail::StipendReleased { .. })));

  let (status, _) = h
    .call(Method::POST, &format!("/api/stipends/{stipend_id}/teleport"), Some(&h.admin), None)
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn release_debits_the_fund_and_mails_the_scholar() {
  let h = harness().await;
  let student = add_user(&h.store, Role::Student, "ana@student.test").await;
  let app = h.approve(&student, h.scholarship().await).await;

  let (_, fund) = h
    .post(
      "/api/funds",
      &h.admin,
      json!({
        "fund_source": "University Fund",
        "source_type": "university",
        "academic_year": 2026,
        "total_budget": 1_000_000,
      }),
    )
    .await;
  let fund_id = fund["fund_id"].as_str().unwrap().to_owned();
  let (_, stipend) = h
    .post(
      "/api/stipends",
      &h.admin,
      json!({
        "application_id": app.application_id,
        "fund_id": fund_id,
        "amount": 250_000,
        "period_label": "1st Semester AY 2026-2027",
      }),
    )
    .await;
  let stipend_id = stipend["stipend_id"].as_str().unwrap().to_owned();

  for action in ["process", "release"] {
    let (status, body) = h
      .call(Method::POST, &format!("/api/stipends/{stipend_id}/{action}"), Some(&h.admin), None)
      .await;
    assert_eq!(status, StatusCode::OK, "{action}: {body}");
  }

  let (_, fund) = h.get(&format!("/api/funds/{fund_id}"), &h.admin).await;
  assert_eq!(fund["disbursed_amount"], 250_000);
  assert_eq!(fund["remaining_budget"], 750_000);
  assert!(h.mailer.sent().iter().any(|m| matches!(m, Mail::StipendReleased { .. })));

  let (status, own) = h.get("/api/stipends", &student).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(own.as_array().unwrap().len(), 1);
}
