//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, NaiveTime, Utc};
use osas_core::{
  Error as CoreError,
  application::{Application, ApplicationStatus, TransitionRequest},
  assistantship::{Assignment, NewAssignment, NewWorkHourLog, PaymentPeriod, WorkLogReview},
  document::{DocumentOwner, DocumentReview, DocumentType, NewDocument, VerificationStatus},
  interview::{
    InterviewEvaluation, InterviewScores, InterviewStatus, NewInterview, Recommendation,
    RescheduleRequest,
  },
  ledger::{DisbursementStatus, Fund, FundSourceType, NewFund, NewStipend},
  money::{Gwa, Hours, Money},
  renewal::{NewRenewal, RenewalPeriod, RenewalStatus, Semester},
  scholarship::{NewScholarship, Scholarship, ScholarshipStatus, ScholarshipType},
  store::{ScholarshipQuery, ScholarshipStore},
  user::{Actor, EnrollmentStatus, NewUser, Role, StudentProfile, User},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn core(err: Error) -> CoreError {
  match err {
    Error::Core(e) => e,
    other => panic!("expected a domain error, got {other:?}"),
  }
}

async fn user(s: &SqliteStore, role: Role, email: &str) -> User {
  s.create_user(NewUser {
    name:               format!("User {email}"),
    email:              email.into(),
    role,
    password_hash:      "x".into(),
    verification_token: None,
  })
  .await
  .unwrap()
}

fn scholarship_input(slots: u32, required_documents: Vec<DocumentType>) -> NewScholarship {
  NewScholarship {
    name: "Academic Excellence".into(),
    description: String::new(),
    scholarship_type: ScholarshipType::AcademicFull,
    amount: Money::from_pesos(5_000),
    deadline: Utc::now().date_naive() + Duration::days(30),
    slots,
    eligibility_criteria: vec!["GWA of 1.45 or better".into()],
    renewal_criteria: Vec::new(),
    required_documents,
    max_gwa: None,
    status: ScholarshipStatus::Active,
  }
}

async fn scholarship(s: &SqliteStore, slots: u32) -> Scholarship {
  s.create_scholarship(scholarship_input(slots, Vec::new())).await.unwrap()
}

async fn advance(
  s: &SqliteStore,
  app: &Application,
  to: ApplicationStatus,
  actor: Actor,
) -> Result<Application, Error> {
  s.transition_application(app.application_id, TransitionRequest { to, actor, note: None })
    .await
}

/// Walk a fresh application up to `interview_scheduled`.
async fn interviewed(
  s: &SqliteStore,
  staff: &User,
  student: &User,
  sch: &Scholarship,
) -> Application {
  use ApplicationStatus::*;
  let app = s.create_application(student.actor(), sch.scholarship_id).await.unwrap();
  let app = advance(s, &app, Submitted, student.actor()).await.unwrap();
  let app = advance(s, &app, UnderVerification, staff.actor()).await.unwrap();
  let app = advance(s, &app, Verified, staff.actor()).await.unwrap();
  let app = advance(s, &app, UnderEvaluation, staff.actor()).await.unwrap();
  s.schedule_interview(
    NewInterview {
      application_id: app.application_id,
      interviewer_id: staff.user_id,
      scheduled_at:   Utc::now() + Duration::days(2),
      location:       "OSAS Conference Room".into(),
    },
    staff.actor(),
  )
  .await
  .unwrap();
  s.get_application(app.application_id).await.unwrap().unwrap()
}

async fn approved(s: &SqliteStore, staff: &User, student: &User, sch: &Scholarship) -> Application {
  let app = interviewed(s, staff, student, sch).await;
  advance(s, &app, ApplicationStatus::Approved, staff.actor()).await.unwrap()
}

async fn fund(s: &SqliteStore, pesos: i64) -> Fund {
  s.create_fund(NewFund {
    fund_source:   "University Scholarship Fund".into(),
    source_type:   FundSourceType::University,
    academic_year: 2026,
    semester:      Some(Semester::First),
    total_budget:  Money::from_pesos(pesos),
  })
  .await
  .unwrap()
}

async fn verified_document(
  s: &SqliteStore,
  owner: DocumentOwner,
  document_type: DocumentType,
  reviewer: &User,
) {
  let id = Uuid::new_v4();
  let doc = s
    .record_document(NewDocument {
      document_id: id,
      owner,
      document_type,
      file_name: "scan.pdf".into(),
      storage_path: format!("documents/{id}.pdf"),
      mime_type: "application/pdf".into(),
      size_bytes: 1_024,
      content_hash: "00".repeat(32),
    })
    .await
    .unwrap();
  s.review_document(
    doc.document_id,
    DocumentReview { decision: VerificationStatus::Verified, notes: None },
    reviewer.actor(),
  )
  .await
  .unwrap();
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
  let s = store().await;
  user(&s, Role::Student, "juan@example.edu").await;

  let err = s
    .create_user(NewUser {
      name:               "Juan Again".into(),
      email:              "JUAN@example.edu".into(),
      role:               Role::Student,
      password_hash:      "x".into(),
      verification_token: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::DuplicateEmail(_)));

  let found = s.find_user_by_email("Juan@Example.edu").await.unwrap();
  assert!(found.is_some());
}

#[tokio::test]
async fn verification_token_is_single_use() {
  let s = store().await;
  let staff = s
    .create_user(NewUser {
      name:               "Maria Staff".into(),
      email:              "maria@example.edu".into(),
      role:               Role::OsasStaff,
      password_hash:      "x".into(),
      verification_token: Some("tok-123".into()),
    })
    .await
    .unwrap();
  assert!(!staff.is_verified());

  let verified = s.verify_email("tok-123").await.unwrap();
  assert_eq!(verified.user_id, staff.user_id);
  assert!(verified.is_verified());

  let err = s.verify_email("tok-123").await.unwrap_err();
  assert!(matches!(core(err), CoreError::InvalidVerificationToken));
}

#[tokio::test]
async fn profile_upsert_replaces_previous_values() {
  let s = store().await;
  let student = user(&s, Role::Student, "ana@example.edu").await;
  let mut profile = StudentProfile {
    user_id:                 student.user_id,
    student_number:          "2023-00001".into(),
    course:                  "BS Biology".into(),
    year_level:              2,
    current_gwa:             None,
    enrollment_status:       EnrollmentStatus::Enrolled,
    has_disciplinary_record: false,
  };
  s.upsert_student_profile(profile.clone()).await.unwrap();
  profile.year_level = 3;
  profile.current_gwa = Some(Gwa::from_thousandths(1_500).unwrap());
  s.upsert_student_profile(profile).await.unwrap();

  let stored = s.get_student_profile(student.user_id).await.unwrap().unwrap();
  assert_eq!(stored.year_level, 3);
  assert_eq!(stored.current_gwa, Some(Gwa::from_thousandths(1_500).unwrap()));
}

// ─── Scholarships ────────────────────────────────────────────────────────────

#[tokio::test]
async fn drafts_and_deleted_scholarships_are_hidden() {
  let s = store().await;
  let active = scholarship(&s, 3).await;
  let mut draft = scholarship_input(3, Vec::new());
  draft.status = ScholarshipStatus::Draft;
  s.create_scholarship(draft).await.unwrap();
  let doomed = scholarship(&s, 3).await;
  s.delete_scholarship(doomed.scholarship_id).await.unwrap();

  let public = s.list_scholarships(ScholarshipQuery::default()).await.unwrap();
  assert_eq!(public.len(), 1);
  assert_eq!(public[0].scholarship_id, active.scholarship_id);

  let staff_view = s
    .list_scholarships(ScholarshipQuery { status: None, include_drafts: true })
    .await
    .unwrap();
  assert_eq!(staff_view.len(), 2);

  // Soft-deleted rows are still readable directly.
  let gone = s.get_scholarship(doomed.scholarship_id).await.unwrap().unwrap();
  assert!(gone.is_deleted());
}

// ─── Applications ────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_lattice_walk_records_history() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;

  let app = approved(&s, &staff, &student, &sch).await;
  assert_eq!(app.status, ApplicationStatus::Approved);
  assert!(app.submitted_at.is_some());

  let history = s.application_history(app.application_id).await.unwrap();
  let steps: Vec<_> = history.iter().map(|c| c.to_status).collect();
  assert_eq!(steps, vec![
    ApplicationStatus::Draft,
    ApplicationStatus::Submitted,
    ApplicationStatus::UnderVerification,
    ApplicationStatus::Verified,
    ApplicationStatus::UnderEvaluation,
    ApplicationStatus::InterviewScheduled,
    ApplicationStatus::Approved,
  ]);
  assert_eq!(history[0].from_status, None);
}

#[tokio::test]
async fn skipping_ahead_is_illegal() {
  let s = store().await;
  let staff = user(&s, Role::Admin, "admin@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;

  let app = s.create_application(student.actor(), sch.scholarship_id).await.unwrap();
  let app = advance(&s, &app, ApplicationStatus::Submitted, student.actor()).await.unwrap();

  let err = advance(&s, &app, ApplicationStatus::Approved, staff.actor()).await.unwrap_err();
  assert!(matches!(core(err), CoreError::IllegalTransition { .. }));

  let still = s.get_application(app.application_id).await.unwrap().unwrap();
  assert_eq!(still.status, ApplicationStatus::Submitted);
}

#[tokio::test]
async fn roles_gate_transitions() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;

  let app = s.create_application(student.actor(), sch.scholarship_id).await.unwrap();
  let err = advance(&s, &app, ApplicationStatus::Submitted, staff.actor()).await.unwrap_err();
  assert!(matches!(core(err), CoreError::TransitionNotPermitted { .. }));

  let app = advance(&s, &app, ApplicationStatus::Submitted, student.actor()).await.unwrap();
  let err = advance(&s, &app, ApplicationStatus::UnderVerification, student.actor())
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::TransitionNotPermitted { .. }));
}

#[tokio::test]
async fn incomplete_returns_only_to_where_it_left() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;

  let app = s.create_application(student.actor(), sch.scholarship_id).await.unwrap();
  let app = advance(&s, &app, ApplicationStatus::Submitted, student.actor()).await.unwrap();
  let app = advance(&s, &app, ApplicationStatus::UnderVerification, staff.actor()).await.unwrap();
  let app = advance(&s, &app, ApplicationStatus::Incomplete, staff.actor()).await.unwrap();
  assert_eq!(app.resume_status, Some(ApplicationStatus::UnderVerification));

  let err = advance(&s, &app, ApplicationStatus::Verified, staff.actor()).await.unwrap_err();
  assert!(matches!(core(err), CoreError::IllegalTransition { .. }));

  let app = advance(&s, &app, ApplicationStatus::UnderVerification, staff.actor()).await.unwrap();
  assert_eq!(app.status, ApplicationStatus::UnderVerification);
  assert_eq!(app.resume_status, None);
}

#[tokio::test]
async fn verification_waits_for_required_documents() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = s
    .create_scholarship(scholarship_input(2, vec![DocumentType::GradeReport]))
    .await
    .unwrap();

  let app = s.create_application(student.actor(), sch.scholarship_id).await.unwrap();
  let app = advance(&s, &app, ApplicationStatus::Submitted, student.actor()).await.unwrap();
  let app = advance(&s, &app, ApplicationStatus::UnderVerification, staff.actor()).await.unwrap();

  let err = advance(&s, &app, ApplicationStatus::Verified, staff.actor()).await.unwrap_err();
  match core(err) {
    CoreError::DocumentsIncomplete(missing) => {
      assert_eq!(missing, vec![DocumentType::GradeReport])
    }
    other => panic!("unexpected error {other:?}"),
  }

  verified_document(
    &s,
    DocumentOwner::Application(app.application_id),
    DocumentType::GradeReport,
    &staff,
  )
  .await;
  let app = advance(&s, &app, ApplicationStatus::Verified, staff.actor()).await.unwrap();
  assert_eq!(app.status, ApplicationStatus::Verified);
}

#[tokio::test]
async fn rejecting_a_document_requires_notes() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;
  let app = s.create_application(student.actor(), sch.scholarship_id).await.unwrap();

  let id = Uuid::new_v4();
  let doc = s
    .record_document(NewDocument {
      document_id:   id,
      owner:         DocumentOwner::Application(app.application_id),
      document_type: DocumentType::IdPhoto,
      file_name:     "photo.jpg".into(),
      storage_path:  format!("documents/{id}.jpg"),
      mime_type:     "image/jpeg".into(),
      size_bytes:    2_048,
      content_hash:  "ab".repeat(32),
    })
    .await
    .unwrap();

  let err = s
    .review_document(
      doc.document_id,
      DocumentReview { decision: VerificationStatus::Rejected, notes: None },
      staff.actor(),
    )
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::Validation { field: "notes", .. }));

  let reviewed = s
    .review_document(
      doc.document_id,
      DocumentReview {
        decision: VerificationStatus::Rejected,
        notes:    Some("Photo is blurred".into()),
      },
      staff.actor(),
    )
    .await
    .unwrap();
  assert_eq!(reviewed.status, VerificationStatus::Rejected);
  assert_eq!(reviewed.verified_by, Some(staff.user_id));
}

#[tokio::test]
async fn approvals_stop_at_slot_capacity() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let first = user(&s, Role::Student, "s1@example.edu").await;
  let second = user(&s, Role::Student, "s2@example.edu").await;
  let sch = scholarship(&s, 1).await;

  approved(&s, &staff, &first, &sch).await;
  let waiting = interviewed(&s, &staff, &second, &sch).await;

  let err = advance(&s, &waiting, ApplicationStatus::Approved, staff.actor()).await.unwrap_err();
  assert!(matches!(core(err), CoreError::NoSlotsAvailable));

  // Rejection is still possible.
  let rejected = advance(&s, &waiting, ApplicationStatus::Rejected, staff.actor()).await.unwrap();
  assert_eq!(rejected.status, ApplicationStatus::Rejected);
}

#[tokio::test]
async fn one_application_per_scholarship() {
  let s = store().await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;

  s.create_application(student.actor(), sch.scholarship_id).await.unwrap();
  let err = s.create_application(student.actor(), sch.scholarship_id).await.unwrap_err();
  assert!(matches!(core(err), CoreError::DuplicateApplication));
}

#[tokio::test]
async fn closed_scholarships_refuse_applications() {
  let s = store().await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let mut input = scholarship_input(2, Vec::new());
  input.deadline = Utc::now().date_naive() - Duration::days(1);
  let late = s.create_scholarship(input).await.unwrap();

  let err = s.create_application(student.actor(), late.scholarship_id).await.unwrap_err();
  assert!(matches!(core(err), CoreError::ScholarshipClosed));
}

// ─── Interviews ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn reschedule_keeps_history_and_completion_closes() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;
  let app = interviewed(&s, &staff, &student, &sch).await;

  let interview = s.list_interviews(app.application_id).await.unwrap().remove(0);
  let new_time = Utc::now() + Duration::days(5);
  let moved = s
    .reschedule_interview(
      interview.interview_id,
      RescheduleRequest { new_time, reason: "Panel conflict".into() },
      staff.actor(),
    )
    .await
    .unwrap();
  assert_eq!(moved.status, InterviewStatus::Rescheduled);
  assert_eq!(moved.reschedule_history.len(), 1);
  assert_eq!(moved.reschedule_history[0].previous_time, interview.scheduled_at);

  let done = s
    .complete_interview(interview.interview_id, InterviewEvaluation {
      scores:         InterviewScores {
        academic_potential:   5,
        communication_skills: 4,
        leadership:           4,
        financial_need:       3,
      },
      recommendation: Recommendation::Recommended,
      remarks:        None,
    })
    .await
    .unwrap();
  assert_eq!(done.status, InterviewStatus::Completed);
  assert!(done.completed_at.is_some());

  let err = s
    .set_interview_status(interview.interview_id, InterviewStatus::NoShow)
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::InvalidState { .. }));
}

#[tokio::test]
async fn cancelled_interview_can_be_scheduled_again() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;
  let app = interviewed(&s, &staff, &student, &sch).await;
  let next_round = NewInterview {
    application_id: app.application_id,
    interviewer_id: staff.user_id,
    scheduled_at:   Utc::now() + Duration::days(4),
    location:       "OSAS Conference Room".into(),
  };

  let err = s.schedule_interview(next_round.clone(), staff.actor()).await.unwrap_err();
  assert!(matches!(core(err), CoreError::InterviewAlreadyOpen));

  let first = s.list_interviews(app.application_id).await.unwrap().remove(0);
  s.set_interview_status(first.interview_id, InterviewStatus::Cancelled).await.unwrap();

  let second = s.schedule_interview(next_round, staff.actor()).await.unwrap();
  assert_eq!(second.status, InterviewStatus::Scheduled);
  assert_eq!(s.list_interviews(app.application_id).await.unwrap().len(), 2);

  let app = s.get_application(app.application_id).await.unwrap().unwrap();
  assert_eq!(app.status, ApplicationStatus::InterviewScheduled);
  let history = s.application_history(app.application_id).await.unwrap();
  let entered = history
    .iter()
    .filter(|c| c.to_status == ApplicationStatus::InterviewScheduled)
    .count();
  assert_eq!(entered, 1);
}

#[tokio::test]
async fn interview_stage_is_entered_only_by_scheduling() {
  use ApplicationStatus::*;
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;

  let app = s.create_application(student.actor(), sch.scholarship_id).await.unwrap();
  let mut app = advance(&s, &app, Submitted, student.actor()).await.unwrap();
  for to in [UnderVerification, Verified, UnderEvaluation] {
    app = advance(&s, &app, to, staff.actor()).await.unwrap();
  }

  let err = advance(&s, &app, InterviewScheduled, staff.actor()).await.unwrap_err();
  assert!(matches!(core(err), CoreError::InterviewRequired));
  assert!(s.list_interviews(app.application_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn upcoming_interviews_respects_window() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;
  interviewed(&s, &staff, &student, &sch).await;

  let now = Utc::now();
  let soon = s.upcoming_interviews(now, now + Duration::days(3)).await.unwrap();
  assert_eq!(soon.len(), 1);
  let tomorrow = s.upcoming_interviews(now, now + Duration::days(1)).await.unwrap();
  assert!(tomorrow.is_empty());
}

// ─── Renewals ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn renewal_lifecycle_and_eligibility() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;
  let app = approved(&s, &staff, &student, &sch).await;
  let period = RenewalPeriod { semester: Semester::Second, academic_year: 2026 };

  let candidates = s.renewal_candidates(period).await.unwrap();
  assert_eq!(candidates.len(), 1);

  let renewal = s
    .submit_renewal(student.actor(), NewRenewal {
      original_application_id: app.application_id,
      period,
    })
    .await
    .unwrap();
  assert!(!renewal.eligibility.eligible);
  assert!(s.renewal_candidates(period).await.unwrap().is_empty());

  let err = s
    .submit_renewal(student.actor(), NewRenewal {
      original_application_id: app.application_id,
      period,
    })
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::DuplicateRenewal));

  let renewal = s
    .transition_renewal(renewal.renewal_id, RenewalStatus::UnderReview, staff.actor(), None)
    .await
    .unwrap();
  let err = s
    .transition_renewal(renewal.renewal_id, RenewalStatus::Approved, staff.actor(), None)
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::IneligibleRenewal(_)));

  s.upsert_student_profile(StudentProfile {
    user_id:                 student.user_id,
    student_number:          "2023-00001".into(),
    course:                  "BS Mathematics".into(),
    year_level:              3,
    current_gwa:             Some(Gwa::from_thousandths(1_250).unwrap()),
    enrollment_status:       EnrollmentStatus::Enrolled,
    has_disciplinary_record: false,
  })
  .await
  .unwrap();
  for ty in [DocumentType::GradeReport, DocumentType::CertificateOfEnrollment] {
    verified_document(&s, DocumentOwner::Renewal(renewal.renewal_id), ty, &staff).await;
  }

  let report = s.evaluate_renewal(renewal.renewal_id).await.unwrap();
  assert!(report.eligible, "{:?}", report.reasons);

  let approved = s
    .transition_renewal(
      renewal.renewal_id,
      RenewalStatus::Approved,
      staff.actor(),
      Some("Maintained standing".into()),
    )
    .await
    .unwrap();
  assert_eq!(approved.status, RenewalStatus::Approved);
  assert_eq!(approved.reviewed_by, Some(staff.user_id));
  assert!(approved.eligibility.eligible);
}

#[tokio::test]
async fn renewal_needs_an_approved_application() {
  let s = store().await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;
  let app = s.create_application(student.actor(), sch.scholarship_id).await.unwrap();

  let err = s
    .submit_renewal(student.actor(), NewRenewal {
      original_application_id: app.application_id,
      period:                  RenewalPeriod { semester: Semester::First, academic_year: 2026 },
    })
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::InvalidState { .. }));
}

// ─── Funds and stipends ──────────────────────────────────────────────────────

#[tokio::test]
async fn released_stipend_debits_the_fund() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;
  let app = approved(&s, &staff, &student, &sch).await;
  let f = fund(&s, 10_000).await;

  let stipend = s
    .create_stipend(NewStipend {
      application_id: app.application_id,
      fund_id:        f.fund_id,
      amount:         Money::from_pesos(5_000),
      period_label:   "1st Semester 2026".into(),
    })
    .await
    .unwrap();
  s.advance_stipend(stipend.stipend_id, DisbursementStatus::Processing, staff.actor(), None)
    .await
    .unwrap();
  let released = s
    .advance_stipend(stipend.stipend_id, DisbursementStatus::Released, staff.actor(), None)
    .await
    .unwrap();
  assert_eq!(released.status, DisbursementStatus::Released);
  assert_eq!(released.released_by, Some(staff.user_id));

  let f = s.get_fund(f.fund_id).await.unwrap().unwrap();
  assert_eq!(f.disbursed_amount, Money::from_pesos(5_000));
  assert_eq!(f.remaining_budget, Money::from_pesos(5_000));
  assert_eq!(f.remaining_budget.0, f.total_budget.0 - f.disbursed_amount.0);

  let lines = s.list_disbursements(f.fund_id).await.unwrap();
  assert_eq!(lines.len(), 1);
  assert_eq!(lines[0].source_id, stipend.stipend_id);

  let summary = s.fund_summary().await.unwrap();
  assert_eq!(summary[0].disbursement_count, 1);
}

#[tokio::test]
async fn overdraft_is_refused_and_nothing_changes() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;
  let app = approved(&s, &staff, &student, &sch).await;
  let f = fund(&s, 3_000).await;

  let stipend = s
    .create_stipend(NewStipend {
      application_id: app.application_id,
      fund_id:        f.fund_id,
      amount:         Money::from_pesos(5_000),
      period_label:   "1st Semester 2026".into(),
    })
    .await
    .unwrap();
  s.advance_stipend(stipend.stipend_id, DisbursementStatus::Processing, staff.actor(), None)
    .await
    .unwrap();

  let err = s
    .advance_stipend(stipend.stipend_id, DisbursementStatus::Released, staff.actor(), None)
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::InsufficientFunds { .. }));

  let f = s.get_fund(f.fund_id).await.unwrap().unwrap();
  assert_eq!(f.disbursed_amount, Money::ZERO);
  assert_eq!(f.remaining_budget, Money::from_pesos(3_000));
  assert!(s.list_disbursements(f.fund_id).await.unwrap().is_empty());

  let stipend = s.get_stipend(stipend.stipend_id).await.unwrap().unwrap();
  assert_eq!(stipend.status, DisbursementStatus::Processing);
}

#[tokio::test]
async fn release_requires_processing_first() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;
  let app = approved(&s, &staff, &student, &sch).await;
  let f = fund(&s, 10_000).await;

  let stipend = s
    .create_stipend(NewStipend {
      application_id: app.application_id,
      fund_id:        f.fund_id,
      amount:         Money::from_pesos(1_000),
      period_label:   "1st Semester 2026".into(),
    })
    .await
    .unwrap();
  let err = s
    .advance_stipend(stipend.stipend_id, DisbursementStatus::Released, staff.actor(), None)
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::InvalidState { entity: "stipend", .. }));
}

#[tokio::test]
async fn budget_cannot_drop_below_disbursed() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;
  let app = approved(&s, &staff, &student, &sch).await;
  let f = fund(&s, 10_000).await;

  let stipend = s
    .create_stipend(NewStipend {
      application_id: app.application_id,
      fund_id:        f.fund_id,
      amount:         Money::from_pesos(6_000),
      period_label:   "1st Semester 2026".into(),
    })
    .await
    .unwrap();
  for to in [DisbursementStatus::Processing, DisbursementStatus::Released] {
    s.advance_stipend(stipend.stipend_id, to, staff.actor(), None).await.unwrap();
  }

  let err = s.adjust_fund_budget(f.fund_id, Money::from_pesos(5_000)).await.unwrap_err();
  assert!(matches!(core(err), CoreError::BudgetBelowDisbursed { .. }));

  let raised = s.adjust_fund_budget(f.fund_id, Money::from_pesos(12_000)).await.unwrap();
  assert_eq!(raised.remaining_budget, Money::from_pesos(6_000));
}

#[tokio::test]
async fn stipends_need_an_approved_application() {
  let s = store().await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let sch = scholarship(&s, 2).await;
  let app = s.create_application(student.actor(), sch.scholarship_id).await.unwrap();
  let f = fund(&s, 10_000).await;

  let err = s
    .create_stipend(NewStipend {
      application_id: app.application_id,
      fund_id:        f.fund_id,
      amount:         Money::from_pesos(1_000),
      period_label:   "1st Semester 2026".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::InvalidState { .. }));
}

// ─── Assistantship ───────────────────────────────────────────────────────────

async fn assignment(s: &SqliteStore, student: &User, supervisor: &User, f: &Fund) -> Assignment {
  let today = Utc::now().date_naive();
  s.create_assignment(NewAssignment {
    student_id:    student.user_id,
    supervisor_id: supervisor.user_id,
    office:        "University Library".into(),
    hourly_rate:   Money::from_pesos(60),
    start_date:    today - Duration::days(30),
    end_date:      today + Duration::days(30),
    fund_id:       f.fund_id,
  })
  .await
  .unwrap()
}

fn shift(days_ago: i64, from: u32, to: u32) -> NewWorkHourLog {
  NewWorkHourLog {
    work_date:        Utc::now().date_naive() - Duration::days(days_ago),
    time_in:          NaiveTime::from_hms_opt(from, 0, 0).unwrap(),
    time_out:         NaiveTime::from_hms_opt(to, 0, 0).unwrap(),
    task_description: "Shelving returned books".into(),
  }
}

#[tokio::test]
async fn one_work_log_per_day() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let f = fund(&s, 10_000).await;
  let a = assignment(&s, &student, &staff, &f).await;
  let today = Utc::now().date_naive();

  let log = s.log_work_hours(a.assignment_id, shift(1, 8, 12), today).await.unwrap();
  assert_eq!(log.hours_worked, Hours::from_hundredths(400));

  let err = s.log_work_hours(a.assignment_id, shift(1, 13, 17), today).await.unwrap_err();
  assert!(matches!(core(err), CoreError::DuplicateWorkHourLog { .. }));
}

#[tokio::test]
async fn payroll_pays_approved_hours_once() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let f = fund(&s, 10_000).await;
  let a = assignment(&s, &student, &staff, &f).await;
  let today = Utc::now().date_naive();

  let first = s.log_work_hours(a.assignment_id, shift(3, 8, 12), today).await.unwrap();
  let second = s.log_work_hours(a.assignment_id, shift(2, 8, 12), today).await.unwrap();
  let third = s.log_work_hours(a.assignment_id, shift(1, 8, 12), today).await.unwrap();

  s.review_work_log(
    first.log_id,
    WorkLogReview::Approve { adjusted_hours: None },
    staff.actor(),
  )
  .await
  .unwrap();
  s.review_work_log(
    second.log_id,
    WorkLogReview::Approve { adjusted_hours: Some(Hours::from_hundredths(300)) },
    staff.actor(),
  )
  .await
  .unwrap();
  s.review_work_log(
    third.log_id,
    WorkLogReview::Reject { reason: "No supervisor sign-off".into() },
    staff.actor(),
  )
  .await
  .unwrap();

  let period = PaymentPeriod {
    period_start: today - Duration::days(7),
    period_end:   today,
  };
  let payment = s.create_payment(a.assignment_id, period).await.unwrap();
  assert_eq!(payment.total_hours, Hours::from_hundredths(700));
  assert_eq!(payment.gross_amount, Money::from_pesos(420));

  let err = s.create_payment(a.assignment_id, period).await.unwrap_err();
  assert!(matches!(core(err), CoreError::NothingToPay));

  for to in [DisbursementStatus::Processing, DisbursementStatus::Released] {
    s.advance_payment(payment.payment_id, to, staff.actor()).await.unwrap();
  }
  let f = s.get_fund(f.fund_id).await.unwrap().unwrap();
  assert_eq!(f.disbursed_amount, Money::from_pesos(420));

  let logs = s.list_work_logs(a.assignment_id).await.unwrap();
  let paid = logs.iter().filter(|l| l.payment_id == Some(payment.payment_id)).count();
  assert_eq!(paid, 2);
}

#[tokio::test]
async fn cancelled_payment_returns_hours_to_payroll() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let student = user(&s, Role::Student, "s1@example.edu").await;
  let f = fund(&s, 10_000).await;
  let a = assignment(&s, &student, &staff, &f).await;
  let today = Utc::now().date_naive();

  let log = s.log_work_hours(a.assignment_id, shift(2, 8, 12), today).await.unwrap();
  s.review_work_log(log.log_id, WorkLogReview::Approve { adjusted_hours: None }, staff.actor())
    .await
    .unwrap();

  let period = PaymentPeriod {
    period_start: today - Duration::days(7),
    period_end:   today,
  };
  let cancelled = s.create_payment(a.assignment_id, period).await.unwrap();
  s.advance_payment(cancelled.payment_id, DisbursementStatus::Cancelled, staff.actor())
    .await
    .unwrap();

  let retried = s.create_payment(a.assignment_id, period).await.unwrap();
  assert_eq!(retried.total_hours, Hours::from_hundredths(400));

  for to in [DisbursementStatus::Processing, DisbursementStatus::Failed] {
    s.advance_payment(retried.payment_id, to, staff.actor()).await.unwrap();
  }
  let third = s.create_payment(a.assignment_id, period).await.unwrap();
  assert_eq!(third.gross_amount, Money::from_pesos(240));

  let logs = s.list_work_logs(a.assignment_id).await.unwrap();
  assert_eq!(logs[0].payment_id, Some(third.payment_id));
  let f = s.get_fund(f.fund_id).await.unwrap().unwrap();
  assert_eq!(f.disbursed_amount, Money::ZERO);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_releases_cannot_double_spend() {
  let s = store().await;
  let staff = user(&s, Role::OsasStaff, "staff@example.edu").await;
  let f = fund(&s, 8_000).await;
  let sch = scholarship(&s, 2).await;

  let mut stipends = Vec::new();
  for email in ["s1@example.edu", "s2@example.edu"] {
    let student = user(&s, Role::Student, email).await;
    let app = approved(&s, &staff, &student, &sch).await;
    let stipend = s
      .create_stipend(NewStipend {
        application_id: app.application_id,
        fund_id:        f.fund_id,
        amount:         Money::from_pesos(5_000),
        period_label:   "1st Semester 2026".into(),
      })
      .await
      .unwrap();
    s.advance_stipend(stipend.stipend_id, DisbursementStatus::Processing, staff.actor(), None)
      .await
      .unwrap();
    stipends.push(stipend.stipend_id);
  }

  let (a, b) = tokio::join!(
    s.advance_stipend(stipends[0], DisbursementStatus::Released, staff.actor(), None),
    s.advance_stipend(stipends[1], DisbursementStatus::Released, staff.actor(), None),
  );
  let refused = [a, b]
    .into_iter()
    .filter_map(Result::err)
    .map(core)
    .filter(|e| matches!(e, CoreError::InsufficientFunds { .. }))
    .count();
  assert_eq!(refused, 1);

  let f = s.get_fund(f.fund_id).await.unwrap().unwrap();
  assert_eq!(f.disbursed_amount, Money::from_pesos(5_000));
  assert_eq!(f.remaining_budget.0, f.total_budget.0 - f.disbursed_amount.0);
  assert_eq!(s.list_disbursements(f.fund_id).await.unwrap().len(), 1);
}
