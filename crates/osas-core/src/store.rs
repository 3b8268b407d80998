//! The `ScholarshipStore` trait and supporting query types.
//!
//! Implemented by storage backends (e.g. `osas-store-sqlite`). The HTTP layer
//! depends on this abstraction, not on any concrete backend.
//!
//! Every write that touches more than one row (a transition plus its audit
//! row, a release plus its fund debit) must be atomic in the implementation.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  application::{Application, ApplicationStatus, StatusChange, TransitionRequest},
  assistantship::{
    Assignment, AssistantshipPayment, NewAssignment, NewWorkHourLog, PaymentPeriod,
    WorkHourLog, WorkLogReview,
  },
  document::{Document, DocumentOwner, DocumentReview, NewDocument},
  interview::{Interview, InterviewEvaluation, InterviewStatus, NewInterview, RescheduleRequest},
  ledger::{Disbursement, DisbursementStatus, Fund, FundSummary, NewFund, NewStipend, Stipend},
  money::Money,
  renewal::{
    EligibilityReport, NewRenewal, RenewalApplication, RenewalCandidate, RenewalPeriod,
    RenewalStatus,
  },
  scholarship::{NewScholarship, Scholarship, ScholarshipPatch, ScholarshipStatus},
  user::{Actor, NewUser, StudentProfile, User},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`ScholarshipStore::list_scholarships`]. Soft-deleted rows
/// are never listed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScholarshipQuery {
  pub status:         Option<ScholarshipStatus>,
  /// Include `draft` scholarships. Off for students.
  #[serde(default)]
  pub include_drafts: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationQuery {
  pub student_id:     Option<Uuid>,
  pub scholarship_id: Option<Uuid>,
  pub status:         Option<ApplicationStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenewalQuery {
  pub student_id: Option<Uuid>,
  pub status:     Option<RenewalStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StipendQuery {
  pub student_id: Option<Uuid>,
  pub fund_id:    Option<Uuid>,
  pub status:     Option<DisbursementStatus>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an OSAS Connect persistence backend.
///
/// Every state change is validated with the pure rules in this crate before
/// it is written. Rule violations surface as [`crate::Error`] values wrapped
/// in `Self::Error`, reachable through [`std::error::Error::source`].
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait ScholarshipStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create an account. Fails with `DuplicateEmail` if the address is taken.
  fn create_user(&self, input: NewUser)
  -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(&self, id: Uuid)
  -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Case-insensitive lookup, used by authentication.
  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Consume a verification token and mark the owning account verified.
  fn verify_email<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + 'a;

  /// Insert or replace the academic profile of a student account.
  fn upsert_student_profile(
    &self,
    profile: StudentProfile,
  ) -> impl Future<Output = Result<StudentProfile, Self::Error>> + Send + '_;

  fn get_student_profile(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<StudentProfile>, Self::Error>> + Send + '_;

  // ── Scholarships ──────────────────────────────────────────────────────

  fn create_scholarship(
    &self,
    input: NewScholarship,
  ) -> impl Future<Output = Result<Scholarship, Self::Error>> + Send + '_;

  /// Returns soft-deleted scholarships too; callers decide visibility.
  fn get_scholarship(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Scholarship>, Self::Error>> + Send + '_;

  fn list_scholarships(
    &self,
    query: ScholarshipQuery,
  ) -> impl Future<Output = Result<Vec<Scholarship>, Self::Error>> + Send + '_;

  fn update_scholarship(
    &self,
    id: Uuid,
    patch: ScholarshipPatch,
  ) -> impl Future<Output = Result<Scholarship, Self::Error>> + Send + '_;

  /// Soft delete. Applications and stipends referencing it are untouched.
  fn delete_scholarship(&self, id: Uuid)
  -> impl Future<Output = Result<Scholarship, Self::Error>> + Send + '_;

  // ── Applications ──────────────────────────────────────────────────────

  /// Open a `draft` application for `student`.
  fn create_application(
    &self,
    student: Actor,
    scholarship_id: Uuid,
  ) -> impl Future<Output = Result<Application, Self::Error>> + Send + '_;

  fn get_application(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Application>, Self::Error>> + Send + '_;

  fn list_applications(
    &self,
    query: ApplicationQuery,
  ) -> impl Future<Output = Result<Vec<Application>, Self::Error>> + Send + '_;

  /// Move an application along the status lattice, appending an audit row.
  ///
  /// Besides the lattice itself this enforces the scholarship deadline on
  /// submission, document readiness on verification, and slot capacity on
  /// approval.
  fn transition_application(
    &self,
    id: Uuid,
    request: TransitionRequest,
  ) -> impl Future<Output = Result<Application, Self::Error>> + Send + '_;

  /// Audit trail for one application, oldest first.
  fn application_history(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<StatusChange>, Self::Error>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  fn record_document(
    &self,
    input: NewDocument,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  fn get_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  fn list_documents(
    &self,
    owner: DocumentOwner,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;

  fn review_document(
    &self,
    id: Uuid,
    review: DocumentReview,
    reviewer: Actor,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  // ── Interviews ────────────────────────────────────────────────────────

  /// Schedule an interview for an `under_evaluation` application and move the
  /// application to `interview_scheduled` in the same transaction.
  fn schedule_interview(
    &self,
    input: NewInterview,
    actor: Actor,
  ) -> impl Future<Output = Result<Interview, Self::Error>> + Send + '_;

  fn get_interview(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Interview>, Self::Error>> + Send + '_;

  fn list_interviews(
    &self,
    application_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Interview>, Self::Error>> + Send + '_;

  fn reschedule_interview(
    &self,
    id: Uuid,
    request: RescheduleRequest,
    actor: Actor,
  ) -> impl Future<Output = Result<Interview, Self::Error>> + Send + '_;

  fn complete_interview(
    &self,
    id: Uuid,
    evaluation: InterviewEvaluation,
  ) -> impl Future<Output = Result<Interview, Self::Error>> + Send + '_;

  /// Close an interview as `missed`, `no_show`, or `cancelled`.
  fn set_interview_status(
    &self,
    id: Uuid,
    status: InterviewStatus,
  ) -> impl Future<Output = Result<Interview, Self::Error>> + Send + '_;

  /// Open interviews scheduled in `[from, until)`.
  fn upcoming_interviews(
    &self,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Interview>, Self::Error>> + Send + '_;

  // ── Renewals ──────────────────────────────────────────────────────────

  /// File a renewal against the student's own approved application,
  /// snapshotting GWA and eligibility.
  fn submit_renewal(
    &self,
    student: Actor,
    input: NewRenewal,
  ) -> impl Future<Output = Result<RenewalApplication, Self::Error>> + Send + '_;

  fn get_renewal(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RenewalApplication>, Self::Error>> + Send + '_;

  fn list_renewals(
    &self,
    query: RenewalQuery,
  ) -> impl Future<Output = Result<Vec<RenewalApplication>, Self::Error>> + Send + '_;

  /// Run the evaluator against current data without changing anything.
  fn evaluate_renewal(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<EligibilityReport, Self::Error>> + Send + '_;

  /// Move a renewal along its lifecycle. Eligibility is re-evaluated and
  /// stored at every step; approving an ineligible renewal fails.
  fn transition_renewal(
    &self,
    id: Uuid,
    to: RenewalStatus,
    actor: Actor,
    remarks: Option<String>,
  ) -> impl Future<Output = Result<RenewalApplication, Self::Error>> + Send + '_;

  /// Approved scholars of active scholarships with no renewal for `period`.
  fn renewal_candidates(
    &self,
    period: RenewalPeriod,
  ) -> impl Future<Output = Result<Vec<RenewalCandidate>, Self::Error>> + Send + '_;

  // ── Funds ─────────────────────────────────────────────────────────────

  fn create_fund(&self, input: NewFund)
  -> impl Future<Output = Result<Fund, Self::Error>> + Send + '_;

  fn get_fund(&self, id: Uuid)
  -> impl Future<Output = Result<Option<Fund>, Self::Error>> + Send + '_;

  fn list_funds(&self) -> impl Future<Output = Result<Vec<Fund>, Self::Error>> + Send + '_;

  fn adjust_fund_budget(
    &self,
    id: Uuid,
    total_budget: Money,
  ) -> impl Future<Output = Result<Fund, Self::Error>> + Send + '_;

  fn list_disbursements(
    &self,
    fund_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Disbursement>, Self::Error>> + Send + '_;

  fn fund_summary(&self) -> impl Future<Output = Result<Vec<FundSummary>, Self::Error>> + Send + '_;

  // ── Stipends ──────────────────────────────────────────────────────────

  /// Create a `pending` stipend for an approved application.
  fn create_stipend(
    &self,
    input: NewStipend,
  ) -> impl Future<Output = Result<Stipend, Self::Error>> + Send + '_;

  fn get_stipend(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Stipend>, Self::Error>> + Send + '_;

  fn list_stipends(
    &self,
    query: StipendQuery,
  ) -> impl Future<Output = Result<Vec<Stipend>, Self::Error>> + Send + '_;

  /// Move a stipend along the disbursement lifecycle. Moving to `released`
  /// debits the fund atomically and fails, changing nothing, on overdraft.
  fn advance_stipend(
    &self,
    id: Uuid,
    to: DisbursementStatus,
    actor: Actor,
    remarks: Option<String>,
  ) -> impl Future<Output = Result<Stipend, Self::Error>> + Send + '_;

  // ── Assistantship ─────────────────────────────────────────────────────

  fn create_assignment(
    &self,
    input: NewAssignment,
  ) -> impl Future<Output = Result<Assignment, Self::Error>> + Send + '_;

  fn get_assignment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Assignment>, Self::Error>> + Send + '_;

  fn list_assignments(
    &self,
    student_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Assignment>, Self::Error>> + Send + '_;

  /// Record a day's work. One log per (assignment, work date).
  fn log_work_hours(
    &self,
    assignment_id: Uuid,
    input: NewWorkHourLog,
    today: NaiveDate,
  ) -> impl Future<Output = Result<WorkHourLog, Self::Error>> + Send + '_;

  fn get_work_log(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<WorkHourLog>, Self::Error>> + Send + '_;

  fn list_work_logs(
    &self,
    assignment_id: Uuid,
  ) -> impl Future<Output = Result<Vec<WorkHourLog>, Self::Error>> + Send + '_;

  fn review_work_log(
    &self,
    id: Uuid,
    review: WorkLogReview,
    reviewer: Actor,
  ) -> impl Future<Output = Result<WorkHourLog, Self::Error>> + Send + '_;

  /// Aggregate approved, unpaid logs in `period` into a `pending` payment and
  /// mark them paid by it.
  fn create_payment(
    &self,
    assignment_id: Uuid,
    period: PaymentPeriod,
  ) -> impl Future<Output = Result<AssistantshipPayment, Self::Error>> + Send + '_;

  fn get_payment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AssistantshipPayment>, Self::Error>> + Send + '_;

  fn list_payments(
    &self,
    assignment_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AssistantshipPayment>, Self::Error>> + Send + '_;

  /// Same lifecycle and ledger rules as [`Self::advance_stipend`].
  fn advance_payment(
    &self,
    id: Uuid,
    to: DisbursementStatus,
    actor: Actor,
  ) -> impl Future<Output = Result<AssistantshipPayment, Self::Error>> + Send + '_;
}
