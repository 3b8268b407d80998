//! Error types for `osas-core`.
//!
//! Every variant other than `Serialization` is a state-invariant violation
//! that must reach the user as a rejection message.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  application::ApplicationStatus, document::DocumentType, money::Money, user::Role,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: Uuid },

  #[error("illegal application transition: {from} -> {to}")]
  IllegalTransition {
    from: ApplicationStatus,
    to:   ApplicationStatus,
  },

  #[error("role {role} may not move an application from {from} to {to}")]
  TransitionNotPermitted {
    role: Role,
    from: ApplicationStatus,
    to:   ApplicationStatus,
  },

  #[error("{entity} cannot move from {from} to {to}")]
  InvalidState {
    entity: &'static str,
    from:   String,
    to:     String,
  },

  #[error("insufficient funds: requested {requested}, remaining {remaining}")]
  InsufficientFunds { requested: Money, remaining: Money },

  #[error("budget cannot drop below the disbursed amount {disbursed}")]
  BudgetBelowDisbursed { disbursed: Money },

  #[error("a work-hour log already exists for {work_date}")]
  DuplicateWorkHourLog { work_date: NaiveDate },

  #[error("a renewal application already exists for this period")]
  DuplicateRenewal,

  #[error("student already applied to this scholarship")]
  DuplicateApplication,

  #[error("an account with email {0:?} already exists")]
  DuplicateEmail(String),

  #[error("required documents are not verified: {}", join_types(.0))]
  DocumentsIncomplete(Vec<DocumentType>),

  #[error("interview_scheduled is entered by scheduling an interview")]
  InterviewRequired,

  #[error("application already has an open or completed interview")]
  InterviewAlreadyOpen,

  #[error("no slots remain for this scholarship")]
  NoSlotsAvailable,

  #[error("scholarship is not accepting applications")]
  ScholarshipClosed,

  #[error("renewal is not eligible: {}", .0.join("; "))]
  IneligibleRenewal(Vec<String>),

  #[error("no approved, unpaid work hours in the requested period")]
  NothingToPay,

  #[error("invalid email verification token")]
  InvalidVerificationToken,

  #[error("validation failed: {field}: {message}")]
  Validation {
    field:   &'static str,
    message: String,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
    Self::Validation { field, message: message.into() }
  }

  pub fn not_found(entity: &'static str, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }

  /// True when the error is a broken business rule rather than bad input or
  /// a missing record.
  pub fn is_conflict(&self) -> bool {
    !matches!(
      self,
      Self::NotFound { .. } | Self::Validation { .. } | Self::Serialization(_)
    )
  }
}

fn join_types(types: &[DocumentType]) -> String {
  types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
