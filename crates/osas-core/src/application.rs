//! Scholarship applications and the status lattice they move through.
//!
//! ```text
//! draft → submitted → under_verification → verified → under_evaluation
//!       → interview_scheduled → approved | rejected
//! ```
//!
//! Any in-progress state may drop laterally to `incomplete`; an incomplete
//! application can only return to the state it was interrupted in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  user::{Actor, Role},
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApplicationStatus {
  Draft,
  Submitted,
  UnderVerification,
  Incomplete,
  Verified,
  UnderEvaluation,
  InterviewScheduled,
  Approved,
  Rejected,
}

impl ApplicationStatus {
  pub fn is_terminal(self) -> bool { matches!(self, Self::Approved | Self::Rejected) }

  /// States from which an application may be flagged `incomplete`.
  pub fn is_in_progress(self) -> bool {
    matches!(
      self,
      Self::Submitted
        | Self::UnderVerification
        | Self::Verified
        | Self::UnderEvaluation
        | Self::InterviewScheduled
    )
  }

  /// Forward edges of the lattice. `incomplete` is handled separately since
  /// its exit depends on where it was entered from.
  pub fn successors(self) -> &'static [ApplicationStatus] {
    use ApplicationStatus::*;
    match self {
      Draft => &[Submitted],
      Submitted => &[UnderVerification],
      UnderVerification => &[Verified],
      Verified => &[UnderEvaluation],
      UnderEvaluation => &[InterviewScheduled],
      InterviewScheduled => &[Approved, Rejected],
      Incomplete | Approved | Rejected => &[],
    }
  }
}

/// A legal move computed by [`plan_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  pub from:          ApplicationStatus,
  pub to:            ApplicationStatus,
  /// Value to persist as the application's `resume_status` afterwards.
  pub resume_status: Option<ApplicationStatus>,
}

/// Decide whether `actor_role` may move an application from `current` to
/// `requested`.
///
/// `resume_status` is the state an `incomplete` application was interrupted
/// in; it is ignored for every other state.
pub fn plan_transition(
  current: ApplicationStatus,
  resume_status: Option<ApplicationStatus>,
  requested: ApplicationStatus,
  actor_role: Role,
) -> Result<Transition> {
  use ApplicationStatus::*;

  let illegal = || Error::IllegalTransition { from: current, to: requested };

  let next_resume = match (current, requested) {
    (Incomplete, to) => {
      if resume_status != Some(to) {
        return Err(illegal());
      }
      None
    }
    (from, Incomplete) if from.is_in_progress() => Some(from),
    (from, to) if from.successors().contains(&to) => None,
    _ => return Err(illegal()),
  };

  let permitted = match (current, requested) {
    (Draft, Submitted) => actor_role == Role::Student,
    _ => actor_role.is_staff(),
  };
  if !permitted {
    return Err(Error::TransitionNotPermitted {
      role: actor_role,
      from: current,
      to:   requested,
    });
  }

  Ok(Transition { from: current, to: requested, resume_status: next_resume })
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
  pub application_id: Uuid,
  pub student_id:     Uuid,
  pub scholarship_id: Uuid,
  pub status:         ApplicationStatus,
  /// Set only while `status` is `incomplete`.
  pub resume_status:  Option<ApplicationStatus>,
  pub remarks:        Option<String>,
  pub submitted_at:   Option<DateTime<Utc>>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// Request to move an application to a new status.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
  pub to:    ApplicationStatus,
  pub actor: Actor,
  pub note:  Option<String>,
}

/// One row of the append-only status audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
  pub change_id:      Uuid,
  pub application_id: Uuid,
  /// `None` for the row recording creation of the draft.
  pub from_status:    Option<ApplicationStatus>,
  pub to_status:      ApplicationStatus,
  pub actor_id:       Uuid,
  pub note:           Option<String>,
  pub recorded_at:    DateTime<Utc>,
}
