//! Renewal applications and the renewal eligibility evaluator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  money::Gwa,
  user::{EnrollmentStatus, Role},
};

// ─── Period ──────────────────────────────────────────────────────────────────

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
pub enum Semester {
  First,
  Second,
  Summer,
}

/// A renewal period: one semester of one academic year (the year the
/// academic year starts in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenewalPeriod {
  pub semester:      Semester,
  pub academic_year: i32,
}

impl fmt::Display for RenewalPeriod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sem = match self.semester {
      Semester::First => "1st Semester",
      Semester::Second => "2nd Semester",
      Semester::Summer => "Summer",
    };
    write!(f, "{sem}, AY {}-{}", self.academic_year, self.academic_year + 1)
  }
}

// ─── Eligibility ─────────────────────────────────────────────────────────────

/// The inputs the evaluator looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentStanding {
  pub current_gwa:             Option<Gwa>,
  pub enrollment_status:       EnrollmentStatus,
  pub has_disciplinary_record: bool,
  pub documents_complete:      bool,
}

/// One unmet renewal requirement. Variants are declared in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "requirement", rename_all = "snake_case")]
pub enum UnmetRequirement {
  GwaNotOnRecord,
  GwaAboveCeiling { actual: Gwa, ceiling: Gwa },
  NotEnrolled { status: EnrollmentStatus },
  DisciplinaryRecord,
  DocumentsIncomplete,
}

impl fmt::Display for UnmetRequirement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::GwaNotOnRecord => {
        write!(f, "GWA requirement not met: no current GWA on record")
      }
      Self::GwaAboveCeiling { actual, ceiling } => write!(
        f,
        "GWA requirement not met: current GWA {actual} exceeds the required {ceiling}"
      ),
      Self::NotEnrolled { status } => {
        write!(f, "enrollment requirement not met: student is {status}")
      }
      Self::DisciplinaryRecord => {
        write!(f, "conduct requirement not met: student has a disciplinary record")
      }
      Self::DocumentsIncomplete => {
        write!(f, "document requirement not met: renewal documents are incomplete")
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityReport {
  pub eligible: bool,
  pub reasons:  Vec<UnmetRequirement>,
}

impl EligibilityReport {
  pub fn messages(&self) -> Vec<String> { self.reasons.iter().map(ToString::to_string).collect() }
}

/// Evaluate renewal eligibility.
///
/// `gwa_ceiling` is the highest acceptable GWA (lower is better); `None`
/// means the scholarship sets no grade requirement beyond having a GWA on
/// record. A missing GWA never passes.
pub fn evaluate_renewal(standing: &StudentStanding, gwa_ceiling: Option<Gwa>) -> EligibilityReport {
  let mut reasons = Vec::new();

  match (standing.current_gwa, gwa_ceiling) {
    (None, _) => reasons.push(UnmetRequirement::GwaNotOnRecord),
    (Some(actual), Some(ceiling)) if actual > ceiling => {
      reasons.push(UnmetRequirement::GwaAboveCeiling { actual, ceiling })
    }
    _ => {}
  }

  if standing.enrollment_status != EnrollmentStatus::Enrolled {
    reasons.push(UnmetRequirement::NotEnrolled { status: standing.enrollment_status });
  }

  if standing.has_disciplinary_record {
    reasons.push(UnmetRequirement::DisciplinaryRecord);
  }

  if !standing.documents_complete {
    reasons.push(UnmetRequirement::DocumentsIncomplete);
  }

  EligibilityReport { eligible: reasons.is_empty(), reasons }
}

// ─── Renewal applications ────────────────────────────────────────────────────

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
pub enum RenewalStatus {
  Pending,
  UnderReview,
  Approved,
  Rejected,
  Withdrawn,
}

impl RenewalStatus {
  /// Check a move from `self` to `to` by an actor of `role`.
  pub fn check_transition(self, to: RenewalStatus, role: Role) -> Result<()> {
    use RenewalStatus::*;
    let legal = match (self, to) {
      (Pending, UnderReview) | (UnderReview, Approved) | (UnderReview, Rejected) => {
        role.is_staff()
      }
      (Pending, Withdrawn) | (UnderReview, Withdrawn) => role == Role::Student,
      _ => false,
    };
    if !legal {
      return Err(Error::InvalidState {
        entity: "renewal",
        from:   self.to_string(),
        to:     to.to_string(),
      });
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalApplication {
  pub renewal_id:              Uuid,
  pub original_application_id: Uuid,
  pub student_id:              Uuid,
  pub scholarship_id:          Uuid,
  pub period:                  RenewalPeriod,
  /// GWA on record when the renewal was filed.
  pub gwa_snapshot:            Option<Gwa>,
  /// Most recent evaluator result; refreshed at every review step.
  pub eligibility:             EligibilityReport,
  pub status:                  RenewalStatus,
  pub reviewed_by:             Option<Uuid>,
  pub reviewed_at:             Option<DateTime<Utc>>,
  pub remarks:                 Option<String>,
  pub created_at:              DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRenewal {
  pub original_application_id: Uuid,
  pub period:                  RenewalPeriod,
}

/// An approved scholar who has not filed a renewal for a period.
#[derive(Debug, Clone, Serialize)]
pub struct RenewalCandidate {
  pub student_id:       Uuid,
  pub student_name:     String,
  pub student_email:    String,
  pub scholarship_id:   Uuid,
  pub scholarship_name: String,
  pub application_id:   Uuid,
}
