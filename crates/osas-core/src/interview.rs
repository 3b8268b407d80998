//! Interview scheduling, outcomes, and the reschedule trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

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
pub enum InterviewStatus {
  Scheduled,
  Completed,
  Missed,
  Rescheduled,
  Cancelled,
  NoShow,
}

impl InterviewStatus {
  /// `scheduled` and `rescheduled` are the only states still awaiting the
  /// interview itself.
  pub fn is_open(self) -> bool { matches!(self, Self::Scheduled | Self::Rescheduled) }

  /// Check a move out of this state.
  pub fn check_transition(self, to: InterviewStatus) -> Result<()> {
    let allowed = self.is_open() && to != Self::Scheduled;
    if !allowed {
      return Err(Error::InvalidState {
        entity: "interview",
        from:   self.to_string(),
        to:     to.to_string(),
      });
    }
    Ok(())
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Recommendation {
  Recommended,
  NotRecommended,
  Waitlisted,
}

/// Panel ratings, each on a 1–5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewScores {
  pub academic_potential:   u8,
  pub communication_skills: u8,
  pub leadership:           u8,
  pub financial_need:       u8,
}

impl InterviewScores {
  pub fn validate(&self) -> Result<()> {
    let fields = [
      ("academic_potential", self.academic_potential),
      ("communication_skills", self.communication_skills),
      ("leadership", self.leadership),
      ("financial_need", self.financial_need),
    ];
    for (field, value) in fields {
      if !(1..=5).contains(&value) {
        return Err(Error::validation(field, "must be between 1 and 5"));
      }
    }
    Ok(())
  }

  pub fn total(&self) -> u8 {
    self.academic_potential + self.communication_skills + self.leadership + self.financial_need
  }
}

/// Scores and recommendation are always recorded together so a row can
/// never carry one without the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewEvaluation {
  pub scores:         InterviewScores,
  pub recommendation: Recommendation,
  pub remarks:        Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleEntry {
  pub previous_time:  DateTime<Utc>,
  pub new_time:       DateTime<Utc>,
  pub reason:         String,
  pub rescheduled_by: Uuid,
  pub recorded_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
  pub interview_id:       Uuid,
  pub application_id:     Uuid,
  pub interviewer_id:     Uuid,
  pub scheduled_at:       DateTime<Utc>,
  pub location:           String,
  pub status:             InterviewStatus,
  pub evaluation:         Option<InterviewEvaluation>,
  /// Set exactly when `status` is `completed`.
  pub completed_at:       Option<DateTime<Utc>>,
  pub reschedule_history: Vec<RescheduleEntry>,
  pub created_at:         DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInterview {
  pub application_id: Uuid,
  pub interviewer_id: Uuid,
  pub scheduled_at:   DateTime<Utc>,
  pub location:       String,
}

impl NewInterview {
  pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
    if self.scheduled_at <= now {
      return Err(Error::validation("scheduled_at", "must be in the future"));
    }
    if self.location.trim().is_empty() {
      return Err(Error::validation("location", "must not be empty"));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
  pub new_time: DateTime<Utc>,
  pub reason:   String,
}

impl RescheduleRequest {
  pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
    if self.new_time <= now {
      return Err(Error::validation("new_time", "must be in the future"));
    }
    if self.reason.trim().is_empty() {
      return Err(Error::validation("reason", "must not be empty"));
    }
    Ok(())
  }
}
