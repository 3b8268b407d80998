//! Student assistantship assignments, daily work-hour logs, and payroll.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  ledger::DisbursementStatus,
  money::{Hours, Money},
};

// ─── Assignments ─────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
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
pub enum AssignmentStatus {
  #[default]
  Active,
  Completed,
  Terminated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
  pub assignment_id: Uuid,
  pub student_id:    Uuid,
  pub supervisor_id: Uuid,
  pub office:        String,
  pub hourly_rate:   Money,
  pub start_date:    NaiveDate,
  pub end_date:      NaiveDate,
  pub fund_id:       Uuid,
  pub status:        AssignmentStatus,
  pub created_at:    DateTime<Utc>,
  pub deleted_at:    Option<DateTime<Utc>>,
}

impl Assignment {
  pub fn covers(&self, date: NaiveDate) -> bool {
    self.start_date <= date && date <= self.end_date
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
  pub student_id:    Uuid,
  pub supervisor_id: Uuid,
  pub office:        String,
  pub hourly_rate:   Money,
  pub start_date:    NaiveDate,
  pub end_date:      NaiveDate,
  pub fund_id:       Uuid,
}

impl NewAssignment {
  pub fn validate(&self) -> Result<()> {
    if self.office.trim().is_empty() {
      return Err(Error::validation("office", "must not be empty"));
    }
    if !self.hourly_rate.is_positive() {
      return Err(Error::validation("hourly_rate", "must be greater than zero"));
    }
    if self.end_date < self.start_date {
      return Err(Error::validation("end_date", "must not precede start_date"));
    }
    Ok(())
  }
}

// ─── Work-hour logs ──────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
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
pub enum WorkLogStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkHourLog {
  pub log_id:           Uuid,
  pub assignment_id:    Uuid,
  pub work_date:        NaiveDate,
  pub time_in:          NaiveTime,
  pub time_out:         NaiveTime,
  pub hours_worked:     Hours,
  pub task_description: String,
  pub status:           WorkLogStatus,
  /// Hours credited on approval; may be lower than `hours_worked`.
  pub approved_hours:   Option<Hours>,
  pub reviewed_by:      Option<Uuid>,
  pub reviewed_at:      Option<DateTime<Utc>>,
  pub rejection_reason: Option<String>,
  pub payment_id:       Option<Uuid>,
  pub created_at:       DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkHourLog {
  pub work_date:        NaiveDate,
  pub time_in:          NaiveTime,
  pub time_out:         NaiveTime,
  pub task_description: String,
}

impl NewWorkHourLog {
  /// Check the entry against its assignment and compute the hours worked.
  pub fn validate(&self, assignment: &Assignment, today: NaiveDate) -> Result<Hours> {
    if assignment.status != AssignmentStatus::Active || assignment.deleted_at.is_some() {
      return Err(Error::InvalidState {
        entity: "assignment",
        from:   assignment.status.to_string(),
        to:     "work log".into(),
      });
    }
    if self.time_out <= self.time_in {
      return Err(Error::validation("time_out", "must be after time_in"));
    }
    if self.work_date > today {
      return Err(Error::validation("work_date", "must not be in the future"));
    }
    if !assignment.covers(self.work_date) {
      return Err(Error::validation(
        "work_date",
        format!(
          "must fall between {} and {}",
          assignment.start_date, assignment.end_date
        ),
      ));
    }
    if self.task_description.trim().is_empty() {
      return Err(Error::validation("task_description", "must not be empty"));
    }
    let minutes = (self.time_out - self.time_in).num_minutes();
    let hours = Hours::from_minutes(minutes as u32);
    if hours == Hours::ZERO {
      return Err(Error::validation("time_out", "must be at least one minute after time_in"));
    }
    Ok(hours)
  }
}

/// A supervisor's decision on a pending entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum WorkLogReview {
  Approve { adjusted_hours: Option<Hours> },
  Reject { reason: String },
}

/// Outcome of a successful [`WorkLogReview::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
  pub status:           WorkLogStatus,
  pub approved_hours:   Option<Hours>,
  pub rejection_reason: Option<String>,
}

impl WorkLogReview {
  pub fn check(&self, log: &WorkHourLog) -> Result<ReviewOutcome> {
    let target = match self {
      Self::Approve { .. } => WorkLogStatus::Approved,
      Self::Reject { .. } => WorkLogStatus::Rejected,
    };
    if log.status != WorkLogStatus::Pending {
      return Err(Error::InvalidState {
        entity: "work log",
        from:   log.status.to_string(),
        to:     target.to_string(),
      });
    }
    match self {
      Self::Approve { adjusted_hours } => {
        let hours = adjusted_hours.unwrap_or(log.hours_worked);
        if hours == Hours::ZERO || hours > log.hours_worked {
          return Err(Error::validation(
            "adjusted_hours",
            format!("must be greater than 0 and at most {}", log.hours_worked),
          ));
        }
        Ok(ReviewOutcome { status: target, approved_hours: Some(hours), rejection_reason: None })
      }
      Self::Reject { reason } => {
        if reason.trim().is_empty() {
          return Err(Error::validation("reason", "must not be empty"));
        }
        Ok(ReviewOutcome {
          status:           target,
          approved_hours:   None,
          rejection_reason: Some(reason.clone()),
        })
      }
    }
  }
}

// ─── Payments ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantshipPayment {
  pub payment_id:    Uuid,
  pub assignment_id: Uuid,
  pub period_start:  NaiveDate,
  pub period_end:    NaiveDate,
  pub total_hours:   Hours,
  pub hourly_rate:   Money,
  pub gross_amount:  Money,
  pub fund_id:       Uuid,
  pub status:        DisbursementStatus,
  pub released_at:   Option<DateTime<Utc>>,
  pub released_by:   Option<Uuid>,
  pub created_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaymentPeriod {
  pub period_start: NaiveDate,
  pub period_end:   NaiveDate,
}

impl PaymentPeriod {
  pub fn validate(&self) -> Result<()> {
    if self.period_end < self.period_start {
      return Err(Error::validation("period_end", "must not precede period_start"));
    }
    Ok(())
  }
}

/// Sum approved hours and price them at `rate`.
///
/// Every log must be approved and unpaid; an empty set means there is
/// nothing to pay.
pub fn compute_payroll(logs: &[WorkHourLog], rate: Money) -> Result<(Hours, Money)> {
  let mut total = Hours::ZERO;
  for log in logs {
    if log.status != WorkLogStatus::Approved || log.payment_id.is_some() {
      continue;
    }
    let hours = log.approved_hours.unwrap_or(log.hours_worked);
    total = total
      .checked_add(hours)
      .ok_or_else(|| Error::validation("total_hours", "overflows"))?;
  }
  if total == Hours::ZERO {
    return Err(Error::NothingToPay);
  }
  Ok((total, total.wage(rate)))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assignment() -> Assignment {
    Assignment {
      assignment_id: Uuid::new_v4(),
      student_id:    Uuid::new_v4(),
      supervisor_id: Uuid::new_v4(),
      office:        "Library".into(),
      hourly_rate:   Money::from_pesos(60),
      start_date:    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
      end_date:      NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
      fund_id:       Uuid::new_v4(),
      status:        AssignmentStatus::Active,
      created_at:    Utc::now(),
      deleted_at:    None,
    }
  }

  fn entry(date: (i32, u32, u32), time_in: (u32, u32), time_out: (u32, u32)) -> NewWorkHourLog {
    NewWorkHourLog {
      work_date:        NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
      time_in:          NaiveTime::from_hms_opt(time_in.0, time_in.1, 0).unwrap(),
      time_out:         NaiveTime::from_hms_opt(time_out.0, time_out.1, 0).unwrap(),
      task_description: "Shelving returns".into(),
    }
  }

  fn logged(hours: u32, status: WorkLogStatus) -> WorkHourLog {
    WorkHourLog {
      log_id:           Uuid::new_v4(),
      assignment_id:    Uuid::new_v4(),
      work_date:        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
      time_in:          NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
      time_out:         NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
      hours_worked:     Hours::from_hundredths(hours),
      task_description: "Filing".into(),
      status,
      approved_hours:   None,
      reviewed_by:      None,
      reviewed_at:      None,
      rejection_reason: None,
      payment_id:       None,
      created_at:       Utc::now(),
    }
  }

  #[test]
  fn hours_are_computed_from_times() {
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let hours = entry((2026, 9, 1), (8, 0), (12, 30)).validate(&assignment(), today).unwrap();
    assert_eq!(hours, Hours::from_hundredths(450));
  }

  #[test]
  fn entry_rules() {
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let a = assignment();
    assert!(entry((2026, 9, 1), (12, 0), (8, 0)).validate(&a, today).is_err());
    assert!(entry((2026, 10, 20), (8, 0), (9, 0)).validate(&a, today).is_err());
    assert!(entry((2026, 5, 31), (8, 0), (9, 0)).validate(&a, today).is_err());

    let mut ended = a.clone();
    ended.status = AssignmentStatus::Terminated;
    assert!(matches!(
      entry((2026, 9, 1), (8, 0), (9, 0)).validate(&ended, today),
      Err(Error::InvalidState { .. })
    ));
  }

  #[test]
  fn sub_minute_shifts_are_refused() {
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let mut blip = entry((2026, 9, 1), (8, 0), (8, 0));
    blip.time_out = NaiveTime::from_hms_opt(8, 0, 30).unwrap();
    assert!(matches!(
      blip.validate(&assignment(), today),
      Err(Error::Validation { field: "time_out", .. })
    ));
  }

  #[test]
  fn approval_may_only_reduce_hours() {
    let log = logged(400, WorkLogStatus::Pending);
    let over = WorkLogReview::Approve { adjusted_hours: Some(Hours::from_hundredths(401)) };
    assert!(over.check(&log).is_err());
    let zero = WorkLogReview::Approve { adjusted_hours: Some(Hours::ZERO) };
    assert!(zero.check(&log).is_err());
    let trimmed = WorkLogReview::Approve { adjusted_hours: Some(Hours::from_hundredths(350)) };
    assert_eq!(trimmed.check(&log).unwrap().approved_hours, Some(Hours::from_hundredths(350)));
  }

  #[test]
  fn only_pending_logs_are_reviewed() {
    let log = logged(400, WorkLogStatus::Approved);
    let review = WorkLogReview::Reject { reason: "duplicate".into() };
    assert!(matches!(review.check(&log), Err(Error::InvalidState { .. })));
    let blank = WorkLogReview::Reject { reason: " ".into() };
    assert!(blank.check(&logged(400, WorkLogStatus::Pending)).is_err());
  }

  #[test]
  fn payroll_sums_approved_unpaid_hours() {
    let mut a = logged(400, WorkLogStatus::Approved);
    a.approved_hours = Some(Hours::from_hundredths(350));
    let b = logged(250, WorkLogStatus::Approved);
    let mut paid = logged(800, WorkLogStatus::Approved);
    paid.payment_id = Some(Uuid::new_v4());
    let pending = logged(300, WorkLogStatus::Pending);

    let (hours, gross) =
      compute_payroll(&[a, b, paid, pending], Money::from_centavos(6_025)).unwrap();
    assert_eq!(hours, Hours::from_hundredths(600));
    assert_eq!(gross, Money::from_centavos(36_150));
  }

  #[test]
  fn empty_period_has_nothing_to_pay() {
    let pending = logged(300, WorkLogStatus::Pending);
    assert!(matches!(compute_payroll(&[pending], Money::from_pesos(60)), Err(Error::NothingToPay)));
  }
}
