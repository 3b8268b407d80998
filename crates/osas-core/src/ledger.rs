//! Fund ledger, stipends, and the shared disbursement status lifecycle.
//!
//! A fund row keeps `remaining_budget = total_budget - disbursed_amount` at
//! all times. [`FundBalance`] is the only way the store computes a new row,
//! so the invariant holds by construction and is re-checked by SQL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, money::Money, renewal::Semester};

// ─── Balance arithmetic ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundBalance {
  pub total_budget:     Money,
  pub disbursed_amount: Money,
}

impl FundBalance {
  pub fn new(total_budget: Money) -> Result<Self> {
    if total_budget < Money::ZERO {
      return Err(Error::validation("total_budget", "must not be negative"));
    }
    Ok(Self { total_budget, disbursed_amount: Money::ZERO })
  }

  pub fn remaining(&self) -> Money { Money(self.total_budget.0 - self.disbursed_amount.0) }

  /// Debit `amount`. Refuses, leaving `self` untouched, if the fund would go
  /// negative.
  pub fn disburse(&self, amount: Money) -> Result<FundBalance> {
    if !amount.is_positive() {
      return Err(Error::validation("amount", "must be greater than zero"));
    }
    let remaining = self.remaining();
    if amount > remaining {
      return Err(Error::InsufficientFunds { requested: amount, remaining });
    }
    let disbursed_amount = self
      .disbursed_amount
      .checked_add(amount)
      .ok_or_else(|| Error::validation("amount", "overflows the ledger"))?;
    Ok(FundBalance { total_budget: self.total_budget, disbursed_amount })
  }

  /// Replace the total budget. It may never drop below what is already paid.
  pub fn with_total(&self, total_budget: Money) -> Result<FundBalance> {
    if total_budget < self.disbursed_amount {
      return Err(Error::BudgetBelowDisbursed { disbursed: self.disbursed_amount });
    }
    Ok(FundBalance { total_budget, disbursed_amount: self.disbursed_amount })
  }
}

// ─── Funds ───────────────────────────────────────────────────────────────────

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
pub enum FundSourceType {
  University,
  Government,
  PrivateDonor,
  External,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fund {
  pub fund_id:          Uuid,
  pub fund_source:      String,
  pub source_type:      FundSourceType,
  pub academic_year:    i32,
  pub semester:         Option<Semester>,
  pub total_budget:     Money,
  pub disbursed_amount: Money,
  pub remaining_budget: Money,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
  pub deleted_at:       Option<DateTime<Utc>>,
}

impl Fund {
  pub fn balance(&self) -> FundBalance {
    FundBalance {
      total_budget:     self.total_budget,
      disbursed_amount: self.disbursed_amount,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFund {
  pub fund_source:   String,
  pub source_type:   FundSourceType,
  pub academic_year: i32,
  pub semester:      Option<Semester>,
  pub total_budget:  Money,
}

impl NewFund {
  pub fn validate(&self) -> Result<FundBalance> {
    if self.fund_source.trim().is_empty() {
      return Err(Error::validation("fund_source", "must not be empty"));
    }
    FundBalance::new(self.total_budget)
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DisbursementSource {
  Stipend,
  AssistantshipPayment,
}

/// Append-only ledger line written with every successful release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disbursement {
  pub disbursement_id: Uuid,
  pub fund_id:         Uuid,
  pub amount:          Money,
  pub source:          DisbursementSource,
  pub source_id:       Uuid,
  pub recorded_by:     Uuid,
  pub recorded_at:     DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundSummary {
  pub fund:               Fund,
  pub disbursement_count: u64,
  pub last_disbursed_at:  Option<DateTime<Utc>>,
}

// ─── Disbursement lifecycle ──────────────────────────────────────────────────

/// Shared by stipends and assistantship payments.
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
pub enum DisbursementStatus {
  #[default]
  Pending,
  Processing,
  Released,
  Failed,
  Cancelled,
}

impl DisbursementStatus {
  pub fn check_transition(self, to: DisbursementStatus, entity: &'static str) -> Result<()> {
    use DisbursementStatus::*;
    let legal = matches!(
      (self, to),
      (Pending, Processing)
        | (Processing, Released)
        | (Processing, Failed)
        | (Pending, Cancelled)
        | (Processing, Cancelled)
    );
    if !legal {
      return Err(Error::InvalidState { entity, from: self.to_string(), to: to.to_string() });
    }
    Ok(())
  }
}

// ─── Stipends ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stipend {
  pub stipend_id:     Uuid,
  pub application_id: Uuid,
  pub student_id:     Uuid,
  pub scholarship_id: Uuid,
  pub fund_id:        Uuid,
  pub amount:         Money,
  pub period_label:   String,
  pub status:         DisbursementStatus,
  pub released_at:    Option<DateTime<Utc>>,
  pub released_by:    Option<Uuid>,
  pub remarks:        Option<String>,
  pub created_at:     DateTime<Utc>,
  pub deleted_at:     Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStipend {
  pub application_id: Uuid,
  pub fund_id:        Uuid,
  pub amount:         Money,
  pub period_label:   String,
}

impl NewStipend {
  pub fn validate(&self) -> Result<()> {
    if !self.amount.is_positive() {
      return Err(Error::validation("amount", "must be greater than zero"));
    }
    if self.period_label.trim().is_empty() {
      return Err(Error::validation("period_label", "must not be empty"));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn overdraft_is_refused_and_balance_unchanged() {
    let balance = FundBalance {
      total_budget:     Money::from_pesos(10_000),
      disbursed_amount: Money::from_pesos(7_000),
    };
    let err = balance.disburse(Money::from_pesos(5_000)).unwrap_err();
    assert!(matches!(
      err,
      Error::InsufficientFunds { requested, remaining }
        if requested == Money::from_pesos(5_000) && remaining == Money::from_pesos(3_000)
    ));
    assert_eq!(balance.remaining(), Money::from_pesos(3_000));
  }

  #[test]
  fn remaining_tracks_every_disbursement() {
    let mut balance = FundBalance::new(Money::from_pesos(10_000)).unwrap();
    for pesos in [1_500, 2_500, 6_000] {
      balance = balance.disburse(Money::from_pesos(pesos)).unwrap();
      assert_eq!(
        balance.remaining().0,
        balance.total_budget.0 - balance.disbursed_amount.0
      );
    }
    assert_eq!(balance.remaining(), Money::ZERO);
    assert!(balance.disburse(Money::from_centavos(1)).is_err());
  }

  #[test]
  fn budget_cannot_shrink_below_disbursed() {
    let balance = FundBalance::new(Money::from_pesos(100)).unwrap();
    let balance = balance.disburse(Money::from_pesos(60)).unwrap();
    assert!(balance.with_total(Money::from_pesos(59)).is_err());
    let grown = balance.with_total(Money::from_pesos(200)).unwrap();
    assert_eq!(grown.remaining(), Money::from_pesos(140));
  }

  #[test]
  fn release_must_pass_through_processing() {
    use DisbursementStatus::*;
    assert!(Pending.check_transition(Released, "stipend").is_err());
    assert!(Pending.check_transition(Processing, "stipend").is_ok());
    assert!(Processing.check_transition(Released, "stipend").is_ok());
    assert!(Released.check_transition(Cancelled, "stipend").is_err());
  }
}
