//! Fixed-point quantities: pesos, grade averages, and work hours.
//!
//! Nothing in the ledger is stored as a float. Each type keeps an integer in
//! its smallest unit and only converts to a decimal at the serde boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Money ───────────────────────────────────────────────────────────────────

/// An amount in Philippine pesos, held as centavos.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(pub i64);

impl Money {
  pub const ZERO: Money = Money(0);

  pub const fn from_centavos(centavos: i64) -> Self { Self(centavos) }

  pub const fn from_pesos(pesos: i64) -> Self { Self(pesos * 100) }

  pub const fn centavos(self) -> i64 { self.0 }

  pub fn is_positive(self) -> bool { self.0 > 0 }

  pub fn checked_add(self, other: Money) -> Option<Money> {
    self.0.checked_add(other.0).map(Money)
  }

  pub fn checked_sub(self, other: Money) -> Option<Money> {
    self.0.checked_sub(other.0).map(Money)
  }
}

impl fmt::Display for Money {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if self.0 < 0 { "-" } else { "" };
    let abs = self.0.unsigned_abs();
    let pesos = (abs / 100).to_string();

    let mut grouped = String::with_capacity(pesos.len() + pesos.len() / 3);
    for (i, ch) in pesos.chars().enumerate() {
      if i > 0 && (pesos.len() - i) % 3 == 0 {
        grouped.push(',');
      }
      grouped.push(ch);
    }

    write!(f, "{sign}PHP {grouped}.{:02}", abs % 100)
  }
}

// ─── GWA ─────────────────────────────────────────────────────────────────────

/// A General Weighted Average on the 1.000–5.000 scale (lower is better),
/// held as thousandths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Gwa(u16);

impl Gwa {
  pub const MIN: u16 = 1_000;
  pub const MAX: u16 = 5_000;

  pub fn from_thousandths(value: u16) -> Result<Self> {
    if !(Self::MIN..=Self::MAX).contains(&value) {
      return Err(Error::validation("gwa", "must be between 1.000 and 5.000"));
    }
    Ok(Self(value))
  }

  /// Const constructor for thresholds that are known to be in range.
  pub const fn ceiling(value: u16) -> Self { Self(value) }

  pub const fn thousandths(self) -> u16 { self.0 }
}

impl TryFrom<f64> for Gwa {
  type Error = Error;

  fn try_from(value: f64) -> Result<Self> {
    if !value.is_finite() {
      return Err(Error::validation("gwa", "must be a finite number"));
    }
    Self::from_thousandths((value * 1_000.0).round() as u16)
  }
}

impl From<Gwa> for f64 {
  fn from(value: Gwa) -> Self { f64::from(value.0) / 1_000.0 }
}

impl fmt::Display for Gwa {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{:03}", self.0 / 1_000, self.0 % 1_000)
  }
}

// ─── Hours ───────────────────────────────────────────────────────────────────

/// A duration of work, held as hundredths of an hour.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "f64", into = "f64")]
pub struct Hours(u32);

impl Hours {
  pub const ZERO: Hours = Hours(0);
  pub const FULL_DAY: Hours = Hours(2_400);

  pub const fn from_hundredths(value: u32) -> Self { Self(value) }

  pub const fn hundredths(self) -> u32 { self.0 }

  /// Convert whole minutes, rounding to the nearest hundredth of an hour.
  pub fn from_minutes(minutes: u32) -> Self { Self((minutes * 100 + 30) / 60) }

  pub fn checked_add(self, other: Hours) -> Option<Hours> {
    self.0.checked_add(other.0).map(Hours)
  }

  /// Wage for these hours at `rate` per hour, rounded half-up to the centavo.
  pub fn wage(self, rate: Money) -> Money {
    let raw = i128::from(self.0) * i128::from(rate.0);
    Money(((raw + 50) / 100) as i64)
  }
}

impl TryFrom<f64> for Hours {
  type Error = Error;

  fn try_from(value: f64) -> Result<Self> {
    if !value.is_finite() || value < 0.0 || value > 24.0 {
      return Err(Error::validation("hours", "must be between 0 and 24"));
    }
    Ok(Self((value * 100.0).round() as u32))
  }
}

impl From<Hours> for f64 {
  fn from(value: Hours) -> Self { f64::from(value.0) / 100.0 }
}

impl fmt::Display for Hours {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn money_display_groups_thousands() {
    assert_eq!(Money::from_pesos(5_000).to_string(), "PHP 5,000.00");
    assert_eq!(Money::from_centavos(123_456_789).to_string(), "PHP 1,234,567.89");
    assert_eq!(Money::from_centavos(-250).to_string(), "-PHP 2.50");
  }

  #[test]
  fn gwa_parses_from_decimal() {
    let gwa = Gwa::try_from(1.45).unwrap();
    assert_eq!(gwa.thousandths(), 1_450);
    assert_eq!(gwa.to_string(), "1.450");
    assert!(Gwa::try_from(0.5).is_err());
    assert!(Gwa::try_from(f64::NAN).is_err());
  }

  #[test]
  fn gwa_round_trips_through_json() {
    let gwa: Gwa = serde_json::from_str("1.75").unwrap();
    assert_eq!(gwa, Gwa::ceiling(1_750));
    assert_eq!(serde_json::to_string(&gwa).unwrap(), "1.75");
  }

  #[test]
  fn hours_from_minutes_rounds() {
    assert_eq!(Hours::from_minutes(90), Hours::from_hundredths(150));
    assert_eq!(Hours::from_minutes(20), Hours::from_hundredths(33));
  }

  #[test]
  fn wage_rounds_half_up() {
    // 7.5h at PHP 60.25/h = PHP 451.875 → 451.88
    let wage = Hours::from_hundredths(750).wage(Money::from_centavos(6_025));
    assert_eq!(wage, Money::from_centavos(45_188));
  }
}
