//! Scholarship programmes offered by OSAS.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  document::DocumentType,
  money::{Gwa, Money},
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
pub enum ScholarshipType {
  AcademicFull,
  AcademicPartial,
  StudentAssistantship,
  PerformingArtsFull,
  PerformingArtsPartial,
  EconomicAssistance,
  Others,
}

impl ScholarshipType {
  /// Highest GWA a scholar of this type may carry into a renewal.
  pub fn default_gwa_ceiling(self) -> Option<Gwa> {
    match self {
      Self::AcademicFull => Some(Gwa::ceiling(1_450)),
      Self::AcademicPartial => Some(Gwa::ceiling(1_750)),
      Self::EconomicAssistance => Some(Gwa::ceiling(2_250)),
      Self::StudentAssistantship => Some(Gwa::ceiling(2_500)),
      Self::PerformingArtsFull | Self::PerformingArtsPartial => Some(Gwa::ceiling(2_000)),
      Self::Others => None,
    }
  }
}

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
pub enum ScholarshipStatus {
  #[default]
  Draft,
  Active,
  Inactive,
  Upcoming,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scholarship {
  pub scholarship_id:       Uuid,
  pub name:                 String,
  pub description:          String,
  pub scholarship_type:     ScholarshipType,
  pub amount:               Money,
  pub deadline:             NaiveDate,
  pub slots:                u32,
  pub eligibility_criteria: Vec<String>,
  pub renewal_criteria:     Vec<String>,
  pub required_documents:   Vec<DocumentType>,
  /// Overrides [`ScholarshipType::default_gwa_ceiling`] when set.
  pub max_gwa:              Option<Gwa>,
  pub status:               ScholarshipStatus,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
  pub deleted_at:           Option<DateTime<Utc>>,
}

impl Scholarship {
  pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }

  pub fn gwa_ceiling(&self) -> Option<Gwa> {
    self.max_gwa.or_else(|| self.scholarship_type.default_gwa_ceiling())
  }

  /// Whether a student may open or submit an application on `today`.
  pub fn accepts_applications(&self, today: NaiveDate) -> bool {
    !self.is_deleted() && self.status == ScholarshipStatus::Active && today <= self.deadline
  }
}

/// Input for creating a scholarship.
#[derive(Debug, Clone, Deserialize)]
pub struct NewScholarship {
  pub name:                 String,
  #[serde(default)]
  pub description:          String,
  pub scholarship_type:     ScholarshipType,
  pub amount:               Money,
  pub deadline:             NaiveDate,
  pub slots:                u32,
  #[serde(default)]
  pub eligibility_criteria: Vec<String>,
  #[serde(default)]
  pub renewal_criteria:     Vec<String>,
  #[serde(default)]
  pub required_documents:   Vec<DocumentType>,
  pub max_gwa:              Option<Gwa>,
  #[serde(default)]
  pub status:               ScholarshipStatus,
}

impl NewScholarship {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::validation("name", "must not be empty"));
    }
    if !self.amount.is_positive() {
      return Err(Error::validation("amount", "must be greater than zero"));
    }
    if self.slots == 0 {
      return Err(Error::validation("slots", "must be at least 1"));
    }
    Ok(())
  }
}

/// Partial update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScholarshipPatch {
  pub name:                 Option<String>,
  pub description:          Option<String>,
  pub amount:               Option<Money>,
  pub deadline:             Option<NaiveDate>,
  pub slots:                Option<u32>,
  pub eligibility_criteria: Option<Vec<String>>,
  pub renewal_criteria:     Option<Vec<String>>,
  pub required_documents:   Option<Vec<DocumentType>>,
  pub max_gwa:              Option<Gwa>,
  pub status:               Option<ScholarshipStatus>,
}

impl ScholarshipPatch {
  pub fn apply(self, scholarship: &mut Scholarship) -> Result<()> {
    if let Some(name) = self.name {
      if name.trim().is_empty() {
        return Err(Error::validation("name", "must not be empty"));
      }
      scholarship.name = name;
    }
    if let Some(description) = self.description {
      scholarship.description = description;
    }
    if let Some(amount) = self.amount {
      if !amount.is_positive() {
        return Err(Error::validation("amount", "must be greater than zero"));
      }
      scholarship.amount = amount;
    }
    if let Some(deadline) = self.deadline {
      scholarship.deadline = deadline;
    }
    if let Some(slots) = self.slots {
      if slots == 0 {
        return Err(Error::validation("slots", "must be at least 1"));
      }
      scholarship.slots = slots;
    }
    if let Some(criteria) = self.eligibility_criteria {
      scholarship.eligibility_criteria = criteria;
    }
    if let Some(criteria) = self.renewal_criteria {
      scholarship.renewal_criteria = criteria;
    }
    if let Some(documents) = self.required_documents {
      scholarship.required_documents = documents;
    }
    if let Some(max_gwa) = self.max_gwa {
      scholarship.max_gwa = Some(max_gwa);
    }
    if let Some(status) = self.status {
      scholarship.status = status;
    }
    Ok(())
  }
}
