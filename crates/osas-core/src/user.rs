//! Accounts, roles, and the academic standing kept for each student.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, money::Gwa};

/// Route-gating role. Every account has exactly one.
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
pub enum Role {
  Admin,
  OsasStaff,
  Student,
}

impl Role {
  /// Admins and OSAS staff share every back-office permission except the
  /// admin-only management endpoints.
  pub fn is_staff(self) -> bool { matches!(self, Self::Admin | Self::OsasStaff) }
}

/// The identity performing an operation, threaded into the store so audit
/// rows can name who did what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub user_id: Uuid,
  pub role:    Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:           Uuid,
  pub name:              String,
  pub email:             String,
  pub role:              Role,
  #[serde(skip_serializing)]
  pub password_hash:     String,
  pub email_verified_at: Option<DateTime<Utc>>,
  pub created_at:        DateTime<Utc>,
}

impl User {
  pub fn actor(&self) -> Actor {
    Actor { user_id: self.user_id, role: self.role }
  }

  pub fn is_verified(&self) -> bool { self.email_verified_at.is_some() }
}

/// Input for [`ScholarshipStore::create_user`](crate::store::ScholarshipStore::create_user).
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:               String,
  pub email:              String,
  pub role:               Role,
  pub password_hash:      String,
  /// `None` creates an account that is already verified.
  pub verification_token: Option<String>,
}

/// Enrollment status as reported by the registrar.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
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
pub enum EnrollmentStatus {
  #[default]
  Enrolled,
  NotEnrolled,
  OnLeave,
  Graduated,
}

/// Academic standing of a student account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
  pub user_id:                 Uuid,
  pub student_number:          String,
  pub course:                  String,
  pub year_level:              u8,
  pub current_gwa:             Option<Gwa>,
  #[serde(default)]
  pub enrollment_status:       EnrollmentStatus,
  #[serde(default)]
  pub has_disciplinary_record: bool,
}

impl StudentProfile {
  pub fn validate(&self) -> Result<()> {
    if self.student_number.trim().is_empty() {
      return Err(Error::validation("student_number", "must not be empty"));
    }
    if !(1..=6).contains(&self.year_level) {
      return Err(Error::validation("year_level", "must be between 1 and 6"));
    }
    Ok(())
  }
}
