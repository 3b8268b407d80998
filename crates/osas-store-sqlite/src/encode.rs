//! Encoding and decoding helpers between domain types and the plain column
//! representations stored in SQLite.
//!
//! Timestamps are RFC 3339 strings, calendar dates `YYYY-MM-DD`, times of day
//! `HH:MM:SS`. Enumerations use their snake_case names. Lists and nested
//! records are compact JSON. UUIDs are hyphenated lowercase strings.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use osas_core::{
  application::{Application, StatusChange},
  assistantship::{Assignment, AssistantshipPayment, WorkHourLog},
  document::{Document, DocumentOwner},
  interview::{Interview, RescheduleEntry},
  ledger::{Disbursement, Fund, Stipend},
  money::{Gwa, Hours, Money},
  renewal::{RenewalApplication, RenewalPeriod},
  scholarship::Scholarship,
  user::{StudentProfile, User},
};
use rusqlite::Row;
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

/// Fixed-width UTC form, so stored timestamps also sort correctly as text.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::decode("timestamp", e))
}

pub fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::decode("date", e))
}

pub fn encode_time(t: NaiveTime) -> String { t.format("%H:%M:%S").to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|e| Error::decode("time", e))
}

/// Parse a snake_case enum column.
pub fn decode_enum<T>(column: &'static str, s: &str) -> Result<T>
where
  T: FromStr,
  T::Err: Display,
{
  s.parse().map_err(|e: T::Err| Error::decode(column, format!("{e}: {s:?}")))
}

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> { Ok(serde_json::from_str(s)?) }

pub fn decode_gwa(v: Option<i64>) -> Result<Option<Gwa>> {
  v.map(|v| -> Result<Gwa> {
    let thousandths = u16::try_from(v).map_err(|e| Error::decode("gwa", e))?;
    Ok(Gwa::from_thousandths(thousandths)?)
  })
  .transpose()
}

pub fn encode_gwa(g: Option<Gwa>) -> Option<i64> { g.map(|g| i64::from(g.thousandths())) }

pub fn decode_hours(v: i64) -> Result<Hours> {
  Ok(Hours::from_hundredths(u32::try_from(v).map_err(|e| Error::decode("hours", e))?))
}

pub fn encode_hours(h: Hours) -> i64 { i64::from(h.hundredths()) }

fn decode_u32(column: &'static str, v: i64) -> Result<u32> {
  u32::try_from(v).map_err(|e| Error::decode(column, e))
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "user_id, name, email, role, password_hash, email_verified_at, created_at";

pub struct RawUser {
  pub user_id:           String,
  pub name:              String,
  pub email:             String,
  pub role:              String,
  pub password_hash:     String,
  pub email_verified_at: Option<String>,
  pub created_at:        String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:           row.get(0)?,
      name:              row.get(1)?,
      email:             row.get(2)?,
      role:              row.get(3)?,
      password_hash:     row.get(4)?,
      email_verified_at: row.get(5)?,
      created_at:        row.get(6)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:           decode_uuid(&self.user_id)?,
      name:              self.name,
      email:             self.email,
      role:              decode_enum("role", &self.role)?,
      password_hash:     self.password_hash,
      email_verified_at: decode_opt_dt(self.email_verified_at)?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

pub const PROFILE_COLUMNS: &str = "user_id, student_number, course, year_level, current_gwa, \
                                   enrollment_status, has_disciplinary_record";

pub struct RawProfile {
  pub user_id:                 String,
  pub student_number:          String,
  pub course:                  String,
  pub year_level:              i64,
  pub current_gwa:             Option<i64>,
  pub enrollment_status:       String,
  pub has_disciplinary_record: bool,
}

impl RawProfile {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:                 row.get(0)?,
      student_number:          row.get(1)?,
      course:                  row.get(2)?,
      year_level:              row.get(3)?,
      current_gwa:             row.get(4)?,
      enrollment_status:       row.get(5)?,
      has_disciplinary_record: row.get(6)?,
    })
  }

  pub fn into_profile(self) -> Result<StudentProfile> {
    Ok(StudentProfile {
      user_id:                 decode_uuid(&self.user_id)?,
      student_number:          self.student_number,
      course:                  self.course,
      year_level:              u8::try_from(self.year_level)
        .map_err(|e| Error::decode("year_level", e))?,
      current_gwa:             decode_gwa(self.current_gwa)?,
      enrollment_status:       decode_enum("enrollment_status", &self.enrollment_status)?,
      has_disciplinary_record: self.has_disciplinary_record,
    })
  }
}

// ─── Scholarships ────────────────────────────────────────────────────────────

pub const SCHOLARSHIP_COLUMNS: &str = "scholarship_id, name, description, scholarship_type, \
                                       amount, deadline, slots, eligibility_criteria, \
                                       renewal_criteria, required_documents, max_gwa, status, \
                                       created_at, updated_at, deleted_at";

pub struct RawScholarship {
  pub scholarship_id:       String,
  pub name:                 String,
  pub description:          String,
  pub scholarship_type:     String,
  pub amount:               i64,
  pub deadline:             String,
  pub slots:                i64,
  pub eligibility_criteria: String,
  pub renewal_criteria:     String,
  pub required_documents:   String,
  pub max_gwa:              Option<i64>,
  pub status:               String,
  pub created_at:           String,
  pub updated_at:           String,
  pub deleted_at:           Option<String>,
}

impl RawScholarship {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      scholarship_id:       row.get(0)?,
      name:                 row.get(1)?,
      description:          row.get(2)?,
      scholarship_type:     row.get(3)?,
      amount:               row.get(4)?,
      deadline:             row.get(5)?,
      slots:                row.get(6)?,
      eligibility_criteria: row.get(7)?,
      renewal_criteria:     row.get(8)?,
      required_documents:   row.get(9)?,
      max_gwa:              row.get(10)?,
      status:               row.get(11)?,
      created_at:           row.get(12)?,
      updated_at:           row.get(13)?,
      deleted_at:           row.get(14)?,
    })
  }

  pub fn into_scholarship(self) -> Result<Scholarship> {
    Ok(Scholarship {
      scholarship_id:       decode_uuid(&self.scholarship_id)?,
      name:                 self.name,
      description:          self.description,
      scholarship_type:     decode_enum("scholarship_type", &self.scholarship_type)?,
      amount:               Money(self.amount),
      deadline:             decode_date(&self.deadline)?,
      slots:                decode_u32("slots", self.slots)?,
      eligibility_criteria: decode_json(&self.eligibility_criteria)?,
      renewal_criteria:     decode_json(&self.renewal_criteria)?,
      required_documents:   decode_json(&self.required_documents)?,
      max_gwa:              decode_gwa(self.max_gwa)?,
      status:               decode_enum("status", &self.status)?,
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
      deleted_at:           decode_opt_dt(self.deleted_at)?,
    })
  }
}

// ─── Applications ────────────────────────────────────────────────────────────

pub const APPLICATION_COLUMNS: &str = "application_id, student_id, scholarship_id, status, \
                                       resume_status, remarks, submitted_at, created_at, \
                                       updated_at";

pub struct RawApplication {
  pub application_id: String,
  pub student_id:     String,
  pub scholarship_id: String,
  pub status:         String,
  pub resume_status:  Option<String>,
  pub remarks:        Option<String>,
  pub submitted_at:   Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawApplication {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      application_id: row.get(0)?,
      student_id:     row.get(1)?,
      scholarship_id: row.get(2)?,
      status:         row.get(3)?,
      resume_status:  row.get(4)?,
      remarks:        row.get(5)?,
      submitted_at:   row.get(6)?,
      created_at:     row.get(7)?,
      updated_at:     row.get(8)?,
    })
  }

  pub fn into_application(self) -> Result<Application> {
    Ok(Application {
      application_id: decode_uuid(&self.application_id)?,
      student_id:     decode_uuid(&self.student_id)?,
      scholarship_id: decode_uuid(&self.scholarship_id)?,
      status:         decode_enum("status", &self.status)?,
      resume_status:  self
        .resume_status
        .as_deref()
        .map(|s| decode_enum("resume_status", s))
        .transpose()?,
      remarks:        self.remarks,
      submitted_at:   decode_opt_dt(self.submitted_at)?,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

pub const HISTORY_COLUMNS: &str =
  "change_id, application_id, from_status, to_status, actor_id, note, recorded_at";

pub struct RawStatusChange {
  pub change_id:      String,
  pub application_id: String,
  pub from_status:    Option<String>,
  pub to_status:      String,
  pub actor_id:       String,
  pub note:           Option<String>,
  pub recorded_at:    String,
}

impl RawStatusChange {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      change_id:      row.get(0)?,
      application_id: row.get(1)?,
      from_status:    row.get(2)?,
      to_status:      row.get(3)?,
      actor_id:       row.get(4)?,
      note:           row.get(5)?,
      recorded_at:    row.get(6)?,
    })
  }

  pub fn into_change(self) -> Result<StatusChange> {
    Ok(StatusChange {
      change_id:      decode_uuid(&self.change_id)?,
      application_id: decode_uuid(&self.application_id)?,
      from_status:    self
        .from_status
        .as_deref()
        .map(|s| decode_enum("from_status", s))
        .transpose()?,
      to_status:      decode_enum("to_status", &self.to_status)?,
      actor_id:       decode_uuid(&self.actor_id)?,
      note:           self.note,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

pub const DOCUMENT_COLUMNS: &str = "document_id, application_id, renewal_id, document_type, \
                                    file_name, storage_path, mime_type, size_bytes, \
                                    content_hash, status, verified_by, verified_at, notes, \
                                    uploaded_at";

/// Split an owner into its `(application_id, renewal_id)` column pair.
pub fn encode_owner(owner: DocumentOwner) -> (Option<String>, Option<String>) {
  match owner {
    DocumentOwner::Application(id) => (Some(encode_uuid(id)), None),
    DocumentOwner::Renewal(id) => (None, Some(encode_uuid(id))),
  }
}

pub struct RawDocument {
  pub document_id:    String,
  pub application_id: Option<String>,
  pub renewal_id:     Option<String>,
  pub document_type:  String,
  pub file_name:      String,
  pub storage_path:   String,
  pub mime_type:      String,
  pub size_bytes:     i64,
  pub content_hash:   String,
  pub status:         String,
  pub verified_by:    Option<String>,
  pub verified_at:    Option<String>,
  pub notes:          Option<String>,
  pub uploaded_at:    String,
}

impl RawDocument {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id:    row.get(0)?,
      application_id: row.get(1)?,
      renewal_id:     row.get(2)?,
      document_type:  row.get(3)?,
      file_name:      row.get(4)?,
      storage_path:   row.get(5)?,
      mime_type:      row.get(6)?,
      size_bytes:     row.get(7)?,
      content_hash:   row.get(8)?,
      status:         row.get(9)?,
      verified_by:    row.get(10)?,
      verified_at:    row.get(11)?,
      notes:          row.get(12)?,
      uploaded_at:    row.get(13)?,
    })
  }

  pub fn into_document(self) -> Result<Document> {
    let owner = match (self.application_id, self.renewal_id) {
      (Some(id), None) => DocumentOwner::Application(decode_uuid(&id)?),
      (None, Some(id)) => DocumentOwner::Renewal(decode_uuid(&id)?),
      _ => return Err(Error::decode("owner", "exactly one owner column must be set")),
    };
    Ok(Document {
      document_id: decode_uuid(&self.document_id)?,
      owner,
      document_type: decode_enum("document_type", &self.document_type)?,
      file_name: self.file_name,
      storage_path: self.storage_path,
      mime_type: self.mime_type,
      size_bytes: u64::try_from(self.size_bytes).map_err(|e| Error::decode("size_bytes", e))?,
      content_hash: self.content_hash,
      status: decode_enum("status", &self.status)?,
      verified_by: decode_opt_uuid(self.verified_by)?,
      verified_at: decode_opt_dt(self.verified_at)?,
      notes: self.notes,
      uploaded_at: decode_dt(&self.uploaded_at)?,
    })
  }
}

// ─── Interviews ──────────────────────────────────────────────────────────────

pub const INTERVIEW_COLUMNS: &str = "interview_id, application_id, interviewer_id, \
                                     scheduled_at, location, status, evaluation, completed_at, \
                                     created_at";

pub struct RawInterview {
  pub interview_id:   String,
  pub application_id: String,
  pub interviewer_id: String,
  pub scheduled_at:   String,
  pub location:       String,
  pub status:         String,
  pub evaluation:     Option<String>,
  pub completed_at:   Option<String>,
  pub created_at:     String,
}

impl RawInterview {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      interview_id:   row.get(0)?,
      application_id: row.get(1)?,
      interviewer_id: row.get(2)?,
      scheduled_at:   row.get(3)?,
      location:       row.get(4)?,
      status:         row.get(5)?,
      evaluation:     row.get(6)?,
      completed_at:   row.get(7)?,
      created_at:     row.get(8)?,
    })
  }

  pub fn into_interview(self, reschedule_history: Vec<RescheduleEntry>) -> Result<Interview> {
    Ok(Interview {
      interview_id: decode_uuid(&self.interview_id)?,
      application_id: decode_uuid(&self.application_id)?,
      interviewer_id: decode_uuid(&self.interviewer_id)?,
      scheduled_at: decode_dt(&self.scheduled_at)?,
      location: self.location,
      status: decode_enum("status", &self.status)?,
      evaluation: self.evaluation.as_deref().map(decode_json).transpose()?,
      completed_at: decode_opt_dt(self.completed_at)?,
      reschedule_history,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const RESCHEDULE_COLUMNS: &str =
  "previous_time, new_time, reason, rescheduled_by, recorded_at";

pub struct RawReschedule {
  pub previous_time:  String,
  pub new_time:       String,
  pub reason:         String,
  pub rescheduled_by: String,
  pub recorded_at:    String,
}

impl RawReschedule {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      previous_time:  row.get(0)?,
      new_time:       row.get(1)?,
      reason:         row.get(2)?,
      rescheduled_by: row.get(3)?,
      recorded_at:    row.get(4)?,
    })
  }

  pub fn into_entry(self) -> Result<RescheduleEntry> {
    Ok(RescheduleEntry {
      previous_time:  decode_dt(&self.previous_time)?,
      new_time:       decode_dt(&self.new_time)?,
      reason:         self.reason,
      rescheduled_by: decode_uuid(&self.rescheduled_by)?,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}

// ─── Renewals ────────────────────────────────────────────────────────────────

pub const RENEWAL_COLUMNS: &str = "renewal_id, original_application_id, student_id, \
                                   scholarship_id, semester, academic_year, gwa_snapshot, \
                                   eligibility, status, reviewed_by, reviewed_at, remarks, \
                                   created_at";

pub struct RawRenewal {
  pub renewal_id:              String,
  pub original_application_id: String,
  pub student_id:              String,
  pub scholarship_id:          String,
  pub semester:                String,
  pub academic_year:           i32,
  pub gwa_snapshot:            Option<i64>,
  pub eligibility:             String,
  pub status:                  String,
  pub reviewed_by:             Option<String>,
  pub reviewed_at:             Option<String>,
  pub remarks:                 Option<String>,
  pub created_at:              String,
}

impl RawRenewal {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      renewal_id:              row.get(0)?,
      original_application_id: row.get(1)?,
      student_id:              row.get(2)?,
      scholarship_id:          row.get(3)?,
      semester:                row.get(4)?,
      academic_year:           row.get(5)?,
      gwa_snapshot:            row.get(6)?,
      eligibility:             row.get(7)?,
      status:                  row.get(8)?,
      reviewed_by:             row.get(9)?,
      reviewed_at:             row.get(10)?,
      remarks:                 row.get(11)?,
      created_at:              row.get(12)?,
    })
  }

  pub fn into_renewal(self) -> Result<RenewalApplication> {
    Ok(RenewalApplication {
      renewal_id:              decode_uuid(&self.renewal_id)?,
      original_application_id: decode_uuid(&self.original_application_id)?,
      student_id:              decode_uuid(&self.student_id)?,
      scholarship_id:          decode_uuid(&self.scholarship_id)?,
      period:                  RenewalPeriod {
        semester:      decode_enum("semester", &self.semester)?,
        academic_year: self.academic_year,
      },
      gwa_snapshot:            decode_gwa(self.gwa_snapshot)?,
      eligibility:             decode_json(&self.eligibility)?,
      status:                  decode_enum("status", &self.status)?,
      reviewed_by:             decode_opt_uuid(self.reviewed_by)?,
      reviewed_at:             decode_opt_dt(self.reviewed_at)?,
      remarks:                 self.remarks,
      created_at:              decode_dt(&self.created_at)?,
    })
  }
}

// ─── Funds ───────────────────────────────────────────────────────────────────

pub const FUND_COLUMNS: &str = "fund_id, fund_source, source_type, academic_year, semester, \
                                total_budget, disbursed_amount, remaining_budget, created_at, \
                                updated_at, deleted_at";

pub struct RawFund {
  pub fund_id:          String,
  pub fund_source:      String,
  pub source_type:      String,
  pub academic_year:    i32,
  pub semester:         Option<String>,
  pub total_budget:     i64,
  pub disbursed_amount: i64,
  pub remaining_budget: i64,
  pub created_at:       String,
  pub updated_at:       String,
  pub deleted_at:       Option<String>,
}

impl RawFund {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fund_id:          row.get(0)?,
      fund_source:      row.get(1)?,
      source_type:      row.get(2)?,
      academic_year:    row.get(3)?,
      semester:         row.get(4)?,
      total_budget:     row.get(5)?,
      disbursed_amount: row.get(6)?,
      remaining_budget: row.get(7)?,
      created_at:       row.get(8)?,
      updated_at:       row.get(9)?,
      deleted_at:       row.get(10)?,
    })
  }

  pub fn into_fund(self) -> Result<Fund> {
    Ok(Fund {
      fund_id:          decode_uuid(&self.fund_id)?,
      fund_source:      self.fund_source,
      source_type:      decode_enum("source_type", &self.source_type)?,
      academic_year:    self.academic_year,
      semester:         self
        .semester
        .as_deref()
        .map(|s| decode_enum("semester", s))
        .transpose()?,
      total_budget:     Money(self.total_budget),
      disbursed_amount: Money(self.disbursed_amount),
      remaining_budget: Money(self.remaining_budget),
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
      deleted_at:       decode_opt_dt(self.deleted_at)?,
    })
  }
}

pub const DISBURSEMENT_COLUMNS: &str =
  "disbursement_id, fund_id, amount, source, source_id, recorded_by, recorded_at";

pub struct RawDisbursement {
  pub disbursement_id: String,
  pub fund_id:         String,
  pub amount:          i64,
  pub source:          String,
  pub source_id:       String,
  pub recorded_by:     String,
  pub recorded_at:     String,
}

impl RawDisbursement {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      disbursement_id: row.get(0)?,
      fund_id:         row.get(1)?,
      amount:          row.get(2)?,
      source:          row.get(3)?,
      source_id:       row.get(4)?,
      recorded_by:     row.get(5)?,
      recorded_at:     row.get(6)?,
    })
  }

  pub fn into_disbursement(self) -> Result<Disbursement> {
    Ok(Disbursement {
      disbursement_id: decode_uuid(&self.disbursement_id)?,
      fund_id:         decode_uuid(&self.fund_id)?,
      amount:          Money(self.amount),
      source:          decode_enum("source", &self.source)?,
      source_id:       decode_uuid(&self.source_id)?,
      recorded_by:     decode_uuid(&self.recorded_by)?,
      recorded_at:     decode_dt(&self.recorded_at)?,
    })
  }
}

// ─── Stipends ────────────────────────────────────────────────────────────────

pub const STIPEND_COLUMNS: &str = "stipend_id, application_id, student_id, scholarship_id, \
                                   fund_id, amount, period_label, status, released_at, \
                                   released_by, remarks, created_at, deleted_at";

pub struct RawStipend {
  pub stipend_id:     String,
  pub application_id: String,
  pub student_id:     String,
  pub scholarship_id: String,
  pub fund_id:        String,
  pub amount:         i64,
  pub period_label:   String,
  pub status:         String,
  pub released_at:    Option<String>,
  pub released_by:    Option<String>,
  pub remarks:        Option<String>,
  pub created_at:     String,
  pub deleted_at:     Option<String>,
}

impl RawStipend {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      stipend_id:     row.get(0)?,
      application_id: row.get(1)?,
      student_id:     row.get(2)?,
      scholarship_id: row.get(3)?,
      fund_id:        row.get(4)?,
      amount:         row.get(5)?,
      period_label:   row.get(6)?,
      status:         row.get(7)?,
      released_at:    row.get(8)?,
      released_by:    row.get(9)?,
      remarks:        row.get(10)?,
      created_at:     row.get(11)?,
      deleted_at:     row.get(12)?,
    })
  }

  pub fn into_stipend(self) -> Result<Stipend> {
    Ok(Stipend {
      stipend_id:     decode_uuid(&self.stipend_id)?,
      application_id: decode_uuid(&self.application_id)?,
      student_id:     decode_uuid(&self.student_id)?,
      scholarship_id: decode_uuid(&self.scholarship_id)?,
      fund_id:        decode_uuid(&self.fund_id)?,
      amount:         Money(self.amount),
      period_label:   self.period_label,
      status:         decode_enum("status", &self.status)?,
      released_at:    decode_opt_dt(self.released_at)?,
      released_by:    decode_opt_uuid(self.released_by)?,
      remarks:        self.remarks,
      created_at:     decode_dt(&self.created_at)?,
      deleted_at:     decode_opt_dt(self.deleted_at)?,
    })
  }
}

// ─── Assistantship ───────────────────────────────────────────────────────────

pub const ASSIGNMENT_COLUMNS: &str = "assignment_id, student_id, supervisor_id, office, \
                                      hourly_rate, start_date, end_date, fund_id, status, \
                                      created_at, deleted_at";

pub struct RawAssignment {
  pub assignment_id: String,
  pub student_id:    String,
  pub supervisor_id: String,
  pub office:        String,
  pub hourly_rate:   i64,
  pub start_date:    String,
  pub end_date:      String,
  pub fund_id:       String,
  pub status:        String,
  pub created_at:    String,
  pub deleted_at:    Option<String>,
}

impl RawAssignment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      assignment_id: row.get(0)?,
      student_id:    row.get(1)?,
      supervisor_id: row.get(2)?,
      office:        row.get(3)?,
      hourly_rate:   row.get(4)?,
      start_date:    row.get(5)?,
      end_date:      row.get(6)?,
      fund_id:       row.get(7)?,
      status:        row.get(8)?,
      created_at:    row.get(9)?,
      deleted_at:    row.get(10)?,
    })
  }

  pub fn into_assignment(self) -> Result<Assignment> {
    Ok(Assignment {
      assignment_id: decode_uuid(&self.assignment_id)?,
      student_id:    decode_uuid(&self.student_id)?,
      supervisor_id: decode_uuid(&self.supervisor_id)?,
      office:        self.office,
      hourly_rate:   Money(self.hourly_rate),
      start_date:    decode_date(&self.start_date)?,
      end_date:      decode_date(&self.end_date)?,
      fund_id:       decode_uuid(&self.fund_id)?,
      status:        decode_enum("status", &self.status)?,
      created_at:    decode_dt(&self.created_at)?,
      deleted_at:    decode_opt_dt(self.deleted_at)?,
    })
  }
}

pub const WORK_LOG_COLUMNS: &str = "log_id, assignment_id, work_date, time_in, time_out, \
                                    hours_worked, task_description, status, approved_hours, \
                                    reviewed_by, reviewed_at, rejection_reason, payment_id, \
                                    created_at";

pub struct RawWorkLog {
  pub log_id:           String,
  pub assignment_id:    String,
  pub work_date:        String,
  pub time_in:          String,
  pub time_out:         String,
  pub hours_worked:     i64,
  pub task_description: String,
  pub status:           String,
  pub approved_hours:   Option<i64>,
  pub reviewed_by:      Option<String>,
  pub reviewed_at:      Option<String>,
  pub rejection_reason: Option<String>,
  pub payment_id:       Option<String>,
  pub created_at:       String,
}

impl RawWorkLog {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      log_id:           row.get(0)?,
      assignment_id:    row.get(1)?,
      work_date:        row.get(2)?,
      time_in:          row.get(3)?,
      time_out:         row.get(4)?,
      hours_worked:     row.get(5)?,
      task_description: row.get(6)?,
      status:           row.get(7)?,
      approved_hours:   row.get(8)?,
      reviewed_by:      row.get(9)?,
      reviewed_at:      row.get(10)?,
      rejection_reason: row.get(11)?,
      payment_id:       row.get(12)?,
      created_at:       row.get(13)?,
    })
  }

  pub fn into_log(self) -> Result<WorkHourLog> {
    Ok(WorkHourLog {
      log_id:           decode_uuid(&self.log_id)?,
      assignment_id:    decode_uuid(&self.assignment_id)?,
      work_date:        decode_date(&self.work_date)?,
      time_in:          decode_time(&self.time_in)?,
      time_out:         decode_time(&self.time_out)?,
      hours_worked:     decode_hours(self.hours_worked)?,
      task_description: self.task_description,
      status:           decode_enum("status", &self.status)?,
      approved_hours:   self.approved_hours.map(decode_hours).transpose()?,
      reviewed_by:      decode_opt_uuid(self.reviewed_by)?,
      reviewed_at:      decode_opt_dt(self.reviewed_at)?,
      rejection_reason: self.rejection_reason,
      payment_id:       decode_opt_uuid(self.payment_id)?,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

pub const PAYMENT_COLUMNS: &str = "payment_id, assignment_id, period_start, period_end, \
                                   total_hours, hourly_rate, gross_amount, fund_id, status, \
                                   released_at, released_by, created_at";

pub struct RawPayment {
  pub payment_id:    String,
  pub assignment_id: String,
  pub period_start:  String,
  pub period_end:    String,
  pub total_hours:   i64,
  pub hourly_rate:   i64,
  pub gross_amount:  i64,
  pub fund_id:       String,
  pub status:        String,
  pub released_at:   Option<String>,
  pub released_by:   Option<String>,
  pub created_at:    String,
}

impl RawPayment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      payment_id:    row.get(0)?,
      assignment_id: row.get(1)?,
      period_start:  row.get(2)?,
      period_end:    row.get(3)?,
      total_hours:   row.get(4)?,
      hourly_rate:   row.get(5)?,
      gross_amount:  row.get(6)?,
      fund_id:       row.get(7)?,
      status:        row.get(8)?,
      released_at:   row.get(9)?,
      released_by:   row.get(10)?,
      created_at:    row.get(11)?,
    })
  }

  pub fn into_payment(self) -> Result<AssistantshipPayment> {
    Ok(AssistantshipPayment {
      payment_id:    decode_uuid(&self.payment_id)?,
      assignment_id: decode_uuid(&self.assignment_id)?,
      period_start:  decode_date(&self.period_start)?,
      period_end:    decode_date(&self.period_end)?,
      total_hours:   decode_hours(self.total_hours)?,
      hourly_rate:   Money(self.hourly_rate),
      gross_amount:  Money(self.gross_amount),
      fund_id:       decode_uuid(&self.fund_id)?,
      status:        decode_enum("status", &self.status)?,
      released_at:   decode_opt_dt(self.released_at)?,
      released_by:   decode_opt_uuid(self.released_by)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}
