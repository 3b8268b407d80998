//! Synchronous row helpers shared by the [`SqliteStore`](crate::SqliteStore)
//! methods.
//!
//! Every function takes a plain `&Connection` so it can run either directly
//! or inside a `Transaction` (which derefs to one), always on the
//! `tokio_rusqlite` worker thread.

use std::collections::HashMap;

use chrono::{DateTime, SubsecRound as _, Utc};
use osas_core::{
  application::{Application, StatusChange},
  assistantship::{Assignment, AssistantshipPayment, WorkHourLog},
  document::{Document, DocumentOwner, RENEWAL_REQUIRED_DOCUMENTS, missing_documents},
  interview::Interview,
  ledger::{Disbursement, DisbursementSource, Fund, Stipend},
  money::Money,
  renewal::{RenewalApplication, StudentStanding},
  scholarship::Scholarship,
  user::{Actor, StudentProfile, User},
};
use rusqlite::{Connection, OptionalExtension as _, Params, Row};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    APPLICATION_COLUMNS, ASSIGNMENT_COLUMNS, DISBURSEMENT_COLUMNS, DOCUMENT_COLUMNS,
    FUND_COLUMNS, INTERVIEW_COLUMNS, PAYMENT_COLUMNS, PROFILE_COLUMNS, RENEWAL_COLUMNS,
    RESCHEDULE_COLUMNS, RawApplication, RawAssignment, RawDisbursement, RawDocument, RawFund,
    RawInterview, RawPayment, RawProfile, RawRenewal, RawReschedule, RawScholarship,
    RawStipend, RawUser, RawWorkLog, SCHOLARSHIP_COLUMNS, STIPEND_COLUMNS, USER_COLUMNS,
    WORK_LOG_COLUMNS, decode_opt_dt, decode_uuid, encode_dt, encode_owner, encode_uuid,
  },
};

/// Current time at the precision the schema stores.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Generic fetch ───────────────────────────────────────────────────────────

pub fn fetch_one<R, T>(
  conn: &Connection,
  sql: &str,
  params: impl Params,
  read: impl FnOnce(&Row<'_>) -> rusqlite::Result<R>,
  decode: impl FnOnce(R) -> Result<T>,
) -> Result<Option<T>> {
  conn.query_row(sql, params, read).optional()?.map(decode).transpose()
}

pub fn fetch_all<R, T>(
  conn: &Connection,
  sql: &str,
  params: impl Params,
  read: impl FnMut(&Row<'_>) -> rusqlite::Result<R>,
  decode: impl FnMut(R) -> Result<T>,
) -> Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt.query_map(params, read)?.collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(decode).collect()
}

// ─── Single-row loads ────────────────────────────────────────────────────────

pub fn user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
  fetch_one(
    conn,
    &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
    [encode_uuid(id)],
    RawUser::from_row,
    RawUser::into_user,
  )
}

pub fn user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
  fetch_one(
    conn,
    &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE"),
    [email.trim()],
    RawUser::from_row,
    RawUser::into_user,
  )
}

pub fn profile(conn: &Connection, user_id: Uuid) -> Result<Option<StudentProfile>> {
  fetch_one(
    conn,
    &format!("SELECT {PROFILE_COLUMNS} FROM student_profiles WHERE user_id = ?1"),
    [encode_uuid(user_id)],
    RawProfile::from_row,
    RawProfile::into_profile,
  )
}

pub fn scholarship(conn: &Connection, id: Uuid) -> Result<Option<Scholarship>> {
  fetch_one(
    conn,
    &format!("SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships WHERE scholarship_id = ?1"),
    [encode_uuid(id)],
    RawScholarship::from_row,
    RawScholarship::into_scholarship,
  )
}

pub fn application(conn: &Connection, id: Uuid) -> Result<Option<Application>> {
  fetch_one(
    conn,
    &format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE application_id = ?1"),
    [encode_uuid(id)],
    RawApplication::from_row,
    RawApplication::into_application,
  )
}

pub fn document(conn: &Connection, id: Uuid) -> Result<Option<Document>> {
  fetch_one(
    conn,
    &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE document_id = ?1"),
    [encode_uuid(id)],
    RawDocument::from_row,
    RawDocument::into_document,
  )
}

pub fn documents_for(conn: &Connection, owner: DocumentOwner) -> Result<Vec<Document>> {
  let (column, id) = match encode_owner(owner) {
    (Some(id), _) => ("application_id", id),
    (_, Some(id)) => ("renewal_id", id),
    (None, None) => return Ok(Vec::new()),
  };
  fetch_all(
    conn,
    &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE {column} = ?1 ORDER BY uploaded_at"),
    [id],
    RawDocument::from_row,
    RawDocument::into_document,
  )
}

pub fn interview(conn: &Connection, id: Uuid) -> Result<Option<Interview>> {
  let id_str = encode_uuid(id);
  let Some(raw) = conn
    .query_row(
      &format!("SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE interview_id = ?1"),
      [&id_str],
      RawInterview::from_row,
    )
    .optional()?
  else {
    return Ok(None);
  };
  let history = fetch_all(
    conn,
    &format!(
      "SELECT {RESCHEDULE_COLUMNS} FROM interview_reschedules
       WHERE interview_id = ?1 ORDER BY seq"
    ),
    [&id_str],
    RawReschedule::from_row,
    RawReschedule::into_entry,
  )?;
  raw.into_interview(history).map(Some)
}

pub fn interviews_where(
  conn: &Connection,
  clause: &str,
  params: impl Params,
) -> Result<Vec<Interview>> {
  let ids: Vec<Uuid> = fetch_all(
    conn,
    &format!("SELECT interview_id FROM interviews WHERE {clause} ORDER BY scheduled_at"),
    params,
    |row| row.get::<_, String>(0),
    |s| decode_uuid(&s),
  )?;
  let mut out = Vec::with_capacity(ids.len());
  for id in ids {
    if let Some(iv) = interview(conn, id)? {
      out.push(iv);
    }
  }
  Ok(out)
}

pub fn renewal(conn: &Connection, id: Uuid) -> Result<Option<RenewalApplication>> {
  fetch_one(
    conn,
    &format!("SELECT {RENEWAL_COLUMNS} FROM renewal_applications WHERE renewal_id = ?1"),
    [encode_uuid(id)],
    RawRenewal::from_row,
    RawRenewal::into_renewal,
  )
}

/// A live fund. Soft-deleted funds read as missing.
pub fn fund(conn: &Connection, id: Uuid) -> Result<Option<Fund>> {
  fetch_one(
    conn,
    &format!("SELECT {FUND_COLUMNS} FROM fund_tracking WHERE fund_id = ?1 AND deleted_at IS NULL"),
    [encode_uuid(id)],
    RawFund::from_row,
    RawFund::into_fund,
  )
}

pub fn stipend(conn: &Connection, id: Uuid) -> Result<Option<Stipend>> {
  fetch_one(
    conn,
    &format!(
      "SELECT {STIPEND_COLUMNS} FROM scholarship_stipends
       WHERE stipend_id = ?1 AND deleted_at IS NULL"
    ),
    [encode_uuid(id)],
    RawStipend::from_row,
    RawStipend::into_stipend,
  )
}

pub fn assignment(conn: &Connection, id: Uuid) -> Result<Option<Assignment>> {
  fetch_one(
    conn,
    &format!(
      "SELECT {ASSIGNMENT_COLUMNS} FROM student_assistantship_assignments
       WHERE assignment_id = ?1 AND deleted_at IS NULL"
    ),
    [encode_uuid(id)],
    RawAssignment::from_row,
    RawAssignment::into_assignment,
  )
}

pub fn work_log(conn: &Connection, id: Uuid) -> Result<Option<WorkHourLog>> {
  fetch_one(
    conn,
    &format!("SELECT {WORK_LOG_COLUMNS} FROM work_hour_logs WHERE log_id = ?1"),
    [encode_uuid(id)],
    RawWorkLog::from_row,
    RawWorkLog::into_log,
  )
}

pub fn payment(conn: &Connection, id: Uuid) -> Result<Option<AssistantshipPayment>> {
  fetch_one(
    conn,
    &format!("SELECT {PAYMENT_COLUMNS} FROM assistantship_payments WHERE payment_id = ?1"),
    [encode_uuid(id)],
    RawPayment::from_row,
    RawPayment::into_payment,
  )
}

// ─── Derived reads ───────────────────────────────────────────────────────────

pub fn approved_count(conn: &Connection, scholarship_id: Uuid) -> Result<u32> {
  let n: i64 = conn.query_row(
    "SELECT COUNT(*) FROM applications WHERE scholarship_id = ?1 AND status = 'approved'",
    [encode_uuid(scholarship_id)],
    |row| row.get(0),
  )?;
  Ok(u32::try_from(n).unwrap_or(u32::MAX))
}

/// Evaluator inputs for a renewal as of now.
pub fn renewal_standing(
  conn: &Connection,
  renewal: &RenewalApplication,
) -> Result<StudentStanding> {
  let profile = profile(conn, renewal.student_id)?;
  let docs = documents_for(conn, DocumentOwner::Renewal(renewal.renewal_id))?;
  let documents_complete = missing_documents(&RENEWAL_REQUIRED_DOCUMENTS, &docs).is_empty();
  Ok(StudentStanding {
    current_gwa: profile.as_ref().and_then(|p| p.current_gwa),
    enrollment_status: profile.as_ref().map(|p| p.enrollment_status).unwrap_or_default(),
    has_disciplinary_record: profile.is_some_and(|p| p.has_disciplinary_record),
    documents_complete,
  })
}

/// `(count, last recorded_at)` per fund.
pub fn disbursement_stats(
  conn: &Connection,
) -> Result<HashMap<Uuid, (u64, Option<DateTime<Utc>>)>> {
  let rows = fetch_all(
    conn,
    "SELECT fund_id, COUNT(*), MAX(recorded_at) FROM fund_disbursements GROUP BY fund_id",
    [],
    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, Option<String>>(2)?)),
    |(id, count, last)| {
      Ok((
        decode_uuid(&id)?,
        (count.unsigned_abs(), decode_opt_dt(last)?),
      ))
    },
  )?;
  Ok(rows.into_iter().collect())
}

pub fn disbursements(conn: &Connection, fund_id: Uuid) -> Result<Vec<Disbursement>> {
  fetch_all(
    conn,
    &format!(
      "SELECT {DISBURSEMENT_COLUMNS} FROM fund_disbursements
       WHERE fund_id = ?1 ORDER BY recorded_at"
    ),
    [encode_uuid(fund_id)],
    RawDisbursement::from_row,
    RawDisbursement::into_disbursement,
  )
}

// ─── Writes ──────────────────────────────────────────────────────────────────

pub fn insert_status_change(conn: &Connection, change: &StatusChange) -> Result<()> {
  conn.execute(
    "INSERT INTO application_status_history
       (change_id, application_id, from_status, to_status, actor_id, note, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      encode_uuid(change.change_id),
      encode_uuid(change.application_id),
      change.from_status.map(|s| s.to_string()),
      change.to_status.as_ref(),
      encode_uuid(change.actor_id),
      change.note,
      encode_dt(change.recorded_at),
    ],
  )?;
  Ok(())
}

pub fn write_application_state(conn: &Connection, app: &Application) -> Result<()> {
  conn.execute(
    "UPDATE applications
     SET status = ?2, resume_status = ?3, remarks = ?4, submitted_at = ?5, updated_at = ?6
     WHERE application_id = ?1",
    rusqlite::params![
      encode_uuid(app.application_id),
      app.status.as_ref(),
      app.resume_status.map(|s| s.to_string()),
      app.remarks,
      app.submitted_at.map(encode_dt),
      encode_dt(app.updated_at),
    ],
  )?;
  Ok(())
}

/// Debit `amount` from a fund and append the ledger line.
///
/// Must run inside an `IMMEDIATE` transaction: the balance read and the
/// write that depends on it may not interleave with another release.
pub fn disburse(
  conn: &Connection,
  fund_id: Uuid,
  amount: Money,
  source: DisbursementSource,
  source_id: Uuid,
  actor: Actor,
) -> Result<Fund> {
  let mut fund = fund(conn, fund_id)?.ok_or(osas_core::Error::not_found("fund", fund_id))?;
  let balance = fund.balance().disburse(amount)?;
  let at = now();

  conn.execute(
    "UPDATE fund_tracking
     SET disbursed_amount = ?2, remaining_budget = ?3, updated_at = ?4
     WHERE fund_id = ?1",
    rusqlite::params![
      encode_uuid(fund_id),
      balance.disbursed_amount.0,
      balance.remaining().0,
      encode_dt(at),
    ],
  )?;
  conn.execute(
    "INSERT INTO fund_disbursements
       (disbursement_id, fund_id, amount, source, source_id, recorded_by, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      encode_uuid(Uuid::new_v4()),
      encode_uuid(fund_id),
      amount.0,
      source.as_ref(),
      encode_uuid(source_id),
      encode_uuid(actor.user_id),
      encode_dt(at),
    ],
  )?;

  tracing::info!(
    fund_id = %fund_id,
    %amount,
    remaining = %balance.remaining(),
    source = source.as_ref(),
    "fund debited"
  );

  fund.disbursed_amount = balance.disbursed_amount;
  fund.remaining_budget = balance.remaining();
  fund.updated_at = at;
  Ok(fund)
}
