//! [`SqliteStore`]: the SQLite implementation of [`ScholarshipStore`].

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use osas_core::{
  Error as CoreError,
  application::{
    Application, ApplicationStatus, StatusChange, TransitionRequest, plan_transition,
  },
  assistantship::{
    Assignment, AssistantshipPayment, NewAssignment, NewWorkHourLog, PaymentPeriod,
    WorkHourLog, WorkLogReview, compute_payroll,
  },
  document::{Document, DocumentOwner, DocumentReview, NewDocument, missing_documents},
  interview::{Interview, InterviewEvaluation, InterviewStatus, NewInterview, RescheduleRequest},
  ledger::{
    Disbursement, DisbursementSource, DisbursementStatus, Fund, FundSummary, NewFund,
    NewStipend, Stipend,
  },
  money::Money,
  renewal::{
    EligibilityReport, NewRenewal, RenewalApplication, RenewalCandidate, RenewalPeriod,
    RenewalStatus, evaluate_renewal,
  },
  scholarship::{NewScholarship, Scholarship, ScholarshipPatch},
  store::{ApplicationQuery, RenewalQuery, ScholarshipQuery, ScholarshipStore, StipendQuery},
  user::{Actor, NewUser, Role, StudentProfile, User},
};
use rusqlite::{Connection, OptionalExtension as _, Transaction, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    APPLICATION_COLUMNS, ASSIGNMENT_COLUMNS, FUND_COLUMNS, HISTORY_COLUMNS, PAYMENT_COLUMNS,
    RENEWAL_COLUMNS, RawApplication, RawAssignment, RawFund, RawPayment, RawRenewal,
    RawScholarship, RawStatusChange, RawStipend, RawWorkLog, SCHOLARSHIP_COLUMNS, STIPEND_COLUMNS,
    WORK_LOG_COLUMNS,
    decode_uuid, encode_date, encode_dt, encode_gwa, encode_hours, encode_json, encode_owner,
    encode_time, encode_uuid,
  },
  queries::{self, fetch_all, now},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An OSAS Connect store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` against the connection on the database thread.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(&*conn)?)).await?)
  }

  /// Run `f` inside an `IMMEDIATE` transaction, committing only if it
  /// succeeds.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
          let out = f(&tx)?;
          tx.commit()?;
          Ok(out)
        })
        .await?,
    )
  }
}

fn require<T>(found: Option<T>, entity: &'static str, id: Uuid) -> Result<T> {
  found.ok_or(Error::Core(CoreError::not_found(entity, id)))
}

fn require_student_owner(
  actor: Actor,
  owner_id: Uuid,
  entity: &'static str,
  id: Uuid,
) -> Result<()> {
  if actor.role == Role::Student && actor.user_id != owner_id {
    // Students never learn about other students' records.
    return Err(CoreError::not_found(entity, id).into());
  }
  Ok(())
}

/// Insert or overwrite every mutable column of a scholarship row.
fn save_scholarship(conn: &Connection, s: &Scholarship) -> Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO scholarships ({SCHOLARSHIP_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
       ON CONFLICT (scholarship_id) DO UPDATE SET
         name = excluded.name,
         description = excluded.description,
         amount = excluded.amount,
         deadline = excluded.deadline,
         slots = excluded.slots,
         eligibility_criteria = excluded.eligibility_criteria,
         renewal_criteria = excluded.renewal_criteria,
         required_documents = excluded.required_documents,
         max_gwa = excluded.max_gwa,
         status = excluded.status,
         updated_at = excluded.updated_at"
    ),
    rusqlite::params![
      encode_uuid(s.scholarship_id),
      s.name,
      s.description,
      s.scholarship_type.as_ref(),
      s.amount.0,
      encode_date(s.deadline),
      s.slots,
      encode_json(&s.eligibility_criteria)?,
      encode_json(&s.renewal_criteria)?,
      encode_json(&s.required_documents)?,
      encode_gwa(s.max_gwa),
      s.status.as_ref(),
      encode_dt(s.created_at),
      encode_dt(s.updated_at),
      s.deleted_at.map(encode_dt),
    ],
  )?;
  Ok(())
}

fn write_stipend_state(conn: &Connection, s: &Stipend) -> Result<()> {
  conn.execute(
    "UPDATE scholarship_stipends
     SET status = ?2, released_at = ?3, released_by = ?4, remarks = ?5
     WHERE stipend_id = ?1",
    rusqlite::params![
      encode_uuid(s.stipend_id),
      s.status.as_ref(),
      s.released_at.map(encode_dt),
      s.released_by.map(encode_uuid),
      s.remarks,
    ],
  )?;
  Ok(())
}

// ─── ScholarshipStore impl ───────────────────────────────────────────────────

impl ScholarshipStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let name = input.name.trim().to_owned();
    let email = input.email.trim().to_owned();
    if name.is_empty() {
      return Err(CoreError::validation("name", "must not be empty").into());
    }
    if !email.contains('@') {
      return Err(CoreError::validation("email", "must be an email address").into());
    }

    let now = now();
    let user = User {
      user_id: Uuid::new_v4(),
      name,
      email,
      role: input.role,
      password_hash: input.password_hash,
      email_verified_at: input.verification_token.is_none().then_some(now),
      created_at: now,
    };

    let row = user.clone();
    let token = input.verification_token;
    self
      .write(move |tx| {
        if queries::user_by_email(tx, &row.email)?.is_some() {
          return Err(CoreError::DuplicateEmail(row.email.clone()).into());
        }
        tx.execute(
          "INSERT INTO users (user_id, name, email, role, password_hash,
                              email_verified_at, verification_token, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            encode_uuid(row.user_id),
            row.name,
            row.email,
            row.role.as_ref(),
            row.password_hash,
            row.email_verified_at.map(encode_dt),
            token,
            encode_dt(row.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(user_id = %user.user_id, role = %user.role, "user created");
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self.read(move |conn| queries::user(conn, id)).await
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let email = email.to_owned();
    self.read(move |conn| queries::user_by_email(conn, &email)).await
  }

  async fn verify_email(&self, token: &str) -> Result<User> {
    let token = token.to_owned();
    self
      .write(move |tx| {
        let user_id: Option<String> = tx
          .query_row(
            "SELECT user_id FROM users WHERE verification_token = ?1",
            [&token],
            |row| row.get(0),
          )
          .optional()?;
        let Some(user_id) = user_id else {
          return Err(CoreError::InvalidVerificationToken.into());
        };
        tx.execute(
          "UPDATE users SET email_verified_at = ?2, verification_token = NULL
           WHERE user_id = ?1",
          rusqlite::params![user_id, encode_dt(now())],
        )?;
        let id = decode_uuid(&user_id)?;
        require(queries::user(tx, id)?, "user", id)
      })
      .await
  }

  async fn upsert_student_profile(&self, profile: StudentProfile) -> Result<StudentProfile> {
    profile.validate()?;
    let row = profile.clone();
    self
      .write(move |tx| {
        let user = require(queries::user(tx, row.user_id)?, "user", row.user_id)?;
        if user.role != Role::Student {
          return Err(CoreError::validation("user_id", "must be a student account").into());
        }
        tx.execute(
          "INSERT INTO student_profiles (user_id, student_number, course, year_level,
                                         current_gwa, enrollment_status,
                                         has_disciplinary_record)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (user_id) DO UPDATE SET
             student_number = excluded.student_number,
             course = excluded.course,
             year_level = excluded.year_level,
             current_gwa = excluded.current_gwa,
             enrollment_status = excluded.enrollment_status,
             has_disciplinary_record = excluded.has_disciplinary_record",
          rusqlite::params![
            encode_uuid(row.user_id),
            row.student_number,
            row.course,
            row.year_level,
            encode_gwa(row.current_gwa),
            row.enrollment_status.as_ref(),
            row.has_disciplinary_record,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(profile)
  }

  async fn get_student_profile(&self, user_id: Uuid) -> Result<Option<StudentProfile>> {
    self.read(move |conn| queries::profile(conn, user_id)).await
  }

  // ── Scholarships ──────────────────────────────────────────────────────────

  async fn create_scholarship(&self, input: NewScholarship) -> Result<Scholarship> {
    input.validate()?;
    let now = now();
    let scholarship = Scholarship {
      scholarship_id:       Uuid::new_v4(),
      name:                 input.name.trim().to_owned(),
      description:          input.description,
      scholarship_type:     input.scholarship_type,
      amount:               input.amount,
      deadline:             input.deadline,
      slots:                input.slots,
      eligibility_criteria: input.eligibility_criteria,
      renewal_criteria:     input.renewal_criteria,
      required_documents:   input.required_documents,
      max_gwa:              input.max_gwa,
      status:               input.status,
      created_at:           now,
      updated_at:           now,
      deleted_at:           None,
    };
    let row = scholarship.clone();
    self.write(move |tx| save_scholarship(tx, &row)).await?;
    Ok(scholarship)
  }

  async fn get_scholarship(&self, id: Uuid) -> Result<Option<Scholarship>> {
    self.read(move |conn| queries::scholarship(conn, id)).await
  }

  async fn list_scholarships(&self, query: ScholarshipQuery) -> Result<Vec<Scholarship>> {
    let status = query.status.map(|s| s.to_string());
    let include_drafts = query.include_drafts;
    self
      .read(move |conn| {
        fetch_all(
          conn,
          &format!(
            "SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships
             WHERE deleted_at IS NULL
               AND (?1 IS NULL OR status = ?1)
               AND (?2 OR status <> 'draft')
             ORDER BY deadline, name"
          ),
          rusqlite::params![status, include_drafts],
          RawScholarship::from_row,
          RawScholarship::into_scholarship,
        )
      })
      .await
  }

  async fn update_scholarship(&self, id: Uuid, patch: ScholarshipPatch) -> Result<Scholarship> {
    self
      .write(move |tx| {
        let mut scholarship = require(
          queries::scholarship(tx, id)?.filter(|s| !s.is_deleted()),
          "scholarship",
          id,
        )?;
        patch.apply(&mut scholarship)?;
        if scholarship.slots < queries::approved_count(tx, id)? {
          return Err(
            CoreError::validation("slots", "cannot drop below the number already approved")
              .into(),
          );
        }
        scholarship.updated_at = now();
        save_scholarship(tx, &scholarship)?;
        Ok(scholarship)
      })
      .await
  }

  async fn delete_scholarship(&self, id: Uuid) -> Result<Scholarship> {
    self
      .write(move |tx| {
        let mut scholarship = require(
          queries::scholarship(tx, id)?.filter(|s| !s.is_deleted()),
          "scholarship",
          id,
        )?;
        let at = now();
        scholarship.deleted_at = Some(at);
        scholarship.updated_at = at;
        tx.execute(
          "UPDATE scholarships SET deleted_at = ?2, updated_at = ?2 WHERE scholarship_id = ?1",
          rusqlite::params![encode_uuid(id), encode_dt(at)],
        )?;
        Ok(scholarship)
      })
      .await
  }

  // ── Applications ──────────────────────────────────────────────────────────

  async fn create_application(&self, student: Actor, scholarship_id: Uuid) -> Result<Application> {
    if student.role != Role::Student {
      return Err(
        CoreError::validation("student", "only student accounts can apply").into(),
      );
    }
    self
      .write(move |tx| {
        let scholarship = require(
          queries::scholarship(tx, scholarship_id)?.filter(|s| !s.is_deleted()),
          "scholarship",
          scholarship_id,
        )?;
        let now = now();
        if !scholarship.accepts_applications(now.date_naive()) {
          return Err(CoreError::ScholarshipClosed.into());
        }
        let exists: bool = tx.query_row(
          "SELECT EXISTS (SELECT 1 FROM applications
                          WHERE student_id = ?1 AND scholarship_id = ?2)",
          [encode_uuid(student.user_id), encode_uuid(scholarship_id)],
          |row| row.get(0),
        )?;
        if exists {
          return Err(CoreError::DuplicateApplication.into());
        }

        let app = Application {
          application_id: Uuid::new_v4(),
          student_id: student.user_id,
          scholarship_id,
          status: ApplicationStatus::Draft,
          resume_status: None,
          remarks: None,
          submitted_at: None,
          created_at: now,
          updated_at: now,
        };
        tx.execute(
          &format!(
            "INSERT INTO applications ({APPLICATION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, NULL, NULL, NULL, ?5, ?5)"
          ),
          rusqlite::params![
            encode_uuid(app.application_id),
            encode_uuid(app.student_id),
            encode_uuid(app.scholarship_id),
            app.status.as_ref(),
            encode_dt(now),
          ],
        )?;
        queries::insert_status_change(tx, &StatusChange {
          change_id:      Uuid::new_v4(),
          application_id: app.application_id,
          from_status:    None,
          to_status:      ApplicationStatus::Draft,
          actor_id:       student.user_id,
          note:           None,
          recorded_at:    now,
        })?;
        Ok(app)
      })
      .await
  }

  async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
    self.read(move |conn| queries::application(conn, id)).await
  }

  async fn list_applications(&self, query: ApplicationQuery) -> Result<Vec<Application>> {
    let student = query.student_id.map(encode_uuid);
    let scholarship = query.scholarship_id.map(encode_uuid);
    let status = query.status.map(|s| s.to_string());
    self
      .read(move |conn| {
        fetch_all(
          conn,
          &format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications
             WHERE (?1 IS NULL OR student_id = ?1)
               AND (?2 IS NULL OR scholarship_id = ?2)
               AND (?3 IS NULL OR status = ?3)
             ORDER BY created_at"
          ),
          rusqlite::params![student, scholarship, status],
          RawApplication::from_row,
          RawApplication::into_application,
        )
      })
      .await
  }

  async fn transition_application(
    &self,
    id: Uuid,
    request: TransitionRequest,
  ) -> Result<Application> {
    let app = self
      .write(move |tx| {
        let mut app = require(queries::application(tx, id)?, "application", id)?;
        let actor = request.actor;
        if actor.role == Role::Student && actor.user_id != app.student_id {
          return Err(
            CoreError::TransitionNotPermitted {
              role: actor.role,
              from: app.status,
              to:   request.to,
            }
            .into(),
          );
        }

        let plan = plan_transition(app.status, app.resume_status, request.to, actor.role)?;
        let scholarship_id = app.scholarship_id;
        let scholarship =
          require(queries::scholarship(tx, scholarship_id)?, "scholarship", scholarship_id)?;
        let now = now();

        match (plan.from, plan.to) {
          (ApplicationStatus::UnderEvaluation, ApplicationStatus::InterviewScheduled) => {
            return Err(CoreError::InterviewRequired.into());
          }
          (ApplicationStatus::Draft, ApplicationStatus::Submitted) => {
            if !scholarship.accepts_applications(now.date_naive()) {
              return Err(CoreError::ScholarshipClosed.into());
            }
            app.submitted_at = Some(now);
          }
          (ApplicationStatus::UnderVerification, ApplicationStatus::Verified) => {
            let docs = queries::documents_for(tx, DocumentOwner::Application(id))?;
            let missing = missing_documents(&scholarship.required_documents, &docs);
            if !missing.is_empty() {
              return Err(CoreError::DocumentsIncomplete(missing).into());
            }
          }
          (_, ApplicationStatus::Approved) => {
            if scholarship.is_deleted() {
              return Err(CoreError::ScholarshipClosed.into());
            }
            if queries::approved_count(tx, scholarship.scholarship_id)? >= scholarship.slots {
              return Err(CoreError::NoSlotsAvailable.into());
            }
          }
          _ => {}
        }

        app.status = plan.to;
        app.resume_status = plan.resume_status;
        if request.note.is_some() {
          app.remarks = request.note.clone();
        }
        app.updated_at = now;

        queries::write_application_state(tx, &app)?;
        queries::insert_status_change(tx, &StatusChange {
          change_id:      Uuid::new_v4(),
          application_id: id,
          from_status:    Some(plan.from),
          to_status:      plan.to,
          actor_id:       actor.user_id,
          note:           request.note,
          recorded_at:    now,
        })?;
        Ok(app)
      })
      .await?;

    tracing::info!(application_id = %id, status = %app.status, "application transitioned");
    Ok(app)
  }

  async fn application_history(&self, id: Uuid) -> Result<Vec<StatusChange>> {
    self
      .read(move |conn| {
        fetch_all(
          conn,
          &format!(
            "SELECT {HISTORY_COLUMNS} FROM application_status_history
             WHERE application_id = ?1 ORDER BY recorded_at, rowid"
          ),
          [encode_uuid(id)],
          RawStatusChange::from_row,
          RawStatusChange::into_change,
        )
      })
      .await
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn record_document(&self, input: NewDocument) -> Result<Document> {
    let document = Document {
      document_id:   input.document_id,
      owner:         input.owner,
      document_type: input.document_type,
      file_name:     input.file_name,
      storage_path:  input.storage_path,
      mime_type:     input.mime_type,
      size_bytes:    input.size_bytes,
      content_hash:  input.content_hash,
      status:        Default::default(),
      verified_by:   None,
      verified_at:   None,
      notes:         None,
      uploaded_at:   now(),
    };
    let row = document.clone();
    self
      .write(move |tx| {
        match row.owner {
          DocumentOwner::Application(id) => {
            require(queries::application(tx, id)?, "application", id)?;
          }
          DocumentOwner::Renewal(id) => {
            require(queries::renewal(tx, id)?, "renewal", id)?;
          }
        }
        let (application_id, renewal_id) = encode_owner(row.owner);
        let size = i64::try_from(row.size_bytes)
          .map_err(|_| CoreError::validation("size_bytes", "file is too large"))?;
        tx.execute(
          "INSERT INTO documents (document_id, application_id, renewal_id, document_type,
                                  file_name, storage_path, mime_type, size_bytes,
                                  content_hash, status, uploaded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            encode_uuid(row.document_id),
            application_id,
            renewal_id,
            row.document_type.as_ref(),
            row.file_name,
            row.storage_path,
            row.mime_type,
            size,
            row.content_hash,
            row.status.as_ref(),
            encode_dt(row.uploaded_at),
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(document)
  }

  async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
    self.read(move |conn| queries::document(conn, id)).await
  }

  async fn list_documents(&self, owner: DocumentOwner) -> Result<Vec<Document>> {
    self.read(move |conn| queries::documents_for(conn, owner)).await
  }

  async fn review_document(
    &self,
    id: Uuid,
    review: DocumentReview,
    reviewer: Actor,
  ) -> Result<Document> {
    self
      .write(move |tx| {
        let mut document = require(queries::document(tx, id)?, "document", id)?;
        review.check(document.status)?;
        document.status = review.decision;
        document.verified_by = Some(reviewer.user_id);
        document.verified_at = Some(now());
        document.notes = review.notes;
        tx.execute(
          "UPDATE documents SET status = ?2, verified_by = ?3, verified_at = ?4, notes = ?5
           WHERE document_id = ?1",
          rusqlite::params![
            encode_uuid(id),
            document.status.as_ref(),
            document.verified_by.map(encode_uuid),
            document.verified_at.map(encode_dt),
            document.notes,
          ],
        )?;
        Ok(document)
      })
      .await
  }

  // ── Interviews ────────────────────────────────────────────────────────────

  async fn schedule_interview(&self, input: NewInterview, actor: Actor) -> Result<Interview> {
    let now = now();
    input.validate(now)?;
    self
      .write(move |tx| {
        let application_id = input.application_id;
        let mut app =
          require(queries::application(tx, application_id)?, "application", application_id)?;
        // A second round is allowed once every earlier interview has closed
        // without a result; the application keeps its status.
        let plan = if app.status == ApplicationStatus::InterviewScheduled {
          if !actor.role.is_staff() {
            return Err(
              CoreError::TransitionNotPermitted {
                role: actor.role,
                from: app.status,
                to:   app.status,
              }
              .into(),
            );
          }
          let earlier =
            queries::interviews_where(tx, "application_id = ?1", [encode_uuid(application_id)])?;
          if earlier.iter().any(|i| i.status.is_open() || i.status == InterviewStatus::Completed)
          {
            return Err(CoreError::InterviewAlreadyOpen.into());
          }
          None
        } else {
          Some(plan_transition(
            app.status,
            app.resume_status,
            ApplicationStatus::InterviewScheduled,
            actor.role,
          )?)
        };
        let interviewer =
          require(queries::user(tx, input.interviewer_id)?, "user", input.interviewer_id)?;
        if !interviewer.role.is_staff() {
          return Err(
            CoreError::validation("interviewer_id", "must be an admin or OSAS staff account")
              .into(),
          );
        }

        let interview = Interview {
          interview_id:       Uuid::new_v4(),
          application_id,
          interviewer_id:     interviewer.user_id,
          scheduled_at:       input.scheduled_at,
          location:           input.location.trim().to_owned(),
          status:             InterviewStatus::Scheduled,
          evaluation:         None,
          completed_at:       None,
          reschedule_history: Vec::new(),
          created_at:         now,
        };
        tx.execute(
          "INSERT INTO interviews (interview_id, application_id, interviewer_id, scheduled_at,
                                   location, status, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            encode_uuid(interview.interview_id),
            encode_uuid(application_id),
            encode_uuid(interview.interviewer_id),
            encode_dt(interview.scheduled_at),
            interview.location,
            interview.status.as_ref(),
            encode_dt(now),
          ],
        )?;

        if let Some(plan) = plan {
          app.status = plan.to;
          app.resume_status = plan.resume_status;
          app.updated_at = now;
          queries::write_application_state(tx, &app)?;
          queries::insert_status_change(tx, &StatusChange {
            change_id:      Uuid::new_v4(),
            application_id,
            from_status:    Some(plan.from),
            to_status:      plan.to,
            actor_id:       actor.user_id,
            note:           Some(format!("Interview scheduled for {}", interview.scheduled_at)),
            recorded_at:    now,
          })?;
        }
        Ok(interview)
      })
      .await
  }

  async fn get_interview(&self, id: Uuid) -> Result<Option<Interview>> {
    self.read(move |conn| queries::interview(conn, id)).await
  }

  async fn list_interviews(&self, application_id: Uuid) -> Result<Vec<Interview>> {
    self
      .read(move |conn| {
        queries::interviews_where(conn, "application_id = ?1", [encode_uuid(application_id)])
      })
      .await
  }

  async fn reschedule_interview(
    &self,
    id: Uuid,
    request: RescheduleRequest,
    actor: Actor,
  ) -> Result<Interview> {
    let now = now();
    request.validate(now)?;
    self
      .write(move |tx| {
        let interview = require(queries::interview(tx, id)?, "interview", id)?;
        interview.status.check_transition(InterviewStatus::Rescheduled)?;
        let seq = interview.reschedule_history.len() as i64 + 1;
        tx.execute(
          "INSERT INTO interview_reschedules (interview_id, seq, previous_time, new_time,
                                              reason, rescheduled_by, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            encode_uuid(id),
            seq,
            encode_dt(interview.scheduled_at),
            encode_dt(request.new_time),
            request.reason.trim(),
            encode_uuid(actor.user_id),
            encode_dt(now),
          ],
        )?;
        tx.execute(
          "UPDATE interviews SET scheduled_at = ?2, status = 'rescheduled'
           WHERE interview_id = ?1",
          rusqlite::params![encode_uuid(id), encode_dt(request.new_time)],
        )?;
        require(queries::interview(tx, id)?, "interview", id)
      })
      .await
  }

  async fn complete_interview(
    &self,
    id: Uuid,
    evaluation: InterviewEvaluation,
  ) -> Result<Interview> {
    evaluation.scores.validate()?;
    self
      .write(move |tx| {
        let interview = require(queries::interview(tx, id)?, "interview", id)?;
        interview.status.check_transition(InterviewStatus::Completed)?;
        tx.execute(
          "UPDATE interviews SET status = 'completed', evaluation = ?2, completed_at = ?3
           WHERE interview_id = ?1",
          rusqlite::params![encode_uuid(id), encode_json(&evaluation)?, encode_dt(now())],
        )?;
        require(queries::interview(tx, id)?, "interview", id)
      })
      .await
  }

  async fn set_interview_status(&self, id: Uuid, status: InterviewStatus) -> Result<Interview> {
    if !matches!(
      status,
      InterviewStatus::Missed | InterviewStatus::NoShow | InterviewStatus::Cancelled
    ) {
      return Err(
        CoreError::validation("status", "must be one of missed, no_show, cancelled").into(),
      );
    }
    self
      .write(move |tx| {
        let interview = require(queries::interview(tx, id)?, "interview", id)?;
        interview.status.check_transition(status)?;
        tx.execute(
          "UPDATE interviews SET status = ?2 WHERE interview_id = ?1",
          rusqlite::params![encode_uuid(id), status.as_ref()],
        )?;
        require(queries::interview(tx, id)?, "interview", id)
      })
      .await
  }

  async fn upcoming_interviews(
    &self,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<Interview>> {
    self
      .read(move |conn| {
        queries::interviews_where(
          conn,
          "status IN ('scheduled', 'rescheduled') AND scheduled_at >= ?1 AND scheduled_at < ?2",
          [encode_dt(from), encode_dt(until)],
        )
      })
      .await
  }

  // ── Renewals ──────────────────────────────────────────────────────────────

  async fn submit_renewal(&self, student: Actor, input: NewRenewal) -> Result<RenewalApplication> {
    self
      .write(move |tx| {
        let original_id = input.original_application_id;
        let original = require(queries::application(tx, original_id)?, "application", original_id)?;
        require_student_owner(student, original.student_id, "application", original_id)?;
        if original.status != ApplicationStatus::Approved {
          return Err(
            CoreError::InvalidState {
              entity: "application",
              from:   original.status.to_string(),
              to:     "renewal".into(),
            }
            .into(),
          );
        }
        let scholarship = require(
          queries::scholarship(tx, original.scholarship_id)?,
          "scholarship",
          original.scholarship_id,
        )?;

        let duplicate: bool = tx.query_row(
          "SELECT EXISTS (SELECT 1 FROM renewal_applications
                          WHERE student_id = ?1 AND semester = ?2 AND academic_year = ?3)",
          rusqlite::params![
            encode_uuid(original.student_id),
            input.period.semester.as_ref(),
            input.period.academic_year,
          ],
          |row| row.get(0),
        )?;
        if duplicate {
          return Err(CoreError::DuplicateRenewal.into());
        }

        let mut renewal = RenewalApplication {
          renewal_id:              Uuid::new_v4(),
          original_application_id: original_id,
          student_id:              original.student_id,
          scholarship_id:          scholarship.scholarship_id,
          period:                  input.period,
          gwa_snapshot:            None,
          eligibility:             EligibilityReport { eligible: false, reasons: Vec::new() },
          status:                  RenewalStatus::Pending,
          reviewed_by:             None,
          reviewed_at:             None,
          remarks:                 None,
          created_at:              now(),
        };
        let standing = queries::renewal_standing(tx, &renewal)?;
        renewal.gwa_snapshot = standing.current_gwa;
        renewal.eligibility = evaluate_renewal(&standing, scholarship.gwa_ceiling());

        tx.execute(
          &format!(
            "INSERT INTO renewal_applications ({RENEWAL_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, NULL, NULL, ?10)"
          ),
          rusqlite::params![
            encode_uuid(renewal.renewal_id),
            encode_uuid(renewal.original_application_id),
            encode_uuid(renewal.student_id),
            encode_uuid(renewal.scholarship_id),
            renewal.period.semester.as_ref(),
            renewal.period.academic_year,
            encode_gwa(renewal.gwa_snapshot),
            encode_json(&renewal.eligibility)?,
            renewal.status.as_ref(),
            encode_dt(renewal.created_at),
          ],
        )?;
        Ok(renewal)
      })
      .await
  }

  async fn get_renewal(&self, id: Uuid) -> Result<Option<RenewalApplication>> {
    self.read(move |conn| queries::renewal(conn, id)).await
  }

  async fn list_renewals(&self, query: RenewalQuery) -> Result<Vec<RenewalApplication>> {
    let student = query.student_id.map(encode_uuid);
    let status = query.status.map(|s| s.to_string());
    self
      .read(move |conn| {
        fetch_all(
          conn,
          &format!(
            "SELECT {RENEWAL_COLUMNS} FROM renewal_applications
             WHERE (?1 IS NULL OR student_id = ?1) AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at"
          ),
          rusqlite::params![student, status],
          RawRenewal::from_row,
          RawRenewal::into_renewal,
        )
      })
      .await
  }

  async fn evaluate_renewal(&self, id: Uuid) -> Result<EligibilityReport> {
    self
      .read(move |conn| {
        let renewal = require(queries::renewal(conn, id)?, "renewal", id)?;
        let scholarship = require(
          queries::scholarship(conn, renewal.scholarship_id)?,
          "scholarship",
          renewal.scholarship_id,
        )?;
        let standing = queries::renewal_standing(conn, &renewal)?;
        Ok(evaluate_renewal(&standing, scholarship.gwa_ceiling()))
      })
      .await
  }

  async fn transition_renewal(
    &self,
    id: Uuid,
    to: RenewalStatus,
    actor: Actor,
    remarks: Option<String>,
  ) -> Result<RenewalApplication> {
    self
      .write(move |tx| {
        let mut renewal = require(queries::renewal(tx, id)?, "renewal", id)?;
        require_student_owner(actor, renewal.student_id, "renewal", id)?;
        renewal.status.check_transition(to, actor.role)?;

        let scholarship = require(
          queries::scholarship(tx, renewal.scholarship_id)?,
          "scholarship",
          renewal.scholarship_id,
        )?;
        let standing = queries::renewal_standing(tx, &renewal)?;
        renewal.eligibility = evaluate_renewal(&standing, scholarship.gwa_ceiling());
        if to == RenewalStatus::Approved && !renewal.eligibility.eligible {
          return Err(CoreError::IneligibleRenewal(renewal.eligibility.messages()).into());
        }

        renewal.status = to;
        if actor.role.is_staff() {
          renewal.reviewed_by = Some(actor.user_id);
          renewal.reviewed_at = Some(now());
        }
        if remarks.is_some() {
          renewal.remarks = remarks;
        }
        tx.execute(
          "UPDATE renewal_applications
           SET status = ?2, eligibility = ?3, reviewed_by = ?4, reviewed_at = ?5, remarks = ?6
           WHERE renewal_id = ?1",
          rusqlite::params![
            encode_uuid(id),
            renewal.status.as_ref(),
            encode_json(&renewal.eligibility)?,
            renewal.reviewed_by.map(encode_uuid),
            renewal.reviewed_at.map(encode_dt),
            renewal.remarks,
          ],
        )?;
        Ok(renewal)
      })
      .await
  }

  async fn renewal_candidates(&self, period: RenewalPeriod) -> Result<Vec<RenewalCandidate>> {
    self
      .read(move |conn| {
        fetch_all(
          conn,
          "SELECT a.student_id, u.name, u.email, a.scholarship_id, s.name, a.application_id
           FROM applications a
           JOIN users u        ON u.user_id = a.student_id
           JOIN scholarships s ON s.scholarship_id = a.scholarship_id
           WHERE a.status = 'approved'
             AND s.status = 'active'
             AND s.deleted_at IS NULL
             AND NOT EXISTS (
               SELECT 1 FROM renewal_applications r
               WHERE r.student_id = a.student_id
                 AND r.semester = ?1
                 AND r.academic_year = ?2
             )
           ORDER BY u.name",
          rusqlite::params![period.semester.as_ref(), period.academic_year],
          |row| {
            Ok((
              row.get::<_, String>(0)?,
              row.get::<_, String>(1)?,
              row.get::<_, String>(2)?,
              row.get::<_, String>(3)?,
              row.get::<_, String>(4)?,
              row.get::<_, String>(5)?,
            ))
          },
          |(student_id, student_name, student_email, scholarship_id, scholarship_name, app_id)| {
            Ok(RenewalCandidate {
              student_id: decode_uuid(&student_id)?,
              student_name,
              student_email,
              scholarship_id: decode_uuid(&scholarship_id)?,
              scholarship_name,
              application_id: decode_uuid(&app_id)?,
            })
          },
        )
      })
      .await
  }

  // ── Funds ─────────────────────────────────────────────────────────────────

  async fn create_fund(&self, input: NewFund) -> Result<Fund> {
    let balance = input.validate()?;
    let now = now();
    let fund = Fund {
      fund_id:          Uuid::new_v4(),
      fund_source:      input.fund_source.trim().to_owned(),
      source_type:      input.source_type,
      academic_year:    input.academic_year,
      semester:         input.semester,
      total_budget:     balance.total_budget,
      disbursed_amount: balance.disbursed_amount,
      remaining_budget: balance.remaining(),
      created_at:       now,
      updated_at:       now,
      deleted_at:       None,
    };
    let row = fund.clone();
    self
      .write(move |tx| {
        tx.execute(
          &format!(
            "INSERT INTO fund_tracking ({FUND_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, NULL)"
          ),
          rusqlite::params![
            encode_uuid(row.fund_id),
            row.fund_source,
            row.source_type.as_ref(),
            row.academic_year,
            row.semester.map(|s| s.to_string()),
            row.total_budget.0,
            row.disbursed_amount.0,
            row.remaining_budget.0,
            encode_dt(row.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(fund)
  }

  async fn get_fund(&self, id: Uuid) -> Result<Option<Fund>> {
    self.read(move |conn| queries::fund(conn, id)).await
  }

  async fn list_funds(&self) -> Result<Vec<Fund>> {
    self
      .read(|conn| {
        fetch_all(
          conn,
          &format!(
            "SELECT {FUND_COLUMNS} FROM fund_tracking
             WHERE deleted_at IS NULL ORDER BY academic_year DESC, fund_source"
          ),
          [],
          RawFund::from_row,
          RawFund::into_fund,
        )
      })
      .await
  }

  async fn adjust_fund_budget(&self, id: Uuid, total_budget: Money) -> Result<Fund> {
    self
      .write(move |tx| {
        let mut fund = require(queries::fund(tx, id)?, "fund", id)?;
        let balance = fund.balance().with_total(total_budget)?;
        fund.total_budget = balance.total_budget;
        fund.remaining_budget = balance.remaining();
        fund.updated_at = now();
        tx.execute(
          "UPDATE fund_tracking SET total_budget = ?2, remaining_budget = ?3, updated_at = ?4
           WHERE fund_id = ?1",
          rusqlite::params![
            encode_uuid(id),
            fund.total_budget.0,
            fund.remaining_budget.0,
            encode_dt(fund.updated_at),
          ],
        )?;
        Ok(fund)
      })
      .await
  }

  async fn list_disbursements(&self, fund_id: Uuid) -> Result<Vec<Disbursement>> {
    self.read(move |conn| queries::disbursements(conn, fund_id)).await
  }

  async fn fund_summary(&self) -> Result<Vec<FundSummary>> {
    let funds = self.list_funds().await?;
    let stats = self.read(queries::disbursement_stats).await?;
    Ok(
      funds
        .into_iter()
        .map(|fund| {
          let (disbursement_count, last_disbursed_at) =
            stats.get(&fund.fund_id).copied().unwrap_or((0, None));
          FundSummary { fund, disbursement_count, last_disbursed_at }
        })
        .collect(),
    )
  }

  // ── Stipends ──────────────────────────────────────────────────────────────

  async fn create_stipend(&self, input: NewStipend) -> Result<Stipend> {
    input.validate()?;
    self
      .write(move |tx| {
        let app = require(
          queries::application(tx, input.application_id)?,
          "application",
          input.application_id,
        )?;
        if app.status != ApplicationStatus::Approved {
          return Err(
            CoreError::InvalidState {
              entity: "application",
              from:   app.status.to_string(),
              to:     "stipend".into(),
            }
            .into(),
          );
        }
        require(queries::fund(tx, input.fund_id)?, "fund", input.fund_id)?;

        let stipend = Stipend {
          stipend_id:     Uuid::new_v4(),
          application_id: app.application_id,
          student_id:     app.student_id,
          scholarship_id: app.scholarship_id,
          fund_id:        input.fund_id,
          amount:         input.amount,
          period_label:   input.period_label.trim().to_owned(),
          status:         DisbursementStatus::Pending,
          released_at:    None,
          released_by:    None,
          remarks:        None,
          created_at:     now(),
          deleted_at:     None,
        };
        tx.execute(
          &format!(
            "INSERT INTO scholarship_stipends ({STIPEND_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, NULL, NULL, ?9, NULL)"
          ),
          rusqlite::params![
            encode_uuid(stipend.stipend_id),
            encode_uuid(stipend.application_id),
            encode_uuid(stipend.student_id),
            encode_uuid(stipend.scholarship_id),
            encode_uuid(stipend.fund_id),
            stipend.amount.0,
            stipend.period_label,
            stipend.status.as_ref(),
            encode_dt(stipend.created_at),
          ],
        )?;
        Ok(stipend)
      })
      .await
  }

  async fn get_stipend(&self, id: Uuid) -> Result<Option<Stipend>> {
    self.read(move |conn| queries::stipend(conn, id)).await
  }

  async fn list_stipends(&self, query: StipendQuery) -> Result<Vec<Stipend>> {
    let student = query.student_id.map(encode_uuid);
    let fund = query.fund_id.map(encode_uuid);
    let status = query.status.map(|s| s.to_string());
    self
      .read(move |conn| {
        fetch_all(
          conn,
          &format!(
            "SELECT {STIPEND_COLUMNS} FROM scholarship_stipends
             WHERE deleted_at IS NULL
               AND (?1 IS NULL OR student_id = ?1)
               AND (?2 IS NULL OR fund_id = ?2)
               AND (?3 IS NULL OR status = ?3)
             ORDER BY created_at"
          ),
          rusqlite::params![student, fund, status],
          RawStipend::from_row,
          RawStipend::into_stipend,
        )
      })
      .await
  }

  async fn advance_stipend(
    &self,
    id: Uuid,
    to: DisbursementStatus,
    actor: Actor,
    remarks: Option<String>,
  ) -> Result<Stipend> {
    self
      .write(move |tx| {
        let mut stipend = require(queries::stipend(tx, id)?, "stipend", id)?;
        stipend.status.check_transition(to, "stipend")?;
        if to == DisbursementStatus::Released {
          queries::disburse(
            tx,
            stipend.fund_id,
            stipend.amount,
            DisbursementSource::Stipend,
            id,
            actor,
          )?;
          stipend.released_at = Some(now());
          stipend.released_by = Some(actor.user_id);
        }
        stipend.status = to;
        if remarks.is_some() {
          stipend.remarks = remarks;
        }
        write_stipend_state(tx, &stipend)?;
        Ok(stipend)
      })
      .await
  }

  // ── Assistantship ─────────────────────────────────────────────────────────

  async fn create_assignment(&self, input: NewAssignment) -> Result<Assignment> {
    input.validate()?;
    self
      .write(move |tx| {
        let student = require(queries::user(tx, input.student_id)?, "user", input.student_id)?;
        if student.role != Role::Student {
          return Err(CoreError::validation("student_id", "must be a student account").into());
        }
        require(queries::user(tx, input.supervisor_id)?, "user", input.supervisor_id)?;
        require(queries::fund(tx, input.fund_id)?, "fund", input.fund_id)?;

        let assignment = Assignment {
          assignment_id: Uuid::new_v4(),
          student_id:    input.student_id,
          supervisor_id: input.supervisor_id,
          office:        input.office.trim().to_owned(),
          hourly_rate:   input.hourly_rate,
          start_date:    input.start_date,
          end_date:      input.end_date,
          fund_id:       input.fund_id,
          status:        Default::default(),
          created_at:    now(),
          deleted_at:    None,
        };
        tx.execute(
          &format!(
            "INSERT INTO student_assistantship_assignments ({ASSIGNMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL)"
          ),
          rusqlite::params![
            encode_uuid(assignment.assignment_id),
            encode_uuid(assignment.student_id),
            encode_uuid(assignment.supervisor_id),
            assignment.office,
            assignment.hourly_rate.0,
            encode_date(assignment.start_date),
            encode_date(assignment.end_date),
            encode_uuid(assignment.fund_id),
            assignment.status.as_ref(),
            encode_dt(assignment.created_at),
          ],
        )?;
        Ok(assignment)
      })
      .await
  }

  async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>> {
    self.read(move |conn| queries::assignment(conn, id)).await
  }

  async fn list_assignments(&self, student_id: Option<Uuid>) -> Result<Vec<Assignment>> {
    let student = student_id.map(encode_uuid);
    self
      .read(move |conn| {
        fetch_all(
          conn,
          &format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM student_assistantship_assignments
             WHERE deleted_at IS NULL AND (?1 IS NULL OR student_id = ?1)
             ORDER BY start_date"
          ),
          [student],
          RawAssignment::from_row,
          RawAssignment::into_assignment,
        )
      })
      .await
  }

  async fn log_work_hours(
    &self,
    assignment_id: Uuid,
    input: NewWorkHourLog,
    today: NaiveDate,
  ) -> Result<WorkHourLog> {
    self
      .write(move |tx| {
        let assignment =
          require(queries::assignment(tx, assignment_id)?, "assignment", assignment_id)?;
        let hours = input.validate(&assignment, today)?;

        let duplicate: bool = tx.query_row(
          "SELECT EXISTS (SELECT 1 FROM work_hour_logs
                          WHERE assignment_id = ?1 AND work_date = ?2)",
          [encode_uuid(assignment_id), encode_date(input.work_date)],
          |row| row.get(0),
        )?;
        if duplicate {
          return Err(CoreError::DuplicateWorkHourLog { work_date: input.work_date }.into());
        }

        let log = WorkHourLog {
          log_id: Uuid::new_v4(),
          assignment_id,
          work_date: input.work_date,
          time_in: input.time_in,
          time_out: input.time_out,
          hours_worked: hours,
          task_description: input.task_description.trim().to_owned(),
          status: Default::default(),
          approved_hours: None,
          reviewed_by: None,
          reviewed_at: None,
          rejection_reason: None,
          payment_id: None,
          created_at: now(),
        };
        tx.execute(
          "INSERT INTO work_hour_logs (log_id, assignment_id, work_date, time_in, time_out,
                                       hours_worked, task_description, status, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            encode_uuid(log.log_id),
            encode_uuid(assignment_id),
            encode_date(log.work_date),
            encode_time(log.time_in),
            encode_time(log.time_out),
            encode_hours(log.hours_worked),
            log.task_description,
            log.status.as_ref(),
            encode_dt(log.created_at),
          ],
        )?;
        Ok(log)
      })
      .await
  }

  async fn get_work_log(&self, id: Uuid) -> Result<Option<WorkHourLog>> {
    self.read(move |conn| queries::work_log(conn, id)).await
  }

  async fn list_work_logs(&self, assignment_id: Uuid) -> Result<Vec<WorkHourLog>> {
    self
      .read(move |conn| {
        fetch_all(
          conn,
          &format!(
            "SELECT {WORK_LOG_COLUMNS} FROM work_hour_logs
             WHERE assignment_id = ?1 ORDER BY work_date"
          ),
          [encode_uuid(assignment_id)],
          RawWorkLog::from_row,
          RawWorkLog::into_log,
        )
      })
      .await
  }

  async fn review_work_log(
    &self,
    id: Uuid,
    review: WorkLogReview,
    reviewer: Actor,
  ) -> Result<WorkHourLog> {
    self
      .write(move |tx| {
        let mut log = require(queries::work_log(tx, id)?, "work log", id)?;
        let outcome = review.check(&log)?;
        log.status = outcome.status;
        log.approved_hours = outcome.approved_hours;
        log.rejection_reason = outcome.rejection_reason;
        log.reviewed_by = Some(reviewer.user_id);
        log.reviewed_at = Some(now());
        tx.execute(
          "UPDATE work_hour_logs
           SET status = ?2, approved_hours = ?3, rejection_reason = ?4,
               reviewed_by = ?5, reviewed_at = ?6
           WHERE log_id = ?1",
          rusqlite::params![
            encode_uuid(id),
            log.status.as_ref(),
            log.approved_hours.map(encode_hours),
            log.rejection_reason,
            log.reviewed_by.map(encode_uuid),
            log.reviewed_at.map(encode_dt),
          ],
        )?;
        Ok(log)
      })
      .await
  }

  async fn create_payment(
    &self,
    assignment_id: Uuid,
    period: PaymentPeriod,
  ) -> Result<AssistantshipPayment> {
    period.validate()?;
    self
      .write(move |tx| {
        let assignment =
          require(queries::assignment(tx, assignment_id)?, "assignment", assignment_id)?;
        let logs = fetch_all(
          tx,
          &format!(
            "SELECT {WORK_LOG_COLUMNS} FROM work_hour_logs
             WHERE assignment_id = ?1
               AND work_date BETWEEN ?2 AND ?3
               AND status = 'approved'
               AND payment_id IS NULL
             ORDER BY work_date"
          ),
          [
            encode_uuid(assignment_id),
            encode_date(period.period_start),
            encode_date(period.period_end),
          ],
          RawWorkLog::from_row,
          RawWorkLog::into_log,
        )?;
        let (total_hours, gross_amount) = compute_payroll(&logs, assignment.hourly_rate)?;

        let payment = AssistantshipPayment {
          payment_id: Uuid::new_v4(),
          assignment_id,
          period_start: period.period_start,
          period_end: period.period_end,
          total_hours,
          hourly_rate: assignment.hourly_rate,
          gross_amount,
          fund_id: assignment.fund_id,
          status: DisbursementStatus::Pending,
          released_at: None,
          released_by: None,
          created_at: now(),
        };
        tx.execute(
          &format!(
            "INSERT INTO assistantship_payments ({PAYMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, NULL, ?10)"
          ),
          rusqlite::params![
            encode_uuid(payment.payment_id),
            encode_uuid(assignment_id),
            encode_date(payment.period_start),
            encode_date(payment.period_end),
            encode_hours(payment.total_hours),
            payment.hourly_rate.0,
            payment.gross_amount.0,
            encode_uuid(payment.fund_id),
            payment.status.as_ref(),
            encode_dt(payment.created_at),
          ],
        )?;
        for log in &logs {
          tx.execute(
            "UPDATE work_hour_logs SET payment_id = ?2 WHERE log_id = ?1",
            [encode_uuid(log.log_id), encode_uuid(payment.payment_id)],
          )?;
        }
        Ok(payment)
      })
      .await
  }

  async fn get_payment(&self, id: Uuid) -> Result<Option<AssistantshipPayment>> {
    self.read(move |conn| queries::payment(conn, id)).await
  }

  async fn list_payments(&self, assignment_id: Uuid) -> Result<Vec<AssistantshipPayment>> {
    self
      .read(move |conn| {
        fetch_all(
          conn,
          &format!(
            "SELECT {PAYMENT_COLUMNS} FROM assistantship_payments
             WHERE assignment_id = ?1 ORDER BY period_start"
          ),
          [encode_uuid(assignment_id)],
          RawPayment::from_row,
          RawPayment::into_payment,
        )
      })
      .await
  }

  async fn advance_payment(
    &self,
    id: Uuid,
    to: DisbursementStatus,
    actor: Actor,
  ) -> Result<AssistantshipPayment> {
    self
      .write(move |tx| {
        let mut payment = require(queries::payment(tx, id)?, "payment", id)?;
        payment.status.check_transition(to, "payment")?;
        if to == DisbursementStatus::Released {
          queries::disburse(
            tx,
            payment.fund_id,
            payment.gross_amount,
            DisbursementSource::AssistantshipPayment,
            id,
            actor,
          )?;
          payment.released_at = Some(now());
          payment.released_by = Some(actor.user_id);
        }
        if matches!(to, DisbursementStatus::Cancelled | DisbursementStatus::Failed) {
          // Hand the covered hours back to the next payroll run.
          tx.execute(
            "UPDATE work_hour_logs SET payment_id = NULL WHERE payment_id = ?1",
            [encode_uuid(id)],
          )?;
        }
        payment.status = to;
        tx.execute(
          "UPDATE assistantship_payments SET status = ?2, released_at = ?3, released_by = ?4
           WHERE payment_id = ?1",
          rusqlite::params![
            encode_uuid(id),
            payment.status.as_ref(),
            payment.released_at.map(encode_dt),
            payment.released_by.map(encode_uuid),
          ],
        )?;
        Ok(payment)
      })
      .await
  }
}
