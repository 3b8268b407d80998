//! SQL schema for the OSAS Connect SQLite store.
//!
//! Executed once at connection startup. Money columns hold centavos, GWA
//! columns thousandths, and hour columns hundredths of an hour.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id            TEXT PRIMARY KEY,
    name               TEXT NOT NULL,
    email              TEXT NOT NULL UNIQUE COLLATE NOCASE,
    role               TEXT NOT NULL CHECK (role IN ('admin', 'osas_staff', 'student')),
    password_hash      TEXT NOT NULL,
    email_verified_at  TEXT,
    verification_token TEXT UNIQUE,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS student_profiles (
    user_id                 TEXT PRIMARY KEY REFERENCES users(user_id),
    student_number          TEXT NOT NULL UNIQUE,
    course                  TEXT NOT NULL,
    year_level              INTEGER NOT NULL CHECK (year_level BETWEEN 1 AND 6),
    current_gwa             INTEGER CHECK (current_gwa BETWEEN 1000 AND 5000),
    enrollment_status       TEXT NOT NULL DEFAULT 'enrolled',
    has_disciplinary_record INTEGER NOT NULL DEFAULT 0
);

-- Soft-deleted only; no DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS scholarships (
    scholarship_id       TEXT PRIMARY KEY,
    name                 TEXT NOT NULL,
    description          TEXT NOT NULL DEFAULT '',
    scholarship_type     TEXT NOT NULL,
    amount               INTEGER NOT NULL CHECK (amount > 0),
    deadline             TEXT NOT NULL,   -- YYYY-MM-DD
    slots                INTEGER NOT NULL CHECK (slots > 0),
    eligibility_criteria TEXT NOT NULL DEFAULT '[]',
    renewal_criteria     TEXT NOT NULL DEFAULT '[]',
    required_documents   TEXT NOT NULL DEFAULT '[]',
    max_gwa              INTEGER,
    status               TEXT NOT NULL DEFAULT 'draft',
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL,
    deleted_at           TEXT
);

-- Never deleted.
CREATE TABLE IF NOT EXISTS applications (
    application_id TEXT PRIMARY KEY,
    student_id     TEXT NOT NULL REFERENCES users(user_id),
    scholarship_id TEXT NOT NULL REFERENCES scholarships(scholarship_id),
    status         TEXT NOT NULL DEFAULT 'draft',
    resume_status  TEXT,
    remarks        TEXT,
    submitted_at   TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (student_id, scholarship_id),
    CHECK  ((status = 'incomplete') = (resume_status IS NOT NULL))
);

-- Append-only.
CREATE TABLE IF NOT EXISTS application_status_history (
    change_id      TEXT PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(application_id),
    from_status    TEXT,
    to_status      TEXT NOT NULL,
    actor_id       TEXT NOT NULL REFERENCES users(user_id),
    note           TEXT,
    recorded_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS renewal_applications (
    renewal_id              TEXT PRIMARY KEY,
    original_application_id TEXT NOT NULL REFERENCES applications(application_id),
    student_id              TEXT NOT NULL REFERENCES users(user_id),
    scholarship_id          TEXT NOT NULL REFERENCES scholarships(scholarship_id),
    semester                TEXT NOT NULL CHECK (semester IN ('first', 'second', 'summer')),
    academic_year           INTEGER NOT NULL,
    gwa_snapshot            INTEGER,
    eligibility             TEXT NOT NULL,   -- JSON EligibilityReport
    status                  TEXT NOT NULL DEFAULT 'pending',
    reviewed_by             TEXT REFERENCES users(user_id),
    reviewed_at             TEXT,
    remarks                 TEXT,
    created_at              TEXT NOT NULL,
    UNIQUE (student_id, semester, academic_year)
);

-- Exactly one owner column is set.
CREATE TABLE IF NOT EXISTS documents (
    document_id    TEXT PRIMARY KEY,
    application_id TEXT REFERENCES applications(application_id),
    renewal_id     TEXT REFERENCES renewal_applications(renewal_id),
    document_type  TEXT NOT NULL,
    file_name      TEXT NOT NULL,
    storage_path   TEXT NOT NULL UNIQUE,
    mime_type      TEXT NOT NULL,
    size_bytes     INTEGER NOT NULL CHECK (size_bytes >= 0),
    content_hash   TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'pending',
    verified_by    TEXT REFERENCES users(user_id),
    verified_at    TEXT,
    notes          TEXT,
    uploaded_at    TEXT NOT NULL,
    CHECK ((application_id IS NULL) <> (renewal_id IS NULL))
);

CREATE TABLE IF NOT EXISTS interviews (
    interview_id   TEXT PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(application_id),
    interviewer_id TEXT NOT NULL REFERENCES users(user_id),
    scheduled_at   TEXT NOT NULL,
    location       TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'scheduled',
    evaluation     TEXT,   -- JSON InterviewEvaluation: scores and recommendation together
    completed_at   TEXT,
    created_at     TEXT NOT NULL,
    CHECK ((status = 'completed') = (completed_at IS NOT NULL))
);

-- Append-only.
CREATE TABLE IF NOT EXISTS interview_reschedules (
    interview_id   TEXT NOT NULL REFERENCES interviews(interview_id),
    seq            INTEGER NOT NULL,
    previous_time  TEXT NOT NULL,
    new_time       TEXT NOT NULL,
    reason         TEXT NOT NULL,
    rescheduled_by TEXT NOT NULL REFERENCES users(user_id),
    recorded_at    TEXT NOT NULL,
    PRIMARY KEY (interview_id, seq)
);

CREATE TABLE IF NOT EXISTS fund_tracking (
    fund_id          TEXT PRIMARY KEY,
    fund_source      TEXT NOT NULL,
    source_type      TEXT NOT NULL,
    academic_year    INTEGER NOT NULL,
    semester         TEXT,
    total_budget     INTEGER NOT NULL,
    disbursed_amount INTEGER NOT NULL DEFAULT 0 CHECK (disbursed_amount >= 0),
    remaining_budget INTEGER NOT NULL CHECK (remaining_budget >= 0),
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    deleted_at       TEXT,
    CHECK (remaining_budget = total_budget - disbursed_amount)
);

-- Append-only ledger lines.
CREATE TABLE IF NOT EXISTS fund_disbursements (
    disbursement_id TEXT PRIMARY KEY,
    fund_id         TEXT NOT NULL REFERENCES fund_tracking(fund_id),
    amount          INTEGER NOT NULL CHECK (amount > 0),
    source          TEXT NOT NULL,   -- 'stipend' | 'assistantship_payment'
    source_id       TEXT NOT NULL,
    recorded_by     TEXT NOT NULL REFERENCES users(user_id),
    recorded_at     TEXT NOT NULL,
    UNIQUE (source, source_id)
);

CREATE TABLE IF NOT EXISTS scholarship_stipends (
    stipend_id     TEXT PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(application_id),
    student_id     TEXT NOT NULL REFERENCES users(user_id),
    scholarship_id TEXT NOT NULL REFERENCES scholarships(scholarship_id),
    fund_id        TEXT NOT NULL REFERENCES fund_tracking(fund_id),
    amount         INTEGER NOT NULL CHECK (amount > 0),
    period_label   TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'pending',
    released_at    TEXT,
    released_by    TEXT REFERENCES users(user_id),
    remarks        TEXT,
    created_at     TEXT NOT NULL,
    deleted_at     TEXT
);

CREATE TABLE IF NOT EXISTS student_assistantship_assignments (
    assignment_id TEXT PRIMARY KEY,
    student_id    TEXT NOT NULL REFERENCES users(user_id),
    supervisor_id TEXT NOT NULL REFERENCES users(user_id),
    office        TEXT NOT NULL,
    hourly_rate   INTEGER NOT NULL CHECK (hourly_rate > 0),
    start_date    TEXT NOT NULL,
    end_date      TEXT NOT NULL,
    fund_id       TEXT NOT NULL REFERENCES fund_tracking(fund_id),
    status        TEXT NOT NULL DEFAULT 'active',
    created_at    TEXT NOT NULL,
    deleted_at    TEXT,
    CHECK (end_date >= start_date)
);

CREATE TABLE IF NOT EXISTS assistantship_payments (
    payment_id    TEXT PRIMARY KEY,
    assignment_id TEXT NOT NULL REFERENCES student_assistantship_assignments(assignment_id),
    period_start  TEXT NOT NULL,
    period_end    TEXT NOT NULL,
    total_hours   INTEGER NOT NULL CHECK (total_hours > 0),
    hourly_rate   INTEGER NOT NULL,
    gross_amount  INTEGER NOT NULL CHECK (gross_amount > 0),
    fund_id       TEXT NOT NULL REFERENCES fund_tracking(fund_id),
    status        TEXT NOT NULL DEFAULT 'pending',
    released_at   TEXT,
    released_by   TEXT REFERENCES users(user_id),
    created_at    TEXT NOT NULL,
    CHECK (period_end >= period_start)
);

CREATE TABLE IF NOT EXISTS work_hour_logs (
    log_id           TEXT PRIMARY KEY,
    assignment_id    TEXT NOT NULL REFERENCES student_assistantship_assignments(assignment_id),
    work_date        TEXT NOT NULL,
    time_in          TEXT NOT NULL,   -- HH:MM:SS
    time_out         TEXT NOT NULL,
    hours_worked     INTEGER NOT NULL CHECK (hours_worked > 0),
    task_description TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'pending',
    approved_hours   INTEGER,
    reviewed_by      TEXT REFERENCES users(user_id),
    reviewed_at      TEXT,
    rejection_reason TEXT,
    payment_id       TEXT REFERENCES assistantship_payments(payment_id),
    created_at       TEXT NOT NULL,
    UNIQUE (assignment_id, work_date),
    CHECK  (time_out > time_in),
    CHECK  (approved_hours IS NULL OR (approved_hours > 0 AND approved_hours <= hours_worked))
);

CREATE INDEX IF NOT EXISTS applications_status_idx  ON applications(status);
CREATE INDEX IF NOT EXISTS history_application_idx  ON application_status_history(application_id);
CREATE INDEX IF NOT EXISTS documents_application_idx ON documents(application_id);
CREATE INDEX IF NOT EXISTS documents_renewal_idx    ON documents(renewal_id);
CREATE INDEX IF NOT EXISTS interviews_scheduled_idx ON interviews(scheduled_at);
CREATE INDEX IF NOT EXISTS disbursements_fund_idx   ON fund_disbursements(fund_id);
CREATE INDEX IF NOT EXISTS stipends_student_idx     ON scholarship_stipends(student_id);

PRAGMA user_version = 1;
";
