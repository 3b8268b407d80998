//! Outbound mail payloads and the [`Mailer`] seam.
//!
//! Each [`Mail`] variant carries the fixed set of variables its template
//! needs. Rendering is plain string formatting; delivery is left to the
//! `Mailer` implementation.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  application::ApplicationStatus,
  document::{DocumentType, VerificationStatus},
  money::Money,
  renewal::RenewalPeriod,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
  pub name:  String,
  pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum Mail {
  DocumentVerification {
    to:                  Recipient,
    scholarship_name:    String,
    document_type:       DocumentType,
    file_name:           String,
    verification_status: VerificationStatus,
    notes:               Option<String>,
  },
  /// Sent on scheduling, on reschedule, and again as a reminder.
  InterviewScheduled {
    to:               Recipient,
    scholarship_name: String,
    scheduled_at:     DateTime<Utc>,
    location:         String,
    interviewer_name: String,
    is_reminder:      bool,
  },
  RenewalReminder {
    to:               Recipient,
    scholarship_name: String,
    period:           RenewalPeriod,
  },
  StatusChanged {
    to:               Recipient,
    scholarship_name: String,
    old_status:       ApplicationStatus,
    new_status:       ApplicationStatus,
    remarks:          Option<String>,
  },
  StipendReleased {
    to:               Recipient,
    scholarship_name: String,
    amount:           Money,
    period_label:     String,
    released_at:      DateTime<Utc>,
  },
  StaffInvitation {
    to:                 Recipient,
    invited_by:         String,
    verification_token: String,
    verify_url:         String,
  },
}

impl Mail {
  pub fn recipient(&self) -> &Recipient {
    match self {
      Self::DocumentVerification { to, .. }
      | Self::InterviewScheduled { to, .. }
      | Self::RenewalReminder { to, .. }
      | Self::StatusChanged { to, .. }
      | Self::StipendReleased { to, .. }
      | Self::StaffInvitation { to, .. } => to,
    }
  }

  /// Short template name, used as a log field.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::DocumentVerification { .. } => "document_verification",
      Self::InterviewScheduled { is_reminder: false, .. } => "interview_scheduled",
      Self::InterviewScheduled { is_reminder: true, .. } => "interview_reminder",
      Self::RenewalReminder { .. } => "renewal_reminder",
      Self::StatusChanged { .. } => "status_changed",
      Self::StipendReleased { .. } => "stipend_released",
      Self::StaffInvitation { .. } => "staff_invitation",
    }
  }

  pub fn subject(&self) -> String {
    match self {
      Self::DocumentVerification { document_type, verification_status, .. } => format!(
        "Document {}: {}",
        verification_status.title(),
        document_type.label()
      ),
      Self::InterviewScheduled { scholarship_name, is_reminder: false, .. } => {
        format!("Interview Scheduled: {scholarship_name}")
      }
      Self::InterviewScheduled { scholarship_name, is_reminder: true, .. } => {
        format!("Interview Reminder: {scholarship_name}")
      }
      Self::RenewalReminder { scholarship_name, period, .. } => {
        format!("Renewal Reminder: {scholarship_name} ({period})")
      }
      Self::StatusChanged { scholarship_name, new_status, .. } => format!(
        "Application Update: {scholarship_name} is now {}",
        status_title(*new_status)
      ),
      Self::StipendReleased { scholarship_name, amount, .. } => {
        format!("Stipend Released: {amount} for {scholarship_name}")
      }
      Self::StaffInvitation { .. } => "You have been invited to OSAS Connect".to_owned(),
    }
  }

  /// Next-step bullets shown beneath the message.
  pub fn next_steps(&self) -> Vec<String> {
    let steps: &[&str] = match self {
      Self::DocumentVerification { verification_status: VerificationStatus::Rejected, .. } => &[
        "Read the verifier's notes below",
        "Prepare a corrected copy of the document",
        "Resubmit the document through your application page",
      ],
      Self::DocumentVerification { .. } => &["No further action is needed for this document"],
      Self::InterviewScheduled { .. } => &[
        "Arrive ten minutes before the scheduled time",
        "Bring your school ID and a copy of your latest grade report",
      ],
      Self::RenewalReminder { .. } => &[
        "Upload your latest grade report and certificate of enrollment",
        "Submit your renewal application before the deadline",
      ],
      Self::StatusChanged { new_status, .. } => status_guidance(*new_status).1,
      Self::StipendReleased { .. } => &["Claim your stipend at the cashier with your school ID"],
      Self::StaffInvitation { .. } => &[
        "Verify your email address using the link below",
        "Sign in with the credentials provided by your administrator",
      ],
    };
    steps.iter().map(|s| (*s).to_owned()).collect()
  }

  pub fn html_body(&self) -> String {
    let to = self.recipient();
    let mut body = format!("<p>Dear {},</p>\n", escape(&to.name));

    match self {
      Self::DocumentVerification {
        scholarship_name,
        document_type,
        file_name,
        verification_status,
        notes,
        ..
      } => {
        body.push_str(&format!(
          "<p>Your {} (<em>{}</em>) for <strong>{}</strong> has been \
           <strong>{}</strong>.</p>\n",
          document_type.label(),
          escape(file_name),
          escape(scholarship_name),
          verification_status.title(),
        ));
        if let Some(notes) = notes {
          body.push_str(&format!("<p>Notes: {}</p>\n", escape(notes)));
        }
      }
      Self::InterviewScheduled {
        scholarship_name,
        scheduled_at,
        location,
        interviewer_name,
        is_reminder,
        ..
      } => {
        let lead = if *is_reminder {
          "This is a reminder of your upcoming interview"
        } else {
          "An interview has been scheduled"
        };
        body.push_str(&format!(
          "<p>{lead} for <strong>{}</strong>.</p>\n<ul>\n<li>When: {}</li>\n\
           <li>Where: {}</li>\n<li>Interviewer: {}</li>\n</ul>\n",
          escape(scholarship_name),
          scheduled_at.format("%B %-d, %Y %H:%M UTC"),
          escape(location),
          escape(interviewer_name),
        ));
      }
      Self::RenewalReminder { scholarship_name, period, .. } => {
        body.push_str(&format!(
          "<p>It is time to renew your <strong>{}</strong> scholarship for {period}.</p>\n",
          escape(scholarship_name),
        ));
      }
      Self::StatusChanged { scholarship_name, old_status, new_status, remarks, .. } => {
        body.push_str(&format!(
          "<p>Your application for <strong>{}</strong> moved from {} to \
           <strong>{}</strong>.</p>\n<p>{}</p>\n",
          escape(scholarship_name),
          status_title(*old_status),
          status_title(*new_status),
          status_guidance(*new_status).0,
        ));
        if let Some(remarks) = remarks {
          body.push_str(&format!("<p>Remarks: {}</p>\n", escape(remarks)));
        }
      }
      Self::StipendReleased { scholarship_name, amount, period_label, released_at, .. } => {
        body.push_str(&format!(
          "<p>Your <strong>{}</strong> stipend of <strong>{amount}</strong> for {} was \
           released on {}.</p>\n",
          escape(scholarship_name),
          escape(period_label),
          released_at.format("%B %-d, %Y"),
        ));
      }
      Self::StaffInvitation { invited_by, verify_url, verification_token, .. } => {
        body.push_str(&format!(
          "<p>{} has invited you to join OSAS Connect as staff.</p>\n\
           <p><a href=\"{}\">Verify your email</a> (token <code>{}</code>).</p>\n",
          escape(invited_by),
          escape(verify_url),
          escape(verification_token),
        ));
      }
    }

    let steps = self.next_steps();
    if !steps.is_empty() {
      body.push_str("<h3>Next steps</h3>\n<ol>\n");
      for step in steps {
        body.push_str(&format!("<li>{}</li>\n", escape(&step)));
      }
      body.push_str("</ol>\n");
    }
    body.push_str("<p>Office of Student Affairs and Services</p>\n");
    body
  }
}

/// Human form of an application status.
pub fn status_title(status: ApplicationStatus) -> &'static str {
  use ApplicationStatus::*;
  match status {
    Draft => "Draft",
    Submitted => "Submitted",
    UnderVerification => "Under Verification",
    Incomplete => "Incomplete",
    Verified => "Verified",
    UnderEvaluation => "Under Evaluation",
    InterviewScheduled => "Interview Scheduled",
    Approved => "Approved",
    Rejected => "Rejected",
  }
}

/// Message and next steps for an application that just entered `status`.
pub fn status_guidance(status: ApplicationStatus) -> (&'static str, &'static [&'static str]) {
  use ApplicationStatus::*;
  match status {
    Draft => (
      "Your application has been saved as a draft.",
      &["Complete and submit the application before the deadline"],
    ),
    Submitted => (
      "Your application has been received.",
      &["Upload every required document", "Wait for OSAS to start verification"],
    ),
    UnderVerification => (
      "OSAS is verifying your documents.",
      &["Watch for document verification emails"],
    ),
    Incomplete => (
      "Your application is missing information.",
      &["Read the remarks from OSAS", "Resubmit the missing or corrected documents"],
    ),
    Verified => (
      "All of your documents have been verified.",
      &["Wait for the evaluation to begin"],
    ),
    UnderEvaluation => (
      "Your application is being evaluated by the committee.",
      &["Keep an eye out for an interview invitation"],
    ),
    InterviewScheduled => (
      "You have been scheduled for an interview.",
      &["Check the interview email for the time and venue"],
    ),
    Approved => (
      "Congratulations, your scholarship application has been approved.",
      &[
        "Watch for stipend release announcements",
        "Keep your GWA within the renewal requirement",
      ],
    ),
    Rejected => (
      "We regret that your application was not approved.",
      &["You may apply to other open scholarships"],
    ),
  }
}

fn escape(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for ch in raw.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(ch),
    }
  }
  out
}

// ─── Delivery seam ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum MailError {
  #[error("mail queue is closed")]
  QueueClosed,

  #[error("mail transport failed: {0}")]
  Transport(String),
}

/// Outbound mail hook. Sends are fire-and-forget: callers log a failure and
/// carry on.
pub trait Mailer: Send + Sync {
  fn send(&self, mail: Mail) -> Result<(), MailError>;
}

/// Collects mail in memory. Used in tests and for dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryMailer {
  sent: Arc<Mutex<Vec<Mail>>>,
}

impl MemoryMailer {
  pub fn sent(&self) -> Vec<Mail> {
    self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }
}

impl Mailer for MemoryMailer {
  fn send(&self, mail: Mail) -> Result<(), MailError> {
    self.sent.lock().unwrap_or_else(PoisonError::into_inner).push(mail);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn student() -> Recipient {
    Recipient { name: "Ana Reyes".into(), email: "ana@example.edu".into() }
  }

  #[test]
  fn rejected_document_points_to_resubmission() {
    let mail = Mail::DocumentVerification {
      to:                  student(),
      scholarship_name:    "Academic Excellence".into(),
      document_type:       DocumentType::GradeReport,
      file_name:           "grades.pdf".into(),
      verification_status: VerificationStatus::Rejected,
      notes:               Some("Scan is unreadable".into()),
    };
    assert_eq!(mail.subject(), "Document Rejected: Grade Report");
    assert!(mail.next_steps().iter().any(|s| s.contains("Resubmit")));
    let body = mail.html_body();
    assert!(body.contains("<strong>Rejected</strong>"));
    assert!(body.contains("Scan is unreadable"));
  }

  #[test]
  fn status_change_carries_guidance() {
    let mail = Mail::StatusChanged {
      to:               student(),
      scholarship_name: "Economic Aid".into(),
      old_status:       ApplicationStatus::InterviewScheduled,
      new_status:       ApplicationStatus::Approved,
      remarks:          None,
    };
    assert_eq!(mail.kind(), "status_changed");
    assert!(mail.subject().ends_with("is now Approved"));
    assert!(mail.html_body().contains("Congratulations"));
    assert_eq!(mail.next_steps().len(), 2);
  }

  #[test]
  fn bodies_escape_user_text() {
    let mail = Mail::StatusChanged {
      to:               Recipient { name: "<b>x</b>".into(), email: "x@example.edu".into() },
      scholarship_name: "A & B".into(),
      old_status:       ApplicationStatus::Draft,
      new_status:       ApplicationStatus::Submitted,
      remarks:          None,
    };
    let body = mail.html_body();
    assert!(body.contains("&lt;b&gt;x&lt;/b&gt;"));
    assert!(body.contains("A &amp; B"));
  }

  #[test]
  fn memory_mailer_records_sends() {
    let mailer = MemoryMailer::default();
    mailer
      .send(Mail::RenewalReminder {
        to:               student(),
        scholarship_name: "Arts Grant".into(),
        period:           RenewalPeriod {
          semester:      crate::renewal::Semester::First,
          academic_year: 2026,
        },
      })
      .unwrap();
    assert_eq!(mailer.sent().len(), 1);
    assert_eq!(mailer.sent()[0].recipient().email, "ana@example.edu");
  }
}
