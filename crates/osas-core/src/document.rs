//! Uploaded supporting documents and their verification state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// The fixed document catalogue.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentType {
  CertificateOfEnrollment,
  GradeReport,
  CertificateOfGoodMoral,
  IncomeTaxReturn,
  BarangayCertificate,
  BirthCertificate,
  RecommendationLetter,
  IdPhoto,
  Other,
}

impl DocumentType {
  pub fn label(self) -> &'static str {
    match self {
      Self::CertificateOfEnrollment => "Certificate of Enrollment",
      Self::GradeReport => "Grade Report",
      Self::CertificateOfGoodMoral => "Certificate of Good Moral Character",
      Self::IncomeTaxReturn => "Income Tax Return",
      Self::BarangayCertificate => "Barangay Certificate",
      Self::BirthCertificate => "Birth Certificate",
      Self::RecommendationLetter => "Recommendation Letter",
      Self::IdPhoto => "ID Photo",
      Self::Other => "Other Document",
    }
  }
}

/// Documents every renewal must carry.
pub const RENEWAL_REQUIRED_DOCUMENTS: [DocumentType; 2] =
  [DocumentType::GradeReport, DocumentType::CertificateOfEnrollment];

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
pub enum VerificationStatus {
  #[default]
  Pending,
  Verified,
  Rejected,
}

impl VerificationStatus {
  /// Display form used in the verification mail.
  pub fn title(self) -> &'static str {
    match self {
      Self::Pending => "Pending",
      Self::Verified => "Verified",
      Self::Rejected => "Rejected",
    }
  }
}

/// What a document is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DocumentOwner {
  Application(Uuid),
  Renewal(Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub document_id:   Uuid,
  pub owner:         DocumentOwner,
  pub document_type: DocumentType,
  pub file_name:     String,
  /// Key under the configured storage root. Never rewritten once recorded.
  pub storage_path:  String,
  pub mime_type:     String,
  pub size_bytes:    u64,
  /// SHA-256 hex digest of the stored bytes.
  pub content_hash:  String,
  pub status:        VerificationStatus,
  pub verified_by:   Option<Uuid>,
  pub verified_at:   Option<DateTime<Utc>>,
  pub notes:         Option<String>,
  pub uploaded_at:   DateTime<Utc>,
}

/// Metadata for a file already written through
/// [`FileStorage`](crate::storage::FileStorage).
#[derive(Debug, Clone)]
pub struct NewDocument {
  pub document_id:   Uuid,
  pub owner:         DocumentOwner,
  pub document_type: DocumentType,
  pub file_name:     String,
  pub storage_path:  String,
  pub mime_type:     String,
  pub size_bytes:    u64,
  pub content_hash:  String,
}

/// A staff decision on a pending document.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentReview {
  pub decision: VerificationStatus,
  pub notes:    Option<String>,
}

impl DocumentReview {
  /// Only `pending` documents can be reviewed, only into a final state, and
  /// rejections must say why.
  pub fn check(&self, current: VerificationStatus) -> Result<()> {
    if current != VerificationStatus::Pending || self.decision == VerificationStatus::Pending {
      return Err(Error::InvalidState {
        entity: "document",
        from:   current.to_string(),
        to:     self.decision.to_string(),
      });
    }
    if self.decision == VerificationStatus::Rejected
      && self.notes.as_deref().map(str::trim).unwrap_or_default().is_empty()
    {
      return Err(Error::validation("notes", "a rejection must explain what to fix"));
    }
    Ok(())
  }
}

/// Required document types that have no verified upload yet, in catalogue
/// order.
pub fn missing_documents(required: &[DocumentType], documents: &[Document]) -> Vec<DocumentType> {
  let mut missing: Vec<DocumentType> = required
    .iter()
    .copied()
    .filter(|ty| {
      !documents
        .iter()
        .any(|d| d.document_type == *ty && d.status == VerificationStatus::Verified)
    })
    .collect();
  missing.sort();
  missing.dedup();
  missing
}

#[cfg(test)]
mod tests {
  use super::*;

  fn doc(ty: DocumentType, status: VerificationStatus) -> Document {
    Document {
      document_id: Uuid::new_v4(),
      owner: DocumentOwner::Application(Uuid::new_v4()),
      document_type: ty,
      file_name: "scan.pdf".into(),
      storage_path: "documents/scan.pdf".into(),
      mime_type: "application/pdf".into(),
      size_bytes: 10,
      content_hash: String::new(),
      status,
      verified_by: None,
      verified_at: None,
      notes: None,
      uploaded_at: Utc::now(),
    }
  }

  #[test]
  fn readiness_needs_a_verified_copy_of_each_type() {
    let required = [DocumentType::GradeReport, DocumentType::IncomeTaxReturn];
    let docs = vec![
      doc(DocumentType::GradeReport, VerificationStatus::Verified),
      doc(DocumentType::IncomeTaxReturn, VerificationStatus::Rejected),
      doc(DocumentType::IncomeTaxReturn, VerificationStatus::Pending),
    ];
    assert_eq!(missing_documents(&required, &docs), vec![DocumentType::IncomeTaxReturn]);
    assert!(missing_documents(&[], &docs).is_empty());
  }

  #[test]
  fn review_only_from_pending() {
    let review = DocumentReview { decision: VerificationStatus::Verified, notes: None };
    assert!(review.check(VerificationStatus::Pending).is_ok());
    assert!(review.check(VerificationStatus::Verified).is_err());
    assert!(review.check(VerificationStatus::Rejected).is_err());
  }

  #[test]
  fn rejection_requires_notes() {
    let blank = DocumentReview {
      decision: VerificationStatus::Rejected,
      notes:    Some("  ".into()),
    };
    assert!(matches!(
      blank.check(VerificationStatus::Pending),
      Err(Error::Validation { field: "notes", .. })
    ));
  }
}
