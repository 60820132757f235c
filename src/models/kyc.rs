use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Where a KYC record stands in the verification workflow.
///
/// ```text
/// (none)         --register-->       StepOneSuccess | StepOneFail
/// StepOneSuccess --documents-->      StepTwoPending | StepTwoFail
/// StepTwoPending --callback-->       Approved | Rejected | StepTwoFail
/// Approved       --payment proof-->  StepThreePending
/// ```
///
/// `StepOneFail`, `StepTwoFail` and `Rejected` close the record; the user may
/// register again, which opens a fresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    StepOneSuccess,
    StepOneFail,
    StepTwoPending,
    StepTwoFail,
    Approved,
    Rejected,
    StepThreePending,
}

impl KycStatus {
    pub const ALL: [KycStatus; 7] = [
        KycStatus::StepOneSuccess,
        KycStatus::StepOneFail,
        KycStatus::StepTwoPending,
        KycStatus::StepTwoFail,
        KycStatus::Approved,
        KycStatus::Rejected,
        KycStatus::StepThreePending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::StepOneSuccess => "step_one_success",
            KycStatus::StepOneFail => "step_one_fail",
            KycStatus::StepTwoPending => "step_two_pending",
            KycStatus::StepTwoFail => "step_two_fail",
            KycStatus::Approved => "approved",
            KycStatus::Rejected => "rejected",
            KycStatus::StepThreePending => "step_three_pending",
        }
    }

    /// No further transition is possible on this record.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            KycStatus::StepOneFail
                | KycStatus::StepTwoFail
                | KycStatus::Rejected
                | KycStatus::Approved
                | KycStatus::StepThreePending
        )
    }

    /// States from which the user may start a new registration attempt.
    pub fn allows_registration(&self) -> bool {
        matches!(self, KycStatus::StepOneFail | KycStatus::StepTwoFail | KycStatus::Rejected)
    }

    /// Position along the workflow. Never decreases within one record.
    pub fn rank(&self) -> u8 {
        match self {
            KycStatus::StepOneSuccess | KycStatus::StepOneFail => 1,
            KycStatus::StepTwoPending | KycStatus::StepTwoFail => 2,
            KycStatus::Approved | KycStatus::Rejected => 3,
            KycStatus::StepThreePending => 4,
        }
    }

    /// Verification level shown to the user.
    pub fn level(&self) -> u8 {
        match self {
            KycStatus::StepOneFail => 0,
            KycStatus::StepOneSuccess | KycStatus::StepTwoPending | KycStatus::StepTwoFail | KycStatus::Rejected => 1,
            KycStatus::Approved => 2,
            KycStatus::StepThreePending => 3,
        }
    }

    /// Whether `from -> to` is an edge of the workflow. `None` is "no record yet".
    pub fn can_transition(from: Option<KycStatus>, to: KycStatus) -> bool {
        use KycStatus::*;
        match from {
            None => matches!(to, StepOneSuccess | StepOneFail),
            Some(StepOneFail) | Some(StepTwoFail) | Some(Rejected) => {
                matches!(to, StepOneSuccess | StepOneFail)
            }
            Some(StepOneSuccess) => matches!(to, StepTwoPending | StepTwoFail),
            Some(StepTwoPending) => matches!(to, Approved | Rejected | StepTwoFail),
            Some(Approved) => to == StepThreePending,
            Some(StepThreePending) => to == StepThreePending,
        }
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KycStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KycStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown KYC status: {}", s))
    }
}

/// Which workflow step produced an archived provider body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStep {
    Registration,
    IdentityDocument,
    Selfie,
    Callback,
}

impl KycStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStep::Registration => "registration",
            KycStep::IdentityDocument => "identity_document",
            KycStep::Selfie => "selfie",
            KycStep::Callback => "callback",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registration" => Some(KycStep::Registration),
            "identity_document" => Some(KycStep::IdentityDocument),
            "selfie" => Some(KycStep::Selfie),
            "callback" => Some(KycStep::Callback),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResponse {
    pub step: KycStep,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kyc {
    pub id: i64,
    pub user_id: u64,
    pub registration_id: String,
    /// Identity-document slot first, selfie slot second. Empty means unassigned.
    pub reference_ids: [String; 2],
    pub status: KycStatus,
    pub version: i64,
    pub raw_responses: Vec<RawResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Kyc {
    pub fn has_reference(&self, reference_id: &str) -> bool {
        !reference_id.is_empty() && self.reference_ids.iter().any(|r| r == reference_id)
    }

    pub fn raw_responses_for(&self, step: KycStep) -> impl Iterator<Item = &RawResponse> {
        self.raw_responses.iter().filter(move |r| r.step == step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdentityDocument,
    Selfie,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::IdentityDocument => "identity_document",
            DocumentType::Selfie => "selfie",
        }
    }

    /// Index of the reference-id slot filled by this bucket.
    pub fn slot(&self) -> usize {
        match self {
            DocumentType::IdentityDocument => 0,
            DocumentType::Selfie => 1,
        }
    }

    pub fn step(&self) -> KycStep {
        match self {
            DocumentType::IdentityDocument => KycStep::IdentityDocument,
            DocumentType::Selfie => KycStep::Selfie,
        }
    }
}

/// Kind of identity document, taken from the `document_type` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IdentityDocumentKind {
    Passport,
    IdCard,
    DrivingLicense,
    ResidencePermit,
}

impl IdentityDocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityDocumentKind::Passport => "passport",
            IdentityDocumentKind::IdCard => "id_card",
            IdentityDocumentKind::DrivingLicense => "driving_license",
            IdentityDocumentKind::ResidencePermit => "residence_permit",
        }
    }
}

impl FromStr for IdentityDocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "passport" => Ok(IdentityDocumentKind::Passport),
            "id_card" | "national_id" => Ok(IdentityDocumentKind::IdCard),
            "driving_license" | "drivers_license" => Ok(IdentityDocumentKind::DrivingLicense),
            "residence_permit" => Ok(IdentityDocumentKind::ResidencePermit),
            other => Err(format!("unsupported document type: {}", other)),
        }
    }
}

/// An uploaded file, already sniffed and size-checked by the edge.
#[derive(Clone, PartialEq, Eq)]
pub struct KycFile {
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub data: Vec<u8>,
}

impl KycFile {
    pub fn new(file_name: &str, content_type: &str, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_lowercase(),
            content_type: content_type.to_string(),
            size: data.len() as u64,
            data,
        }
    }
}

impl fmt::Debug for KycFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KycFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish()
    }
}

/// A typed set of files sent to the provider in one step-two call.
#[derive(Debug, Clone)]
pub struct DocumentBucket {
    pub bucket_type: DocumentType,
    pub document_kind: IdentityDocumentKind,
    pub files: Vec<KycFile>,
}

impl DocumentBucket {
    pub fn identity(document_kind: IdentityDocumentKind, document: KycFile) -> Self {
        Self {
            bucket_type: DocumentType::IdentityDocument,
            document_kind,
            files: vec![document],
        }
    }

    /// The provider matches the face against the document, so the selfie
    /// bucket always ships the identity document alongside the selfie.
    pub fn selfie(document_kind: IdentityDocumentKind, selfie: KycFile, document: KycFile) -> Self {
        Self {
            bucket_type: DocumentType::Selfie,
            document_kind,
            files: vec![selfie, document],
        }
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}
