//! Payloads exchanged with the verification provider.

use crate::models::kyc::KycStatus;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub country: String,
    pub city: String,
    pub street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentMetadata {
    pub number: String,
    pub issuing_country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
}

/// Step-one data entered by the user. Relayed to the provider as-is.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistrationSubmission {
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentMetadata>,
    /// Extra provider-specific fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

/// Body of the outbound customer-registration call.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerRegistrationRequest {
    pub external_user_id: String,
    pub ip_address: String,
    #[serde(flatten)]
    pub submission: RegistrationSubmission,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationResponse {
    #[serde(default)]
    pub is_success: bool,
    #[serde(default)]
    pub registration_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RegistrationResponse {
    pub fn registration_id(&self) -> Option<&str> {
        self.registration_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

/// One element of the array returned by a document upload.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentVerificationResponse {
    #[serde(default)]
    pub is_success: bool,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl DocumentVerificationResponse {
    pub fn reference_id(&self) -> Option<&str> {
        self.reference_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CallbackPayload {
    pub reference_id: String,
    pub decision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CallbackPayload {
    /// Final status the provider decided on, or `None` for an unknown decision.
    pub fn decided_status(&self) -> Option<KycStatus> {
        match self.decision.trim().to_lowercase().as_str() {
            "approved" | "accepted" => Some(KycStatus::Approved),
            "rejected" | "declined" => Some(KycStatus::Rejected),
            "failed" | "error" | "resubmission_requested" => Some(KycStatus::StepTwoFail),
            _ => None,
        }
    }
}
