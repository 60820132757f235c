use crate::models::kyc::{Kyc, KycStatus};
use crate::models::notification::{Notification, NotificationCategory, NotificationType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct KycResponse {
    pub id: i64,
    pub status: KycStatus,
    /// Verification level derived from the status.
    pub level: u8,
    pub registration_id: String,
    /// Identity-document reference first, selfie reference second. Empty when unassigned.
    pub reference_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Kyc> for KycResponse {
    fn from(kyc: Kyc) -> Self {
        Self {
            id: kyc.id,
            level: kyc.status.level(),
            status: kyc.status,
            registration_id: kyc.registration_id,
            reference_ids: kyc.reference_ids.to_vec(),
            created_at: kyc.created_at,
            updated_at: kyc.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationItem {
    pub id: Uuid,
    pub kind: NotificationType,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    pub entity_id: Option<i64>,
    pub date: DateTime<Utc>,
    pub status: String,
}

impl From<Notification> for NotificationItem {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind,
            category: n.category,
            title: n.title,
            message: n.body,
            entity_id: n.entity_id,
            date: n.created_at,
            status: if n.is_read { "Read".to_string() } else { "Unread".to_string() },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    pub notifications: Vec<NotificationItem>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationQuery {
    /// Maximum number of notifications, newest first. Defaults to 50.
    pub limit: Option<i64>,
}

/// Multipart body of `POST /api/kyc/documents`, documented for the API reference only.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct DocumentsUpload {
    /// One of `passport`, `id_card`, `driving_license`, `residence_permit`.
    pub document_type: String,
    #[schema(value_type = String, format = Binary)]
    pub document: Vec<u8>,
    /// Required when the selfie step is enabled, ignored otherwise.
    #[schema(value_type = Option<String>, format = Binary)]
    pub selfie: Option<Vec<u8>>,
}

/// Multipart body of `POST /api/kyc/payment-proof`. Repeat `document` for several files.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct PaymentProofUpload {
    #[schema(value_type = Vec<String>)]
    pub document: Vec<Vec<u8>>,
}
