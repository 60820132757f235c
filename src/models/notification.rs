use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Info,
    Success,
    Warning,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Info => "info",
            NotificationType::Success => "success",
            NotificationType::Warning => "warning",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "success" => NotificationType::Success,
            "warning" => NotificationType::Warning,
            _ => NotificationType::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Kyc,
    System,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Kyc => "kyc",
            NotificationCategory::System => "system",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "kyc" => NotificationCategory::Kyc,
            _ => NotificationCategory::System,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: u64,
    pub kind: NotificationType,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    /// Id of the record the notification is about, e.g. a KYC id.
    pub entity_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
