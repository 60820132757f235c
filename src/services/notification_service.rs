use crate::database::sqlite::SqliteDatabase;
use crate::errors::Result;
use crate::models::kyc::{Kyc, KycStatus};
use crate::models::notification::{Notification, NotificationCategory, NotificationType};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// In-app notifications. Stored in SQLite and listed through the API.
pub struct NotificationService {
    database: Arc<SqliteDatabase>,
}

impl NotificationService {
    pub fn new(database: Arc<SqliteDatabase>) -> Self {
        Self { database }
    }

    pub async fn notify(
        &self,
        user_id: u64,
        kind: NotificationType,
        title: &str,
        body: &str,
        category: NotificationCategory,
        entity_id: Option<i64>,
    ) -> Result<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title: title.to_string(),
            body: body.to_string(),
            category,
            entity_id,
            is_read: false,
            created_at: Utc::now(),
        };

        self.database.store_notification(&notification).await?;

        tracing::info!(
            section = "notification",
            action = "stored",
            user_id = user_id,
            kind = notification.kind.as_str(),
            title = %notification.title
        );
        Ok(notification)
    }

    /// Tells the user which verification level the record puts them at.
    pub async fn notify_level(&self, kyc: &Kyc) -> Result<Notification> {
        let level = kyc.status.level();
        let kind = match kyc.status {
            KycStatus::StepOneFail | KycStatus::StepTwoFail | KycStatus::Rejected => NotificationType::Warning,
            KycStatus::Approved | KycStatus::StepThreePending => NotificationType::Success,
            _ => NotificationType::Info,
        };
        let title = format!("Verification level {}", level);
        let body = match kyc.status {
            KycStatus::StepOneSuccess => "Your details were accepted. Please upload your identity documents.".to_string(),
            KycStatus::StepOneFail => "We could not verify your details. Please check them and try again.".to_string(),
            KycStatus::StepTwoPending => "Your documents are under review.".to_string(),
            KycStatus::StepTwoFail => "We could not verify your documents. Please register again.".to_string(),
            KycStatus::Approved => "Your identity has been verified.".to_string(),
            KycStatus::Rejected => "Your verification was declined. You may register again.".to_string(),
            KycStatus::StepThreePending => "Your payment proof is under review.".to_string(),
        };

        self.notify(kyc.user_id, kind, &title, &body, NotificationCategory::Kyc, Some(kyc.id))
            .await
    }

    pub async fn get_user_notifications(&self, user_id: u64, limit: Option<i64>) -> Result<Vec<Notification>> {
        self.database.get_user_notifications(user_id, limit).await
    }

    pub async fn mark_notification_read(&self, user_id: u64, notification_id: &Uuid) -> Result<bool> {
        self.database.mark_notification_read(user_id, notification_id).await
    }
}
