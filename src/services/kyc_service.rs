use crate::config::KycSettings;
use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::kyc::{DocumentBucket, DocumentType, Kyc, KycFile, KycStatus};
use crate::models::provider::{
    CallbackPayload, CustomerRegistrationRequest, DocumentVerificationResponse, RegistrationResponse,
    RegistrationSubmission,
};
use crate::models::user::User;
use crate::services::mailer::Mailer;
use crate::services::notification_service::NotificationService;
use crate::services::provider::ProviderClient;
use crate::utils::validation::Validator;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Drives a user's KYC record through registration, document review and payment proof.
///
/// The service keeps no state between calls. Every status change is a
/// version-checked write, so concurrent requests on the same record resolve
/// to one winner and `StaleState` for the rest.
pub struct KycService {
    database: Arc<SqliteDatabase>,
    provider: Arc<dyn ProviderClient>,
    mailer: Arc<dyn Mailer>,
    notifications: Arc<NotificationService>,
    settings: KycSettings,
}

impl KycService {
    pub fn new(
        database: Arc<SqliteDatabase>,
        provider: Arc<dyn ProviderClient>,
        mailer: Arc<dyn Mailer>,
        notifications: Arc<NotificationService>,
        settings: KycSettings,
    ) -> Self {
        Self {
            database,
            provider,
            mailer,
            notifications,
            settings,
        }
    }

    pub fn settings(&self) -> &KycSettings {
        &self.settings
    }

    /// Step one: sends the user's details to the provider and opens a record.
    pub async fn register(&self, user: &User, ip: &str, submission: RegistrationSubmission) -> Result<Kyc> {
        Validator::validate_registration(&submission)?;

        if let Some(current) = self.current_kyc(user).await? {
            if !current.status.allows_registration() {
                return Err(AppError::StaleState(format!(
                    "KYC {} is {}, registration is closed",
                    current.id, current.status
                )));
            }
        }

        let request = CustomerRegistrationRequest {
            external_user_id: user.id.to_string(),
            ip_address: ip.to_string(),
            submission,
        };
        let body = self.provider.customer_registration(&request).await?;

        let response: RegistrationResponse = serde_json::from_slice(&body).map_err(|e| {
            AppError::ProviderMalformedResponse(format!("Registration response is not valid JSON: {}", e))
        })?;

        let (status, registration_id) = match (response.is_success, response.registration_id()) {
            (true, Some(id)) => (KycStatus::StepOneSuccess, id.to_string()),
            (false, Some(id)) => (KycStatus::StepOneFail, id.to_string()),
            (true, None) => {
                return Err(AppError::ProviderMalformedResponse(
                    "Successful registration without registration_id".to_string(),
                ))
            }
            (false, None) => {
                return Err(AppError::ProviderRejected(
                    response.message.unwrap_or_else(|| "registration refused".to_string()),
                ))
            }
        };

        let raw = String::from_utf8_lossy(&body).into_owned();
        let mut tx = self.database.begin().await?;
        let kyc_id = self
            .database
            .add_or_update_by_registration_id(&mut tx, user.id, &registration_id, status, &raw)
            .await?;
        self.database.link_user_kyc(&mut tx, user.id, user.kyc_id, kyc_id).await?;
        tx.commit().await?;

        let kyc = self.load(kyc_id).await?;
        info!(
            section = "kyc",
            action = "register",
            user_id = user.id,
            kyc_id = kyc.id,
            status = %kyc.status,
            registration_id = %kyc.registration_id
        );

        self.notify_level(&kyc).await;
        Ok(kyc)
    }

    /// Step two: uploads the document buckets and records the provider's references.
    pub async fn submit_documents(&self, user: &User, buckets: Vec<DocumentBucket>) -> Result<Kyc> {
        let kyc = self
            .current_kyc(user)
            .await?
            .ok_or_else(|| AppError::NotFound("No KYC record for user".to_string()))?;

        if kyc.status != KycStatus::StepOneSuccess {
            return Err(AppError::StaleState(format!(
                "KYC {} is {}, documents are not expected",
                kyc.id, kyc.status
            )));
        }

        self.check_buckets(&buckets)?;

        let mut reference_ids = [String::new(), String::new()];
        let mut raw_responses = Vec::with_capacity(buckets.len());
        let mut failed = false;

        for bucket in &buckets {
            let body = self
                .provider
                .document_verification(user.id, &kyc.registration_id, bucket)
                .await?;

            let responses: Vec<DocumentVerificationResponse> = serde_json::from_slice(&body).map_err(|e| {
                AppError::ProviderMalformedResponse(format!(
                    "{} response is not a JSON array: {}",
                    bucket.bucket_type.as_str(),
                    e
                ))
            })?;
            let first = responses.first().ok_or_else(|| {
                AppError::ProviderMalformedResponse(format!("{} response is empty", bucket.bucket_type.as_str()))
            })?;

            match (first.is_success, first.reference_id()) {
                (true, Some(reference_id)) => {
                    reference_ids[bucket.bucket_type.slot()] = reference_id.to_string();
                }
                (_, reference_id) => {
                    if let Some(reference_id) = reference_id {
                        reference_ids[bucket.bucket_type.slot()] = reference_id.to_string();
                    }
                    warn!(
                        section = "kyc",
                        action = "document_rejected",
                        user_id = user.id,
                        kyc_id = kyc.id,
                        bucket = bucket.bucket_type.as_str(),
                        message = first.message.as_deref().unwrap_or("")
                    );
                    failed = true;
                }
            }

            raw_responses.push((bucket.bucket_type.step(), String::from_utf8_lossy(&body).into_owned()));
        }

        let status = if failed { KycStatus::StepTwoFail } else { KycStatus::StepTwoPending };

        let mut tx = self.database.begin().await?;
        self.database
            .update_on_step_two(&mut tx, kyc.id, kyc.version, status, &reference_ids, &raw_responses)
            .await?;
        tx.commit().await?;

        info!(
            section = "kyc",
            action = "submit_documents",
            user_id = user.id,
            kyc_id = kyc.id,
            status = %status,
            buckets = buckets.len()
        );

        if status == KycStatus::StepTwoPending && user.can_receive_email() {
            self.send_pending_email(user, kyc.id).await;
        }

        let kyc = self.load(kyc.id).await?;
        self.notify_level(&kyc).await;
        Ok(kyc)
    }

    /// Step three: forwards the payment proof to operations for manual review.
    pub async fn submit_payment_proof(&self, user: &User, files: Vec<KycFile>) -> Result<Kyc> {
        if files.is_empty() {
            return Err(AppError::ValidationError("At least one document is required".to_string()));
        }

        let total: u64 = files.iter().map(|f| f.size).sum();
        if total > self.settings.max_kyc_files_size {
            return Err(AppError::TotalSizeExceeded {
                total,
                limit_mb: self.settings.max_files_size_mb(),
            });
        }

        let kyc = self
            .current_kyc(user)
            .await?
            .ok_or_else(|| AppError::NotFound("No KYC record for user".to_string()))?;

        if !matches!(kyc.status, KycStatus::Approved | KycStatus::StepThreePending) {
            return Err(AppError::StaleState(format!(
                "KYC {} is {}, payment proof is not expected",
                kyc.id, kyc.status
            )));
        }

        // The email only goes out once the version check has passed; a failed send
        // drops the transaction.
        let mut tx = self.database.begin().await?;
        self.database.update_on_step_three(&mut tx, kyc.id, kyc.version).await?;

        if user.can_receive_email() {
            self.mailer.send_payment_proof_email(user, &files).await.map_err(|e| {
                error!(section = "kyc", action = "payment_proof_email", user_id = user.id, kyc_id = kyc.id, error = %e);
                e
            })?;
        }
        tx.commit().await?;

        info!(
            section = "kyc",
            action = "submit_payment_proof",
            user_id = user.id,
            kyc_id = kyc.id,
            files = files.len(),
            bytes = total
        );

        let updated = self.load(kyc.id).await?;
        if updated.status != kyc.status {
            self.notify_level(&updated).await;
        }
        Ok(updated)
    }

    /// Applies a provider decision. A record that already reached a terminal
    /// status keeps it; the body is archived either way.
    pub async fn handle_callback(&self, raw_body: &[u8]) -> Result<Kyc> {
        let payload: CallbackPayload = serde_json::from_slice(raw_body)
            .map_err(|e| AppError::ProviderMalformedResponse(format!("Callback is not valid JSON: {}", e)))?;

        let decided = payload.decided_status().ok_or_else(|| {
            AppError::ProviderMalformedResponse(format!("Unknown callback decision: {}", payload.decision))
        })?;

        let mut tx = self.database.begin().await?;

        let kyc = self
            .database
            .get_kyc_by_reference_id(&mut tx, &payload.reference_id)
            .await?
            .ok_or_else(|| AppError::UnknownReference(payload.reference_id.clone()))?;

        let user = self
            .database
            .get_user_by_kyc_id(&mut tx, kyc.id)
            .await?
            .ok_or(AppError::UnknownUser(kyc.id))?;

        let status = if kyc.status.is_terminal() {
            kyc.status
        } else if KycStatus::can_transition(Some(kyc.status), decided) {
            decided
        } else {
            return Err(AppError::StaleState(format!(
                "KYC {} is {}, callback decision {} does not apply",
                kyc.id, kyc.status, decided
            )));
        };

        let raw = String::from_utf8_lossy(raw_body).into_owned();
        self.database
            .update_by_callback(&mut tx, kyc.id, kyc.version, kyc.status, status, &raw)
            .await?;
        tx.commit().await?;

        info!(
            section = "kyc",
            action = "callback",
            user_id = user.id,
            kyc_id = kyc.id,
            reference_id = %payload.reference_id,
            decision = %payload.decision,
            from = %kyc.status,
            to = %status
        );

        let updated = self.load(kyc.id).await?;
        if status != kyc.status {
            self.notify_level(&updated).await;
        }
        Ok(updated)
    }

    pub async fn get_status(&self, user: &User) -> Result<Kyc> {
        self.current_kyc(user)
            .await?
            .ok_or_else(|| AppError::NotFound("No KYC record for user".to_string()))
    }

    async fn current_kyc(&self, user: &User) -> Result<Option<Kyc>> {
        match user.kyc_id {
            Some(kyc_id) => self.database.get_kyc_by_id(kyc_id).await,
            None => Ok(None),
        }
    }

    async fn load(&self, kyc_id: i64) -> Result<Kyc> {
        self.database
            .get_kyc_by_id(kyc_id)
            .await?
            .ok_or_else(|| AppError::InternalError(format!("KYC {} vanished after update", kyc_id)))
    }

    fn check_buckets(&self, buckets: &[DocumentBucket]) -> Result<()> {
        let expected: &[DocumentType] = if self.settings.features.selfie_enabled() {
            &[DocumentType::IdentityDocument, DocumentType::Selfie]
        } else {
            &[DocumentType::IdentityDocument]
        };

        if buckets.len() != expected.len() {
            return Err(AppError::InvalidBucketCount {
                expected: expected.len(),
                got: buckets.len(),
            });
        }

        for (bucket, bucket_type) in buckets.iter().zip(expected) {
            if bucket.bucket_type != *bucket_type {
                return Err(AppError::ValidationError(format!(
                    "Expected a {} bucket, got {}",
                    bucket_type.as_str(),
                    bucket.bucket_type.as_str()
                )));
            }
            if bucket.files.is_empty() {
                return Err(AppError::ValidationError(format!(
                    "{} bucket has no files",
                    bucket_type.as_str()
                )));
            }
            for file in &bucket.files {
                if !Validator::is_allowed_mime(&file.content_type) {
                    return Err(AppError::UnsupportedMime(file.content_type.clone()));
                }
                Validator::validate_file_size(&file.file_name, file.size, self.settings.max_kyc_files_size)?;
            }
        }
        Ok(())
    }

    async fn send_pending_email(&self, user: &User, kyc_id: i64) {
        let details = match self.database.get_user_details(user.id).await {
            Ok(details) => details.unwrap_or_default(),
            Err(e) => {
                error!(section = "kyc", action = "pending_email", user_id = user.id, kyc_id = kyc_id, error = %e);
                return;
            }
        };

        if let Err(e) = self.mailer.send_pending_email(user, &details).await {
            error!(section = "kyc", action = "pending_email", user_id = user.id, kyc_id = kyc_id, error = %e);
        }
    }

    async fn notify_level(&self, kyc: &Kyc) {
        if let Err(e) = self.notifications.notify_level(kyc).await {
            warn!(section = "kyc", action = "notify", user_id = kyc.user_id, kyc_id = kyc.id, error = %e);
        }
    }
}

