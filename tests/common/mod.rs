#![allow(dead_code)]

use async_trait::async_trait;
use kyc_backend::api::{build_router, AppState};
use kyc_backend::config::{FeatureFlags, KycSettings};
use kyc_backend::database::sqlite::SqliteDatabase;
use kyc_backend::errors::{AppError, Result};
use kyc_backend::models::kyc::{DocumentBucket, DocumentType, KycFile};
use kyc_backend::models::provider::{CustomerRegistrationRequest, RegistrationSubmission};
use kyc_backend::models::user::{EmailStatus, User, UserDetails};
use kyc_backend::services::auth::AuthService;
use kyc_backend::services::kyc_service::KycService;
use kyc_backend::services::mailer::Mailer;
use kyc_backend::services::notification_service::NotificationService;
use kyc_backend::services::provider::ProviderClient;
use kyc_backend::services::user_service::UserService;
use kyc_backend::utils::middleware::RateLimiter;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const JWT_SECRET: &str = "test-secret";
pub const MB: u64 = 1024 * 1024;

pub enum Reply {
    Body(String),
    Unavailable,
}

impl Reply {
    pub fn json(body: &str) -> Self {
        Reply::Body(body.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub registration_id: String,
    pub bucket_type: DocumentType,
    pub file_names: Vec<String>,
}

/// Provider double answering from queued replies.
#[derive(Default)]
pub struct ScriptedProvider {
    registrations: Mutex<VecDeque<Reply>>,
    documents: Mutex<VecDeque<Reply>>,
    pub registration_requests: Mutex<Vec<CustomerRegistrationRequest>>,
    pub uploads: Mutex<Vec<RecordedUpload>>,
}

impl ScriptedProvider {
    pub fn on_registration(&self, reply: Reply) {
        self.registrations.lock().unwrap().push_back(reply);
    }

    pub fn on_documents(&self, reply: Reply) {
        self.documents.lock().unwrap().push_back(reply);
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    fn answer(queue: &Mutex<VecDeque<Reply>>) -> Result<Vec<u8>> {
        match queue.lock().unwrap().pop_front() {
            Some(Reply::Body(body)) => Ok(body.into_bytes()),
            Some(Reply::Unavailable) => Err(AppError::ProviderUnavailable("connection refused".into())),
            None => panic!("provider called more often than scripted"),
        }
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn customer_registration(&self, request: &CustomerRegistrationRequest) -> Result<Vec<u8>> {
        self.registration_requests.lock().unwrap().push(request.clone());
        Self::answer(&self.registrations)
    }

    async fn document_verification(
        &self,
        _user_id: u64,
        registration_id: &str,
        bucket: &DocumentBucket,
    ) -> Result<Vec<u8>> {
        self.uploads.lock().unwrap().push(RecordedUpload {
            registration_id: registration_id.to_string(),
            bucket_type: bucket.bucket_type,
            file_names: bucket.files.iter().map(|f| f.file_name.clone()).collect(),
        });
        Self::answer(&self.documents)
    }
}

/// Mailer double that remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    pub fail: AtomicBool,
    pub pending: Mutex<Vec<(u64, String)>>,
    pub payment_proofs: Mutex<Vec<(u64, Vec<String>)>>,
}

impl RecordingMailer {
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn payment_proof_count(&self) -> usize {
        self.payment_proofs.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_pending_email(&self, user: &User, details: &UserDetails) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::EmailError("smtp down".into()));
        }
        self.pending.lock().unwrap().push((user.id, details.language.clone()));
        Ok(())
    }

    async fn send_payment_proof_email(&self, user: &User, files: &[KycFile]) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::EmailError("smtp down".into()));
        }
        self.payment_proofs
            .lock()
            .unwrap()
            .push((user.id, files.iter().map(|f| f.file_name.clone()).collect()));
        Ok(())
    }
}

pub struct TestApp {
    _dir: TempDir,
    pub db: Arc<SqliteDatabase>,
    pub provider: Arc<ScriptedProvider>,
    pub mailer: Arc<RecordingMailer>,
    pub notifications: Arc<NotificationService>,
    pub kyc: Arc<KycService>,
    pub settings: KycSettings,
}

impl TestApp {
    pub async fn new(selfie: bool) -> Self {
        Self::with_limit(selfie, 20 * MB).await
    }

    pub async fn with_limit(selfie: bool, max_kyc_files_size: u64) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kyc.db");
        let db = Arc::new(SqliteDatabase::new(path.to_str().unwrap()).await.unwrap());

        let features = if selfie {
            FeatureFlags::default().with("kyc.selfie")
        } else {
            FeatureFlags::default()
        };
        let settings = KycSettings {
            max_kyc_files_size,
            features,
        };

        let provider = Arc::new(ScriptedProvider::default());
        let mailer = Arc::new(RecordingMailer::default());
        let notifications = Arc::new(NotificationService::new(db.clone()));
        let kyc = Arc::new(KycService::new(
            db.clone(),
            provider.clone(),
            mailer.clone(),
            notifications.clone(),
            settings.clone(),
        ));

        Self {
            _dir: dir,
            db,
            provider,
            mailer,
            notifications,
            kyc,
            settings,
        }
    }

    pub fn state(&self, callback_secret: Option<&str>) -> AppState {
        AppState {
            database: self.db.clone(),
            auth: Arc::new(AuthService::new(JWT_SECRET.to_string(), self.db.clone())),
            kyc: self.kyc.clone(),
            notifications: self.notifications.clone(),
            limiter: Arc::new(RateLimiter::per_second(1000)),
            callback_secret: callback_secret.map(str::to_string),
        }
    }

    pub fn router(&self, callback_secret: Option<&str>) -> axum::Router {
        build_router(self.state(callback_secret))
    }

    pub async fn seed_user(&self, id: u64) -> User {
        UserService::new(self.db.clone())
            .create_user(id, &format!("user{}@example.com", id), "Doe", &UserDetails::default())
            .await
            .unwrap()
    }

    pub async fn seed_unverified_user(&self, id: u64) -> User {
        let mut user = self.seed_user(id).await;
        user.email_status = EmailStatus::Unverified;
        self.db.upsert_user(&user).await.unwrap();
        user
    }

    /// Fresh copy of the user, as the auth extractor would load it.
    pub async fn user(&self, id: u64) -> User {
        self.db.get_user_by_id(id).await.unwrap().unwrap()
    }
}

pub fn submission() -> RegistrationSubmission {
    RegistrationSubmission {
        first_name: "A".into(),
        last_name: "Doe".into(),
        date_of_birth: "1990-01-01".into(),
        address: None,
        document: None,
        metadata: None,
    }
}

pub fn png(size: usize) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.resize(size.max(8), 0);
    data
}

pub fn png_file(name: &str, size: usize) -> KycFile {
    KycFile::new(name, "image/png", png(size))
}

pub fn pdf_file(name: &str, size: usize) -> KycFile {
    let mut data = b"%PDF-1.7\n".to_vec();
    data.resize(size.max(9), b' ');
    KycFile::new(name, "application/pdf", data)
}

pub fn registration_ok(id: &str) -> Reply {
    Reply::json(&format!(r#"{{"is_success": true, "registration_id": "{}"}}"#, id))
}

pub fn document_ok(reference_id: &str) -> Reply {
    Reply::json(&format!(r#"[{{"is_success": true, "reference_id": "{}"}}]"#, reference_id))
}

pub fn callback(reference_id: &str, decision: &str) -> Vec<u8> {
    format!(r#"{{"reference_id": "{}", "decision": "{}"}}"#, reference_id, decision).into_bytes()
}
