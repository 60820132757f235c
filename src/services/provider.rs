use crate::config::ProviderSettings;
use crate::errors::{AppError, Result};
use crate::models::kyc::DocumentBucket;
use crate::models::provider::CustomerRegistrationRequest;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};

/// Outbound calls to the verification provider.
///
/// Implementations hand back the raw response body; classifying it is the
/// workflow's job so the exact bytes can be archived.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn customer_registration(&self, request: &CustomerRegistrationRequest) -> Result<Vec<u8>>;

    async fn document_verification(
        &self,
        user_id: u64,
        registration_id: &str,
        bucket: &DocumentBucket,
    ) -> Result<Vec<u8>>;
}

pub struct HttpProviderClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl HttpProviderClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build provider client: {}", e)))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            client,
        })
    }

    /// Only 2xx bodies are handed back for the caller to classify.
    async fn read_body(action: &str, response: Response) -> Result<Vec<u8>> {
        let status = response.status();
        if status.is_server_error() {
            tracing::error!(section = "provider", action = %action, status = %status);
            return Err(AppError::ProviderUnavailable(format!("{} answered {}", action, status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::ProviderUnavailable(format!("Failed to read {} response: {}", action, e)))?;

        if !status.is_success() {
            tracing::error!(section = "provider", action = %action, status = %status, bytes = body.len());
            return Err(AppError::ProviderRejected(format!(
                "{} answered {}: {}",
                action,
                status,
                String::from_utf8_lossy(&body)
            )));
        }

        tracing::info!(section = "provider", action = %action, status = %status, bytes = body.len());
        Ok(body.to_vec())
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn customer_registration(&self, request: &CustomerRegistrationRequest) -> Result<Vec<u8>> {
        let url = format!("{}/customers/registration", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::ProviderUnavailable(format!("Failed to reach provider: {}", e)))?;

        Self::read_body("customer_registration", response).await
    }

    async fn document_verification(
        &self,
        user_id: u64,
        registration_id: &str,
        bucket: &DocumentBucket,
    ) -> Result<Vec<u8>> {
        let url = format!("{}/customers/{}/documents", self.base_url, registration_id);

        let mut form = Form::new()
            .text("external_user_id", user_id.to_string())
            .text("bucket_type", bucket.bucket_type.as_str())
            .text("document_type", bucket.document_kind.as_str());

        for file in &bucket.files {
            let part = Part::bytes(file.data.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.content_type)
                .map_err(|e| AppError::InternalError(format!("Invalid content type {}: {}", file.content_type, e)))?;
            form = form.part("files", part);
        }

        let response = self
            .client
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::ProviderUnavailable(format!("Failed to reach provider: {}", e)))?;

        Self::read_body("document_verification", response).await
    }
}
