use crate::errors::{AppError, Result};
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_MAX_KYC_FILES_SIZE: u64 = 20 * 1024 * 1024;

/// Name of the flag that turns on the selfie bucket in step two.
pub const KYC_SELFIE_FLAG: &str = "kyc.selfie";

/// Feature flags read from the comma separated `FEATURE_FLAGS` variable.
#[derive(Debug, Clone, Default)]
pub struct FeatureFlags {
    enabled: HashSet<String>,
}

impl FeatureFlags {
    pub fn parse(raw: &str) -> Self {
        Self {
            enabled: raw
                .split(',')
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    pub fn with(mut self, flag: &str) -> Self {
        self.enabled.insert(flag.to_lowercase());
        self
    }

    pub fn is_enabled(&self, flag: &str) -> bool {
        self.enabled.contains(&flag.to_lowercase())
    }

    pub fn selfie_enabled(&self) -> bool {
        self.is_enabled(KYC_SELFIE_FLAG)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub operations_email: String,
}

/// Limits and flags the KYC workflow consults on every request.
#[derive(Debug, Clone)]
pub struct KycSettings {
    /// Per-file cap for step two, total cap for step three.
    pub max_kyc_files_size: u64,
    pub features: FeatureFlags,
}

impl KycSettings {
    pub fn max_files_size_mb(&self) -> u64 {
        self.max_kyc_files_size / (1024 * 1024)
    }

    /// Upper bound for a whole multipart body: identity, selfie and form overhead.
    pub fn max_request_body_size(&self) -> usize {
        (self.max_kyc_files_size as usize)
            .saturating_mul(3)
            .saturating_add(1024 * 1024)
    }
}

impl Default for KycSettings {
    fn default() -> Self {
        Self {
            max_kyc_files_size: DEFAULT_MAX_KYC_FILES_SIZE,
            features: FeatureFlags::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: String,
    pub port: u16,
    pub jwt_secret: String,
    pub callback_secret: Option<String>,
    pub rate_limit_per_sec: u64,
    pub provider: ProviderSettings,
    pub smtp: SmtpSettings,
    pub kyc: KycSettings,
}

impl Settings {
    /// Reads settings from the process environment. Call `dotenv` first to pick up `.env`.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::ConfigError("JWT_SECRET must be set".to_string()))?;

        Ok(Self {
            database_path: env_or("DATABASE_PATH", "kyc.db"),
            port: parse_env("PORT", 8080)?,
            jwt_secret,
            callback_secret: std::env::var("CALLBACK_SECRET").ok().filter(|s| !s.is_empty()),
            rate_limit_per_sec: parse_env("RATE_LIMIT_PER_SEC", 5)?,
            provider: ProviderSettings {
                base_url: env_or("PROVIDER_BASE_URL", "https://api.kyc-provider.example/v1"),
                api_key: env_or("PROVIDER_API_KEY", ""),
                timeout: Duration::from_secs(parse_env("PROVIDER_TIMEOUT_SECS", 30)?),
            },
            smtp: SmtpSettings {
                host: env_or("SMTP_HOST", "localhost"),
                port: parse_env("SMTP_PORT", 587)?,
                username: env_or("SMTP_USERNAME", ""),
                password: env_or("SMTP_PASSWORD", ""),
                from_email: env_or("FROM_EMAIL", "noreply@example.com"),
                operations_email: env_or("OPERATIONS_EMAIL", "kyc-review@example.com"),
            },
            kyc: KycSettings {
                max_kyc_files_size: parse_env("MAX_KYC_FILES_SIZE", DEFAULT_MAX_KYC_FILES_SIZE)?,
                features: FeatureFlags::parse(&env_or("FEATURE_FLAGS", "")),
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::ConfigError(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}
