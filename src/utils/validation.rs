use crate::errors::{AppError, Result};
use crate::models::provider::RegistrationSubmission;
use chrono::{NaiveDate, Utc};
use regex::Regex;

/// How many leading bytes are inspected when sniffing a file type.
pub const SNIFF_LEN: usize = 512;

/// File types accepted for identity documents and payment proofs.
pub const ALLOWED_MIME_TYPES: [&str; 8] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "application/pdf",
    "application/msword",
    "application/octet-stream",
    "image/gif",
    "image/bmp",
];

pub struct Validator;

impl Validator {
    /// Detects a content type from the leading bytes of a file.
    pub fn sniff_mime(data: &[u8]) -> &'static str {
        let head = &data[..data.len().min(SNIFF_LEN)];

        if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
            "image/jpeg"
        } else if head.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            "image/png"
        } else if head.starts_with(b"%PDF-") {
            "application/pdf"
        } else if head.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
            "application/msword"
        } else if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
            "image/gif"
        } else if head.starts_with(b"BM") {
            "image/bmp"
        } else if head.starts_with(b"MZ") {
            "application/x-msdownload"
        } else if head.starts_with(b"PK\x03\x04") {
            "application/zip"
        } else if head.iter().all(|b| !is_binary_byte(*b)) {
            "text/plain"
        } else {
            "application/octet-stream"
        }
    }

    pub fn is_allowed_mime(mime: &str) -> bool {
        ALLOWED_MIME_TYPES.contains(&mime)
    }

    /// Sniffs `data` and returns its type when it may be uploaded.
    pub fn validate_upload(file_name: &str, data: &[u8]) -> Result<&'static str> {
        let mime = Self::sniff_mime(data);
        if !Self::is_allowed_mime(mime) {
            tracing::warn!(section = "validation", action = "reject_mime", file_name = %file_name, mime = %mime);
            return Err(AppError::UnsupportedMime(mime.to_string()));
        }
        Ok(mime)
    }

    pub fn validate_file_size(file_name: &str, size: u64, limit: u64) -> Result<()> {
        if size > limit {
            return Err(AppError::FileTooLarge {
                file_name: file_name.to_string(),
                limit_mb: limit / (1024 * 1024),
            });
        }
        Ok(())
    }

    pub fn validate_name(field: &str, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AppError::ValidationError(format!("{} is required", field)));
        }
        if value.chars().count() > 100 {
            return Err(AppError::ValidationError(format!("{} must be less than 100 characters", field)));
        }

        let name_regex = Regex::new(r"^\p{L}[\p{L}\p{M} '.\-]*$")
            .map_err(|e| AppError::InternalError(format!("Regex error: {}", e)))?;

        if !name_regex.is_match(value) {
            return Err(AppError::ValidationError(format!(
                "{} can only contain letters, spaces, apostrophes, dots and hyphens",
                field
            )));
        }
        Ok(())
    }

    pub fn validate_date_of_birth(raw: &str) -> Result<NaiveDate> {
        let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::ValidationError("date_of_birth must be formatted as YYYY-MM-DD".to_string()))?;

        let earliest = NaiveDate::from_ymd_opt(1900, 1, 1)
            .ok_or_else(|| AppError::InternalError("Invalid earliest birth date".to_string()))?;
        if date < earliest || date > Utc::now().date_naive() {
            return Err(AppError::ValidationError("date_of_birth is out of range".to_string()));
        }
        Ok(date)
    }

    pub fn validate_registration(submission: &RegistrationSubmission) -> Result<()> {
        Self::validate_name("first_name", &submission.first_name)?;
        Self::validate_name("last_name", &submission.last_name)?;
        Self::validate_date_of_birth(&submission.date_of_birth)?;

        if let Some(address) = &submission.address {
            if address.country.trim().len() != 2 {
                return Err(AppError::ValidationError(
                    "address.country must be a two-letter country code".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
