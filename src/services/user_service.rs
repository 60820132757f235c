use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::user::{EmailStatus, User, UserDetails};
use crate::utils::crypto::generate_anti_phishing_code;
use chrono::Utc;
use regex::Regex;
use std::sync::Arc;

/// Account seeding used by the operator CLI. Users are owned by the main
/// platform; this service only keeps the fields the KYC flow needs.
pub struct UserService {
    pub db: Arc<SqliteDatabase>,
}

impl UserService {
    pub fn new(db: Arc<SqliteDatabase>) -> Self {
        Self { db }
    }

    pub async fn create_user(
        &self,
        id: u64,
        email: &str,
        last_name: &str,
        details: &UserDetails,
    ) -> Result<User> {
        let email_regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .map_err(|e| AppError::InternalError(format!("Regex error: {}", e)))?;
        if !email_regex.is_match(email) {
            return Err(AppError::ValidationError("Invalid email format".to_string()));
        }

        let existing = self.db.get_user_by_id(id).await?;
        let now = Utc::now();
        let user = User {
            id,
            email: email.to_string(),
            email_status: EmailStatus::Verified,
            last_name: last_name.to_string(),
            anti_phishing_code: Some(generate_anti_phishing_code()),
            kyc_id: existing.as_ref().and_then(|u| u.kyc_id),
            created_at: existing.as_ref().map(|u| u.created_at).unwrap_or(now),
            updated_at: now,
        };

        self.db.upsert_user(&user).await?;
        self.db.set_user_details(id, details).await?;

        tracing::info!(section = "user", action = "seeded", user_id = id);
        Ok(user)
    }

    pub async fn get_user(&self, id: u64) -> Result<User> {
        self.db
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))
    }
}
