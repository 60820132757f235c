use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::user::User;
use crate::services::jwt::JwtManager;
use std::sync::Arc;

/// Resolves bearer tokens to stored users.
pub struct AuthService {
    jwt_manager: JwtManager,
    database: Arc<SqliteDatabase>,
}

impl AuthService {
    pub fn new(jwt_secret: String, database: Arc<SqliteDatabase>) -> Self {
        Self {
            jwt_manager: JwtManager::new(jwt_secret),
            database,
        }
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt_manager
    }

    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let user_id = self.jwt_manager.user_id(token)?;
        self.database
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::AuthenticationError("Unknown user".to_string()))
    }
}
