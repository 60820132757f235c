use crate::errors::{AppError, Result};
use crate::models::kyc::{Kyc, KycStatus, KycStep, RawResponse};
use crate::models::notification::{Notification, NotificationCategory, NotificationType};
use crate::models::user::{EmailStatus, User, UserDetails};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

const KYC_COLUMNS: &str = "id, user_id, registration_id, reference_id_1, reference_id_2, status, version, created_at, updated_at";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const USER_COLUMNS: &str = "id, email, email_status, last_name, anti_phishing_code, kyc_id, created_at, updated_at";

/// SQLite-backed store for users, KYC records, raw provider bodies and notifications.
///
/// Every status change goes through a compare-and-set on `(version, status)`, so two
/// writers racing on the same KYC row cannot both win; the loser gets `StaleState`.
///
/// Reads use `pool`. All writes go through `writer`, a single connection, so write
/// transactions queue behind each other instead of failing with `SQLITE_BUSY`.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
    writer: SqlitePool,
}

impl SqliteDatabase {
    pub async fn new(database_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::DatabaseError(format!("Failed to create database directory: {}", e)))?;
        }

        if !Path::new(database_path).exists() {
            std::fs::File::create(database_path)
                .map_err(|e| AppError::DatabaseError(format!("Failed to create database file: {}", e)))?;
            tracing::info!(section = "database", action = "create_file", path = %database_path);
        }
        let database_url = format!("sqlite:{}", database_path);

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| AppError::DatabaseError(format!("Invalid database path: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to database: {}", e)))?;

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to database: {}", e)))?;

        let db = Self { pool, writer };
        db.create_tables().await?;

        tracing::info!(section = "database", action = "connected", path = %database_path);
        Ok(db)
    }

    async fn create_tables(&self) -> Result<()> {
        let query = r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL,
                email_status TEXT NOT NULL DEFAULT 'unverified',
                last_name TEXT NOT NULL,
                anti_phishing_code TEXT,
                kyc_id INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_details (
                user_id INTEGER PRIMARY KEY,
                language TEXT NOT NULL DEFAULT 'en',
                timezone TEXT NOT NULL DEFAULT '+00:00',
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS kyc (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                registration_id TEXT NOT NULL,
                reference_id_1 TEXT NOT NULL DEFAULT '',
                reference_id_2 TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kyc_raw_responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kyc_id INTEGER NOT NULL,
                step TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (kyc_id) REFERENCES kyc (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                category TEXT NOT NULL,
                entity_id INTEGER,
                is_read BOOLEAN DEFAULT FALSE,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_kyc_id ON users(kyc_id);
            CREATE INDEX IF NOT EXISTS idx_kyc_user_id ON kyc(user_id);
            CREATE INDEX IF NOT EXISTS idx_kyc_registration_id ON kyc(registration_id);
            CREATE INDEX IF NOT EXISTS idx_kyc_reference_id_1 ON kyc(reference_id_1);
            CREATE INDEX IF NOT EXISTS idx_kyc_reference_id_2 ON kyc(reference_id_2);
            CREATE INDEX IF NOT EXISTS idx_raw_responses_kyc_id ON kyc_raw_responses(kyc_id);
            CREATE INDEX IF NOT EXISTS idx_notifications_user_id ON notifications(user_id);
        "#;

        sqlx::query(query)
            .execute(&self.writer)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    /// Opens a write transaction on the writer connection, waiting for any other
    /// one to finish first. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.writer
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))
    }

    // Users

    pub async fn upsert_user(&self, user: &User) -> Result<()> {
        let query = r#"
            INSERT INTO users (id, email, email_status, last_name, anti_phishing_code, kyc_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                email_status = excluded.email_status,
                last_name = excluded.last_name,
                anti_phishing_code = excluded.anti_phishing_code,
                updated_at = excluded.updated_at
        "#;

        sqlx::query(query)
            .bind(user.id as i64)
            .bind(&user.email)
            .bind(user.email_status.as_str())
            .bind(&user.last_name)
            .bind(&user.anti_phishing_code)
            .bind(user.kyc_id)
            .bind(user.created_at.to_rfc3339())
            .bind(user.updated_at.to_rfc3339())
            .execute(&self.writer)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store user: {}", e)))?;

        Ok(())
    }

    pub async fn get_user_by_id(&self, user_id: u64) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(user_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch user: {}", e)))?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Owner of a KYC record, read inside the caller's transaction.
    pub async fn get_user_by_kyc_id(&self, conn: &mut SqliteConnection, kyc_id: i64) -> Result<Option<User>> {
        let query = r#"
            SELECT u.id, u.email, u.email_status, u.last_name, u.anti_phishing_code, u.kyc_id, u.created_at, u.updated_at
            FROM users u
            JOIN kyc k ON k.user_id = u.id
            WHERE k.id = ?1
        "#;

        let row = sqlx::query(query)
            .bind(kyc_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch KYC owner: {}", e)))?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn delete_user(&self, user_id: u64) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(user_id as i64)
            .execute(&self.writer)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete user: {}", e)))?;
        Ok(())
    }

    pub async fn set_user_details(&self, user_id: u64, details: &UserDetails) -> Result<()> {
        let query = r#"
            INSERT INTO user_details (user_id, language, timezone)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET language = excluded.language, timezone = excluded.timezone
        "#;

        sqlx::query(query)
            .bind(user_id as i64)
            .bind(&details.language)
            .bind(&details.timezone)
            .execute(&self.writer)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store user details: {}", e)))?;

        Ok(())
    }

    pub async fn get_user_details(&self, user_id: u64) -> Result<Option<UserDetails>> {
        let row = sqlx::query("SELECT language, timezone FROM user_details WHERE user_id = ?1")
            .bind(user_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch user details: {}", e)))?;

        Ok(row.map(|row| UserDetails {
            language: row.get("language"),
            timezone: row.get("timezone"),
        }))
    }

    /// Points the user at a KYC record, provided it still points where the caller last saw it.
    pub async fn link_user_kyc(
        &self,
        conn: &mut SqliteConnection,
        user_id: u64,
        expected_kyc_id: Option<i64>,
        kyc_id: i64,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE users SET kyc_id = ?1, updated_at = ?2 WHERE id = ?3 AND kyc_id IS ?4")
            .bind(kyc_id)
            .bind(Utc::now().to_rfc3339())
            .bind(user_id as i64)
            .bind(expected_kyc_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to link KYC to user: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::StaleState(format!(
                "user {} no longer points at KYC {:?}",
                user_id, expected_kyc_id
            )));
        }
        Ok(())
    }

    // KYC records

    pub async fn get_kyc_by_id(&self, kyc_id: i64) -> Result<Option<Kyc>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to acquire connection: {}", e)))?;
        self.fetch_kyc_by_id(&mut conn, kyc_id).await
    }

    pub async fn fetch_kyc_by_id(&self, conn: &mut SqliteConnection, kyc_id: i64) -> Result<Option<Kyc>> {
        let query = format!("SELECT {} FROM kyc WHERE id = ?1", KYC_COLUMNS);
        let row = sqlx::query(&query)
            .bind(kyc_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch KYC: {}", e)))?;

        match row {
            Some(row) => Ok(Some(self.hydrate(conn, &row).await?)),
            None => Ok(None),
        }
    }

    /// The record that owns a step-two reference, read inside the caller's transaction.
    pub async fn get_kyc_by_reference_id(&self, conn: &mut SqliteConnection, reference_id: &str) -> Result<Option<Kyc>> {
        if reference_id.is_empty() {
            return Ok(None);
        }
        let query = format!(
            "SELECT {} FROM kyc WHERE reference_id_1 = ?1 OR reference_id_2 = ?1 ORDER BY id DESC LIMIT 1",
            KYC_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(reference_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch KYC by reference: {}", e)))?;

        match row {
            Some(row) => Ok(Some(self.hydrate(conn, &row).await?)),
            None => Ok(None),
        }
    }

    /// Stores a step-one outcome.
    ///
    /// A record of the same user carrying the same `registration_id` that is still in
    /// `StepOneFail` is updated in place; anything else gets a fresh record. Returns the id.
    pub async fn add_or_update_by_registration_id(
        &self,
        conn: &mut SqliteConnection,
        user_id: u64,
        registration_id: &str,
        status: KycStatus,
        raw_body: &str,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let existing = sqlx::query(
            "SELECT id, version FROM kyc WHERE user_id = ?1 AND registration_id = ?2 AND status = ?3 ORDER BY id DESC LIMIT 1",
        )
        .bind(user_id as i64)
        .bind(registration_id)
        .bind(KycStatus::StepOneFail.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to look up registration: {}", e)))?;

        if let Some(row) = existing {
            let kyc_id: i64 = row.get("id");
            let version: i64 = row.get("version");
            self.append_raw_response(conn, kyc_id, KycStep::Registration, raw_body).await?;
            self.compare_and_set_status(conn, kyc_id, version, &[KycStatus::StepOneFail], status)
                .await?;
            return Ok(kyc_id);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO kyc (user_id, registration_id, status, version, created_at, updated_at)
            VALUES (?1, ?2, ?3, 0, ?4, ?4)
            "#,
        )
        .bind(user_id as i64)
        .bind(registration_id)
        .bind(status.as_str())
        .bind(&now)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create KYC: {}", e)))?;

        let kyc_id = result.last_insert_rowid();
        self.append_raw_response(conn, kyc_id, KycStep::Registration, raw_body).await?;
        Ok(kyc_id)
    }

    /// Records the outcome of the document uploads. The record must still be in
    /// `StepOneSuccess` at `expected_version`.
    pub async fn update_on_step_two(
        &self,
        conn: &mut SqliteConnection,
        kyc_id: i64,
        expected_version: i64,
        status: KycStatus,
        reference_ids: &[String; 2],
        raw_responses: &[(KycStep, String)],
    ) -> Result<()> {
        for (step, body) in raw_responses {
            self.append_raw_response(conn, kyc_id, *step, body).await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE kyc
            SET status = ?1, reference_id_1 = ?2, reference_id_2 = ?3, version = version + 1, updated_at = ?4
            WHERE id = ?5 AND version = ?6 AND status = ?7
              AND reference_id_1 = '' AND reference_id_2 = ''
            "#,
        )
        .bind(status.as_str())
        .bind(&reference_ids[0])
        .bind(&reference_ids[1])
        .bind(Utc::now().to_rfc3339())
        .bind(kyc_id)
        .bind(expected_version)
        .bind(KycStatus::StepOneSuccess.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update KYC on step two: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::StaleState(format!("KYC {} left step one concurrently", kyc_id)));
        }
        Ok(())
    }

    /// Moves an approved record to `StepThreePending`, inside the caller's transaction.
    pub async fn update_on_step_three(
        &self,
        conn: &mut SqliteConnection,
        kyc_id: i64,
        expected_version: i64,
    ) -> Result<()> {
        self.compare_and_set_status(
            conn,
            kyc_id,
            expected_version,
            &[KycStatus::Approved, KycStatus::StepThreePending],
            KycStatus::StepThreePending,
        )
        .await
    }

    /// Archives a callback body and applies the provider's decision.
    pub async fn update_by_callback(
        &self,
        conn: &mut SqliteConnection,
        kyc_id: i64,
        expected_version: i64,
        expected_status: KycStatus,
        status: KycStatus,
        raw_body: &str,
    ) -> Result<()> {
        self.append_raw_response(conn, kyc_id, KycStep::Callback, raw_body).await?;
        self.compare_and_set_status(conn, kyc_id, expected_version, &[expected_status], status)
            .await
    }

    pub async fn append_raw_response(
        &self,
        conn: &mut SqliteConnection,
        kyc_id: i64,
        step: KycStep,
        body: &str,
    ) -> Result<()> {
        sqlx::query("INSERT INTO kyc_raw_responses (kyc_id, step, body, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(kyc_id)
            .bind(step.as_str())
            .bind(body)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to archive provider response: {}", e)))?;
        Ok(())
    }

    pub async fn count_raw_responses(&self, kyc_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kyc_raw_responses WHERE kyc_id = ?1")
            .bind(kyc_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count provider responses: {}", e)))?;
        Ok(count)
    }

    pub async fn count_kyc_records(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kyc")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count KYC records: {}", e)))?;
        Ok(count)
    }

    async fn compare_and_set_status(
        &self,
        conn: &mut SqliteConnection,
        kyc_id: i64,
        expected_version: i64,
        expected_statuses: &[KycStatus],
        status: KycStatus,
    ) -> Result<()> {
        let row = sqlx::query("SELECT status, version FROM kyc WHERE id = ?1")
            .bind(kyc_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to read KYC status: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("KYC {}", kyc_id)))?;

        let current = parse_status(&row.get::<String, _>("status"))?;
        let version: i64 = row.get("version");
        if version != expected_version || !expected_statuses.contains(&current) {
            return Err(AppError::StaleState(format!(
                "KYC {} is {} at version {}, expected version {}",
                kyc_id, current, version, expected_version
            )));
        }

        let result = sqlx::query("UPDATE kyc SET status = ?1, version = version + 1, updated_at = ?2 WHERE id = ?3 AND version = ?4")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(kyc_id)
            .bind(expected_version)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update KYC status: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::StaleState(format!("KYC {} changed concurrently", kyc_id)));
        }
        Ok(())
    }

    async fn hydrate(&self, conn: &mut SqliteConnection, row: &SqliteRow) -> Result<Kyc> {
        let mut kyc = kyc_from_row(row)?;
        kyc.raw_responses = self.load_raw_responses(conn, kyc.id).await?;
        Ok(kyc)
    }

    async fn load_raw_responses(&self, conn: &mut SqliteConnection, kyc_id: i64) -> Result<Vec<RawResponse>> {
        let rows = sqlx::query("SELECT step, body, created_at FROM kyc_raw_responses WHERE kyc_id = ?1 ORDER BY id")
            .bind(kyc_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch provider responses: {}", e)))?;

        rows.iter()
            .map(|row| {
                let step: String = row.get("step");
                Ok(RawResponse {
                    step: KycStep::parse(&step)
                        .ok_or_else(|| AppError::DatabaseError(format!("Invalid response step: {}", step)))?,
                    body: row.get("body"),
                    created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
                })
            })
            .collect()
    }

    // Notifications

    pub async fn store_notification(&self, notification: &Notification) -> Result<()> {
        let query = r#"
            INSERT INTO notifications (id, user_id, kind, title, body, category, entity_id, is_read, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#;

        sqlx::query(query)
            .bind(notification.id.to_string())
            .bind(notification.user_id as i64)
            .bind(notification.kind.as_str())
            .bind(&notification.title)
            .bind(&notification.body)
            .bind(notification.category.as_str())
            .bind(notification.entity_id)
            .bind(notification.is_read)
            .bind(notification.created_at.to_rfc3339())
            .execute(&self.writer)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store notification: {}", e)))?;

        Ok(())
    }

    pub async fn get_user_notifications(&self, user_id: u64, limit: Option<i64>) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, kind, title, body, category, entity_id, is_read, created_at
            FROM notifications
            WHERE user_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id as i64)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch notifications: {}", e)))?;

        rows.iter()
            .map(|row| {
                Ok(Notification {
                    id: Uuid::parse_str(&row.get::<String, _>("id"))
                        .map_err(|e| AppError::DatabaseError(format!("Invalid notification ID: {}", e)))?,
                    user_id: row.get::<i64, _>("user_id") as u64,
                    kind: NotificationType::parse(&row.get::<String, _>("kind")),
                    title: row.get("title"),
                    body: row.get("body"),
                    category: NotificationCategory::parse(&row.get::<String, _>("category")),
                    entity_id: row.get("entity_id"),
                    is_read: row.get("is_read"),
                    created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
                })
            })
            .collect()
    }

    pub async fn mark_notification_read(&self, user_id: u64, notification_id: &Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ?1 AND user_id = ?2")
            .bind(notification_id.to_string())
            .bind(user_id as i64)
            .execute(&self.writer)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to mark notification read: {}", e)))?;
        Ok(result.rows_affected() > 0)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::DatabaseError(format!("Invalid timestamp {}: {}", raw, e)))
}

fn parse_status(raw: &str) -> Result<KycStatus> {
    raw.parse().map_err(AppError::DatabaseError)
}

fn kyc_from_row(row: &SqliteRow) -> Result<Kyc> {
    Ok(Kyc {
        id: row.get("id"),
        user_id: row.get::<i64, _>("user_id") as u64,
        registration_id: row.get("registration_id"),
        reference_ids: [row.get("reference_id_1"), row.get("reference_id_2")],
        status: parse_status(&row.get::<String, _>("status"))?,
        version: row.get("version"),
        raw_responses: Vec::new(),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let email_status: String = row.get("email_status");
    Ok(User {
        id: row.get::<i64, _>("id") as u64,
        email: row.get("email"),
        email_status: EmailStatus::parse(&email_status)
            .ok_or_else(|| AppError::DatabaseError(format!("Invalid email status: {}", email_status)))?,
        last_name: row.get("last_name"),
        anti_phishing_code: row.get("anti_phishing_code"),
        kyc_id: row.get("kyc_id"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}
