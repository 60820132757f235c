use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Unverified,
    Verified,
    Bounced,
    Unsubscribed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Unverified => "unverified",
            EmailStatus::Verified => "verified",
            EmailStatus::Bounced => "bounced",
            EmailStatus::Unsubscribed => "unsubscribed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unverified" => Some(EmailStatus::Unverified),
            "verified" => Some(EmailStatus::Verified),
            "bounced" => Some(EmailStatus::Bounced),
            "unsubscribed" => Some(EmailStatus::Unsubscribed),
            _ => None,
        }
    }

    pub fn can_receive_email(&self) -> bool {
        matches!(self, EmailStatus::Verified)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub email_status: EmailStatus,
    pub last_name: String,
    pub anti_phishing_code: Option<String>,
    /// Active KYC attempt, if any.
    pub kyc_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn can_receive_email(&self) -> bool {
        self.email_status.can_receive_email()
    }
}

/// Localisation preferences used when rendering emails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub language: String,
    /// UTC offset such as `+03:00`.
    pub timezone: String,
}

impl UserDetails {
    pub fn offset(&self) -> FixedOffset {
        self.timezone
            .parse::<FixedOffset>()
            .unwrap_or_else(|_| Utc.fix())
    }
}

impl Default for UserDetails {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            timezone: "+00:00".to_string(),
        }
    }
}
