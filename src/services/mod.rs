pub mod auth;
pub mod jwt;
pub mod kyc_service;
pub mod mailer;
pub mod notification_service;
pub mod provider;
pub mod user_service;
