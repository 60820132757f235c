pub mod kyc;
pub mod notification;
pub mod provider;
pub mod user;
