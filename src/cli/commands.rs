use crate::cli::CLI;
use crate::config::Settings;
use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::user::UserDetails;
use crate::services::jwt::JwtManager;
use crate::services::user_service::UserService;
use colored::Colorize;
use std::sync::Arc;

fn parse_user_id(raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .map_err(|_| AppError::ValidationError(format!("Invalid user id: {}", raw)))
}

pub async fn handle_create_user_command(settings: &Settings, args: &[String]) -> Result<()> {
    if args.len() < 3 {
        println!("{}", "Error: Missing required arguments".red().bold());
        println!("Usage: create-user <id> <email> <last_name> [language] [timezone]");
        return Ok(());
    }

    let id = parse_user_id(&args[0])?;
    let defaults = UserDetails::default();
    let details = UserDetails {
        language: args.get(3).cloned().unwrap_or(defaults.language),
        timezone: args.get(4).cloned().unwrap_or(defaults.timezone),
    };

    let db = Arc::new(SqliteDatabase::new(&settings.database_path).await?);
    let user = UserService::new(db).create_user(id, &args[1], &args[2], &details).await?;

    CLI::print_success(&format!("User {} stored", user.id));
    println!("Email: {}", user.email.yellow());
    println!("Language: {}  Timezone: {}", details.language.cyan(), details.timezone.cyan());
    if let Some(code) = &user.anti_phishing_code {
        println!("Anti-phishing code: {}", code.green().bold());
    }
    Ok(())
}

pub async fn handle_issue_token_command(settings: &Settings, args: &[String]) -> Result<()> {
    let Some(raw_id) = args.first() else {
        println!("Usage: issue-token <id>");
        return Ok(());
    };
    let id = parse_user_id(raw_id)?;

    let db = Arc::new(SqliteDatabase::new(&settings.database_path).await?);
    UserService::new(db).get_user(id).await?;

    let token = JwtManager::new(settings.jwt_secret.clone()).generate_token(id)?;
    CLI::print_info(&format!("Bearer token for user {} (valid 24h):", id));
    println!("{}", token);
    Ok(())
}

pub async fn handle_status_command(settings: &Settings, args: &[String]) -> Result<()> {
    let Some(raw_id) = args.first() else {
        println!("Usage: status <id>");
        return Ok(());
    };
    let id = parse_user_id(raw_id)?;

    let db = Arc::new(SqliteDatabase::new(&settings.database_path).await?);
    let user = UserService::new(db.clone()).get_user(id).await?;

    let Some(kyc_id) = user.kyc_id else {
        CLI::print_info(&format!("User {} has not started verification", id));
        return Ok(());
    };
    let kyc = db
        .get_kyc_by_id(kyc_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("KYC {}", kyc_id)))?;

    println!("\n{}", "📋 KYC Record".cyan().bold());
    println!("ID: {}", kyc.id.to_string().yellow());
    println!("Status: {} (level {})", kyc.status.as_str().green(), kyc.status.level());
    println!("Registration: {}", kyc.registration_id);
    for (slot, reference) in ["identity", "selfie"].iter().zip(kyc.reference_ids.iter()) {
        let shown = if reference.is_empty() { "-" } else { reference.as_str() };
        println!("Reference ({}): {}", slot, shown);
    }
    println!("Version: {}", kyc.version);
    println!("Provider responses archived: {}", kyc.raw_responses.len());
    println!("Updated: {}", kyc.updated_at.to_rfc3339());
    Ok(())
}
