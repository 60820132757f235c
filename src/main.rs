use colored::Colorize;
use kyc_backend::api;
use kyc_backend::cli::{self, CLI};
use kyc_backend::config::Settings;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().flatten_event(true))
        .init();
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    if let Err(e) = run().await {
        CLI::print_error(&format!("Application error: {}", e));
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("serve");

    if command == "help" {
        CLI::print_header();
        CLI::print_help();
        return Ok(());
    }

    let settings = Settings::from_env()?;
    let rest = args.get(2..).unwrap_or_default();

    match command {
        "serve" => {
            println!("🚀 HTTP API listening on port {}", settings.port.to_string().green());
            println!("📚 API documentation at /api/redoc");
            api::start_http_server(settings).await?;
        }
        "create-user" => cli::handle_create_user_command(&settings, rest).await?,
        "issue-token" => cli::handle_issue_token_command(&settings, rest).await?,
        "status" => cli::handle_status_command(&settings, rest).await?,
        _ => {
            println!("{}", "Unknown command. Use 'help' to see available commands.".red());
        }
    }

    Ok(())
}
