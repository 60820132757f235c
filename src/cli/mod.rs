mod commands;
pub use commands::*;

use colored::Colorize;

pub struct CLI;

impl CLI {
    pub fn print_header() {
        println!("{}", "=".repeat(50).bright_blue());
        println!("{}", "        KYC Backend - Operator Console        ".bright_yellow().bold());
        println!("{}", "=".repeat(50).bright_blue());
        println!();
    }

    pub fn print_success(message: &str) {
        println!("{} {}", "✅".green(), message.green());
    }

    pub fn print_error(message: &str) {
        eprintln!("{} {}", "❌".red(), message.red());
    }

    pub fn print_info(message: &str) {
        println!("{} {}", "ℹ️".blue(), message.blue());
    }

    pub fn print_help() {
        println!("\n{}", "Available Commands:".cyan().bold());
        println!("  serve");
        println!("    Run the HTTP API (default when no command is given)");
        println!();
        println!("  create-user <id> <email> <last_name> [language] [timezone]");
        println!("    Seed a verified user, e.g. create-user 42 jane@example.com Doe fr +01:00");
        println!();
        println!("  issue-token <id>");
        println!("    Print a 24h bearer token for the user");
        println!();
        println!("  status <id>");
        println!("    Show the user's current KYC record");
        println!();
        println!("  help");
        println!("    Show this help message");
        println!();
    }
}
