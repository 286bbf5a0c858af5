//! Config validation CLI tool
//!
//! Validates a chargepoold configuration file and reports any errors.

use chargepool_config::{ConfigError, CURRENT_CONFIG_VERSION};
use chargepool_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a chargepoold configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match chargepool_config::load_config(&config_path) {
        Ok(config) => {
            let pool = &config.pool;
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", CURRENT_CONFIG_VERSION);
            println!("  Model: {}", pool.model);
            println!("  Chargers: {}", pool.chargers);
            println!("  Cost per minute: {}", pool.cost_per_unit);
            println!("  Admin: {}", pool.admin);
            if pool.model == chargepool_api::PricingModel::Reservation {
                println!(
                    "  Reservation window: {}..={} min",
                    pool.window.min_minutes, pool.window.max_minutes
                );
            }

            if !config.accounts.is_empty() {
                println!();
                println!("Accounts:");
                for opening in &config.accounts {
                    println!("  - {}: {}", opening.account, opening.balance);
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver, CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
