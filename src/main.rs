use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use urlwarden::config::Config;
use urlwarden::credentials::CredentialRotator;
use urlwarden::scan::{normalize, Scanner};

/// urlwarden: check a URL against several threat-intelligence services at once.
///
/// Fans each scan out to VirusTotal, Google Safe Browsing, AbuseIPDB,
/// Web of Trust and Yandex Safe Browsing, and merges their answers into one
/// verdict. Provider keys stay on the server side.
#[derive(Parser)]
#[command(name = "urlwarden", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (POST /api/scan)
    #[cfg(feature = "web")]
    Serve {
        /// Port to listen on (default: URLWARDEN_PORT or 3002)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (default: URLWARDEN_BIND or 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Scan a single URL and print the verdict
    Scan {
        /// The URL to check (e.g. https://example.com/login)
        url: String,

        /// Print the normalized verdict as JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// Show configured providers, key presence and quota usage
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("urlwarden=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            config.require_any_key()?;
            let (scanner, rotator) = build_scanner(&config)?;
            let port = port.unwrap_or(config.port);
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            info!(
                services = ?scanner.services(),
                "Starting urlwarden API"
            );
            urlwarden::web::run_server(config, Arc::new(scanner), rotator, port, &bind).await?;
        }

        Commands::Scan { url, json } => {
            let config = Config::load()?;
            let (scanner, _rotator) = build_scanner(&config)?;

            if !json {
                println!("Scanning {} across {} services...", url, scanner.services().len());
            }
            let report = scanner.aggregate(&url).await?;
            let verdict = normalize(&report);

            if json {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else {
                urlwarden::output::terminal::display_verdict(&verdict);
            }

            if !verdict.overall_safe {
                // Exit code 2 marks an unsafe verdict.
                std::process::exit(2);
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            let rotator = CredentialRotator::with_system_clock(config.credential_keys());
            println!("{}", "urlwarden status".bold());
            println!();
            urlwarden::status::show(&config, &rotator);
        }
    }

    Ok(())
}

/// Build the shared credential rotator and the scanner that draws from it.
fn build_scanner(config: &Config) -> Result<(Scanner, Arc<CredentialRotator>)> {
    let rotator = Arc::new(CredentialRotator::with_system_clock(
        config.credential_keys(),
    ));
    let scanner = Scanner::from_config(config, Arc::clone(&rotator))?;
    Ok((scanner, rotator))
}
