//! groq-relay - Minimal chat completion relay for the Groq API
//!
//! A small proxy that injects the Groq API key and forwards chat completion
//! requests, relaying buffered JSON or streamed SSE bytes back to the caller.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use groq_relay::config::{Config, KeySource};
use groq_relay::proxy::run_server;

#[derive(Parser)]
#[command(name = "groq-relay")]
#[command(about = "Minimal reverse proxy that relays chat completions to the Groq API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server (default)
    Serve {
        /// Path to an optional TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration and exit
    Check {
        /// Path to an optional TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local development convenience; a missing .env is fine
    let dotenv_path = dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "groq_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(path) = dotenv_path {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve {
        config: None,
        listen: None,
    });

    match command {
        Commands::Serve { config, listen } => {
            let (mut config, key_source) = load_config(config.as_deref())?;

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }

            tracing::info!(key_source = %key_source, "Resolved upstream API key");
            run_server(config).await
        }

        Commands::Check { config } => {
            let (config, key_source) = load_config(config.as_deref())?;
            print_summary(&config, &key_source);
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<(Config, KeySource)> {
    match path {
        Some(path) => tracing::info!(config = %path.display(), "Loading configuration"),
        None => tracing::info!("No config file given, using defaults and environment"),
    }

    Config::load(path).map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e.into()
    })
}

fn print_summary(config: &Config, key_source: &KeySource) {
    println!("Configuration OK");
    println!("  listen:   {}", config.server.listen);
    println!("  upstream: {}", config.upstream.url);
    println!("  timeout:  {}s", config.upstream.timeout.as_secs());
    println!("  api key:  {} ({})", config.upstream.api_key, key_source);
}
