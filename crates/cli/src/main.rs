//! rolectx CLI — the main entry point.
//!
//! Commands:
//! - `tones`    — List the tone catalog
//! - `roles`    — List roles, optionally filtered
//! - `role`     — Show one role
//! - `compose`  — Build the system prompt for a role
//! - `config`   — Show the effective configuration

use clap::{Parser, Subcommand};
use rolectx_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "rolectx",
    about = "rolectx — role-specific context and prompt composition",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tone catalog
    Tones,

    /// List roles in registration order
    Roles {
        /// Only roles tagged with this domain
        #[arg(short, long)]
        domain: Option<String>,

        /// Only roles using this tone
        #[arg(short, long)]
        tone: Option<String>,
    },

    /// Show one role as JSON
    Role {
        /// Role id (e.g. "financial-advisor")
        id: String,
    },

    /// Compose the system prompt for a role
    Compose {
        /// Role id
        #[arg(short, long)]
        role: String,

        /// Memory to seed and include, as scope:key=value (repeatable)
        #[arg(short = 'm', long = "remember", value_name = "SCOPE:KEY=VALUE")]
        remember: Vec<String>,

        /// Print the resolved context as JSON after the prompt
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration as TOML
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let loaded = AppConfig::load();

    // Initialize tracing
    let verbose = cli.verbose || loaded.as_ref().is_ok_and(|c| c.debug);
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    if let Commands::Config { default: true } = cli.command {
        return commands::config_cmd::show_default();
    }

    let config = loaded.map_err(|e| format!("Failed to load config: {e}"))?;

    match cli.command {
        Commands::Tones => commands::tones::run(&config).await?,
        Commands::Roles { domain, tone } => commands::roles::list(&config, domain, tone).await?,
        Commands::Role { id } => commands::roles::show(&config, &id).await?,
        Commands::Compose {
            role,
            remember,
            json,
        } => commands::compose::run(&config, &role, &remember, json).await?,
        Commands::Config { .. } => commands::config_cmd::show(&config)?,
    }

    Ok(())
}
