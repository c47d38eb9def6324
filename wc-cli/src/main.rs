//! WidgetChat CLI - command-line harness for the WidgetChat SDK.
//!
//! Validates widget credentials, opens a live session and streams its
//! events, previews themes, and manages the SDK config file. Useful for
//! checking a backend deployment without embedding the SDK in an app.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use wc_core::config::SdkConfig;
use wc_core::constants;
use wc_core::error::WcResult;
use wc_core::logging;

/// WidgetChat - embeddable chat widget SDK.
#[derive(Parser)]
#[command(
    name = "widgetchat",
    version,
    about = "WidgetChat SDK command-line harness",
    long_about = "A command-line harness for the WidgetChat SDK.\n\
                  Validate widget credentials, run a live chat session and preview themes."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable.
    Status,
    /// Validate widget credentials against the backend.
    Validate {
        #[command(flatten)]
        credentials: commands::CredentialArgs,
    },
    /// Initialize a session, stream its events and send typed lines.
    Connect {
        #[command(flatten)]
        credentials: commands::CredentialArgs,
        /// Resume an existing conversation instead of starting a new one.
        #[arg(long)]
        conversation: Option<String>,
        /// Theme file (TOML) to apply before the session starts.
        #[arg(long)]
        theme: Option<PathBuf>,
    },
    /// Inspect widget themes.
    Theme {
        #[command(subcommand)]
        action: commands::theme::ThemeAction,
    },
    /// View and modify the SDK configuration file.
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> WcResult<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => SdkConfig::default_config_path()?,
    };
    let config = if config_path.exists() {
        SdkConfig::load_from_file(&config_path)?
    } else {
        SdkConfig::default()
    };

    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let log_dir = config
        .effective_log_dir()
        .unwrap_or_else(|_| PathBuf::from("logs"));
    let _guard = logging::init_logging(&log_level, &log_dir, config.logging.json_output)?;

    info!("{} CLI v{}", constants::APP_NAME, constants::SDK_VERSION);

    match cli.command {
        Commands::Status => commands::status::run(&config, cli.format).await,
        Commands::Validate { credentials } => {
            commands::validate::run(&config, credentials, cli.format).await
        }
        Commands::Connect {
            credentials,
            conversation,
            theme,
        } => commands::connect::run(&config, credentials, conversation, theme).await,
        Commands::Theme { action } => commands::theme::run(action, cli.format),
        Commands::Config { action } => {
            commands::config::run(config, &config_path, action, cli.format)
        }
    }
}
