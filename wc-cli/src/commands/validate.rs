//! Validate command - check widget credentials against the backend.

use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use wc_core::config::SdkConfig;
use wc_core::error::WcResult;
use wc_services::{CredentialValidator, EventBus};

use super::CredentialArgs;
use crate::OutputFormat;

/// Run the validate command.
pub async fn run(config: &SdkConfig, credentials: CredentialArgs, format: OutputFormat) -> WcResult<()> {
    let widget_config = credentials.into_widget_config()?;
    let api = Arc::new(super::create_api_client(config)?);
    let validator = CredentialValidator::new(api, EventBus::new(16));

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Validating bot {}...", widget_config.bot_id));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = validator.validate(&widget_config).await;
    pb.finish_and_clear();

    match format {
        OutputFormat::Json => {
            let json = match &result {
                Ok(creds) => serde_json::json!({
                    "valid": true,
                    "bot_id": creds.bot_id,
                    "account_id": creds.account_id,
                    "validated_at": creds.validated_at.to_rfc3339(),
                }),
                Err(e) => serde_json::json!({
                    "valid": false,
                    "local": e.is_local(),
                    "message": e.user_message(),
                    "error": e.to_string(),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        OutputFormat::Text => match &result {
            Ok(creds) => {
                println!(
                    "  {} Credentials valid for bot {} (account {}).",
                    style("OK").green().bold(),
                    creds.bot_id,
                    creds.account_id
                );
            }
            Err(e) => {
                println!("  {} {}", style("FAIL").red().bold(), e.user_message());
                if e.is_local() {
                    println!("  {}", style(e.to_string()).dim());
                }
            }
        },
    }

    result.map(|_| ()).map_err(Into::into)
}
