//! Status command - check that the backend answers.

use console::style;

use wc_core::config::SdkConfig;
use wc_core::error::WcResult;

use crate::OutputFormat;

/// Run the status command.
pub async fn run(config: &SdkConfig, format: OutputFormat) -> WcResult<()> {
    let api = super::create_api_client(config)?;
    let result = api.health_check().await;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "api_root": api.api_root(),
                "socket_url": api.socket_url(),
                "reachable": result.is_ok(),
                "latency_ms": result.as_ref().ok().map(|d| d.as_millis() as u64),
                "error": result.as_ref().err().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        OutputFormat::Text => {
            println!("{}", style("Backend").bold().underlined());
            println!("  API:     {}", api.api_root());
            println!("  Socket:  {}", api.socket_url());
            match &result {
                Ok(latency) => println!(
                    "  Status:  {} ({}ms)",
                    style("reachable").green(),
                    latency.as_millis()
                ),
                Err(e) => println!("  Status:  {} ({e})", style("unreachable").red()),
            }
        }
    }

    result.map(|_| ())
}
