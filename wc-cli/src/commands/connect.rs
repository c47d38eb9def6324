//! Connect command - run a live widget session from the terminal.

use std::path::PathBuf;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use wc_core::config::SdkConfig;
use wc_core::error::WcResult;
use wc_services::{ChatWidget, SdkEvent};

use super::CredentialArgs;

/// Run the connect command.
pub async fn run(
    config: &SdkConfig,
    credentials: CredentialArgs,
    conversation: Option<String>,
    theme: Option<PathBuf>,
) -> WcResult<()> {
    let mut widget_config = credentials.into_widget_config()?;
    if let Some(key) = conversation {
        widget_config = widget_config.with_conversation_key(key);
    }

    let widget = ChatWidget::new(config)?;
    if let Some(path) = theme {
        let applied = widget.set_theme(super::theme::load_theme_file(&path)?)?;
        println!(
            "  {} Theme applied (accent {})",
            style("OK").green(),
            applied.accent_primary
        );
    }

    println!(
        "{} Initializing session for bot {}...",
        style("[1/2]").bold().dim(),
        widget_config.bot_id
    );
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("validating credentials and opening the channel");
    pb.enable_steady_tick(Duration::from_millis(100));

    let mut events = widget.subscribe();
    let result = widget.initialize(widget_config).await;
    pb.finish_and_clear();

    if let Err(e) = result {
        println!("  {} {}", style("FAIL").red().bold(), e.user_message());
        println!("  {}", style(e.to_string()).dim());
        return Err(e.into());
    }

    let key = widget.open_conversation_detail_screen_without_key().await?;
    println!(
        "  {} Session ready. Conversation {}",
        style("OK").green().bold(),
        style(key).cyan()
    );
    println!(
        "{} Type a message and press Enter to send. (Ctrl+C to stop)",
        style("[2/2]").bold().dim()
    );
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let fatal = matches!(event, SdkEvent::SessionFailed { .. });
                    print_event(&event);
                    if fatal {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    println!("  {} Missed {n} events (slow consumer)", style("WARN").yellow());
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => match line {
                Ok(Some(text)) => {
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if let Err(e) = widget.send_message(text) {
                        warn!("send failed: {e}");
                        println!("  {} {e}", style("FAIL").red());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("stdin closed: {e}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\n  Disconnecting...");
                break;
            }
        }
    }

    widget.teardown().await;
    Ok(())
}

fn print_event(event: &SdkEvent) {
    match event {
        SdkEvent::MessageReceived { sender, text, .. } => {
            let who = if sender.is_empty() { "bot" } else { sender.as_str() };
            println!("  {} {}", style(format!("[{who}]")).cyan().bold(), text);
        }
        SdkEvent::TypingChanged { typing: true, .. } => {
            println!("  {}", style("... typing").dim());
        }
        SdkEvent::ConnectionStateChanged { state } => {
            println!("  {} {}", style("[connection]").dim(), state);
        }
        SdkEvent::ConversationKeyAssigned { key } => {
            println!("  {} {}", style("[conversation]").dim(), key);
        }
        SdkEvent::SessionFailed { error } => {
            println!("  {} session failed: {error}", style("FAIL").red().bold());
        }
        _ => {}
    }
}
