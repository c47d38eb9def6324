//! Theme commands.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;

use wc_core::error::WcResult;
use wc_models::{ResolvedTheme, WidgetTheme};

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ThemeAction {
    /// Show the default theme.
    Defaults,
    /// Resolve a theme file (TOML) and show every slot.
    Show {
        /// Theme file path.
        path: PathBuf,
    },
    /// Check a theme file for invalid colors.
    Check {
        /// Theme file path.
        path: PathBuf,
    },
}

/// Read a theme from a TOML file with camelCase slot names.
pub fn load_theme_file(path: &Path) -> WcResult<WidgetTheme> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

/// Run a theme subcommand.
pub fn run(action: ThemeAction, format: OutputFormat) -> WcResult<()> {
    match action {
        ThemeAction::Defaults => {
            print_theme(&ResolvedTheme::default(), None, format);
            Ok(())
        }
        ThemeAction::Show { path } => {
            let source = load_theme_file(&path)?;
            let resolved = source.resolve()?;
            print_theme(&resolved, Some(&source), format);
            Ok(())
        }
        ThemeAction::Check { path } => {
            let source = load_theme_file(&path)?;
            match source.resolve() {
                Ok(_) => {
                    println!("  {} {} is valid", style("OK").green().bold(), path.display());
                    Ok(())
                }
                Err(e) => {
                    println!("  {} {e}", style("FAIL").red().bold());
                    Err(e.into())
                }
            }
        }
    }
}

fn print_theme(theme: &ResolvedTheme, source: Option<&WidgetTheme>, format: OutputFormat) {
    let overridden = |slot: &str| {
        source
            .and_then(|s| serde_json::to_value(s).ok())
            .map(|v| !v[slot].is_null())
            .unwrap_or(false)
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(theme).unwrap_or_default());
        }
        OutputFormat::Text => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Slot", "Color", "Source"]);

            for (slot, color) in theme.slots() {
                let origin = if overridden(slot) { "theme" } else { "default" };
                table.add_row(vec![slot.to_string(), color.to_string(), origin.to_string()]);
            }
            println!("{table}");
        }
    }
}
