//! CLI command implementations.

pub mod config;
pub mod connect;
pub mod status;
pub mod theme;
pub mod validate;

use clap::Args;
use dialoguer::{Input, Password};

use wc_api::ApiClient;
use wc_core::config::SdkConfig;
use wc_core::error::{WcError, WcResult};
use wc_models::WidgetConfig;

/// Widget credentials. Missing values are prompted for.
#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    /// Bot identifier.
    #[arg(long)]
    pub bot_id: Option<String>,
    /// Visitor key (32 characters).
    #[arg(long)]
    pub visitor_key: Option<String>,
    /// Account key.
    #[arg(long)]
    pub account_key: Option<String>,
    /// Numeric account id.
    #[arg(long)]
    pub account_id: Option<i64>,
}

impl CredentialArgs {
    /// Fill in anything not given on the command line interactively.
    pub fn into_widget_config(self) -> WcResult<WidgetConfig> {
        let bot_id = match self.bot_id {
            Some(v) => v,
            None => prompt("Bot id")?,
        };
        let visitor_key = match self.visitor_key {
            Some(v) => v,
            None => prompt("Visitor key")?,
        };
        let account_key = match self.account_key {
            Some(v) => v,
            None => Password::new()
                .with_prompt("Account key")
                .interact()
                .map_err(|e| WcError::Internal(e.to_string()))?,
        };
        let account_id = match self.account_id {
            Some(v) => v,
            None => Input::<i64>::new()
                .with_prompt("Account id")
                .interact_text()
                .map_err(|e| WcError::Internal(e.to_string()))?,
        };
        Ok(WidgetConfig::new(bot_id, visitor_key, account_key, account_id))
    }
}

fn prompt(label: &str) -> WcResult<String> {
    Input::new()
        .with_prompt(label)
        .interact_text()
        .map_err(|e| WcError::Internal(e.to_string()))
}

/// Helper to create an API client from config.
pub fn create_api_client(config: &SdkConfig) -> WcResult<ApiClient> {
    if !config.is_backend_configured() {
        return Err(WcError::MissingConfig(
            "backend.api_url (set it with `widgetchat config set backend.api_url <url>`)".into(),
        ));
    }
    ApiClient::new(&config.backend)
}

/// Truncate a string to a maximum length, appending an ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("héllo wörld", 6), "hél...");
    }

    #[test]
    fn test_credentials_from_flags() {
        let args = CredentialArgs {
            bot_id: Some("b1".into()),
            visitor_key: Some("v".repeat(32)),
            account_key: Some("k1".into()),
            account_id: Some(42),
        };
        let config = args.into_widget_config().unwrap();
        assert_eq!(config.bot_id, "b1");
        assert_eq!(config.account_id, 42);
        assert!(config.validate_local().is_ok());
    }

    #[test]
    fn test_api_client_requires_url() {
        assert!(matches!(
            create_api_client(&SdkConfig::default()),
            Err(WcError::MissingConfig(_))
        ));
    }
}
