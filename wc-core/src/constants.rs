//! SDK-wide constants.

/// SDK name, used for the data directory and log file prefix.
pub const APP_NAME: &str = "WidgetChat";

/// SDK version.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// REST API version prefix.
pub const API_VERSION: &str = "v1";

/// Default backend API timeout in milliseconds.
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;

/// Required length of a visitor key.
pub const VISITOR_KEY_LENGTH: usize = 32;

/// Maximum number of handled message ids kept for inbound deduplication.
pub const MAX_HANDLED_ID_HISTORY: usize = 100;

/// Default capacity of broadcast channels (socket dispatcher and SDK event bus).
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Fallback user-facing messages used when the widget config leaves one unset.
pub mod messages {
    pub const BAD_REQUEST: &str = "Something went wrong. Please check the widget configuration.";
    pub const BOT_NOT_ACTIVE: &str = "This bot is not active right now.";
    pub const NETWORK_ERROR: &str = "Unable to reach the chat service. Please try again.";
}

/// Realtime event names exchanged with the chat backend.
pub mod events {
    pub const NEW_MESSAGE: &str = "new-message";
    pub const MESSAGE_STATUS: &str = "message-status";
    pub const TYPING: &str = "typing";
    pub const CONVERSATION_CLOSED: &str = "conversation-closed";
    pub const AGENT_ASSIGNED: &str = "agent-assigned";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const SEND_MESSAGE: &str = "send-message";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visitor_key_length() {
        assert_eq!(VISITOR_KEY_LENGTH, 32);
    }

    #[test]
    fn test_event_names_are_distinct() {
        let names = [
            events::NEW_MESSAGE,
            events::MESSAGE_STATUS,
            events::TYPING,
            events::CONVERSATION_CLOSED,
            events::AGENT_ASSIGNED,
            events::PING,
            events::PONG,
            events::SEND_MESSAGE,
        ];
        let mut sorted = names.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());
    }
}
