//! Conversation key newtype.

use serde::{Deserialize, Serialize};

/// Opaque identifier of a conversation thread.
///
/// Issued by the backend or supplied by the host app; the SDK never
/// interprets its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationKey(String);

impl ConversationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is blank (treated as "no key").
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConversationKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConversationKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_serde() {
        let key = ConversationKey::new("conv-123");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"conv-123\"");
        let back: ConversationKey = serde_json::from_str("\"conv-123\"").unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_blank_key() {
        assert!(ConversationKey::new("  ").is_blank());
        assert!(!ConversationKey::new("k").is_blank());
    }
}
