//! Screen descriptors handed to the host UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conversation::ConversationKey;
use super::theme::ResolvedTheme;
use super::widget_config::DisplayFlags;

/// Which conversation surface to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenKind {
    ConversationListFullScreen,
    ConversationListBottomSheet,
    ConversationDetail,
}

impl std::fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConversationListFullScreen => write!(f, "conversation_list_full_screen"),
            Self::ConversationListBottomSheet => write!(f, "conversation_list_bottom_sheet"),
            Self::ConversationDetail => write!(f, "conversation_detail"),
        }
    }
}

/// A presentation-ready value: theme snapshot, key and flags.
///
/// The theme is copied at construction; later theme changes never restyle
/// an existing descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDescriptor {
    pub id: Uuid,
    pub kind: ScreenKind,
    pub bot_id: String,
    pub conversation_key: Option<ConversationKey>,
    pub theme: ResolvedTheme,
    pub display: DisplayFlags,
    pub created_at: DateTime<Utc>,
}

impl ScreenDescriptor {
    pub fn new(
        kind: ScreenKind,
        bot_id: impl Into<String>,
        conversation_key: Option<ConversationKey>,
        theme: ResolvedTheme,
        display: DisplayFlags,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            bot_id: bot_id.into(),
            conversation_key,
            theme,
            display,
            created_at: Utc::now(),
        }
    }

    pub fn is_conversation_list(&self) -> bool {
        matches!(
            self.kind,
            ScreenKind::ConversationListFullScreen | ScreenKind::ConversationListBottomSheet
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors_are_distinct_values() {
        let a = ScreenDescriptor::new(
            ScreenKind::ConversationDetail,
            "b1",
            Some("conv-1".into()),
            ResolvedTheme::default(),
            DisplayFlags::default(),
        );
        let b = a.clone();
        assert_eq!(a, b);

        let c = ScreenDescriptor::new(
            ScreenKind::ConversationDetail,
            "b1",
            Some("conv-1".into()),
            ResolvedTheme::default(),
            DisplayFlags::default(),
        );
        assert_ne!(a.id, c.id);
        assert!(!a.is_conversation_list());
    }

    #[test]
    fn test_serializes_for_ui_layer() {
        let d = ScreenDescriptor::new(
            ScreenKind::ConversationListBottomSheet,
            "b1",
            None,
            ResolvedTheme::default(),
            DisplayFlags::default(),
        );
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "conversation_list_bottom_sheet");
        assert_eq!(json["theme"]["accentPrimary"], "#0075ff");
        assert!(json["conversationKey"].is_null());
    }
}
