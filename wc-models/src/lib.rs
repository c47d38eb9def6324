//! WidgetChat Models - the SDK data model.
//!
//! Value types shared by the API client, the realtime channel and the
//! service layer: the caller's widget configuration, session and validation
//! status enums, conversation keys, themes and screen descriptors.

pub mod models;

// Re-export key types
pub use models::conversation::ConversationKey;
pub use models::screen::{ScreenDescriptor, ScreenKind};
pub use models::status::{SessionState, ValidationState};
pub use models::theme::{Color, ResolvedTheme, WidgetTheme};
pub use models::widget_config::{DisplayFlags, ErrorMessages, WidgetConfig};
