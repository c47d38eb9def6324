//! WidgetChat Services - the SDK session layer.
//!
//! This crate wires the API client and the realtime channel into the
//! caller-facing SDK:
//! - Credential validation (local checks, then the backend check)
//! - Session lifecycle (initialize, supervision, teardown)
//! - Theme storage with validated color slots
//! - Conversation screen descriptors and conversation key issuance
//! - Event bus (typed SDK events for the host UI)
//! - The `ChatWidget` facade tying it all together

pub mod event_bus;
pub mod presenter;
pub mod sdk;
pub mod session;
pub mod theme;
pub mod validator;

// Re-export key types
pub use event_bus::{EventBus, SdkEvent};
pub use presenter::ConversationPresenter;
pub use sdk::ChatWidget;
pub use session::SessionManager;
pub use theme::ThemeStore;
pub use validator::{CredentialValidator, ValidatedCredentials};
