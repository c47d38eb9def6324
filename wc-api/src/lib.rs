//! WidgetChat API - HTTP client for the chat backend.
//!
//! This crate provides the typed HTTPS client used during session setup:
//! credential validation and conversation-key issuance. It handles custom
//! headers, timeouts, certificate options and automatic retry with
//! exponential backoff. The `WidgetBackend` trait is the seam the service
//! layer depends on, so tests and alternative backends can stand in for it.

pub mod backend;
pub mod client;
pub mod endpoints;
pub mod response;

// Re-export key types
pub use backend::{ConversationRequest, ValidationOutcome, ValidationRequest, WidgetBackend};
pub use client::{ApiClient, RetryConfig};
pub use response::ServerResponse;
