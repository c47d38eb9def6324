//! Model definitions.

pub mod conversation;
pub mod screen;
pub mod status;
pub mod theme;
pub mod widget_config;
