//! API endpoint modules organized by category.

pub mod widget;
