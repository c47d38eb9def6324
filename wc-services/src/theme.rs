//! Theme store.
//!
//! Holds the last successfully applied theme. Screens copy the resolved
//! theme when they are described, so a later `set_theme` only affects
//! screens described afterwards.

use std::sync::RwLock;

use tracing::{info, warn};

use wc_core::error::ThemeError;
use wc_models::{ResolvedTheme, WidgetTheme};

use crate::event_bus::{EventBus, SdkEvent};

pub struct ThemeStore {
    event_bus: EventBus,
    current: RwLock<Option<(WidgetTheme, ResolvedTheme)>>,
}

impl ThemeStore {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            event_bus,
            current: RwLock::new(None),
        }
    }

    /// Validate and apply `theme`. Unset slots take their defaults.
    ///
    /// On an invalid slot the previously applied theme stays active.
    pub fn set_theme(&self, theme: WidgetTheme) -> Result<ResolvedTheme, ThemeError> {
        let resolved = theme.resolve().map_err(|e| {
            warn!("theme rejected: {e}");
            e
        })?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some((theme, resolved));
        info!("theme applied (accent {})", resolved.accent_primary);
        self.event_bus.emit(SdkEvent::ThemeApplied { theme: resolved });
        Ok(resolved)
    }

    /// The applied theme, with defaults filled in. `None` until one is set.
    pub fn get_theme(&self) -> Option<ResolvedTheme> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|(_, resolved)| *resolved)
    }

    /// The theme exactly as the caller supplied it.
    pub fn source_theme(&self) -> Option<WidgetTheme> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|(source, _)| source.clone())
    }

    /// The theme to snapshot into a new screen.
    pub fn effective_theme(&self) -> ResolvedTheme {
        self.get_theme().unwrap_or_default()
    }
}
