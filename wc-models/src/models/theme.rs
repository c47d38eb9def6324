//! Widget theme: named color slots with documented defaults.
//!
//! `WidgetTheme` is what the host app passes in: any subset of slots as
//! color strings. `ResolvedTheme` is the validated result with every slot
//! filled, which is what screens snapshot.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use wc_core::error::ThemeError;

lazy_static! {
    static ref HEX_COLOR: Regex =
        Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap();
}

/// A color stored as ARGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(u32);

impl Color {
    pub const fn from_argb(argb: u32) -> Self {
        Self(argb)
    }

    /// Opaque color from an RGB value (0xRRGGBB).
    pub const fn from_rgb(rgb: u32) -> Self {
        Self(0xff00_0000 | (rgb & 0x00ff_ffff))
    }

    pub fn argb(&self) -> u32 {
        self.0
    }

    pub fn alpha(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Parse `#rgb`, `#rrggbb` or `#aarrggbb`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if !HEX_COLOR.is_match(value) {
            return None;
        }
        let hex = &value[1..];
        match hex.len() {
            3 => {
                let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
                u32::from_str_radix(&expanded, 16).ok().map(Self::from_rgb)
            }
            6 => u32::from_str_radix(hex, 16).ok().map(Self::from_rgb),
            8 => u32::from_str_radix(hex, 16).ok().map(Self::from_argb),
            _ => None,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.alpha() == 0xff {
            write!(f, "#{:06x}", self.0 & 0x00ff_ffff)
        } else {
            write!(f, "#{:08x}", self.0)
        }
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color: {s:?}")))
    }
}

/// Documented slot defaults.
pub mod defaults {
    use super::Color;

    pub const ACCENT_PRIMARY: Color = Color::from_rgb(0x0075ff);
    pub const ACCENT_SECONDARY: Color = Color::from_rgb(0xe5f1ff);
    pub const BACKGROUND: Color = Color::from_rgb(0xffffff);
    pub const HEADER_BACKGROUND: Color = Color::from_rgb(0x0075ff);
    pub const HEADER_TEXT: Color = Color::from_rgb(0xffffff);
    pub const USER_MESSAGE_BACKGROUND: Color = Color::from_rgb(0x0075ff);
    pub const USER_MESSAGE_TEXT: Color = Color::from_rgb(0xffffff);
    pub const BOT_MESSAGE_BACKGROUND: Color = Color::from_rgb(0xf1f3f6);
    pub const BOT_MESSAGE_TEXT: Color = Color::from_rgb(0x1c1c1e);
    pub const FAILURE_MESSAGE_BACKGROUND: Color = Color::from_rgb(0xfdecea);
    pub const FAILURE_MESSAGE_TEXT: Color = Color::from_rgb(0xd93025);
    pub const TIMESTAMP_TEXT: Color = Color::from_rgb(0x8e8e93);
}

/// Caller-supplied theme; unset slots fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetTheme {
    pub accent_primary: Option<String>,
    pub accent_secondary: Option<String>,
    pub background: Option<String>,
    pub header_background: Option<String>,
    pub header_text: Option<String>,
    pub user_message_background: Option<String>,
    pub user_message_text: Option<String>,
    pub bot_message_background: Option<String>,
    pub bot_message_text: Option<String>,
    pub failure_message_background: Option<String>,
    pub failure_message_text: Option<String>,
    pub timestamp_text: Option<String>,
}

/// Fully populated, validated theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTheme {
    pub accent_primary: Color,
    pub accent_secondary: Color,
    pub background: Color,
    pub header_background: Color,
    pub header_text: Color,
    pub user_message_background: Color,
    pub user_message_text: Color,
    pub bot_message_background: Color,
    pub bot_message_text: Color,
    pub failure_message_background: Color,
    pub failure_message_text: Color,
    pub timestamp_text: Color,
}

impl Default for ResolvedTheme {
    fn default() -> Self {
        Self {
            accent_primary: defaults::ACCENT_PRIMARY,
            accent_secondary: defaults::ACCENT_SECONDARY,
            background: defaults::BACKGROUND,
            header_background: defaults::HEADER_BACKGROUND,
            header_text: defaults::HEADER_TEXT,
            user_message_background: defaults::USER_MESSAGE_BACKGROUND,
            user_message_text: defaults::USER_MESSAGE_TEXT,
            bot_message_background: defaults::BOT_MESSAGE_BACKGROUND,
            bot_message_text: defaults::BOT_MESSAGE_TEXT,
            failure_message_background: defaults::FAILURE_MESSAGE_BACKGROUND,
            failure_message_text: defaults::FAILURE_MESSAGE_TEXT,
            timestamp_text: defaults::TIMESTAMP_TEXT,
        }
    }
}

fn resolve_slot(slot: &str, value: &Option<String>, default: Color) -> Result<Color, ThemeError> {
    match value {
        None => Ok(default),
        Some(raw) => Color::parse(raw).ok_or_else(|| ThemeError::InvalidColor {
            slot: slot.to_string(),
            value: raw.clone(),
        }),
    }
}

impl WidgetTheme {
    pub fn with_accent_primary(mut self, color: impl Into<String>) -> Self {
        self.accent_primary = Some(color.into());
        self
    }

    /// Validate every provided slot and fill the rest with defaults.
    pub fn resolve(&self) -> Result<ResolvedTheme, ThemeError> {
        let d = ResolvedTheme::default();
        Ok(ResolvedTheme {
            accent_primary: resolve_slot("accentPrimary", &self.accent_primary, d.accent_primary)?,
            accent_secondary: resolve_slot(
                "accentSecondary",
                &self.accent_secondary,
                d.accent_secondary,
            )?,
            background: resolve_slot("background", &self.background, d.background)?,
            header_background: resolve_slot(
                "headerBackground",
                &self.header_background,
                d.header_background,
            )?,
            header_text: resolve_slot("headerText", &self.header_text, d.header_text)?,
            user_message_background: resolve_slot(
                "userMessageBackground",
                &self.user_message_background,
                d.user_message_background,
            )?,
            user_message_text: resolve_slot(
                "userMessageText",
                &self.user_message_text,
                d.user_message_text,
            )?,
            bot_message_background: resolve_slot(
                "botMessageBackground",
                &self.bot_message_background,
                d.bot_message_background,
            )?,
            bot_message_text: resolve_slot(
                "botMessageText",
                &self.bot_message_text,
                d.bot_message_text,
            )?,
            failure_message_background: resolve_slot(
                "failureMessageBackground",
                &self.failure_message_background,
                d.failure_message_background,
            )?,
            failure_message_text: resolve_slot(
                "failureMessageText",
                &self.failure_message_text,
                d.failure_message_text,
            )?,
            timestamp_text: resolve_slot("timestampText", &self.timestamp_text, d.timestamp_text)?,
        })
    }
}

impl ResolvedTheme {
    /// All slots in display order, keyed by their wire names.
    pub fn slots(&self) -> Vec<(&'static str, Color)> {
        vec![
            ("accentPrimary", self.accent_primary),
            ("accentSecondary", self.accent_secondary),
            ("background", self.background),
            ("headerBackground", self.header_background),
            ("headerText", self.header_text),
            ("userMessageBackground", self.user_message_background),
            ("userMessageText", self.user_message_text),
            ("botMessageBackground", self.bot_message_background),
            ("botMessageText", self.bot_message_text),
            ("failureMessageBackground", self.failure_message_background),
            ("failureMessageText", self.failure_message_text),
            ("timestampText", self.timestamp_text),
        ]
    }
}
