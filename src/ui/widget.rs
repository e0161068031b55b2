//! Widget configuration and placement.

use serde::{Deserialize, Serialize};

use crate::locale::Direction;

/// Corner of the viewport the widget is anchored to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetPosition {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

impl WidgetPosition {
    /// Placement classes for the widget container.
    ///
    /// In right-to-left layouts the horizontal side is mirrored, so a
    /// `bottom-right` widget sits bottom-left.
    #[must_use]
    pub fn css_classes(self, direction: Direction) -> &'static str {
        match (self, direction) {
            (Self::BottomRight, Direction::Ltr) | (Self::BottomLeft, Direction::Rtl) => {
                "bottom-6 right-6"
            }
            (Self::BottomLeft, Direction::Ltr) | (Self::BottomRight, Direction::Rtl) => {
                "bottom-6 left-6"
            }
            (Self::TopRight, Direction::Ltr) | (Self::TopLeft, Direction::Rtl) => "top-6 right-6",
            (Self::TopLeft, Direction::Ltr) | (Self::TopRight, Direction::Rtl) => "top-6 left-6",
        }
    }
}

/// Configuration of the mounted widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    /// Brand shown in the header and forwarded to the webhook.
    pub brand_name: String,
    /// First AI message of a left-to-right session.
    pub welcome_message: String,
    /// Input placeholder for left-to-right sessions.
    pub placeholder: String,
    pub position: WidgetPosition,
    /// Whether users may switch direction from the widget header.
    #[serde(rename = "enableRTLToggle")]
    pub enable_rtl_toggle: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            brand_name: "Mandaleen".to_string(),
            welcome_message: "Hello! 👋 I'm Mandaleen 🟠, how can I assist you today?".to_string(),
            placeholder: "Ask me anything...".to_string(),
            position: WidgetPosition::BottomRight,
            enable_rtl_toggle: true,
        }
    }
}

impl WidgetConfig {
    /// Placeholder for `direction`: the configured text, or the fixed
    /// Arabic prompt in right-to-left sessions.
    #[must_use]
    pub fn placeholder_for(&self, direction: Direction) -> &str {
        direction
            .strings()
            .placeholder
            .unwrap_or(&self.placeholder)
    }

    /// Header title, e.g. `Mandaleen AI`.
    #[must_use]
    pub fn title_for(&self, direction: Direction) -> String {
        direction.strings().assistant_title(&self.brand_name)
    }
}
