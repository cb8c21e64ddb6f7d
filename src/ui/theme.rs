//! Colour theme for the dashboard.

use crossterm::style::{Color, Stylize};

/// What a piece of text represents on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Title,
    Primary,
    Success,
    Error,
    Warning,
    Info,
    Accent,
    Muted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Palette {
    primary: Color,
    success: Color,
    error: Color,
    warning: Color,
    info: Color,
    accent: Color,
    muted: Color,
}

const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb { r, g, b }
}

const DEFAULT_PALETTE: Palette = Palette {
    primary: rgb(0x63, 0x66, 0xf1),
    success: rgb(0x10, 0xb9, 0x81),
    error: rgb(0xef, 0x44, 0x44),
    warning: rgb(0xf5, 0x9e, 0x0b),
    info: rgb(0x3b, 0x82, 0xf6),
    accent: rgb(0x8b, 0x5c, 0xf6),
    muted: rgb(0x6b, 0x72, 0x80),
};

/// Immutable set of colours handed to the renderer.
///
/// A monochrome theme emits plain text with no escape sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    palette: Option<Palette>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            palette: Some(DEFAULT_PALETTE),
        }
    }
}

impl Theme {
    pub fn monochrome() -> Self {
        Self { palette: None }
    }

    pub fn is_monochrome(&self) -> bool {
        self.palette.is_none()
    }

    /// Styles `text` for `role`.
    pub fn paint(&self, role: Role, text: &str) -> String {
        let Some(palette) = self.palette else {
            return text.to_string();
        };
        let color = match role {
            Role::Title | Role::Primary => palette.primary,
            Role::Success => palette.success,
            Role::Error => palette.error,
            Role::Warning => palette.warning,
            Role::Info => palette.info,
            Role::Accent => palette.accent,
            Role::Muted => palette.muted,
        };
        let styled = text.with(color);
        if role == Role::Title {
            styled.bold().to_string()
        } else {
            styled.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monochrome_leaves_text_untouched() {
        let theme = Theme::monochrome();
        assert_eq!(theme.paint(Role::Error, "boom"), "boom");
        assert!(theme.is_monochrome());
    }

    #[test]
    fn colour_theme_wraps_text_in_escapes() {
        let painted = Theme::default().paint(Role::Success, "ok");
        assert!(painted.contains("ok"));
        assert!(painted.starts_with('\u{1b}'));
    }
}
