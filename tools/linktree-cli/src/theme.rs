//! Profile color themes.
//!
//! A profile stores its color as free text: one of the named palettes or a
//! `#rrggbb` value. Anything else renders with the default palette.

use serde::Serialize;

const DEFAULT_PALETTE: &str = "red";

// (name, background, foreground)
const PALETTES: [(&str, &str, &str); 6] = [
    ("red", "#ef4444", "#ffffff"),
    ("yellow", "#eab308", "#000000"),
    ("blue", "#3b82f6", "#ffffff"),
    ("violet", "#4c1d95", "#ffffff"),
    ("green", "#22c55e", "#000000"),
    ("pink", "#ec4899", "#000000"),
];

/// Colors a profile is rendered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    /// Palette name, or `custom` for a `#rrggbb` color
    pub name: String,
    pub background: String,
    pub foreground: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self::named(DEFAULT_PALETTE).unwrap_or_else(|| Self {
            name: DEFAULT_PALETTE.into(),
            background: "#ef4444".into(),
            foreground: "#ffffff".into(),
        })
    }
}

impl Theme {
    /// Theme for a stored `color_hex` value
    pub fn from_color(color: &str) -> Self {
        let color = color.trim();
        if let Some(theme) = Self::named(&color.to_ascii_lowercase()) {
            return theme;
        }
        match parse_rgb(color) {
            Some(rgb) => Self {
                name: "custom".into(),
                background: color.to_ascii_lowercase(),
                foreground: contrast_foreground(rgb).into(),
            },
            None => Self::default(),
        }
    }

    fn named(name: &str) -> Option<Self> {
        PALETTES
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(name, background, foreground)| Self {
                name: (*name).into(),
                background: (*background).into(),
                foreground: (*foreground).into(),
            })
    }
}

fn parse_rgb(color: &str) -> Option<[u8; 3]> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Black on light backgrounds, white on dark ones
fn contrast_foreground([r, g, b]: [u8; 3]) -> &'static str {
    let luma = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
    if luma > 127.5 {
        "#000000"
    } else {
        "#ffffff"
    }
}
