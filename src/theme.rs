//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::crops::CropKind;
use log::warn;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Board and UI colours, One Dark by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Crop colours indexed by [`CropKind::color_index`]: turnip, apple, pumpkin.
    pub crops: [Color; 3],
    /// Board background.
    pub bg: Color,
    /// Cell borders.
    pub div_line: Color,
    /// Text (score, combo, time).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Growing crops and hints.
    pub inactive_fg: Color,
    /// Border of the pending selection.
    pub selected: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

const TURNIP: Color = Color::Rgb(0xC6, 0x78, 0xDD);
const APPLE: Color = Color::Rgb(0xE0, 0x6C, 0x75);
const PUMPKIN: Color = Color::Rgb(0xD1, 0x9A, 0x66);
const BG: Color = Color::Rgb(0x28, 0x2C, 0x34);
const DIV_LINE: Color = Color::Rgb(0x3F, 0x44, 0x4F);
const MAIN_FG: Color = Color::Rgb(0xAB, 0xB2, 0xBF);
const TITLE: Color = Color::Rgb(0xE5, 0xC0, 0x7B);
const INACTIVE_FG: Color = Color::Rgb(0x5C, 0x63, 0x70);
const SELECTED: Color = Color::Rgb(0x61, 0xAF, 0xEF);

impl Theme {
    pub fn onedark_default() -> Self {
        Self {
            crops: [TURNIP, APPLE, PUMPKIN],
            bg: BG,
            div_line: DIV_LINE,
            main_fg: MAIN_FG,
            title: TITLE,
            inactive_fg: INACTIVE_FG,
            selected: SELECTED,
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            Some(p) => {
                warn!("theme file {} not found, using defaults", p.display());
                return Ok(Self::default());
            }
            None => return Ok(Self::default()),
        };
        let s = std::fs::read_to_string(path)?;
        Ok(Self::from_map(&parse_theme_file(&s)))
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        Self {
            crops: [
                get("turnip").unwrap_or(TURNIP),
                get("apple").unwrap_or(APPLE),
                get("pumpkin").unwrap_or(PUMPKIN),
            ],
            bg: get("main_bg").or_else(|| get("meter_bg")).unwrap_or(BG),
            div_line: get("div_line").unwrap_or(DIV_LINE),
            main_fg: get("main_fg").unwrap_or(MAIN_FG),
            title: get("title").unwrap_or(TITLE),
            inactive_fg: get("inactive_fg").unwrap_or(INACTIVE_FG),
            selected: get("selected_bg").or_else(|| get("hi_fg")).unwrap_or(SELECTED),
        }
    }

    #[inline]
    pub fn crop_color(&self, kind: CropKind) -> Color {
        self.crops[kind.color_index()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    if !s.is_ascii() {
        return Err(ThemeError::InvalidHex(s.to_string()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&s[range], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(ThemeError::InvalidHex(s.to_string())),
    };
    Ok(Color::Rgb(r, g, b))
}
