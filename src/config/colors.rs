//! Color configuration for the TUI.

use ratatui::style::Color;
use serde::{de, Deserialize, Deserializer};

/// Colors used by the splash, listing and detail screens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    #[serde(deserialize_with = "deserialize_color")]
    pub title: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub prompt: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub border: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub selection_bg: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub selection_fg: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub summary: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub metadata_date: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub metadata_tags: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub filter: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub error: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub status_fg: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub status_bg: Color,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            title: Color::White,
            prompt: Color::Gray,
            border: Color::DarkGray,
            selection_bg: Color::Cyan,
            selection_fg: Color::Black,
            summary: Color::Gray,
            metadata_date: Color::Yellow,
            metadata_tags: Color::Magenta,
            filter: Color::Cyan,
            error: Color::LightRed,
            status_fg: Color::White,
            status_bg: Color::DarkGray,
        }
    }
}

fn deserialize_color<'de, D>(deserializer: D) -> Result<Color, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_color_string(&s).map_err(de::Error::custom)
}

/// Parse a color name, `#RRGGBB`/`#RGB` hex code, or ANSI palette index
/// (`0`–`255`).
pub fn parse_color_string(s: &str) -> Result<Color, String> {
    let s = s.trim();

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex_color(hex).ok_or_else(|| format!("Invalid hex color: {}", s));
    }

    if let Ok(index) = s.parse::<u8>() {
        return Ok(Color::Indexed(index));
    }

    let color = match s.to_lowercase().replace(['_', '-', ' '], "").as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        "white" => Color::White,
        "reset" | "default" => Color::Reset,
        _ => return Err(format!("Unknown color: {}", s)),
    };
    Ok(color)
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();

    match hex.len() {
        6 => Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        // #RGB expands each digit: F → FF
        3 => Some(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => None,
    }
}
