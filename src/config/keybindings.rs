//! Keybinding configuration for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::Deserialize;

use crate::tui::event::Action;

/// Key strings for each action; an action fires if any of its keys match.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeybindingConfig {
    pub quit: Vec<String>,
    pub back: Vec<String>,
    pub select: Vec<String>,
    pub move_up: Vec<String>,
    pub move_down: Vec<String>,
    pub page_up: Vec<String>,
    pub page_down: Vec<String>,
    pub top: Vec<String>,
    pub bottom: Vec<String>,
    pub filter: Vec<String>,
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

impl Default for KeybindingConfig {
    fn default() -> Self {
        Self {
            quit: keys(&["q", "Ctrl+c"]),
            back: keys(&["Esc", "Backspace", "h", "Left"]),
            select: keys(&["Enter", "l", "Right"]),
            move_up: keys(&["k", "Up"]),
            move_down: keys(&["j", "Down"]),
            page_up: keys(&["b", "PageUp", "Ctrl+u"]),
            page_down: keys(&["f", "Space", "PageDown", "Ctrl+d"]),
            top: keys(&["g", "Home"]),
            bottom: keys(&["G", "End"]),
            filter: keys(&["/"]),
        }
    }
}

impl KeybindingConfig {
    /// Get the action for a key event. Earlier entries win on conflicts.
    pub fn get_action(&self, key: &KeyEvent) -> Action {
        let table: [(&[String], Action); 10] = [
            (&self.quit, Action::Quit),
            (&self.back, Action::Back),
            (&self.select, Action::Select),
            (&self.move_up, Action::MoveUp),
            (&self.move_down, Action::MoveDown),
            (&self.page_up, Action::PageUp),
            (&self.page_down, Action::PageDown),
            (&self.top, Action::Top),
            (&self.bottom, Action::Bottom),
            (&self.filter, Action::Filter),
        ];

        table
            .iter()
            .find(|(bindings, _)| matches_key(key, bindings))
            .map(|(_, action)| *action)
            .unwrap_or(Action::None)
    }
}

fn matches_key(key: &KeyEvent, bindings: &[String]) -> bool {
    bindings
        .iter()
        .filter_map(|binding| parse_key_string(binding).ok())
        .any(|parsed| parsed.matches(key))
}

/// A parsed key binding with code and modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    /// Check if this binding matches a key event.
    pub fn matches(&self, key: &KeyEvent) -> bool {
        self.code == key.code
            && (self.modifiers == key.modifiers
                || self.modifiers == (key.modifiers & !KeyModifiers::SHIFT))
    }
}

/// Parse strings such as `"j"`, `"PageDown"`, `"Ctrl+c"` or `"Ctrl+Alt+x"`.
///
/// Special key names are case-insensitive: Enter, Tab, BackTab, Backspace,
/// Delete, Home, End, PageUp, PageDown, Up, Down, Left, Right, Esc, Space
/// and F1–F12.
pub fn parse_key_string(s: &str) -> Result<KeyBinding, String> {
    let s = s.trim();
    let (mods, key_part) = match s.rsplit_once('+') {
        Some((mods, key)) if !key.is_empty() => (Some(mods), key),
        _ => (None, s),
    };

    let mut modifiers = KeyModifiers::NONE;
    for part in mods.into_iter().flat_map(|m| m.split('+')) {
        modifiers |= match part.trim().to_lowercase().as_str() {
            "ctrl" | "control" => KeyModifiers::CONTROL,
            "shift" => KeyModifiers::SHIFT,
            "alt" | "meta" => KeyModifiers::ALT,
            _ => return Err(format!("Unknown modifier: {}", part)),
        };
    }

    Ok(KeyBinding {
        code: parse_key_code(key_part)?,
        modifiers,
    })
}

fn parse_key_code(s: &str) -> Result<KeyCode, String> {
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(KeyCode::Char(c));
    }

    let lower = s.to_lowercase();
    if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        if (1..=12).contains(&n) {
            return Ok(KeyCode::F(n));
        }
    }

    let code = match lower.as_str() {
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "backspace" | "bs" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdn" => KeyCode::PageDown,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "esc" | "escape" => KeyCode::Esc,
        "space" => KeyCode::Char(' '),
        _ => return Err(format!("Unknown key: {}", s)),
    };
    Ok(code)
}
