//! Configuration management for postdeck.
//!
//! Configuration is read from `~/.config/postdeck/config.toml` at startup
//! (or the path given with `--config`). If the file doesn't exist, a default
//! configuration with comments is created.

pub mod colors;
pub mod keybindings;

pub use colors::ColorConfig;
pub use keybindings::KeybindingConfig;

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::fetcher::posts::DEFAULT_WORKERS;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub render: RenderConfig,
    pub ui: UiConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
    pub colors: ColorConfig,
    pub keybindings: KeybindingConfig,
}

/// Where posts are listed and downloaded from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub branch: Option<String>,
    /// Only files ending with this suffix are treated as posts.
    pub suffix: String,
    pub timeout_secs: u64,
    pub workers: usize,
    pub user_agent: String,
    pub token: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: "spacecoastdevs".to_string(),
            repo: "spacecoastdevs.github.io".to_string(),
            path: "src/content/blog".to_string(),
            branch: None,
            suffix: ".mdx".to_string(),
            timeout_secs: 10,
            workers: DEFAULT_WORKERS,
            user_agent: concat!("postdeck/", env!("CARGO_PKG_VERSION")).to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// `dark`, `light` or `plain`.
    pub style: String,
    /// Statements removed verbatim from post bodies before rendering.
    pub strip_literals: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            style: "dark".to_string(),
            strip_literals: vec!["import { Image } from 'astro:assets';".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub title: String,
    pub prompt: String,
    pub blink_ms: u64,
    /// Open the newest post as soon as the listing loads.
    pub latest: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: "Welcome to Space Coast Devs".to_string(),
            prompt: "<Press Enter to Continue>".to_string(),
            blink_ms: 500,
            latest: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 23234,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: PathBuf,
    /// Used when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("debug.log"),
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or the default path when `None`.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get the default config file path: `~/.config/postdeck/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("postdeck").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# postdeck configuration
#
# Colors can be specified as:
# - Named colors: Black, Red, Green, Yellow, Blue, Magenta, Cyan, Gray,
#   DarkGray, LightRed, LightGreen, LightYellow, LightBlue, LightMagenta,
#   LightCyan, White, Reset
# - Hex colors: "#RRGGBB" or "#RGB"
# - ANSI palette indexes: "0" to "255"
#
# Keybindings can be specified as:
# - Single characters: "a", "A", "/"
# - Special keys: Enter, Tab, BackTab, Backspace, Delete, Home, End,
#   PageUp, PageDown, Up, Down, Left, Right, Esc, Space, F1-F12
# - With modifiers: "Ctrl+c", "Shift+Tab", "Alt+Enter"

[source]
api_base = "https://api.github.com"
owner = "spacecoastdevs"
repo = "spacecoastdevs.github.io"
path = "src/content/blog"
# branch = "main"
suffix = ".mdx"
timeout_secs = 10
workers = 4
# token = "ghp_..."   (or set POSTDECK_TOKEN)

[render]
# dark, light or plain
style = "dark"
strip_literals = ["import { Image } from 'astro:assets';"]

[ui]
title = "Welcome to Space Coast Devs"
prompt = "<Press Enter to Continue>"
blink_ms = 500
# Open the newest post as soon as posts load
latest = false

[server]
host = "0.0.0.0"
port = 23234

[log]
file = "debug.log"
level = "info"

[colors]
title = "White"
prompt = "Gray"
border = "DarkGray"
selection_bg = "Cyan"
selection_fg = "Black"
summary = "Gray"
metadata_date = "Yellow"
metadata_tags = "Magenta"
filter = "Cyan"
error = "LightRed"
status_fg = "White"
status_bg = "DarkGray"

[keybindings]
quit = ["q", "Ctrl+c"]
back = ["Esc", "Backspace", "h", "Left"]
select = ["Enter", "l", "Right"]
move_up = ["k", "Up"]
move_down = ["j", "Down"]
page_up = ["b", "PageUp", "Ctrl+u"]
page_down = ["f", "Space", "PageDown", "Ctrl+d"]
top = ["g", "Home"]
bottom = ["G", "End"]
filter = ["/"]
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
