//! Post body → display lines.
//!
//! ```text
//! body → strip_markup → footnote_links → MarkdownFormatter → lines
//! ```

pub mod footnotes;
pub mod markdown;
pub mod sanitize;

use std::sync::OnceLock;

use ratatui::text::Line;
use regex::Regex;
use thiserror::Error;

use crate::config::RenderConfig;

pub use footnotes::footnote_links;
pub use markdown::{MarkdownFormatter, RenderStyle};
pub use sanitize::strip_markup;

pub const INIT_FALLBACK: &str = "Error initializing renderer.";
pub const FORMAT_FALLBACK: &str = "Error rendering content.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("failed to initialize renderer: {0}")]
    Init(String),

    #[error("failed to render content: {0}")]
    Format(String),
}

/// Output of one render; on error `lines` holds a single placeholder.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub lines: Vec<Line<'static>>,
    pub error: Option<RenderError>,
}

impl Rendered {
    fn fallback(error: RenderError) -> Self {
        let message = match error {
            RenderError::Init(_) => INIT_FALLBACK,
            RenderError::Format(_) => FORMAT_FALLBACK,
        };
        tracing::error!("{}", error);
        Self {
            lines: vec![Line::from(message)],
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderPipeline {
    style: String,
    strip_literals: Vec<String>,
}

impl RenderPipeline {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            style: config.style.clone(),
            strip_literals: config.strip_literals.clone(),
        }
    }

    /// Never fails outright: errors degrade to a placeholder line.
    pub fn render(&self, body: &str, width: usize) -> Rendered {
        let text = strip_markup(body, &self.strip_literals);
        let text = protect_definitions(&footnote_links(&text));

        let formatter = match MarkdownFormatter::new(&self.style, width) {
            Ok(formatter) => formatter,
            Err(e) => return Rendered::fallback(e),
        };

        match formatter.format(&text) {
            Ok(lines) => Rendered { lines, error: None },
            Err(e) => Rendered::fallback(e),
        }
    }
}

/// `[n]: url` lines would be swallowed as link reference definitions;
/// escaping the brackets keeps the footnote list visible.
fn protect_definitions(text: &str) -> String {
    static DEFINITION: OnceLock<Regex> = OnceLock::new();
    let definition = DEFINITION
        .get_or_init(|| Regex::new(r"(?m)^\[(\d+)\]: ").expect("valid definition pattern"));
    definition.replace_all(text, r"\[${1}\]: ").into_owned()
}
