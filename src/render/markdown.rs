//! Markdown to styled, wrapped terminal lines.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::render::RenderError;

/// Styles applied to each kind of markdown element.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    pub heading: Style,
    pub strong: Style,
    pub emphasis: Style,
    pub code: Style,
    pub link: Style,
    pub quote: Style,
    pub rule: Style,
    pub marker: Style,
}

impl RenderStyle {
    /// Built-in styles: `dark`, `light` and `plain` (no colors).
    pub fn named(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "dark" | "auto" => Some(Self {
                heading: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                strong: Style::default().add_modifier(Modifier::BOLD),
                emphasis: Style::default().add_modifier(Modifier::ITALIC),
                code: Style::default().fg(Color::Yellow),
                link: Style::default()
                    .fg(Color::LightBlue)
                    .add_modifier(Modifier::UNDERLINED),
                quote: Style::default().fg(Color::Gray),
                rule: Style::default().fg(Color::DarkGray),
                marker: Style::default().fg(Color::DarkGray),
            }),
            "light" => Some(Self {
                heading: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
                strong: Style::default().add_modifier(Modifier::BOLD),
                emphasis: Style::default().add_modifier(Modifier::ITALIC),
                code: Style::default().fg(Color::Magenta),
                link: Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::UNDERLINED),
                quote: Style::default().fg(Color::DarkGray),
                rule: Style::default().fg(Color::Gray),
                marker: Style::default().fg(Color::Gray),
            }),
            "plain" | "notty" => Some(Self {
                heading: Style::default(),
                strong: Style::default(),
                emphasis: Style::default(),
                code: Style::default(),
                link: Style::default(),
                quote: Style::default(),
                rule: Style::default(),
                marker: Style::default(),
            }),
            _ => None,
        }
    }
}

/// Formats markdown into lines no wider than the wrap width.
///
/// Newlines inside paragraphs are kept as line breaks, and code blocks are
/// emitted verbatim.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    style: RenderStyle,
    width: usize,
}

impl MarkdownFormatter {
    pub fn new(style: &str, width: usize) -> Result<Self, RenderError> {
        let style = RenderStyle::named(style)
            .ok_or_else(|| RenderError::Init(format!("unknown style: {}", style)))?;
        Ok(Self { style, width })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn format(&self, markdown: &str) -> Result<Vec<Line<'static>>, RenderError> {
        if self.width == 0 {
            return Err(RenderError::Format("wrap width must be positive".into()));
        }

        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut writer = LineWriter::new(&self.style, self.width);
        for event in Parser::new_ext(markdown, options) {
            match event {
                Event::Start(tag) => writer.start(tag),
                Event::End(tag) => writer.end(tag),
                Event::Text(text) => writer.text(&text),
                Event::Code(code) => writer.inline_code(&code),
                Event::SoftBreak | Event::HardBreak => writer.break_line(),
                Event::Rule => writer.rule(),
                Event::TaskListMarker(done) => {
                    writer.word(if done { "[x]" } else { "[ ]" }, writer.style.marker)
                }
                _ => {}
            }
        }

        Ok(writer.finish())
    }
}

struct ListLevel {
    next: Option<u64>,
}

struct LineWriter<'a> {
    style: &'a RenderStyle,
    width: usize,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    line_width: usize,
    pending_space: bool,
    // Block prefixes, outermost first; a list item's bullet replaces its
    // indentation on the item's first line.
    indents: Vec<String>,
    marker: Option<String>,
    lists: Vec<ListLevel>,
    strong: usize,
    emphasis: usize,
    strike: usize,
    links: usize,
    quotes: usize,
    heading: bool,
    code_block: bool,
}

impl<'a> LineWriter<'a> {
    fn new(style: &'a RenderStyle, width: usize) -> Self {
        Self {
            style,
            width,
            lines: Vec::new(),
            spans: Vec::new(),
            line_width: 0,
            pending_space: false,
            indents: Vec::new(),
            marker: None,
            lists: Vec::new(),
            strong: 0,
            emphasis: 0,
            strike: 0,
            links: 0,
            quotes: 0,
            heading: false,
            code_block: false,
        }
    }

    fn inline_style(&self) -> Style {
        let mut style = if self.heading {
            self.style.heading
        } else if self.quotes > 0 {
            self.style.quote
        } else {
            Style::default()
        };
        if self.strong > 0 {
            style = style.patch(self.style.strong);
        }
        if self.emphasis > 0 {
            style = style.patch(self.style.emphasis);
        }
        if self.strike > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        if self.links > 0 {
            style = style.patch(self.style.link);
        }
        style
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.break_line(),
            Tag::Heading { level, .. } => {
                self.break_line();
                self.heading = true;
                let hashes = "#".repeat(heading_depth(level));
                self.word(&hashes, self.style.heading);
                self.pending_space = true;
            }
            Tag::BlockQuote(_) => {
                self.break_line();
                self.quotes += 1;
                self.indents.push("│ ".to_string());
            }
            Tag::CodeBlock(kind) => {
                self.break_line();
                self.code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.word(&lang, self.style.marker);
                        self.break_line();
                    }
                }
            }
            Tag::List(start) => {
                self.break_line();
                self.lists.push(ListLevel { next: start });
            }
            Tag::Item => {
                self.break_line();
                let bullet = match self.lists.last_mut() {
                    Some(ListLevel { next: Some(n) }) => {
                        let bullet = format!("{}. ", n);
                        *n += 1;
                        bullet
                    }
                    _ => "• ".to_string(),
                };
                self.indents.push(" ".repeat(bullet.width()));
                self.marker = Some(bullet);
            }
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::Link { .. } => self.links += 1,
            Tag::Image { .. } => {
                self.word("[image]", self.style.marker);
                self.pending_space = true;
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.break_line();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.heading = false;
                self.break_line();
                self.blank_line();
            }
            TagEnd::BlockQuote(_) => {
                self.break_line();
                self.quotes = self.quotes.saturating_sub(1);
                self.indents.pop();
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                self.code_block = false;
                self.break_line();
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.break_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => {
                self.break_line();
                self.indents.pop();
                self.marker = None;
            }
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Strikethrough => self.strike = self.strike.saturating_sub(1),
            TagEnd::Link => self.links = self.links.saturating_sub(1),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.code_block {
            self.code_text(text);
            return;
        }

        let style = self.inline_style();
        let mut rest = text;
        while !rest.is_empty() {
            if rest.starts_with(char::is_whitespace) {
                self.pending_space = true;
                rest = rest.trim_start();
                continue;
            }
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            self.word(&rest[..end], style);
            rest = &rest[end..];
        }
    }

    fn inline_code(&mut self, code: &str) {
        let style = self.inline_style().patch(self.style.code);
        let mut first = true;
        for piece in code.split(' ') {
            if !first {
                self.pending_space = true;
            }
            first = false;
            if !piece.is_empty() {
                self.word(piece, style);
            }
        }
    }

    fn code_text(&mut self, text: &str) {
        let style = self.style.code;
        let pieces: Vec<&str> = text.split('\n').collect();
        let last = pieces.len() - 1;
        for (i, line) in pieces.into_iter().enumerate() {
            if i > 0 {
                self.break_line();
            }
            if line.is_empty() {
                if i < last {
                    self.begin_line();
                }
                continue;
            }
            self.begin_line();
            self.spans.push(Span::styled(format!("  {}", line), style));
            self.line_width += line.width() + 2;
        }
    }

    fn rule(&mut self) {
        self.break_line();
        let prefix_width = self.prefix().width();
        let len = self.width.saturating_sub(prefix_width).max(1);
        self.begin_line();
        self.spans
            .push(Span::styled("─".repeat(len), self.style.rule));
        self.line_width += len;
        self.break_line();
        self.blank_line();
    }

    fn prefix(&self) -> String {
        self.indents.concat()
    }

    /// Starts a line with its block prefix if nothing has been written yet.
    fn begin_line(&mut self) {
        if !self.spans.is_empty() {
            return;
        }

        let mut prefix = self.prefix();
        if let (Some(marker), Some(last)) = (self.marker.take(), self.indents.last()) {
            prefix.truncate(prefix.len() - last.len());
            prefix.push_str(&marker);
        }

        if !prefix.is_empty() {
            let style = if self.quotes > 0 {
                self.style.quote
            } else {
                self.style.marker
            };
            self.line_width = prefix.width();
            self.spans.push(Span::styled(prefix, style));
        } else {
            self.line_width = 0;
        }
        // A line holding only its prefix still counts as started.
        if self.spans.is_empty() {
            self.spans.push(Span::raw(""));
        }
        self.pending_space = false;
    }

    fn word(&mut self, word: &str, style: Style) {
        self.begin_line();
        let width = word.width();
        let space = usize::from(self.pending_space);

        if self.pending_space && self.line_width + space + width > self.width {
            self.break_line();
            self.begin_line();
        } else if self.pending_space {
            self.spans.push(Span::raw(" "));
            self.line_width += 1;
        }
        self.pending_space = false;

        if self.line_width + width <= self.width {
            self.spans.push(Span::styled(word.to_string(), style));
            self.line_width += width;
            return;
        }

        // Longer than the remaining room: hard split.
        let mut chunk = String::new();
        for c in word.chars() {
            let cw = c.width().unwrap_or(0);
            if self.line_width + cw > self.width && (self.line_width > 0 || !chunk.is_empty()) {
                if !chunk.is_empty() {
                    self.spans.push(Span::styled(std::mem::take(&mut chunk), style));
                }
                self.break_line();
                self.begin_line();
            }
            chunk.push(c);
            self.line_width += cw;
        }
        if !chunk.is_empty() {
            self.spans.push(Span::styled(chunk, style));
        }
    }

    fn break_line(&mut self) {
        self.pending_space = false;
        if self.spans.is_empty() {
            return;
        }
        self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        self.line_width = 0;
    }

    fn blank_line(&mut self) {
        match self.lines.last() {
            None => {}
            Some(line) if line.width() == 0 => {}
            Some(_) => self.lines.push(Line::default()),
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.break_line();
        while self.lines.last().is_some_and(|l| l.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }
}

fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
