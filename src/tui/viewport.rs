use ratatui::text::Line;

/// A fixed-size window over pre-rendered lines.
///
/// `offset` always stays within `0..=max_offset()`, including after the
/// content or the size changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewport {
    lines: Vec<Line<'static>>,
    offset: usize,
    width: usize,
    height: usize,
}

impl Viewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn lines(&self) -> &[Line<'static>] {
        &self.lines
    }

    pub fn set_content(&mut self, lines: Vec<Line<'static>>) {
        self.lines = lines;
        self.clamp();
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.clamp();
    }

    pub fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height)
    }

    pub fn visible_lines(&self) -> &[Line<'static>] {
        let end = (self.offset + self.height).min(self.lines.len());
        &self.lines[self.offset.min(end)..end]
    }

    pub fn line_up(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
    }

    pub fn line_down(&mut self, n: usize) {
        self.offset = self.offset.saturating_add(n).min(self.max_offset());
    }

    pub fn page_up(&mut self) {
        self.line_up(self.height.max(1));
    }

    pub fn page_down(&mut self) {
        self.line_down(self.height.max(1));
    }

    pub fn goto_top(&mut self) {
        self.offset = 0;
    }

    pub fn goto_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    /// How far through the content the bottom edge is, 0 to 100.
    pub fn scroll_percent(&self) -> u16 {
        let max = self.max_offset();
        if max == 0 {
            return 100;
        }
        ((self.offset * 100) / max) as u16
    }

    fn clamp(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }
}
