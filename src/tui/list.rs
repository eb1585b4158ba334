use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;

use crate::domain::Post;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterState {
    #[default]
    Off,
    /// Keystrokes go to the query.
    Editing,
    Applied,
}

/// Selectable post list with an optional text filter.
#[derive(Debug, Default)]
pub struct EntryList {
    posts: Vec<Arc<Post>>,
    /// Indexes into `posts` that pass the filter, in listing order.
    visible: Vec<usize>,
    selected: usize,
    query: String,
    filter: FilterState,
    page_size: usize,
    pub state: ListState,
}

impl EntryList {
    pub fn new() -> Self {
        Self {
            page_size: 1,
            ..Self::default()
        }
    }

    pub fn set_posts(&mut self, posts: Vec<Post>) {
        self.posts = posts.into_iter().map(Arc::new).collect();
        self.visible.clear();
        self.selected = 0;
        self.refilter();
    }

    pub fn clear(&mut self) {
        self.posts.clear();
        self.visible.clear();
        self.query.clear();
        self.filter = FilterState::Off;
        self.selected = 0;
        self.refilter();
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn visible(&self) -> impl Iterator<Item = &Arc<Post>> {
        self.visible.iter().map(|&i| &self.posts[i])
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn first(&self) -> Option<&Arc<Post>> {
        self.posts.first()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Arc<Post>> {
        self.visible.get(self.selected).map(|&i| &self.posts[i])
    }

    pub fn set_page_size(&mut self, rows: usize) {
        self.page_size = rows.max(1);
    }

    pub fn move_up(&mut self) {
        self.select(self.selected.saturating_sub(1));
    }

    pub fn move_down(&mut self) {
        self.select(self.selected.saturating_add(1));
    }

    pub fn page_up(&mut self) {
        self.select(self.selected.saturating_sub(self.page_size));
    }

    pub fn page_down(&mut self) {
        self.select(self.selected.saturating_add(self.page_size));
    }

    pub fn top(&mut self) {
        self.select(0);
    }

    pub fn bottom(&mut self) {
        self.select(self.visible.len().saturating_sub(1));
    }

    pub fn filter_state(&self) -> FilterState {
        self.filter
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_filtering(&self) -> bool {
        self.filter == FilterState::Editing
    }

    pub fn start_filter(&mut self) {
        self.filter = FilterState::Editing;
    }

    pub fn clear_filter(&mut self) {
        self.query.clear();
        self.filter = FilterState::Off;
        self.refilter();
    }

    /// Handles a key while the query is being edited.
    pub fn handle_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.clear_filter(),
            KeyCode::Enter => {
                let state = if self.query.trim().is_empty() {
                    FilterState::Off
                } else {
                    FilterState::Applied
                };
                self.filter = state;
            }
            KeyCode::Backspace => {
                self.query.pop();
                self.refilter();
            }
            KeyCode::Up => self.move_up(),
            KeyCode::Down => self.move_down(),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear_filter()
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.query.push(c);
                self.refilter();
            }
            _ => {}
        }
    }

    fn refilter(&mut self) {
        let current = self.visible.get(self.selected).copied();
        self.visible = self
            .posts
            .iter()
            .enumerate()
            .filter(|(_, post)| post.matches(&self.query))
            .map(|(i, _)| i)
            .collect();

        let selected = current
            .and_then(|post| self.visible.iter().position(|&i| i == post))
            .unwrap_or(0);
        self.select(selected);
    }

    fn select(&mut self, index: usize) {
        self.selected = index.min(self.visible.len().saturating_sub(1));
        if self.visible.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(self.selected));
        }
    }
}
