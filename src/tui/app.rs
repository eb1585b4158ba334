use std::sync::Arc;

use crossterm::event::{KeyEvent, KeyEventKind};

use crate::config::KeybindingConfig;
use crate::domain::Post;
use crate::fetcher::{FetchError, FetchOutcome};
use crate::render::RenderPipeline;
use crate::tui::event::{Action, AppEvent};
use crate::tui::layout::{self, Geometry};
use crate::tui::list::{EntryList, FilterState};
use crate::tui::viewport::Viewport;

/// The screen being shown, carrying only the data that screen needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Splash { prompt_visible: bool },
    Listing,
    Detail { post: Arc<Post>, viewport: Viewport },
    Exited,
}

/// Work the browser asks its runner to start on its behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    FetchPosts,
    /// Start the splash blink period over from now.
    RestartBlink,
}

/// Per-session screen state machine.
///
/// All state is mutated through [`Browser::update`], one event at a time.
/// Background work only reaches it as an [`AppEvent::Fetched`] message.
pub struct Browser {
    screen: Screen,
    list: EntryList,
    error: Option<FetchError>,
    pending_fetches: usize,
    latest: bool,
    keys: KeybindingConfig,
    pipeline: Arc<RenderPipeline>,
    width: u16,
    height: u16,
}

impl Browser {
    pub fn new(pipeline: Arc<RenderPipeline>, keys: KeybindingConfig, latest: bool) -> Self {
        let mut browser = Self {
            screen: Screen::Splash {
                prompt_visible: true,
            },
            list: EntryList::new(),
            error: None,
            pending_fetches: 0,
            latest,
            keys,
            pipeline,
            width: 80,
            height: 24,
        };
        browser.resize(browser.width, browser.height);
        browser
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn list(&self) -> &EntryList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut EntryList {
        &mut self.list
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_fetches > 0
    }

    pub fn is_exited(&self) -> bool {
        self.screen == Screen::Exited
    }

    pub fn geometry(&self) -> Geometry {
        layout::geometry(self.width, self.height)
    }

    pub fn update(&mut self, event: AppEvent) -> Option<Command> {
        match event {
            AppEvent::Key(key) => self.on_key(key),
            AppEvent::Tick => {
                if let Screen::Splash { prompt_visible } = &mut self.screen {
                    *prompt_visible = !*prompt_visible;
                }
                None
            }
            AppEvent::Resize(width, height) => {
                self.resize(width, height);
                None
            }
            AppEvent::Fetched(outcome) => {
                self.on_fetched(outcome);
                None
            }
            AppEvent::Disconnected => {
                self.screen = Screen::Exited;
                None
            }
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.kind == KeyEventKind::Release {
            return None;
        }

        match self.screen {
            Screen::Splash { .. } => match self.keys.get_action(&key) {
                Action::Select => return Some(self.enter_listing()),
                Action::Quit => self.screen = Screen::Exited,
                _ => {}
            },
            Screen::Listing => return self.on_listing_key(key),
            Screen::Detail { .. } => self.on_detail_key(key),
            Screen::Exited => {}
        }
        None
    }

    fn on_listing_key(&mut self, key: KeyEvent) -> Option<Command> {
        if self.list.is_filtering() {
            self.list.handle_filter_key(key);
            return None;
        }

        match self.keys.get_action(&key) {
            Action::Quit => self.screen = Screen::Exited,
            Action::Back if self.list.filter_state() == FilterState::Applied => {
                self.list.clear_filter()
            }
            Action::Back => {
                self.screen = Screen::Splash {
                    prompt_visible: true,
                };
                return Some(Command::RestartBlink);
            }
            Action::Select => {
                if let Some(post) = self.list.selected().cloned() {
                    self.open(post);
                }
            }
            Action::MoveUp => self.list.move_up(),
            Action::MoveDown => self.list.move_down(),
            Action::PageUp => self.list.page_up(),
            Action::PageDown => self.list.page_down(),
            Action::Top => self.list.top(),
            Action::Bottom => self.list.bottom(),
            Action::Filter => self.list.start_filter(),
            Action::None => {}
        }
        None
    }

    fn on_detail_key(&mut self, key: KeyEvent) {
        let action = self.keys.get_action(&key);
        if matches!(action, Action::Quit | Action::Back) {
            self.screen = Screen::Listing;
            return;
        }

        let Screen::Detail { viewport, .. } = &mut self.screen else {
            return;
        };
        match action {
            Action::MoveUp => viewport.line_up(1),
            Action::MoveDown => viewport.line_down(1),
            Action::PageUp => viewport.page_up(),
            Action::PageDown => viewport.page_down(),
            Action::Top => viewport.goto_top(),
            Action::Bottom => viewport.goto_bottom(),
            _ => {}
        }
    }

    fn enter_listing(&mut self) -> Command {
        self.screen = Screen::Listing;
        self.error = None;
        self.list.clear();
        self.pending_fetches += 1;
        tracing::debug!("Entering listing, fetching posts");
        Command::FetchPosts
    }

    fn on_fetched(&mut self, outcome: FetchOutcome) {
        self.pending_fetches = self.pending_fetches.saturating_sub(1);

        match outcome {
            Ok(posts) => {
                tracing::info!("Loaded {} posts", posts.len());
                self.error = None;
                self.list.set_posts(posts);

                if self.latest && self.screen == Screen::Listing {
                    if let Some(post) = self.list.first().cloned() {
                        self.open(post);
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to fetch posts: {}", e);
                self.error = Some(e);
                self.list.clear();
            }
        }
    }

    fn open(&mut self, post: Arc<Post>) {
        let geometry = self.geometry();
        let mut viewport = Viewport::new(geometry.body_width, geometry.body_height);
        viewport.set_content(self.pipeline.render(post.display_body(), geometry.body_width).lines);
        self.screen = Screen::Detail { post, viewport };
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let geometry = self.geometry();
        self.list.set_page_size(geometry.page_size);

        if let Screen::Detail { post, viewport } = &mut self.screen {
            viewport.set_size(geometry.body_width, geometry.body_height);
            let rendered = self.pipeline.render(post.display_body(), geometry.body_width);
            viewport.set_content(rendered.lines);
        }
    }
}
