pub mod app;
pub mod event;
pub mod layout;
pub mod list;
pub mod viewport;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Terminal,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::app::{AppContext, Result};
use crate::fetcher::posts::PostFetcher;

use self::app::{Browser, Command};
use self::event::{AppEvent, EventHandler};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Runs the browser on the local terminal until the user quits.
pub async fn run(ctx: Arc<AppContext>, latest: bool) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &ctx, latest).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(terminal: &mut Tui, ctx: &AppContext, latest: bool) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(ctx.config.ui.blink_ms));
    events.spawn_terminal_input();

    let mut browser = new_browser(ctx, latest);
    let size = terminal.size()?;
    browser.update(AppEvent::Resize(size.width, size.height));

    drive(terminal, &mut browser, &mut events, ctx).await
}

pub fn new_browser(ctx: &AppContext, latest: bool) -> Browser {
    Browser::new(
        ctx.pipeline.clone(),
        ctx.config.keybindings.clone(),
        latest || ctx.config.ui.latest,
    )
}

/// The session event loop: draw, wait for one event, apply it.
///
/// Shared by the local terminal and remote sessions; only the backend differs.
pub async fn drive<B>(
    terminal: &mut Terminal<B>,
    browser: &mut Browser,
    events: &mut EventHandler,
    ctx: &AppContext,
) -> Result<()>
where
    B: Backend<Error = io::Error>,
{
    while !browser.is_exited() {
        terminal.draw(|frame| {
            layout::render(frame, browser, &ctx.config.ui, &ctx.config.colors)
        })?;

        let Some(event) = events.next().await else {
            break;
        };

        if let AppEvent::Resize(width, height) = event {
            terminal.resize(Rect::new(0, 0, width, height))?;
        }

        match browser.update(event) {
            Some(Command::FetchPosts) => spawn_fetch(ctx.posts.clone(), events.sender()),
            Some(Command::RestartBlink) => events.restart_ticks(),
            None => {}
        }
    }

    Ok(())
}

/// Runs one fetch cycle off the event loop; its only effect is the posted result.
fn spawn_fetch(posts: Arc<PostFetcher>, tx: UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let outcome = posts.fetch_posts().await;
        if tx.send(AppEvent::Fetched(outcome)).is_err() {
            tracing::debug!("Session closed before posts arrived");
        }
    });
}
