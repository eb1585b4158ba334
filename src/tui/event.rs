use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;

use crate::fetcher::FetchOutcome;

/// Everything the browser reacts to, delivered one at a time in arrival order.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Tick,
    Resize(u16, u16),
    Fetched(FetchOutcome),
    /// The terminal on the other end went away.
    Disconnected,
}

/// Single event queue for one browser session.
///
/// Input sources, the ticker and background fetches all post onto the same
/// channel; the session loop is the only consumer.
pub struct EventHandler {
    tx: UnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
    restart: Arc<Notify>,
}

impl EventHandler {
    /// Creates the queue and starts a ticker posting [`AppEvent::Tick`] every `tick_rate`.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let restart = Arc::new(Notify::new());

        let ticker = tx.clone();
        let restarted = restart.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_rate);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if ticker.send(AppEvent::Tick).is_err() {
                            break;
                        }
                    }
                    _ = restarted.notified() => interval.reset(),
                }
            }
        });

        Self { tx, rx, restart }
    }

    /// Makes the next tick arrive one full period from now.
    pub fn restart_ticks(&self) {
        self.restart.notify_one();
    }

    pub fn sender(&self) -> UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    /// Forwards key presses and resizes from the local terminal.
    pub fn spawn_terminal_input(&self) {
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            while !tx.is_closed() {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        tracing::error!("Terminal input error: {}", e);
                        break;
                    }
                }

                let forwarded = match event::read() {
                    Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                        tx.send(AppEvent::Key(key))
                    }
                    Ok(Event::Resize(width, height)) => tx.send(AppEvent::Resize(width, height)),
                    Ok(_) => Ok(()),
                    Err(e) => {
                        tracing::error!("Terminal input error: {}", e);
                        break;
                    }
                };
                if forwarded.is_err() {
                    break;
                }
            }
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Back,
    Select,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Filter,
    None,
}
