//! Serving the browser to remote terminals.
//!
//! Each TCP connection gets its own [`Browser`], event queue and ratatui
//! terminal writing to the socket. The client is expected to put its own
//! terminal in raw mode, e.g. `socat -,raw,echo=0 tcp:host:23234`.

pub mod backend;
pub mod input;

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{layout::Rect, Terminal, TerminalOptions, Viewport};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::app::{AppContext, Result};
use crate::tui::event::{AppEvent, EventHandler};
use crate::tui::{self, app::Browser};

use self::backend::{SessionBackend, SessionSize, SessionWriter};
use self::input::{InputDecoder, SessionInput};

/// Size assumed until the client answers the size request.
const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// Asks the terminal to report its text area size as `CSI 8 ; rows ; cols t`.
const SIZE_REQUEST: &[u8] = b"\x1b[18t";

/// Accepts connections until Ctrl+C, running one browser per connection.
pub async fn serve(ctx: Arc<AppContext>, host: &str, port: u16, latest: bool) -> Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    tracing::info!("Listening for sessions on {}", listener.local_addr()?);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer, ctx, latest).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down session server");
                break;
            }
        }
    }

    Ok(())
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    ctx: Arc<AppContext>,
    latest: bool,
) {
    tracing::info!("Session started for {}", peer);
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("Could not disable Nagle for {}: {}", peer, e);
    }

    match run_session(stream, ctx, latest).await {
        Ok(()) => tracing::info!("Session ended for {}", peer),
        Err(e) => tracing::warn!("Session for {} failed: {}", peer, e),
    }
}

/// Runs one browser over an arbitrary byte stream until it exits or the
/// peer disconnects.
pub async fn run_session<S>(stream: S, ctx: Arc<AppContext>, latest: bool) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let writer_task = tokio::spawn(async move {
        while let Some(bytes) = out_rx.recv().await {
            if writer.write_all(&bytes).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let (width, height) = DEFAULT_SIZE;
    let size = SessionSize::new(width, height);

    let mut events = EventHandler::new(Duration::from_millis(ctx.config.ui.blink_ms));
    let input_tx = events.sender();
    let reported = size.clone();
    let reader_task = tokio::spawn(async move {
        let mut decoder = InputDecoder::default();
        let mut buf = [0u8; 1024];
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            for input in decoder.feed(&buf[..n]) {
                let event = match input {
                    SessionInput::Key(key) => AppEvent::Key(key),
                    SessionInput::Resize(width, height) => {
                        reported.set(width, height);
                        AppEvent::Resize(width, height)
                    }
                };
                if input_tx.send(event).is_err() {
                    return;
                }
            }
        }
        let _ = input_tx.send(AppEvent::Disconnected);
    });

    let mut terminal = Terminal::with_options(
        SessionBackend::new(SessionWriter::new(out_tx), size),
        TerminalOptions {
            viewport: Viewport::Fixed(Rect::new(0, 0, width, height)),
        },
    )?;
    execute!(terminal.backend_mut(), EnterAlternateScreen, Hide)?;
    terminal.backend_mut().write_all(SIZE_REQUEST)?;
    Write::flush(terminal.backend_mut())?;
    terminal.clear()?;

    let mut browser: Browser = tui::new_browser(&ctx, latest);
    browser.update(AppEvent::Resize(width, height));

    let result = tui::drive(&mut terminal, &mut browser, &mut events, &ctx).await;

    // The peer may already be gone; nothing to report if this fails.
    let _ = execute!(terminal.backend_mut(), Show, LeaveAlternateScreen);
    reader_task.abort();
    drop(terminal);
    let _ = writer_task.await;

    result
}
