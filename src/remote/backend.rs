//! Terminal output for a session on the far side of a socket.
//!
//! Drawing is delegated to crossterm's escape sequences, but nothing here
//! asks the server's own terminal about anything. Size comes from the
//! client's reports and the cursor position is tracked locally.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ratatui::backend::{Backend, ClearType, CrosstermBackend, WindowSize};
use ratatui::buffer::Cell;
use ratatui::layout::{Position, Size};
use tokio::sync::mpsc::UnboundedSender;

/// Last size reported by the client, shared between the input task and
/// the backend.
#[derive(Debug, Clone)]
pub struct SessionSize(Arc<AtomicU32>);

impl SessionSize {
    pub fn new(width: u16, height: u16) -> Self {
        Self(Arc::new(AtomicU32::new(pack(width, height))))
    }

    pub fn set(&self, width: u16, height: u16) {
        self.0.store(pack(width, height), Ordering::Relaxed);
    }

    pub fn get(&self) -> Size {
        let packed = self.0.load(Ordering::Relaxed);
        Size {
            width: (packed >> 16) as u16,
            height: packed as u16,
        }
    }
}

fn pack(width: u16, height: u16) -> u32 {
    (u32::from(width) << 16) | u32::from(height)
}

/// Buffers one frame of terminal output and hands it to the socket writer
/// on flush.
pub struct SessionWriter {
    buf: Vec<u8>,
    tx: UnboundedSender<Vec<u8>>,
}

impl SessionWriter {
    pub fn new(tx: UnboundedSender<Vec<u8>>) -> Self {
        Self {
            buf: Vec::new(),
            tx,
        }
    }
}

impl Write for SessionWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.tx
            .send(std::mem::take(&mut self.buf))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "session closed"))
    }
}

pub struct SessionBackend {
    inner: CrosstermBackend<SessionWriter>,
    size: SessionSize,
    cursor: Position,
}

impl SessionBackend {
    pub fn new(writer: SessionWriter, size: SessionSize) -> Self {
        Self {
            inner: CrosstermBackend::new(writer),
            size,
            cursor: Position::ORIGIN,
        }
    }
}

impl Write for SessionBackend {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.inner.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.inner)
    }
}

impl Backend for SessionBackend {
    type Error = io::Error;

    fn draw<'a, I>(&mut self, content: I) -> io::Result<()>
    where
        I: Iterator<Item = (u16, u16, &'a Cell)>,
    {
        self.inner.draw(content)
    }

    fn append_lines(&mut self, n: u16) -> io::Result<()> {
        self.inner.append_lines(n)
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        self.inner.hide_cursor()
    }

    fn show_cursor(&mut self) -> io::Result<()> {
        self.inner.show_cursor()
    }

    fn get_cursor_position(&mut self) -> io::Result<Position> {
        Ok(self.cursor)
    }

    fn set_cursor_position<P: Into<Position>>(&mut self, position: P) -> io::Result<()> {
        let position = position.into();
        self.inner.set_cursor_position(position)?;
        self.cursor = position;
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.inner.clear()
    }

    fn clear_region(&mut self, clear_type: ClearType) -> io::Result<()> {
        self.inner.clear_region(clear_type)
    }

    fn size(&self) -> io::Result<Size> {
        Ok(self.size.get())
    }

    fn window_size(&mut self) -> io::Result<WindowSize> {
        Ok(WindowSize {
            columns_rows: self.size.get(),
            pixels: Size {
                width: 0,
                height: 0,
            },
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        Backend::flush(&mut self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::layout::Rect;
    use ratatui::widgets::Paragraph;
    use ratatui::{Terminal, TerminalOptions, Viewport};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn drain(rx: &mut UnboundedReceiver<Vec<u8>>) -> String {
        let mut output = Vec::new();
        while let Ok(bytes) = rx.try_recv() {
            output.extend(bytes);
        }
        String::from_utf8_lossy(&output).into_owned()
    }

    #[test]
    fn test_session_writer_sends_on_flush() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut writer = SessionWriter::new(tx);
        writer.write_all(b"abc").unwrap();
        writer.write_all(b"def").unwrap();
        assert!(rx.try_recv().is_err());

        writer.flush().unwrap();
        assert_eq!(rx.try_recv().unwrap(), b"abcdef".to_vec());

        writer.flush().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_session_writer_reports_closed_peer() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut writer = SessionWriter::new(tx);
        writer.write_all(b"x").unwrap();
        assert_eq!(
            writer.flush().unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
    }

    #[test]
    fn test_size_follows_client_reports() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let size = SessionSize::new(80, 24);
        let mut backend = SessionBackend::new(SessionWriter::new(tx), size.clone());
        assert_eq!(backend.size().unwrap(), Size { width: 80, height: 24 });

        size.set(500, 1);
        assert_eq!(backend.size().unwrap(), Size { width: 500, height: 1 });
        let window = backend.window_size().unwrap();
        assert_eq!(window.columns_rows, Size { width: 500, height: 1 });
        assert_eq!(window.pixels, Size { width: 0, height: 0 });
    }

    #[test]
    fn test_cursor_tracked_locally() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut backend = SessionBackend::new(SessionWriter::new(tx), SessionSize::new(80, 24));
        assert_eq!(backend.get_cursor_position().unwrap(), Position::ORIGIN);

        backend.set_cursor_position(Position { x: 3, y: 4 }).unwrap();
        assert_eq!(
            backend.get_cursor_position().unwrap(),
            Position { x: 3, y: 4 }
        );
        assert!(drain(&mut rx).contains("\x1b[5;4H"));
    }

    #[test]
    fn test_terminal_clears_and_resizes_from_session_size() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let size = SessionSize::new(80, 24);
        let backend = SessionBackend::new(SessionWriter::new(tx), size.clone());
        let mut terminal = Terminal::with_options(
            backend,
            TerminalOptions {
                viewport: Viewport::Fixed(Rect::new(0, 0, 80, 24)),
            },
        )
        .unwrap();
        terminal.clear().unwrap();

        size.set(100, 30);
        terminal.resize(Rect::new(0, 0, 100, 30)).unwrap();
        terminal
            .draw(|frame| frame.render_widget(Paragraph::new("hello session"), frame.area()))
            .unwrap();

        assert_eq!(terminal.size().unwrap(), Size { width: 100, height: 30 });
        assert!(drain(&mut rx).contains("hello session"));
    }
}
