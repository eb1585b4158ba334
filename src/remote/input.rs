//! Decoding of raw terminal input bytes sent by a remote client.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const ESC: u8 = 0x1b;
const IAC: u8 = 0xff;
const SB: u8 = 0xfa;
const SE: u8 = 0xf0;

/// Longest unterminated control sequence held before it is dropped.
const MAX_CSI: usize = 64;
/// Longest unterminated telnet subnegotiation held before it is dropped.
const MAX_SB: usize = 1024;

/// Largest terminal dimension accepted from a size report.
pub const MAX_SIZE: u16 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Key(KeyEvent),
    /// Reply to a text-area size request, in columns and rows.
    Resize(u16, u16),
}

/// Turns a byte stream from a raw-mode terminal into key presses and
/// size reports. Sequences split across reads are held until complete.
#[derive(Debug, Default)]
pub struct InputDecoder {
    pending: Vec<u8>,
}

enum Step {
    Emit(usize, Option<SessionInput>),
    Incomplete,
}

impl InputDecoder {
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SessionInput> {
        self.pending.extend_from_slice(bytes);

        let mut inputs = Vec::new();
        let mut pos = 0;
        while pos < self.pending.len() {
            match decode(&self.pending[pos..]) {
                Step::Emit(used, input) => {
                    inputs.extend(input);
                    pos += used;
                }
                Step::Incomplete => break,
            }
        }

        self.pending.drain(..pos);
        inputs
    }
}

fn key(code: KeyCode) -> Option<SessionInput> {
    Some(SessionInput::Key(KeyEvent::new(code, KeyModifiers::NONE)))
}

fn key_with(code: KeyCode, modifiers: KeyModifiers) -> Option<SessionInput> {
    Some(SessionInput::Key(KeyEvent::new(code, modifiers)))
}

fn decode(buf: &[u8]) -> Step {
    match buf[0] {
        ESC => decode_escape(buf),
        IAC => decode_telnet(buf),
        b'\r' => {
            let used = match buf.get(1) {
                Some(b'\n') | Some(0) => 2,
                _ => 1,
            };
            Step::Emit(used, key(KeyCode::Enter))
        }
        b'\n' => Step::Emit(1, key(KeyCode::Enter)),
        b'\t' => Step::Emit(1, key(KeyCode::Tab)),
        0x7f | 0x08 => Step::Emit(1, key(KeyCode::Backspace)),
        0 => Step::Emit(1, None),
        b @ 0x01..=0x1a => {
            let c = (b'a' + b - 1) as char;
            Step::Emit(1, key_with(KeyCode::Char(c), KeyModifiers::CONTROL))
        }
        0x1c..=0x1f => Step::Emit(1, None),
        b if b < 0x80 => Step::Emit(1, key(KeyCode::Char(b as char))),
        b => decode_utf8(buf, b),
    }
}

fn decode_utf8(buf: &[u8], lead: u8) -> Step {
    let len = match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Step::Emit(1, None),
    };
    if buf.len() < len {
        return Step::Incomplete;
    }

    match std::str::from_utf8(&buf[..len])
        .ok()
        .and_then(|s| s.chars().next())
    {
        Some(c) => Step::Emit(len, key(KeyCode::Char(c))),
        None => Step::Emit(1, None),
    }
}

fn decode_escape(buf: &[u8]) -> Step {
    match buf.get(1) {
        // A lone escape at the end of a read is the Esc key.
        None => Step::Emit(1, key(KeyCode::Esc)),
        Some(b'[') => decode_csi(buf),
        Some(b'O') => match buf.get(2) {
            None => Step::Incomplete,
            Some(&b) => Step::Emit(3, ss3_key(b).and_then(key)),
        },
        Some(&ESC) => Step::Emit(1, key(KeyCode::Esc)),
        Some(&b) if (0x20..0x7f).contains(&b) => {
            Step::Emit(2, key_with(KeyCode::Char(b as char), KeyModifiers::ALT))
        }
        Some(_) => Step::Emit(1, key(KeyCode::Esc)),
    }
}

fn ss3_key(b: u8) -> Option<KeyCode> {
    match b {
        b'A' => Some(KeyCode::Up),
        b'B' => Some(KeyCode::Down),
        b'C' => Some(KeyCode::Right),
        b'D' => Some(KeyCode::Left),
        b'H' => Some(KeyCode::Home),
        b'F' => Some(KeyCode::End),
        b'P'..=b'S' => Some(KeyCode::F(b - b'P' + 1)),
        _ => None,
    }
}

fn decode_csi(buf: &[u8]) -> Step {
    let Some(end) = buf[2..].iter().position(|b| (0x40..=0x7e).contains(b)) else {
        if buf.len() > MAX_CSI {
            return Step::Emit(buf.len(), None);
        }
        return Step::Incomplete;
    };
    let end = end + 2;
    let params = std::str::from_utf8(&buf[2..end]).unwrap_or("");
    let used = end + 1;

    let input = match buf[end] {
        b'A' => key(KeyCode::Up),
        b'B' => key(KeyCode::Down),
        b'C' => key(KeyCode::Right),
        b'D' => key(KeyCode::Left),
        b'H' => key(KeyCode::Home),
        b'F' => key(KeyCode::End),
        b'Z' => key_with(KeyCode::BackTab, KeyModifiers::SHIFT),
        b'~' => match params.split(';').next().unwrap_or("") {
            "1" | "7" => key(KeyCode::Home),
            "2" => key(KeyCode::Insert),
            "3" => key(KeyCode::Delete),
            "4" | "8" => key(KeyCode::End),
            "5" => key(KeyCode::PageUp),
            "6" => key(KeyCode::PageDown),
            _ => None,
        },
        b't' => size_report(params),
        _ => None,
    };
    Step::Emit(used, input)
}

/// `CSI 8 ; rows ; cols t`, clamped to `1..=MAX_SIZE` on both axes.
fn size_report(params: &str) -> Option<SessionInput> {
    let mut parts = params.split(';');
    if parts.next()? != "8" {
        return None;
    }
    let rows = parts.next()?.parse::<u16>().ok()?.clamp(1, MAX_SIZE);
    let cols = parts.next()?.parse::<u16>().ok()?.clamp(1, MAX_SIZE);
    Some(SessionInput::Resize(cols, rows))
}

/// Telnet clients interleave option negotiation with keystrokes; skip it.
fn decode_telnet(buf: &[u8]) -> Step {
    match buf.get(1) {
        None => Step::Incomplete,
        Some(&IAC) => Step::Emit(2, None),
        Some(&SB) => {
            let end = buf.windows(2).position(|w| w == [IAC, SE]);
            match end {
                Some(i) => Step::Emit(i + 2, None),
                None if buf.len() > MAX_SB => Step::Emit(buf.len(), None),
                None => Step::Incomplete,
            }
        }
        Some(0xfb..=0xfe) => {
            if buf.len() < 3 {
                Step::Incomplete
            } else {
                Step::Emit(3, None)
            }
        }
        Some(_) => Step::Emit(2, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(inputs: Vec<SessionInput>) -> Vec<KeyCode> {
        inputs
            .into_iter()
            .filter_map(|input| match input {
                SessionInput::Key(key) => Some(key.code),
                SessionInput::Resize(..) => None,
            })
            .collect()
    }

    #[test]
    fn test_plain_characters_and_enter() {
        let mut decoder = InputDecoder::default();
        let inputs = decoder.feed(b"jk\r\nq");
        assert_eq!(
            keys(inputs),
            vec![
                KeyCode::Char('j'),
                KeyCode::Char('k'),
                KeyCode::Enter,
                KeyCode::Char('q')
            ]
        );
    }

    #[test]
    fn test_control_keys() {
        let mut decoder = InputDecoder::default();
        let inputs = decoder.feed(&[0x03, 0x7f, b'\t']);
        assert_eq!(
            inputs[0],
            SessionInput::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
        );
        assert_eq!(keys(inputs[1..].to_vec()), vec![KeyCode::Backspace, KeyCode::Tab]);
    }

    #[test]
    fn test_arrow_and_paging_sequences() {
        let mut decoder = InputDecoder::default();
        let inputs = decoder.feed(b"\x1b[A\x1b[B\x1bOC\x1b[5~\x1b[6~\x1b[H\x1b[4~");
        assert_eq!(
            keys(inputs),
            vec![
                KeyCode::Up,
                KeyCode::Down,
                KeyCode::Right,
                KeyCode::PageUp,
                KeyCode::PageDown,
                KeyCode::Home,
                KeyCode::End
            ]
        );
    }

    #[test]
    fn test_lone_escape() {
        let mut decoder = InputDecoder::default();
        assert_eq!(keys(decoder.feed(b"\x1b")), vec![KeyCode::Esc]);
    }

    #[test]
    fn test_alt_modified_character() {
        let mut decoder = InputDecoder::default();
        let inputs = decoder.feed(b"\x1bx");
        assert_eq!(
            inputs,
            vec![SessionInput::Key(KeyEvent::new(
                KeyCode::Char('x'),
                KeyModifiers::ALT
            ))]
        );
    }

    #[test]
    fn test_sequence_split_across_reads() {
        let mut decoder = InputDecoder::default();
        assert!(decoder.feed(b"\x1b[").is_empty());
        assert!(decoder.feed(b"8;40").is_empty());
        let inputs = decoder.feed(b";120tj");
        assert_eq!(inputs[0], SessionInput::Resize(120, 40));
        assert_eq!(keys(inputs), vec![KeyCode::Char('j')]);
    }

    #[test]
    fn test_utf8_split_across_reads() {
        let mut decoder = InputDecoder::default();
        let bytes = "é".as_bytes();
        assert!(decoder.feed(&bytes[..1]).is_empty());
        assert_eq!(keys(decoder.feed(&bytes[1..])), vec![KeyCode::Char('é')]);
    }

    #[test]
    fn test_other_reports_ignored() {
        let mut decoder = InputDecoder::default();
        assert!(decoder.feed(b"\x1b[4;600;800t").is_empty());
        assert!(decoder.feed(b"\x1b[?1;2c").is_empty());
    }

    #[test]
    fn test_telnet_negotiation_skipped() {
        let mut decoder = InputDecoder::default();
        let inputs = decoder.feed(&[IAC, 0xfd, 0x03, b'q', IAC, SB, 0x1f, 0, 80, IAC, SE, b'j']);
        assert_eq!(keys(inputs), vec![KeyCode::Char('q'), KeyCode::Char('j')]);
    }

    #[test]
    fn test_size_report_clamped() {
        let mut decoder = InputDecoder::default();
        assert_eq!(
            decoder.feed(b"\x1b[8;65535;65535t"),
            vec![SessionInput::Resize(MAX_SIZE, MAX_SIZE)]
        );
        assert_eq!(
            decoder.feed(b"\x1b[8;0;132t"),
            vec![SessionInput::Resize(132, 1)]
        );
        assert!(decoder.feed(b"\x1b[8;99999;80t").is_empty());
    }

    #[test]
    fn test_unterminated_sequence_is_dropped() {
        let mut decoder = InputDecoder::default();
        decoder.feed(b"\x1b[");
        for _ in 0..256 {
            decoder.feed(&[b'1'; 1024]);
            assert!(decoder.pending.len() <= MAX_CSI);
        }

        let mut decoder = InputDecoder::default();
        let mut endless = b"\x1b[".to_vec();
        endless.resize(2 + 2 * MAX_CSI, b';');
        assert!(decoder.feed(&endless).is_empty());
        assert!(decoder.pending.is_empty());
        assert_eq!(keys(decoder.feed(b"\x1b[Aq")), vec![KeyCode::Up, KeyCode::Char('q')]);
    }

    #[test]
    fn test_unterminated_subnegotiation_is_dropped() {
        let mut decoder = InputDecoder::default();
        decoder.feed(&[IAC, SB, 0x18]);
        for _ in 0..64 {
            assert!(decoder.feed(&[0x00; 512]).is_empty());
            assert!(decoder.pending.len() <= MAX_SB + 512);
        }
        decoder.feed(&[IAC, SB]);
        decoder.feed(&[0x00; MAX_SB + 1]);
        assert!(decoder.pending.is_empty());
        assert_eq!(keys(decoder.feed(b"j")), vec![KeyCode::Char('j')]);
    }
}
