//! Builder for printer command streams.
//!
//! ```
//! use factura_print::protocol::{CommandStream, text::{Alignment, PrintMode}};
//!
//! let job = CommandStream::new()
//!     .init()
//!     .align(Alignment::Center)
//!     .styled(PrintMode::EMPHASIZED, "RECIBO")
//!     .line("gracias")
//!     .build();
//!
//! assert!(job.starts_with("\x1B@\x1Ba\x01"));
//! assert!(job.ends_with("gracias\r\n"));
//! ```

use super::commands::{self, CRLF};
use super::text::{self, Alignment, PrintMode};

/// Accumulates text and control codes into one print job.
#[derive(Debug, Clone, Default)]
pub struct CommandStream {
    buf: String,
}

impl CommandStream {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(512),
        }
    }

    /// ESC @
    pub fn init(mut self) -> Self {
        self.buf.push_str(&commands::init());
        self
    }

    pub fn align(mut self, alignment: Alignment) -> Self {
        self.buf.push_str(&text::align(alignment));
        self
    }

    pub fn mode(mut self, mode: PrintMode) -> Self {
        self.buf.push_str(&text::print_mode(mode));
        self
    }

    /// One line in `mode`, then back to normal text.
    pub fn styled(self, mode: PrintMode, line: &str) -> Self {
        self.mode(mode).line(line).mode(PrintMode::NORMAL)
    }

    /// Literal text followed by CRLF.
    pub fn line(mut self, line: &str) -> Self {
        self.buf.push_str(line);
        self.buf.push_str(CRLF);
        self
    }

    /// `label: value` on a single line.
    pub fn field(self, label: &str, value: &str) -> Self {
        self.line(&format!("{label}: {value}"))
    }

    /// Horizontal rule `width` characters wide.
    pub fn rule(self, ch: char, width: usize) -> Self {
        let rule: String = std::iter::repeat_n(ch, width).collect();
        self.line(&rule)
    }

    pub fn blank(mut self, lines: usize) -> Self {
        self.buf.push_str(&commands::blank_lines(lines));
        self
    }

    pub fn build(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stream() {
        assert_eq!(CommandStream::new().build(), "");
    }

    #[test]
    fn test_styled_resets_mode() {
        let s = CommandStream::new().styled(PrintMode::DOUBLE_HEIGHT, "X").build();
        assert_eq!(s, "\x1B!\x10X\r\n\x1B!\x00");
    }

    #[test]
    fn test_field_and_rule() {
        let s = CommandStream::new().field("Folio", "12").rule('-', 4).build();
        assert_eq!(s, "Folio: 12\r\n----\r\n");
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(CommandStream::new().blank(3).build(), "\r\n\r\n\r\n");
    }
}
