//! # ESC/POS Base Commands
//!
//! Control codes shared by the Woosim / Star mobile printers the app ships
//! with. Streams are built as `String`s because the transport boundary
//! writes text; the RFCOMM transport encodes them to CP437 on the wire.
//!
//! ## Escape Sequence Structure
//!
//! - Two bytes: `ESC @`
//! - Three bytes: `ESC a n`, `ESC ! n`, `ESC t n`
//!
//! Lines are terminated with CRLF; there is no checksum or acknowledgement.

// ============================================================================
// CONTROL CHARACTERS
// ============================================================================

/// ESC (Escape) - Command prefix (0x1B)
pub const ESC: char = '\x1B';

/// Line terminator used by every formatted stream
pub const CRLF: &str = "\r\n";

// ============================================================================
// INITIALIZATION
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Clears the print buffer and resets alignment and print mode.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
///
/// ```
/// use factura_print::protocol::commands;
///
/// assert_eq!(commands::init(), "\x1B@");
/// ```
#[inline]
pub fn init() -> String {
    format!("{ESC}@")
}

// ============================================================================
// PAPER FEED
// ============================================================================

/// Blank lines made of bare CRLF pairs.
///
/// Every job ends with a few so the last line clears the tear bar.
pub fn blank_lines(n: usize) -> String {
    CRLF.repeat(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert_eq!(init().as_bytes(), &[0x1B, 0x40]);
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(blank_lines(2), "\r\n\r\n");
        assert_eq!(blank_lines(0), "");
    }
}
