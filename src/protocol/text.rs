//! # Text Alignment and Print Modes
//!
//! ## Alignment (ESC a n)
//!
//! ```text
//! Left aligned (default)    |LEFT TEXT
//! Center aligned            |  CENTER TEXT
//! Right aligned             |      RIGHT TEXT
//! ```
//!
//! ## Print Mode (ESC ! n)
//!
//! One byte of flags selects emphasis and character size together:
//!
//! | Bit | Hex  | Effect        |
//! |-----|------|---------------|
//! | 3   | 0x08 | Emphasized    |
//! | 4   | 0x10 | Double height |
//! | 5   | 0x20 | Double width  |
//!
//! Sending `ESC ! 0` returns to normal text.

use std::ops::BitOr;

use super::commands::ESC;

// ============================================================================
// TEXT ALIGNMENT
// ============================================================================

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Set Text Alignment (ESC a n)
///
/// | Format  | Bytes      |
/// |---------|------------|
/// | ASCII   | ESC a n    |
/// | Hex     | 1B 61 n    |
///
/// Takes effect at the start of the next line and is reset by `ESC @`.
///
/// ```
/// use factura_print::protocol::text::{align, Alignment};
///
/// assert_eq!(align(Alignment::Center).as_bytes(), &[0x1B, 0x61, 0x01]);
/// ```
pub fn align(alignment: Alignment) -> String {
    format!("{ESC}a{}", char::from(alignment as u8))
}

// ============================================================================
// PRINT MODE
// ============================================================================

/// Print-mode flag byte for `ESC ! n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrintMode(u8);

impl PrintMode {
    pub const NORMAL: Self = Self(0x00);
    pub const EMPHASIZED: Self = Self(0x08);
    pub const DOUBLE_HEIGHT: Self = Self(0x10);
    pub const DOUBLE_WIDTH: Self = Self(0x20);
    /// Double height and double width.
    pub const LARGE: Self = Self(0x30);
    /// Large plus emphasized; the widest, heaviest mode.
    pub const LARGE_WIDE: Self = Self(0x38);

    /// Raw flag byte.
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for PrintMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// # Select Print Mode (ESC ! n)
///
/// | Format  | Bytes      |
/// |---------|------------|
/// | ASCII   | ESC ! n    |
/// | Hex     | 1B 21 n    |
///
/// ```
/// use factura_print::protocol::text::{print_mode, PrintMode};
///
/// assert_eq!(print_mode(PrintMode::DOUBLE_HEIGHT).as_bytes(), &[0x1B, 0x21, 0x10]);
/// ```
pub fn print_mode(mode: PrintMode) -> String {
    format!("{ESC}!{}", char::from(mode.bits()))
}
