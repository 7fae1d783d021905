//! # ESC/POS Command Language
//!
//! Command builders for the escape-sequence language understood by the
//! mobile thermal printers (Woosim WSP series, Star SM series).
//!
//! ## Module Structure
//!
//! - [`commands`]: escape prefix, initialize, blank lines
//! - [`text`]: alignment and print modes (emphasis, size)
//! - [`stream`]: [`CommandStream`] builder used by the receipt formatter
//! - [`codepage`]: CP437 encoding for the wire
//!
//! ## Usage Example
//!
//! ```
//! use factura_print::protocol::{commands, text};
//!
//! let mut job = String::new();
//! job.push_str(&commands::init());
//! job.push_str(&text::align(text::Alignment::Center));
//! job.push_str(&text::print_mode(text::PrintMode::EMPHASIZED));
//! job.push_str("RECIBO\r\n");
//! job.push_str(&text::print_mode(text::PrintMode::NORMAL));
//! ```

pub mod codepage;
pub mod commands;
pub mod stream;
pub mod text;

pub use stream::CommandStream;
