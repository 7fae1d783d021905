//! # Printer Module
//!
//! Device descriptors and printer model matching.
//!
//! ## Modules
//!
//! - [`device`]: transport records and their normalized form
//! - [`model`]: printer families matched by device name

pub mod device;
pub mod model;

pub use device::{PrinterDevice, RawDevice, UNKNOWN_DEVICE_NAME};
pub use model::PrinterModel;
