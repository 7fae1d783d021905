//! # Factura Print - Bluetooth Receipt Printing
//!
//! Printing subsystem of the Factura Móvil invoicing app. It finds mobile
//! thermal printers over Bluetooth, keeps one connection open and prints
//! invoices and test pages as ESC/POS text.
//!
//! - **Permission gate**: platform-specific Bluetooth permission checks
//! - **Device registry**: paired listing and timed discovery
//! - **Connection manager**: the single active printer link
//! - **Receipt formatter**: ESC/POS command streams for invoices and test pages
//! - **Service facade**: the one object UI code holds
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use factura_print::{
//!     Invoice, PrinterService, ServiceConfig,
//!     platform::StaticPermissions,
//!     transport::{MockTransport, Transport},
//! };
//!
//! # async fn demo() -> factura_print::Result<()> {
//! let config = ServiceConfig::default();
//! let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
//! let service = PrinterService::new(
//!     &config,
//!     Some(transport),
//!     Arc::new(StaticPermissions::granted()),
//! );
//!
//! if service.connect_to_woosim_printer().await {
//!     let invoice: Invoice = serde_json::from_str(r#"{"assignedFolio": 42, "total": 9990}"#)?;
//!     service.print_invoice(Some(&invoice)).await;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`platform`] | Platform detection and permission gate |
//! | [`registry`] | Paired listing and discovery |
//! | [`connection`] | Active printer link and its state |
//! | [`protocol`] | ESC/POS command builders |
//! | [`receipt`] | Test page, invoice and PDF notice layouts |
//! | [`service`] | Facade with the operation slot |
//! | [`transport`] | Bluetooth backends |
//! | [`printer`] | Device records and printer models |
//! | [`config`] | JSON service configuration |
//! | [`error`] | Error types |

pub mod config;
pub mod connection;
pub mod error;
pub mod invoice;
pub mod platform;
pub mod printer;
pub mod protocol;
pub mod receipt;
pub mod registry;
pub mod service;
pub mod transport;

// Re-exports for convenience
pub use config::ServiceConfig;
pub use connection::ConnectionState;
pub use error::{PrinterError, Result};
pub use invoice::Invoice;
pub use printer::{PrinterDevice, PrinterModel};
pub use service::{PdfPrintOutcome, PrinterService};
