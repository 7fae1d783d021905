//! # Printer Service
//!
//! The entry point UI code talks to. One instance is built at startup and
//! shared by reference (`Arc<PrinterService>`); it composes the permission
//! gate, device registry, connection manager and receipt formatter.
//!
//! ## Operation Slot
//!
//! Bluetooth stacks misbehave when a connect races a scan or a write. Every
//! operation that reaches the transport holds the service's operation slot
//! (a fair async mutex) for its whole duration, so concurrent callers run
//! one at a time in arrival order.
//!
//! ## Failure Contract
//!
//! Methods return `false`, an empty list or [`PdfPrintOutcome::NotPrinted`]
//! on failure. The one error that escapes is
//! [`PrinterError::PermissionDenied`](crate::PrinterError::PermissionDenied)
//! from [`PrinterService::list_paired`] and [`PrinterService::scan`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};

use crate::config::{ServiceConfig, TransportKind};
use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::Result;
use crate::invoice::Invoice;
use crate::platform::{PermissionBackend, PermissionGate};
use crate::printer::model::name_contains;
use crate::printer::{PrinterDevice, PrinterModel};
use crate::receipt::ReceiptFormatter;
use crate::registry::DeviceRegistry;
use crate::transport::{MockTransport, RfcommTransport, Transport};

/// Result of [`PrinterService::print_pdf`].
///
/// PDF rasterization does not exist yet; the best outcome is a printed
/// notice saying so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfPrintOutcome {
    /// The "not implemented" notice was printed in place of the document.
    PlaceholderPrinted,
    /// Nothing was printed.
    NotPrinted,
}

pub struct PrinterService {
    registry: DeviceRegistry,
    connection: ConnectionManager,
    formatter: ReceiptFormatter,
    scan_timeout: Duration,
    printer_match: String,
    slot: Mutex<()>,
}

impl PrinterService {
    /// Build a service around an explicit transport.
    ///
    /// Pass `None` where no Bluetooth stack exists; every operation then
    /// reports failure without side effects.
    pub fn new(
        config: &ServiceConfig,
        transport: Option<Arc<dyn Transport>>,
        permissions: Arc<dyn PermissionBackend>,
    ) -> Self {
        let gate = PermissionGate::new(config.platform, config.modern_permissions, permissions);
        Self {
            registry: DeviceRegistry::new(transport.clone(), gate),
            connection: ConnectionManager::new(transport),
            formatter: ReceiptFormatter::new(config.receipt.clone()),
            scan_timeout: config.scan_timeout(),
            printer_match: config.printer_match.clone(),
            slot: Mutex::new(()),
        }
    }

    /// Build the transport named in `config`.
    ///
    /// No transport is created for the web platform.
    pub fn from_config(config: &ServiceConfig, permissions: Arc<dyn PermissionBackend>) -> Self {
        let transport: Option<Arc<dyn Transport>> = if !config.platform.supports_bluetooth() {
            None
        } else {
            match config.transport.kind {
                TransportKind::Mock => Some(Arc::new(MockTransport::new())),
                TransportKind::Rfcomm => Some(Arc::new(
                    RfcommTransport::new(config.transport.rfcomm_channel)
                        .with_chunk_size(config.transport.chunk_size)
                        .with_chunk_delay(Duration::from_millis(config.transport.chunk_delay_ms)),
                )),
            }
        };
        tracing::debug!(
            platform = ?config.platform,
            transport = ?config.transport.kind,
            available = transport.is_some(),
            "printer service created"
        );
        Self::new(config, transport, permissions)
    }

    /// False on the web or without a transport.
    pub fn is_available(&self) -> bool {
        self.registry.is_available()
    }

    pub async fn check_permissions(&self) -> bool {
        self.is_available() && self.registry.gate().check_permissions().await
    }

    pub async fn request_permissions(&self) -> bool {
        self.is_available() && self.registry.gate().request_permissions().await
    }

    // ------------------------------------------------------------------------
    // Discovery
    // ------------------------------------------------------------------------

    pub async fn list_paired(&self) -> Result<Vec<PrinterDevice>> {
        if !self.is_available() {
            return Ok(Vec::new());
        }
        let _slot = self.slot.lock().await;
        self.registry.list_paired().await
    }

    /// Scan for unpaired printers; `None` uses the configured window.
    pub async fn scan(&self, timeout: Option<Duration>) -> Result<Vec<PrinterDevice>> {
        if !self.is_available() {
            return Ok(Vec::new());
        }
        let _slot = self.slot.lock().await;
        self.registry
            .scan(timeout.unwrap_or(self.scan_timeout))
            .await
    }

    // ------------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------------

    pub async fn connect(&self, device: &PrinterDevice) -> bool {
        if !self.is_available() {
            return false;
        }
        let _slot = self.slot.lock().await;
        self.connection.connect(device).await
    }

    pub async fn disconnect(&self) -> bool {
        if !self.is_available() {
            return false;
        }
        let _slot = self.slot.lock().await;
        self.connection.disconnect().await
    }

    pub fn is_connected_to_printer(&self) -> bool {
        self.connection.is_connected_to_printer()
    }

    pub fn current_printer(&self) -> Option<PrinterDevice> {
        self.connection.current_printer()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// Connect to the first printer whose name satisfies `matches`.
    ///
    /// Order: current printer, then paired devices, then a scan whose match
    /// is paired (failures logged) and connected.
    pub async fn connect_to_named_printer<F>(&self, matches: F) -> bool
    where
        F: Fn(&str) -> bool + Sync,
    {
        if !self.is_available() {
            return false;
        }
        let _slot = self.slot.lock().await;
        self.connect_matching(&matches).await
    }

    /// Connect to a Woosim printer, pairing a new one if needed.
    pub async fn connect_to_woosim_printer(&self) -> bool {
        self.connect_to_named_printer(|name| PrinterModel::WOOSIM.matches(name))
            .await
    }

    /// Connect to the printer named by the `printer_match` setting.
    pub async fn connect_to_preferred_printer(&self) -> bool {
        let fragment = self.printer_match.clone();
        self.connect_to_named_printer(move |name| name_contains(name, &fragment))
            .await
    }

    async fn connect_matching<F>(&self, matches: &F) -> bool
    where
        F: Fn(&str) -> bool + Sync,
    {
        if let Some(current) = self.connection.current_printer() {
            if matches(&current.name) {
                tracing::debug!(id = %current.id, "already connected to matching printer");
                return true;
            }
        }

        let paired = match self.registry.list_paired().await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!(error = %e, "cannot list paired printers");
                return false;
            }
        };
        if let Some(device) = paired.into_iter().find(|d| matches(&d.name)) {
            return self.connection.connect(&device).await;
        }

        tracing::info!("no paired match, scanning");
        let found = match self.registry.scan(self.scan_timeout).await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!(error = %e, "cannot scan for printers");
                return false;
            }
        };
        let Some(device) = found.into_iter().find(|d| matches(&d.name)) else {
            tracing::info!("no matching printer found");
            return false;
        };

        if let Some(transport) = self.registry.transport() {
            match transport.pair_device(&device.id).await {
                Ok(()) => tracing::info!(id = %device.id, "paired"),
                Err(e) => tracing::warn!(id = %device.id, error = %e, "pairing failed, connecting anyway"),
            }
        }
        self.connection.connect(&device).await
    }

    // ------------------------------------------------------------------------
    // Printing
    // ------------------------------------------------------------------------

    /// Send raw text (may contain control codes) to the connected printer.
    pub async fn print_text(&self, text: &str) -> bool {
        if !self.is_available() {
            return false;
        }
        let _slot = self.slot.lock().await;
        self.send(text).await
    }

    pub async fn print_test_page(&self) -> bool {
        if !self.is_available() {
            return false;
        }
        let _slot = self.slot.lock().await;
        let Some(printer) = self.connection.current_printer() else {
            tracing::warn!("test page requested with no printer connected");
            return false;
        };
        let page = self.formatter.test_page(&printer.name);
        self.send(&page).await
    }

    /// Print an invoice receipt. `None` prints nothing and returns false.
    pub async fn print_invoice(&self, invoice: Option<&Invoice>) -> bool {
        if !self.is_available() {
            return false;
        }
        let Some(receipt) = self.formatter.invoice_receipt(invoice) else {
            tracing::warn!("print_invoice called without an invoice");
            return false;
        };
        let _slot = self.slot.lock().await;
        self.send(&receipt).await
    }

    /// Print the PDF placeholder notice for `url`.
    pub async fn print_pdf(&self, url: &str) -> PdfPrintOutcome {
        if !self.is_available() {
            return PdfPrintOutcome::NotPrinted;
        }
        tracing::warn!("PDF conversion not implemented, printing notice");
        let notice = self.formatter.pdf_placeholder(url);
        let _slot = self.slot.lock().await;
        if self.send(&notice).await {
            PdfPrintOutcome::PlaceholderPrinted
        } else {
            PdfPrintOutcome::NotPrinted
        }
    }

    async fn send(&self, text: &str) -> bool {
        if !self.connection.is_connected_to_printer() {
            tracing::warn!("print requested with no printer connected");
            return false;
        }
        match self.connection.write(text).await {
            Ok(()) => {
                tracing::debug!(bytes = text.len(), "print job sent");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "print failed");
                false
            }
        }
    }
}
