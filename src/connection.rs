//! # Connection Manager
//!
//! Owns the one active printer link.
//!
//! ```text
//!                 connect(d) ok
//!   Disconnected ───────────────▶ Connected(d)
//!        ▲                            │
//!        └──── disconnect() / connect(d2) failure
//! ```
//!
//! `connect` on a live link disconnects it first, so two links are never open
//! at once. Connection state is published on a `watch` channel; only this
//! module writes it.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{PrinterError, Result};
use crate::printer::PrinterDevice;
use crate::transport::Transport;

/// Observable connection state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected(PrinterDevice),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn printer(&self) -> Option<&PrinterDevice> {
        match self {
            Self::Connected(device) => Some(device),
            Self::Disconnected => None,
        }
    }
}

pub struct ConnectionManager {
    transport: Option<Arc<dyn Transport>>,
    state: watch::Sender<ConnectionState>,
}

impl ConnectionManager {
    /// `transport` is `None` where Bluetooth is unavailable.
    pub fn new(transport: Option<Arc<dyn Transport>>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self { transport, state }
    }

    /// Open a link to `device`, closing any current link first.
    pub async fn connect(&self, device: &PrinterDevice) -> bool {
        let Some(transport) = &self.transport else {
            return false;
        };

        if self.is_connected_to_printer() {
            self.disconnect().await;
        }

        tracing::info!(id = %device.id, name = %device.name, "connecting to printer");
        match transport.connect(&device.id).await {
            Ok(()) => {
                self.state.send_replace(ConnectionState::Connected(device.clone()));
                tracing::info!(id = %device.id, "printer connected");
                true
            }
            Err(e) => {
                self.state.send_replace(ConnectionState::Disconnected);
                tracing::warn!(id = %device.id, error = %e, "printer connection failed");
                false
            }
        }
    }

    /// Close the link. Idempotent.
    ///
    /// State is cleared once the transport call returns, even when it fails;
    /// `false` only reports that failure.
    pub async fn disconnect(&self) -> bool {
        let Some(device) = self.current_printer() else {
            return true;
        };

        let closed = match self.transport.as_ref().filter(|t| t.supports_disconnect()) {
            Some(transport) => match transport.disconnect().await {
                Ok(()) => {
                    tracing::info!(id = %device.id, "printer disconnected");
                    true
                }
                Err(e) => {
                    tracing::warn!(id = %device.id, error = %e, "transport disconnect failed");
                    false
                }
            },
            None => true,
        };

        self.state.send_replace(ConnectionState::Disconnected);
        closed
    }

    /// Send a print job over the active link.
    pub async fn write(&self, text: &str) -> Result<()> {
        let transport = self.transport.as_ref().ok_or(PrinterError::Unavailable)?;
        if !self.is_connected_to_printer() {
            return Err(PrinterError::NotConnected);
        }
        transport.write(text).await
    }

    pub fn is_connected_to_printer(&self) -> bool {
        self.state.borrow().is_connected()
    }

    pub fn current_printer(&self) -> Option<PrinterDevice> {
        self.state.borrow().printer().cloned()
    }

    /// Receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}
