//! Service configuration.
//!
//! Loaded from a JSON file; every field has a default so `{}` is a valid
//! config.
//!
//! ```json
//! {
//!   "platform": { "os": "android", "api_level": 30 },
//!   "modern_permissions": "delegate",
//!   "scan_timeout_ms": 10000,
//!   "printer_match": "Woosim",
//!   "receipt": { "title": "FACTURA", "line_width": 32 },
//!   "transport": { "kind": "rfcomm", "rfcomm_channel": 0 }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PrinterError, Result};
use crate::platform::{ModernPermissionPolicy, Platform};
use crate::receipt::ReceiptLayout;
use crate::registry::DEFAULT_SCAN_TIMEOUT;
use crate::transport::bluetooth::{DEFAULT_CHUNK_DELAY_MS, DEFAULT_CHUNK_SIZE};

/// Which transport the service drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Canned in-memory printers.
    Mock,
    /// BlueZ + RFCOMM serial link.
    #[default]
    Rfcomm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
    /// N in `/dev/rfcommN`.
    pub rfcomm_channel: u8,
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            rfcomm_channel: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay_ms: DEFAULT_CHUNK_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub platform: Platform,
    pub modern_permissions: ModernPermissionPolicy,
    pub scan_timeout_ms: u64,
    /// Name fragment of the preferred printer.
    pub printer_match: String,
    pub receipt: ReceiptLayout,
    pub transport: TransportConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            modern_permissions: ModernPermissionPolicy::default(),
            scan_timeout_ms: DEFAULT_SCAN_TIMEOUT.as_millis() as u64,
            printer_match: "Woosim".to_string(),
            receipt: ReceiptLayout::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PrinterError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan_timeout_ms == 0 {
            return Err(PrinterError::Config("scan_timeout_ms must be positive".into()));
        }
        if self.printer_match.trim().is_empty() {
            return Err(PrinterError::Config("printer_match must not be empty".into()));
        }
        if self.receipt.line_width < 16 {
            return Err(PrinterError::Config(format!(
                "receipt.line_width {} is narrower than any supported paper",
                self.receipt.line_width
            )));
        }
        if self.transport.chunk_size == 0 {
            return Err(PrinterError::Config("transport.chunk_size must be positive".into()));
        }
        Ok(())
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }
}
