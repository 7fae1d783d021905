//! # Printer Devices
//!
//! [`RawDevice`] is what a transport reports; [`PrinterDevice`] is the
//! normalized descriptor handed to the rest of the crate. Both are rebuilt on
//! every list or scan and never persisted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Name substituted when the transport reports none (or only whitespace).
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown Device";

/// A device record as reported by the transport, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDevice {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub rssi: Option<i16>,
}

impl RawDevice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            address: None,
            rssi: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// A discovered or paired Bluetooth printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterDevice {
    /// Transport identifier, stable per pairing.
    pub id: String,
    /// Human-readable name; never empty.
    pub name: String,
    pub address: Option<String>,
    /// RSSI in dBm, when the transport reports it.
    pub signal_strength: Option<i16>,
}

impl From<RawDevice> for PrinterDevice {
    fn from(raw: RawDevice) -> Self {
        let name = raw
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string());
        Self {
            id: raw.id,
            name,
            address: raw.address.filter(|a| !a.is_empty()),
            signal_strength: raw.rssi,
        }
    }
}

/// Normalize a transport result set.
///
/// Records with an empty id are dropped and repeated ids keep the first
/// occurrence, so ids are unique within the returned list.
pub fn normalize(raw: Vec<RawDevice>) -> Vec<PrinterDevice> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|r| !r.id.is_empty())
        .filter(|r| seen.insert(r.id.clone()))
        .map(PrinterDevice::from)
        .collect()
}
