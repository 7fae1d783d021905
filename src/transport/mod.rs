//! # Printer Transport Layer
//!
//! [`Transport`] is the capability set the rest of the crate needs from a
//! Bluetooth serial stack. Everything above this module talks to
//! `Arc<dyn Transport>` only.
//!
//! ## Available Transports
//!
//! - [`bluetooth`]: BlueZ + RFCOMM serial link (Linux)
//! - [`mock`]: deterministic in-memory printer pair for tests and demos

use async_trait::async_trait;

use crate::error::Result;
use crate::printer::RawDevice;

pub mod bluetooth;
pub mod mock;

pub use bluetooth::RfcommTransport;
pub use mock::MockTransport;

/// Bluetooth serial transport used by the registry and connection manager.
///
/// Implementations keep their own interior state; callers serialize access
/// through the service's operation slot.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether the Bluetooth radio is powered.
    async fn is_enabled(&self) -> Result<bool>;

    /// Power the radio on.
    async fn enable(&self) -> Result<()>;

    /// Devices already bonded with this host.
    async fn list(&self) -> Result<Vec<RawDevice>>;

    /// Start discovery of devices that are not bonded yet.
    async fn discover_unpaired(&self) -> Result<()>;

    /// Unbonded devices seen since discovery started.
    async fn list_unpaired(&self) -> Result<Vec<RawDevice>>;

    /// Stop discovery. Safe to call when no discovery is running.
    async fn cancel_discovery(&self) -> Result<()>;

    async fn pair_device(&self, id: &str) -> Result<()>;

    /// Open the serial link to a device.
    async fn connect(&self, id: &str) -> Result<()>;

    /// Whether [`Transport::disconnect`] does anything on this transport.
    fn supports_disconnect(&self) -> bool {
        true
    }

    async fn disconnect(&self) -> Result<()>;

    /// Send a formatted print job over the open link.
    async fn write(&self, text: &str) -> Result<()>;
}
