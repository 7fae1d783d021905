//! # Device Registry
//!
//! Lists paired printers and scans for new ones.
//!
//! Both listings require Bluetooth permission. When the check fails the
//! registry prompts once; a refused prompt is the only error it returns.
//! Transport failures are logged and yield an empty list.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{PrinterError, Result};
use crate::platform::PermissionGate;
use crate::printer::{PrinterDevice, device};
use crate::transport::Transport;

/// Discovery window used when the caller gives none.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_millis(10_000);

pub struct DeviceRegistry {
    transport: Option<Arc<dyn Transport>>,
    gate: PermissionGate,
}

impl DeviceRegistry {
    pub fn new(transport: Option<Arc<dyn Transport>>, gate: PermissionGate) -> Self {
        Self { transport, gate }
    }

    /// True when a transport exists and the platform is not the web.
    pub fn is_available(&self) -> bool {
        self.transport.is_some() && self.gate.platform().supports_bluetooth()
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    /// The transport, but only where Bluetooth is usable.
    pub(crate) fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref().filter(|_| self.is_available())
    }

    /// Previously paired devices.
    pub async fn list_paired(&self) -> Result<Vec<PrinterDevice>> {
        let Some(transport) = self.transport() else {
            return Ok(Vec::new());
        };
        self.ensure_permission().await?;

        if let Err(e) = ensure_enabled(transport.as_ref()).await {
            tracing::warn!(error = %e, "Bluetooth radio unavailable");
            return Ok(Vec::new());
        }

        match transport.list().await {
            Ok(raw) => {
                let devices = device::normalize(raw);
                tracing::debug!(count = devices.len(), "paired devices");
                Ok(devices)
            }
            Err(e) => {
                tracing::warn!(error = %e, "listing paired devices failed");
                Ok(Vec::new())
            }
        }
    }

    /// Discover unpaired devices for the whole `timeout`.
    ///
    /// Discovery is cancelled afterwards whatever the outcome.
    pub async fn scan(&self, timeout: Duration) -> Result<Vec<PrinterDevice>> {
        let Some(transport) = self.transport() else {
            return Ok(Vec::new());
        };
        self.ensure_permission().await?;

        tracing::info!(timeout_ms = timeout.as_millis() as u64, "scanning for printers");
        let found = discover(transport.as_ref(), timeout).await;

        if let Err(e) = transport.cancel_discovery().await {
            tracing::warn!(error = %e, "cancelling discovery failed");
        }

        match found {
            Ok(raw) => {
                let devices = device::normalize(raw);
                tracing::info!(count = devices.len(), "scan complete");
                Ok(devices)
            }
            Err(e) => {
                tracing::warn!(error = %e, "scan failed");
                Ok(Vec::new())
            }
        }
    }

    async fn ensure_permission(&self) -> Result<()> {
        if self.gate.check_permissions().await || self.gate.request_permissions().await {
            Ok(())
        } else {
            Err(PrinterError::PermissionDenied)
        }
    }
}

async fn ensure_enabled(transport: &dyn Transport) -> Result<()> {
    if !transport.is_enabled().await? {
        tracing::info!("powering on Bluetooth");
        transport.enable().await?;
    }
    Ok(())
}

async fn discover(
    transport: &dyn Transport,
    timeout: Duration,
) -> Result<Vec<crate::printer::RawDevice>> {
    ensure_enabled(transport).await?;
    transport.discover_unpaired().await?;
    tokio::time::sleep(timeout).await;
    transport.list_unpaired().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ModernPermissionPolicy, Platform, StaticPermissions};
    use crate::printer::{RawDevice, UNKNOWN_DEVICE_NAME};
    use crate::transport::mock::{FailOn, MockTransport, TransportCall};

    fn registry(
        mock: Arc<MockTransport>,
        platform: Platform,
        perms: StaticPermissions,
    ) -> DeviceRegistry {
        let gate = PermissionGate::new(platform, ModernPermissionPolicy::Delegate, Arc::new(perms));
        DeviceRegistry::new(Some(mock as Arc<dyn Transport>), gate)
    }

    #[tokio::test]
    async fn test_list_paired_normalizes() {
        let mock = Arc::new(MockTransport::empty().with_paired(vec![
            RawDevice::new("a", "Woosim"),
            RawDevice {
                id: "b".into(),
                name: None,
                address: None,
                rssi: None,
            },
        ]));
        let reg = registry(mock, Platform::Desktop, StaticPermissions::granted());
        let devices = reg.list_paired().await.unwrap();
        assert_eq!(devices[1].name, UNKNOWN_DEVICE_NAME);
    }

    #[tokio::test]
    async fn test_list_paired_transport_error_is_empty() {
        let mock = Arc::new(MockTransport::new().failing(FailOn::List));
        let reg = registry(mock, Platform::Desktop, StaticPermissions::granted());
        assert!(reg.list_paired().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_powered_off_radio_is_enabled_first() {
        let mock = Arc::new(MockTransport::new().powered_off());
        let reg = registry(mock.clone(), Platform::Desktop, StaticPermissions::granted());
        assert_eq!(reg.list_paired().await.unwrap().len(), 2);
        assert_eq!(mock.count(|c| *c == TransportCall::Enable), 1);
    }

    #[tokio::test]
    async fn test_scan_cancels_discovery_on_failure() {
        let mock = Arc::new(MockTransport::new().failing(FailOn::ListUnpaired));
        let reg = registry(mock.clone(), Platform::Desktop, StaticPermissions::granted());
        let found = reg.scan(Duration::from_millis(1)).await.unwrap();
        assert!(found.is_empty());
        assert!(!mock.is_discovering());
        assert_eq!(mock.calls().last(), Some(&TransportCall::CancelDiscovery));
    }

    #[tokio::test]
    async fn test_prompt_accepted_lets_listing_proceed() {
        let perms = StaticPermissions::prompt_accepts();
        let mock = Arc::new(MockTransport::new());
        let reg = registry(mock, Platform::Android { api_level: 29 }, perms);
        assert_eq!(reg.list_paired().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_permission_refused_is_an_error() {
        let mock = Arc::new(MockTransport::new());
        let reg = registry(
            mock.clone(),
            Platform::Android { api_level: 29 },
            StaticPermissions::denied(),
        );
        assert!(matches!(reg.list_paired().await, Err(PrinterError::PermissionDenied)));
        assert!(matches!(
            reg.scan(Duration::from_millis(1)).await,
            Err(PrinterError::PermissionDenied)
        ));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_transport_is_unavailable() {
        let gate = PermissionGate::new(
            Platform::Desktop,
            ModernPermissionPolicy::Delegate,
            Arc::new(StaticPermissions::granted()),
        );
        let reg = DeviceRegistry::new(None, gate);
        assert!(!reg.is_available());
        assert!(reg.list_paired().await.unwrap().is_empty());
    }
}
