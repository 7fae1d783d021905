//! # Mock Transport
//!
//! Deterministic stand-in for a Bluetooth stack. The default instance has the
//! two printers every demo build ships with:
//!
//! | id              | name            | address           |
//! |-----------------|-----------------|-------------------|
//! | mock-woosim-id  | Woosim WSP-i450 | 00:11:22:33:44:55 |
//! | mock-star-id    | Star SM-T300i   | 55:44:33:22:11:00 |
//!
//! Every call is recorded so tests can assert on exactly what reached the
//! transport.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::Transport;
use crate::error::{PrinterError, Result};
use crate::printer::RawDevice;

/// A call received by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    IsEnabled,
    Enable,
    List,
    DiscoverUnpaired,
    ListUnpaired,
    CancelDiscovery,
    PairDevice(String),
    Connect(String),
    Disconnect,
    Write(String),
}

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    Enable,
    List,
    DiscoverUnpaired,
    ListUnpaired,
    Pair,
    Connect,
    Disconnect,
    Write,
}

#[derive(Debug)]
struct MockState {
    enabled: bool,
    paired: Vec<RawDevice>,
    unpaired: Vec<RawDevice>,
    discovering: bool,
    connected: Option<String>,
    failures: HashSet<FailOn>,
    calls: Vec<TransportCall>,
}

/// In-memory transport with canned devices and failure injection.
#[derive(Debug)]
pub struct MockTransport {
    state: Mutex<MockState>,
    supports_disconnect: bool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Mock with the two canned paired printers and nothing to discover.
    pub fn new() -> Self {
        Self::empty().with_paired(vec![
            RawDevice::new("mock-woosim-id", "Woosim WSP-i450").with_address("00:11:22:33:44:55"),
            RawDevice::new("mock-star-id", "Star SM-T300i").with_address("55:44:33:22:11:00"),
        ])
    }

    /// Mock with no devices at all.
    pub fn empty() -> Self {
        Self {
            state: Mutex::new(MockState {
                enabled: true,
                paired: Vec::new(),
                unpaired: Vec::new(),
                discovering: false,
                connected: None,
                failures: HashSet::new(),
                calls: Vec::new(),
            }),
            supports_disconnect: true,
        }
    }

    pub fn with_paired(self, devices: Vec<RawDevice>) -> Self {
        self.lock().paired = devices;
        self
    }

    pub fn with_unpaired(self, devices: Vec<RawDevice>) -> Self {
        self.lock().unpaired = devices;
        self
    }

    /// Start with the radio powered off.
    pub fn powered_off(self) -> Self {
        self.lock().enabled = false;
        self
    }

    /// Make `op` fail until [`MockTransport::heal`] is called.
    pub fn failing(self, op: FailOn) -> Self {
        self.fail(op);
        self
    }

    /// Transport without a disconnect call.
    pub fn without_disconnect(mut self) -> Self {
        self.supports_disconnect = false;
        self
    }

    pub fn fail(&self, op: FailOn) {
        self.lock().failures.insert(op);
    }

    pub fn heal(&self, op: FailOn) {
        self.lock().failures.remove(&op);
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&TransportCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Print jobs written so far.
    pub fn written(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                TransportCall::Write(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn connected_id(&self) -> Option<String> {
        self.lock().connected.clone()
    }

    pub fn is_discovering(&self) -> bool {
        self.lock().discovering
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record `call`, then fail if `op` is armed.
    fn record(&self, call: TransportCall, op: Option<FailOn>) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        state.calls.push(call);
        match op {
            Some(op) if state.failures.contains(&op) => Err(PrinterError::Transport(format!(
                "mock failure: {op:?}"
            ))),
            _ => Ok(state),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn is_enabled(&self) -> Result<bool> {
        Ok(self.record(TransportCall::IsEnabled, None)?.enabled)
    }

    async fn enable(&self) -> Result<()> {
        self.record(TransportCall::Enable, Some(FailOn::Enable))?.enabled = true;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RawDevice>> {
        Ok(self.record(TransportCall::List, Some(FailOn::List))?.paired.clone())
    }

    async fn discover_unpaired(&self) -> Result<()> {
        self.record(TransportCall::DiscoverUnpaired, Some(FailOn::DiscoverUnpaired))?
            .discovering = true;
        Ok(())
    }

    async fn list_unpaired(&self) -> Result<Vec<RawDevice>> {
        Ok(self
            .record(TransportCall::ListUnpaired, Some(FailOn::ListUnpaired))?
            .unpaired
            .clone())
    }

    async fn cancel_discovery(&self) -> Result<()> {
        self.record(TransportCall::CancelDiscovery, None)?.discovering = false;
        Ok(())
    }

    async fn pair_device(&self, id: &str) -> Result<()> {
        let mut state = self.record(TransportCall::PairDevice(id.to_string()), Some(FailOn::Pair))?;
        let pos = state
            .unpaired
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| PrinterError::Transport(format!("no unpaired device {id}")))?;
        let device = state.unpaired.remove(pos);
        state.paired.push(device);
        Ok(())
    }

    async fn connect(&self, id: &str) -> Result<()> {
        let mut state = self.record(TransportCall::Connect(id.to_string()), Some(FailOn::Connect))?;
        let known = state.paired.iter().chain(&state.unpaired).any(|d| d.id == id);
        if !known {
            return Err(PrinterError::Transport(format!("device {id} not in range")));
        }
        state.connected = Some(id.to_string());
        Ok(())
    }

    fn supports_disconnect(&self) -> bool {
        self.supports_disconnect
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(TransportCall::Disconnect);
        // the link is gone even when the stack reports an error
        state.connected = None;
        if state.failures.contains(&FailOn::Disconnect) {
            return Err(PrinterError::Transport("mock failure: Disconnect".into()));
        }
        Ok(())
    }

    async fn write(&self, text: &str) -> Result<()> {
        let state = self.record(TransportCall::Write(text.to_string()), Some(FailOn::Write))?;
        if state.connected.is_none() {
            return Err(PrinterError::NotConnected);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_has_two_paired_printers() {
        let mock = MockTransport::new();
        let paired = mock.list().await.unwrap();
        assert_eq!(paired.len(), 2);
        assert_eq!(paired[0].id, "mock-woosim-id");
        assert_eq!(paired[1].name.as_deref(), Some("Star SM-T300i"));
    }

    #[tokio::test]
    async fn test_pair_moves_device() {
        let mock = MockTransport::empty().with_unpaired(vec![RawDevice::new("u1", "Woosim (New)")]);
        mock.pair_device("u1").await.unwrap();
        assert!(mock.list_unpaired().await.unwrap().is_empty());
        assert_eq!(mock.list().await.unwrap()[0].id, "u1");
    }

    #[tokio::test]
    async fn test_connect_unknown_device_fails() {
        let mock = MockTransport::new();
        assert!(mock.connect("nope").await.is_err());
        assert_eq!(mock.connected_id(), None);
    }

    #[tokio::test]
    async fn test_failure_injection_and_heal() {
        let mock = MockTransport::new().failing(FailOn::List);
        assert!(mock.list().await.is_err());
        mock.heal(FailOn::List);
        assert!(mock.list().await.is_ok());
        assert_eq!(mock.count(|c| *c == TransportCall::List), 2);
    }

    #[tokio::test]
    async fn test_write_requires_connection() {
        let mock = MockTransport::new();
        assert!(matches!(mock.write("x").await, Err(PrinterError::NotConnected)));
        mock.connect("mock-star-id").await.unwrap();
        mock.write("hola").await.unwrap();
        assert_eq!(mock.written(), vec!["x".to_string(), "hola".to_string()]);
    }

    #[tokio::test]
    async fn test_discovery_flag() {
        let mock = MockTransport::new();
        mock.discover_unpaired().await.unwrap();
        assert!(mock.is_discovering());
        mock.cancel_discovery().await.unwrap();
        assert!(!mock.is_discovering());
    }
}
