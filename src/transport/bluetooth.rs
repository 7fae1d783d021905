//! # Bluetooth RFCOMM Transport
//!
//! Talks to Woosim / Star printers over the Serial Port Profile on Linux.
//! BlueZ is driven through `bluetoothctl` (power, listing, discovery,
//! pairing) and the serial link is an RFCOMM TTY bound with `rfcomm bind`.
//!
//! ## Device Identifiers
//!
//! Device ids are Bluetooth MAC addresses (`XX:XX:XX:XX:XX:XX`).
//!
//! ## TTY Configuration
//!
//! The RFCOMM device is opened in raw mode so the escape sequences reach the
//! printer unmodified:
//!
//! - **No input processing**, **no output processing** (no CR/LF translation)
//! - **8-bit characters**: CS8, no parity
//! - **No echo**, **non-canonical mode**
//!
//! ## Chunked Writes
//!
//! Mobile printers have small receive buffers, so jobs are written in chunks
//! (default 512 bytes) with a short pause between them.

use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io::{self, Write};
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use super::Transport;
use crate::error::{PrinterError, Result};
use crate::printer::RawDevice;
use crate::protocol::codepage;

/// Default chunk size for writes (bytes)
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Default delay between chunks (milliseconds)
pub const DEFAULT_CHUNK_DELAY_MS: u64 = 20;

/// Upper bound on a single `bluetoothctl scan on` session (seconds)
const SCAN_SESSION_SECS: u64 = 120;

/// Time for a freshly bound RFCOMM node to appear
const BIND_SETTLE: Duration = Duration::from_millis(500);

/// An open serial link to one printer.
struct Link {
    mac: String,
    channel: Option<u8>,
    file: File,
}

/// # RFCOMM Printer Transport
///
/// ```no_run
/// use factura_print::transport::{RfcommTransport, Transport};
///
/// # async fn demo() -> factura_print::Result<()> {
/// let transport = RfcommTransport::new(0);
/// transport.connect("00:11:22:33:44:55").await?;
/// transport.write("\x1B@Hola\r\n").await?;
/// # Ok(())
/// # }
/// ```
pub struct RfcommTransport {
    channel: u8,
    chunk_size: usize,
    chunk_delay: Duration,
    link: Mutex<Option<Link>>,
    scan: Mutex<Option<Child>>,
}

impl RfcommTransport {
    /// Transport that binds `/dev/rfcomm{channel}` when connecting.
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: Duration::from_millis(DEFAULT_CHUNK_DELAY_MS),
            link: Mutex::new(None),
            scan: Mutex::new(None),
        }
    }

    /// Set the chunk size for writes. Zero is treated as one byte.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    async fn paired_macs(&self) -> Result<Vec<RawDevice>> {
        let out = bluetoothctl(&["devices", "Paired"]).await?;
        Ok(parse_device_lines(&String::from_utf8_lossy(&out.stdout)))
    }
}

#[async_trait]
impl Transport for RfcommTransport {
    async fn is_enabled(&self) -> Result<bool> {
        let out = bluetoothctl(&["show"]).await?;
        Ok(String::from_utf8_lossy(&out.stdout).contains("Powered: yes"))
    }

    async fn enable(&self) -> Result<()> {
        let out = bluetoothctl(&["power", "on"]).await?;
        let stdout = String::from_utf8_lossy(&out.stdout);
        if stdout.contains("succeeded") {
            Ok(())
        } else {
            Err(PrinterError::Transport(format!(
                "power on failed: {}",
                stdout.trim()
            )))
        }
    }

    async fn list(&self) -> Result<Vec<RawDevice>> {
        self.paired_macs().await
    }

    async fn discover_unpaired(&self) -> Result<()> {
        let mut scan = self.scan.lock().await;
        if scan.is_some() {
            return Ok(());
        }
        // discovery only lasts as long as the bluetoothctl client
        let secs = SCAN_SESSION_SECS.to_string();
        let child = Command::new("bluetoothctl")
            .args(["--timeout", secs.as_str(), "scan", "on"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PrinterError::Transport(format!("Failed to start scan: {e}")))?;
        tracing::debug!("bluetoothctl scan started");
        *scan = Some(child);
        Ok(())
    }

    async fn list_unpaired(&self) -> Result<Vec<RawDevice>> {
        let out = bluetoothctl(&["devices"]).await?;
        let all = parse_device_lines(&String::from_utf8_lossy(&out.stdout));
        let paired = self.paired_macs().await?;
        Ok(all
            .into_iter()
            .filter(|d| !paired.iter().any(|p| p.id == d.id))
            .collect())
    }

    async fn cancel_discovery(&self) -> Result<()> {
        if let Some(mut child) = self.scan.lock().await.take() {
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "scan process already gone");
            }
        }
        bluetoothctl(&["scan", "off"]).await?;
        Ok(())
    }

    async fn pair_device(&self, id: &str) -> Result<()> {
        let mac = checked_mac(id)?;
        let out = bluetoothctl(&["pair", &mac]).await?;
        let stdout = String::from_utf8_lossy(&out.stdout);
        if !(stdout.contains("Pairing successful") || stdout.contains("AlreadyExists")) {
            return Err(PrinterError::Transport(format!(
                "Pairing {mac} failed: {}",
                stdout.trim()
            )));
        }
        // trusted devices reconnect without a prompt
        if let Err(e) = bluetoothctl(&["trust", &mac]).await {
            tracing::warn!(mac = %mac, error = %e, "trust failed");
        }
        Ok(())
    }

    async fn connect(&self, id: &str) -> Result<()> {
        let mac = checked_mac(id)?;
        let mut link = self.link.lock().await;
        if link.as_ref().is_some_and(|l| l.mac == mac) {
            return Ok(());
        }

        let (device_path, channel) = match find_rfcomm_for_mac(&mac).await? {
            Some(path) => (path, None),
            None => (setup_rfcomm(&mac, self.channel).await?, Some(self.channel)),
        };

        let opened = tokio::task::spawn_blocking(move || open_raw(&device_path))
            .await
            .map_err(|e| PrinterError::Transport(format!("open task failed: {e}")))
            .and_then(|r| r);
        // a node we bound ourselves must not outlive a failed connect
        let file = match channel {
            Some(channel) => release_on_failure(opened, channel, release_rfcomm).await?,
            None => opened?,
        };

        tracing::info!(mac = %mac, "RFCOMM link open");
        *link = Some(Link { mac, channel, file });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let Some(link) = self.link.lock().await.take() else {
            return Ok(());
        };
        drop(link.file);
        if let Some(channel) = link.channel {
            release_rfcomm(channel).await?;
        }
        tracing::info!(mac = %link.mac, "RFCOMM link closed");
        Ok(())
    }

    async fn write(&self, text: &str) -> Result<()> {
        let link = self.link.lock().await;
        let link = link.as_ref().ok_or(PrinterError::NotConnected)?;

        let mut data = codepage::select_cp437().into_bytes();
        data.extend(codepage::encode(text));

        let mut file = link.file.try_clone()?;
        let chunk_size = self.chunk_size;
        let delay = self.chunk_delay;
        tokio::task::spawn_blocking(move || write_chunked(&mut file, &data, chunk_size, delay))
            .await
            .map_err(|e| PrinterError::Transport(format!("write task failed: {e}")))?
    }
}

/// Write `data` in `chunk_size` pieces, pausing `delay` between them.
fn write_chunked(out: &mut impl Write, data: &[u8], chunk_size: usize, delay: Duration) -> Result<()> {
    let chunks = data.chunks(chunk_size.max(1));
    let total = chunks.len();
    for (i, chunk) in chunks.enumerate() {
        out.write_all(chunk)
            .map_err(|e| PrinterError::Transport(format!("Write failed: {e}")))?;
        if i + 1 < total && !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
    out.flush()
        .map_err(|e| PrinterError::Transport(format!("Flush failed: {e}")))
}

fn open_raw(device_path: &str) -> Result<File> {
    let file = OpenOptions::new()
        .write(true)
        .open(device_path)
        .map_err(|e| PrinterError::Transport(format!("Failed to open {device_path}: {e}")))?;
    configure_tty_raw(&file)?;
    Ok(file)
}

async fn run(program: &str, args: &[&str]) -> Result<Output> {
    Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| PrinterError::Transport(format!("Failed to run {program}: {e}")))
}

async fn bluetoothctl(args: &[&str]) -> Result<Output> {
    run("bluetoothctl", args).await
}

/// Parse `bluetoothctl devices` output (`Device XX:XX:XX:XX:XX:XX Name`).
fn parse_device_lines(stdout: &str) -> Vec<RawDevice> {
    stdout
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Device ")?;
            let (mac, name) = rest.split_once(' ').unwrap_or((rest, ""));
            if !is_valid_mac(mac) {
                return None;
            }
            let mac = mac.to_uppercase();
            // BlueZ echoes the address when a device has no name
            let name = name.trim();
            let name = (!name.is_empty() && name.replace('-', ":").to_uppercase() != mac)
                .then(|| name.to_string());
            Some(RawDevice {
                id: mac.clone(),
                name,
                address: Some(mac),
                rssi: None,
            })
        })
        .collect()
}

fn checked_mac(id: &str) -> Result<String> {
    if is_valid_mac(id) {
        Ok(id.to_uppercase())
    } else {
        Err(PrinterError::Transport(format!("Not a Bluetooth address: {id}")))
    }
}

/// Configure a file descriptor for raw TTY mode.
///
/// IXON/IXOFF/IXANY are cleared as well: 0x11 and 0x13 must not be taken as
/// flow control bytes.
#[cfg(unix)]
fn configure_tty_raw(file: &File) -> Result<()> {
    use std::mem::MaybeUninit;
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(PrinterError::Transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(PrinterError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_file: &File) -> Result<()> {
    Ok(())
}

// ============================================================================
// RFCOMM SETUP HELPERS
// ============================================================================

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Find the `/dev/rfcommN` node already bound to `mac`, if any.
///
/// Reads `/proc/net/rfcomm`, falling back to `rfcomm -a`.
pub async fn find_rfcomm_for_mac(mac: &str) -> Result<Option<String>> {
    if let Ok(contents) = tokio::fs::read_to_string("/proc/net/rfcomm").await {
        if let Some(path) = rfcomm_node_for(&contents, mac) {
            return Ok(Some(path));
        }
    }

    let output = run("rfcomm", &["-a"]).await?;
    Ok(rfcomm_node_for(&String::from_utf8_lossy(&output.stdout), mac))
}

/// Pick the node for `mac` out of `rfcomm0: XX:XX:... channel 1 ...` lines.
fn rfcomm_node_for(listing: &str, mac: &str) -> Option<String> {
    let mac_upper = mac.to_uppercase();
    listing
        .lines()
        .filter(|line| line.to_uppercase().contains(&mac_upper))
        .filter_map(|line| line.split(':').next())
        .map(|dev| format!("/dev/{}", dev.trim()))
        .find(|path| Path::new(path).exists())
}

/// Bind `/dev/rfcomm{channel}` to `mac` on SPP channel 1.
///
/// Connects with `bluetoothctl`, then runs `rfcomm bind` (needs root or the
/// matching capability).
pub async fn setup_rfcomm(mac: &str, channel: u8) -> Result<String> {
    let device_path = format!("/dev/rfcomm{channel}");

    let out = bluetoothctl(&["connect", mac]).await?;
    let stdout = String::from_utf8_lossy(&out.stdout);
    if !(stdout.contains("Connection successful") || stdout.contains("already connected")) {
        // rfcomm bind decides whether the device is reachable
        tracing::debug!(mac = %mac, output = %stdout.trim(), "bluetoothctl connect");
    }

    let out = run("rfcomm", &["bind", &channel.to_string(), mac, "1"]).await?;
    if !out.status.success() {
        return Err(PrinterError::Transport(format!(
            "rfcomm bind failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    tokio::time::sleep(BIND_SETTLE).await;

    if !Path::new(&device_path).exists() {
        let missing = Err(PrinterError::Transport(format!(
            "Device {device_path} was not created"
        )));
        return release_on_failure(missing, channel, release_rfcomm).await;
    }

    tracing::info!(mac = %mac, path = %device_path, "RFCOMM bound");
    Ok(device_path)
}

/// Unbind `/dev/rfcomm{channel}`.
async fn release_rfcomm(channel: u8) -> Result<()> {
    let out = run("rfcomm", &["release", &channel.to_string()]).await?;
    if !out.status.success() {
        return Err(PrinterError::Transport(format!(
            "rfcomm release failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}

/// Run `release` for `channel` when `result` is an error.
///
/// The original error is returned; a failed release is only logged.
async fn release_on_failure<T, R, Fut>(result: Result<T>, channel: u8, release: R) -> Result<T>
where
    R: FnOnce(u8) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if let Err(e) = &result {
        tracing::debug!(channel, error = %e, "releasing RFCOMM node after failed connect");
        if let Err(release_err) = release(channel).await {
            tracing::warn!(channel, error = %release_err, "rfcomm release failed");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_mac_addresses() {
        assert!(is_valid_mac("00:11:22:33:44:55"));
        assert!(is_valid_mac("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn test_invalid_mac_addresses() {
        assert!(!is_valid_mac("00:11:22:33:44"));
        assert!(!is_valid_mac("00-11-22-33-44-55"));
        assert!(!is_valid_mac("GG:HH:II:JJ:KK:LL"));
        assert!(!is_valid_mac("mock-woosim-id"));
        assert!(!is_valid_mac(""));
    }

    #[test]
    fn test_parse_device_lines() {
        let out = "Device 00:11:22:33:44:55 Woosim WSP-i450\n\
                   Device 55:44:33:22:11:00 55-44-33-22-11-00\n\
                   [CHG] Controller 00:00:00:00:00:00 Discovering: yes\n\
                   Device aa:bb:cc:dd:ee:ff\n";
        let devices = parse_device_lines(out);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].id, "00:11:22:33:44:55");
        assert_eq!(devices[0].name.as_deref(), Some("Woosim WSP-i450"));
        assert_eq!(devices[1].name, None);
        assert_eq!(devices[2].id, "AA:BB:CC:DD:EE:FF");
        assert_eq!(devices[2].name, None);
    }

    #[test]
    fn test_rfcomm_node_missing_device() {
        let listing = "rfcomm9: 00:11:22:33:44:55 channel 1 clean\n";
        // /dev/rfcomm9 does not exist in the test environment
        assert_eq!(rfcomm_node_for(listing, "AA:BB:CC:DD:EE:FF"), None);
    }

    #[test]
    fn test_checked_mac_uppercases() {
        assert_eq!(checked_mac("aa:bb:cc:dd:ee:ff").unwrap(), "AA:BB:CC:DD:EE:FF");
        assert!(checked_mac("mock-star-id").is_err());
    }

    #[tokio::test]
    async fn test_failed_open_releases_bound_channel() {
        let released = std::sync::Mutex::new(Vec::new());
        let opened: Result<File> = Err(PrinterError::Transport("Permission denied".into()));

        let result = release_on_failure(opened, 3, |channel| {
            released.lock().unwrap().push(channel);
            async { Ok(()) }
        })
        .await;

        assert!(matches!(result, Err(PrinterError::Transport(msg)) if msg == "Permission denied"));
        assert_eq!(*released.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_release_failure_keeps_connect_error() {
        let result: Result<()> = release_on_failure(Err(PrinterError::NotConnected), 0, |_| async {
            Err(PrinterError::Transport("rfcomm missing".into()))
        })
        .await;
        assert!(matches!(result, Err(PrinterError::NotConnected)));
    }

    #[tokio::test]
    async fn test_successful_open_keeps_binding() {
        let released = std::sync::Mutex::new(Vec::new());
        let result = release_on_failure(Ok(7u8), 0, |channel| {
            released.lock().unwrap().push(channel);
            async { Ok(()) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert!(released.lock().unwrap().is_empty());
    }

    #[test]
    fn test_write_chunked_splits_data() {
        struct Recorder(Vec<usize>);
        impl Write for Recorder {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.push(buf.len());
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut rec = Recorder(Vec::new());
        write_chunked(&mut rec, &[0u8; 1100], 512, Duration::ZERO).unwrap();
        assert_eq!(rec.0, vec![512, 512, 76]);
    }
}
