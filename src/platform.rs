//! # Platform and Permission Gate
//!
//! Decides whether Bluetooth work may start on the current platform.
//!
//! | Platform            | Runtime permission                              |
//! |---------------------|-------------------------------------------------|
//! | Android API < 23    | none (install-time)                             |
//! | Android API 23..31  | coarse location (required for scanning)         |
//! | Android API ≥ 31    | BLUETOOTH_SCAN + BLUETOOTH_CONNECT, per policy  |
//! | iOS, desktop        | none                                            |
//! | Web                 | Bluetooth unsupported; gate is never consulted  |
//!
//! The OS prompt itself lives behind [`PermissionBackend`]. Backend errors
//! count as "not granted" and are never propagated.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// First Android API level with runtime permissions.
pub const RUNTIME_PERMISSION_API: u32 = 23;

/// First Android API level with the dedicated Bluetooth permissions.
pub const MODERN_PERMISSION_API: u32 = 31;

/// Where the app is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "os", rename_all = "snake_case")]
pub enum Platform {
    Android { api_level: u32 },
    Ios,
    Web,
    Desktop,
}

impl Platform {
    /// Platform of the compile target.
    ///
    /// Android cannot know its API level at compile time; it is assumed to
    /// use the modern permission model unless configured otherwise.
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            Self::Android {
                api_level: MODERN_PERMISSION_API,
            }
        } else if cfg!(target_os = "ios") {
            Self::Ios
        } else if cfg!(target_family = "wasm") {
            Self::Web
        } else {
            Self::Desktop
        }
    }

    /// Bluetooth serial printing is impossible from a browser.
    pub fn supports_bluetooth(&self) -> bool {
        !matches!(self, Self::Web)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

/// OS permissions the gate may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    CoarseLocation,
    BluetoothScan,
    BluetoothConnect,
}

const LEGACY_PERMISSIONS: &[Permission] = &[Permission::CoarseLocation];
const MODERN_PERMISSIONS: &[Permission] =
    &[Permission::BluetoothScan, Permission::BluetoothConnect];

/// How to treat the Android 12+ permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModernPermissionPolicy {
    /// Ask the backend for BLUETOOTH_SCAN and BLUETOOTH_CONNECT.
    #[default]
    Delegate,
    /// Report granted without asking. Placeholder for builds whose backend
    /// cannot prompt yet; logged as a warning on every use.
    AssumeGranted,
}

/// Platform hook that checks and prompts for permissions.
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    async fn check(&self, permission: Permission) -> Result<bool>;

    /// Show the system prompt; returns the user's decision.
    async fn request(&self, permission: Permission) -> Result<bool>;
}

/// Backend with fixed answers.
///
/// Used on desktop targets and in tests; counts every call.
#[derive(Debug, Default)]
pub struct StaticPermissions {
    check_answer: bool,
    request_answer: bool,
    fail: bool,
    checks: AtomicUsize,
    requests: AtomicUsize,
}

impl StaticPermissions {
    /// Everything already granted.
    pub fn granted() -> Self {
        Self::answering(true, true)
    }

    /// Not granted, and the prompt is refused.
    pub fn denied() -> Self {
        Self::answering(false, false)
    }

    /// Not granted until the user accepts the prompt.
    pub fn prompt_accepts() -> Self {
        Self::answering(false, true)
    }

    /// Every call errors.
    pub fn broken() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn answering(check: bool, request: bool) -> Self {
        Self {
            check_answer: check,
            request_answer: request,
            ..Self::default()
        }
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionBackend for StaticPermissions {
    async fn check(&self, _permission: Permission) -> Result<bool> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(crate::PrinterError::Transport("permission service unavailable".into()));
        }
        Ok(self.check_answer)
    }

    async fn request(&self, _permission: Permission) -> Result<bool> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(crate::PrinterError::Transport("permission service unavailable".into()));
        }
        Ok(self.request_answer)
    }
}

/// Checks and requests the permissions Bluetooth work needs on this platform.
pub struct PermissionGate {
    platform: Platform,
    policy: ModernPermissionPolicy,
    backend: Arc<dyn PermissionBackend>,
}

impl PermissionGate {
    pub fn new(
        platform: Platform,
        policy: ModernPermissionPolicy,
        backend: Arc<dyn PermissionBackend>,
    ) -> Self {
        Self {
            platform,
            policy,
            backend,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Permissions the backend must grant, or `None` when the platform has
    /// no runtime model (or the modern model is assumed granted).
    fn required(&self) -> Option<&'static [Permission]> {
        match self.platform {
            Platform::Android { api_level } if api_level >= MODERN_PERMISSION_API => {
                match self.policy {
                    ModernPermissionPolicy::Delegate => Some(MODERN_PERMISSIONS),
                    ModernPermissionPolicy::AssumeGranted => {
                        tracing::warn!(
                            api_level,
                            "Bluetooth permissions assumed granted without a runtime check"
                        );
                        None
                    }
                }
            }
            Platform::Android { api_level } if api_level >= RUNTIME_PERMISSION_API => {
                Some(LEGACY_PERMISSIONS)
            }
            _ => None,
        }
    }

    /// Whether Bluetooth work may proceed without prompting.
    pub async fn check_permissions(&self) -> bool {
        let Some(permissions) = self.required() else {
            return true;
        };
        for &permission in permissions {
            match self.backend.check(permission).await {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    tracing::warn!(?permission, error = %e, "permission check failed");
                    return false;
                }
            }
        }
        true
    }

    /// Prompt for every missing permission; true only if all are granted.
    pub async fn request_permissions(&self) -> bool {
        let Some(permissions) = self.required() else {
            return true;
        };
        for &permission in permissions {
            match self.backend.request(permission).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!(?permission, "permission refused");
                    return false;
                }
                Err(e) => {
                    tracing::warn!(?permission, error = %e, "permission request failed");
                    return false;
                }
            }
        }
        true
    }
}
