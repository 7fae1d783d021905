//! # Error Types
//!
//! This module defines error types used throughout the factura-print library.
//!
//! Only [`PrinterError::PermissionDenied`] is meant to reach UI code: the
//! service facade converts everything else into `false` or an empty list.

use thiserror::Error;

/// Main error type for printer operations
#[derive(Debug, Error)]
pub enum PrinterError {
    /// Bluetooth permission was refused after an explicit request
    #[error("Bluetooth permission denied")]
    PermissionDenied,

    /// Bluetooth is not supported on this platform or the transport is missing
    #[error("Bluetooth is not available on this platform")]
    Unavailable,

    /// A print was attempted with no active printer connection
    #[error("Not connected to any printer")]
    NotConnected,

    /// Transport-level errors (connection, pairing, discovery, I/O)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (config or invoice file) error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for printer operations.
pub type Result<T> = std::result::Result<T, PrinterError>;
