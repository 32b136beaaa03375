//! Unified error handling for Thermfan
//!
//! This crate provides a single error type used across all Thermfan components.
//! It uses thiserror for ergonomic error definitions with proper Display and Error trait impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using ThermfanError
pub type Result<T> = std::result::Result<T, ThermfanError>;

/// Unified error type for all Thermfan operations
#[derive(thiserror::Error, Debug)]
pub enum ThermfanError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    // ============================================================================
    // Hardware Access Errors
    // ============================================================================
    #[error("Failed to open fan control device {path}: {source}")]
    DeviceOpen {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Device request {request} failed: {source}")]
    DeviceRequest {
        request: &'static str,
        source: io::Error,
    },

    #[error("Invalid {what} from hardware: {value}")]
    InvalidResponse {
        what: &'static str,
        value: i64,
    },

    #[error("Failed to acquire I/O port access for {port:#06x}: {source}")]
    PortAccess {
        port: u16,
        source: io::Error,
    },

    #[error("Firmware signature mismatch (eax={eax:#010x}, edx={edx:#010x}): not a supported machine")]
    SignatureMismatch {
        eax: u32,
        edx: u32,
    },

    #[error("Firmware call {command:#06x} failed (eax={eax:#010x}, carry={carry})")]
    FirmwareCall {
        command: u32,
        eax: u32,
        carry: bool,
    },

    // ============================================================================
    // Configuration and Settings Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Generic(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl ThermfanError {
    /// Create a generic error from a string
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid config error for a named field
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-supported error from a string
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    /// True for errors raised before the hardware was ever touched.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InvalidConfig { .. } | Self::JsonParse(_) | Self::FileTooLarge { .. }
        )
    }
}
