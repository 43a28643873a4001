//! Error types for swayfade.
//!
//! Each subsystem has its own error enum; this module provides the top-level
//! type returned by the daemon and the command line.

use thiserror::Error;

use crate::config::ConfigError;
use crate::ipc::IpcError;

/// Errors that can occur while running swayfade.
#[derive(Debug, Error)]
pub enum SwayfadeError {
    /// The configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Talking to the window manager failed.
    #[error("IPC error: {0}")]
    Ipc(#[from] IpcError),

    /// `start` was called on a daemon that is already running.
    #[error("swayfade is already started")]
    AlreadyStarted,

    /// `stop` or `wait` was called on a daemon that is not running.
    #[error("swayfade is not started")]
    NotStarted,

    /// Runtime setup or another I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_config_error_display() {
        let err: SwayfadeError = ConfigError::Invalid {
            key: "active-opacity",
            reason: "must be between 0 and 1",
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Configuration error: active-opacity must be between 0 and 1"
        );
    }

    #[test]
    fn test_config_not_found_display() {
        let err: SwayfadeError = ConfigError::NotFound(PathBuf::from("/tmp/nope.toml")).into();
        let msg = err.to_string();
        assert!(msg.contains("Invalid config path"));
        assert!(msg.contains("/tmp/nope.toml"));
    }

    #[test]
    fn test_ipc_error_display() {
        let err: SwayfadeError = IpcError::SocketNotFound.into();
        let msg = err.to_string();
        assert!(msg.starts_with("IPC error"));
    }

    #[test]
    fn test_lifecycle_errors_display() {
        assert_eq!(SwayfadeError::AlreadyStarted.to_string(), "swayfade is already started");
        assert_eq!(SwayfadeError::NotStarted.to_string(), "swayfade is not started");
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err: SwayfadeError = io_err.into();
        assert!(matches!(err, SwayfadeError::Io(_)));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_error_is_debug() {
        let debug_str = format!("{:?}", SwayfadeError::NotStarted);
        assert!(debug_str.contains("NotStarted"));
    }
}
