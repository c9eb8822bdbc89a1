//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Durable settings storage failures. Only writes surface these; reads fall
/// back to defaults.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Keyboard hook install failures. Fatal at startup.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("input monitoring permission denied: {0}")]
    PermissionDenied(String),

    #[error("failed to install keyboard hook: {0}")]
    Install(String),

    #[error("global keyboard hook is not supported on this platform")]
    Unsupported,
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("failed to create {kind} surface: {reason}")]
    Create { kind: &'static str, reason: String },
}

/// Errors seen by callers talking to the broker task.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker is no longer running")]
    Closed,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}
