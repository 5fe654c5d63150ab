// src/error.rs
//! Error types shared by the bridge and the platform backends

use thiserror::Error;

/// Error code sent to the UI when a required argument is missing
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";

/// Error code used for failures that escape a handler unhandled
pub const UNHANDLED_ERROR: &str = "error";

/// Failure raised by the operating system collaborators
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// Package enumeration failed
    #[error("package query failed: {0}")]
    PackageQuery(String),

    /// `startActivity` threw (activity not found, security exception, ...)
    #[error("activity start failed: {0}")]
    ActivityStart(String),

    /// Broadcast receiver registration failed
    #[error("receiver registration failed: {0}")]
    Receiver(String),

    /// JNI plumbing failed before the platform call was reached
    #[error("jni: {0}")]
    Jni(String),
}

/// Errors surfaced by the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A required argument was absent or had the wrong type
    #[error("{message}")]
    MissingArgument {
        argument: &'static str,
        message: &'static str,
    },

    /// A platform failure that the operation's policy lets escape
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The payload could not be decoded with the method codec
    #[error("codec: {0}")]
    Codec(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn missing_package_name() -> Self {
        BridgeError::MissingArgument {
            argument: "packageName",
            message: "Package name is required",
        }
    }

    /// Error code reported in the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::MissingArgument { .. } => INVALID_ARGUMENT,
            _ => UNHANDLED_ERROR,
        }
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
