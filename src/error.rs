//! Error types for rollsafe.

use thiserror::Error;

/// Main error type for vault operations.
#[derive(Error, Debug)]
pub enum RollSafeError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Stored vault data is unreadable: {0}")]
    CorruptState(String),

    #[error("Attachment is too large ({size} bytes, limit is {limit} bytes)")]
    OversizedAttachment { size: u64, limit: u64 },

    #[error("Incorrect PIN")]
    WrongPin,

    #[error("No inspection PIN has been set. Use 'set-pin' first.")]
    NoPinSet,

    #[error("Invalid PIN: {0}")]
    InvalidPin(String),

    #[error("PINs do not match")]
    PinMismatch,

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Document has no attachment: {0}")]
    NoAttachment(String),

    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<figment::Error> for RollSafeError {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, RollSafeError>;
