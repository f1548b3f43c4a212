//! Error types for Jellyfin Fetcher
//!
//! This module defines the error types for all components of the application.
//! Catalog errors carry the classification the UI turns into a settings prompt,
//! transfer errors become a task's failure reason, and store errors are fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Classification of a failed catalog request
///
/// These are the only outcomes the navigator and the download queue act on.
/// The first three map to a setting the user can correct.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// HTTP 401 from the server
    #[error("Incorrect API key")]
    InvalidCredentials,

    /// HTTP 400 from the server
    #[error("Incorrect user id")]
    InvalidUser,

    /// Transport failure or malformed endpoint URL
    #[error("Incorrect API endpoint")]
    InvalidEndpoint,

    /// Any other non-2xx response or undecodable body
    #[error("{0}")]
    Other(String),
}

impl CatalogError {
    /// Create an `Other` classification from any displayable message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether the user can fix this by editing a setting
    pub fn needs_setting(&self) -> bool {
        !matches!(self, CatalogError::Other(_))
    }
}

/// File transfer errors
#[derive(Error, Debug)]
pub enum TransferError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error while writing the destination file
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server returned an error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Download URL could not be built
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Atomic rename of the finished file failed
    #[error("Could not move {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// The transfer was cancelled by the user
    #[error("Transfer cancelled")]
    Cancelled,

    /// The transfer task ended without reporting a result
    #[error("Transfer task ended unexpectedly")]
    Aborted,

    /// Generic error for other issues
    #[error("{0}")]
    Other(String),
}

impl TransferError {
    /// Cancellation is not a failure and never becomes a failure reason
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }
}

/// Session record persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error reading or writing the record
    #[error("Session file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded or decoded
    #[error("Session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// No user configuration directory on this platform
    #[error("Could not determine user config directory")]
    NoConfigDir,

    /// A downloaded file could not be removed; the index still lists it
    #[error("Could not delete {path}: {reason}")]
    DeleteFailed { path: PathBuf, reason: String },

    /// Write kept failing after retries
    #[error("Failed to persist session to {path} after {attempts} attempts: {reason}")]
    PersistFailed {
        path: PathBuf,
        attempts: u32,
        reason: String,
    },
}

/// Download queue errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// No task with this item id in the list
    #[error("Download task not found: {item_id}")]
    TaskNotFound { item_id: String },

    /// The item already has an active transfer
    #[error("Transfer already active for {item_id}")]
    AlreadyActive { item_id: String },

    /// The task list has not been built yet
    #[error("Download list is still loading")]
    NotLoaded,

    /// Destination directory could not be created
    #[error("Cannot create destination {path}: {reason}")]
    Destination { path: PathBuf, reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// No user configuration directory on this platform
    #[error("Could not determine user config directory")]
    NoConfigDir,
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Catalog request error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Transfer error
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Session persistence error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Queue error
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the session can continue after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Catalog(_) | AppError::Transfer(_) | AppError::Queue(_) => true,
            AppError::Store(StoreError::DeleteFailed { .. }) => true,
            AppError::Store(_) | AppError::Config(_) => false,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Catalog(_) => "catalog",
            AppError::Transfer(_) => "transfer",
            AppError::Store(_) => "store",
            AppError::Queue(_) => "queue",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Catalog result type alias
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Transfer result type alias
pub type TransferResult<T> = std::result::Result<T, TransferError>;

/// Store result type alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Queue result type alias
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Config result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
