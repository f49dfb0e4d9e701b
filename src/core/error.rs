//! Error handling for modsync
//!
//! This module provides the error types and user-friendly error reporting used
//! throughout the crate. The error system follows two principles:
//! 1. **Strongly-typed errors** for precise handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Manifest**: [`SyncError::ManifestUnavailable`], [`SyncError::ManifestParseError`],
//!   [`SyncError::ManifestValidation`]
//! - **Integrity**: [`SyncError::HashFailure`], [`SyncError::IntegrityMismatch`]
//! - **File system**: [`SyncError::FileSystemError`], [`SyncError::PermissionDenied`]
//! - **Transport**: [`SyncError::NetworkError`], [`SyncError::Timeout`], [`SyncError::HttpStatus`]
//! - **Components**: [`SyncError::CircularDependency`], [`SyncError::ConflictingComponents`],
//!   [`SyncError::UnknownComponent`]
//!
//! Planning-phase errors (no manifest, unreadable root) abort before any
//! mutation. Execution-phase errors are recorded per operation in an
//! [`ApplyReport`](crate::executor::ApplyReport) and never abort siblings.
//!
//! # Examples
//!
//! ```rust,no_run
//! use modsync_cli::core::{SyncError, user_friendly_error};
//!
//! let err = anyhow::Error::from(SyncError::ManifestUnavailable {
//!     endpoints: "http://primary, http://fallback".to_string(),
//!     reason: "connection refused".to_string(),
//! });
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for modsync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Every configured endpoint failed to deliver a usable manifest.
    #[error("Manifest unavailable from all endpoints ({endpoints}): {reason}")]
    ManifestUnavailable {
        /// Endpoints that were tried, in order
        endpoints: String,
        /// Failure reported by the last endpoint
        reason: String,
    },

    #[error("Failed to parse manifest from {source_name}: {reason}")]
    ManifestParseError {
        source_name: String,
        reason: String,
    },

    #[error("Invalid manifest: {reason}")]
    ManifestValidation {
        reason: String,
    },

    /// A local file could not be read while computing its digest.
    #[error("Failed to hash {path}: {reason}")]
    HashFailure {
        path: String,
        reason: String,
    },

    /// Downloaded bytes did not match the manifest digest or size.
    #[error("Integrity check failed for {path}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("File system error during {operation} on {path}: {reason}")]
    FileSystemError {
        operation: String,
        path: String,
        reason: String,
    },

    #[error("Permission denied: {operation} on {path}")]
    PermissionDenied {
        operation: String,
        path: String,
    },

    #[error("Network error fetching {url}: {reason}")]
    NetworkError {
        url: String,
        reason: String,
    },

    #[error("Timed out after {seconds}s fetching {url}")]
    Timeout {
        url: String,
        seconds: u64,
    },

    #[error("Server returned HTTP {status} for {url}")]
    HttpStatus {
        url: String,
        status: u16,
    },

    #[error("Circular dependency detected: {chain}")]
    CircularDependency {
        chain: String,
    },

    #[error("Components {first} and {second} conflict and cannot be active together")]
    ConflictingComponents {
        first: String,
        second: String,
    },

    #[error("Unknown component: {id}")]
    UnknownComponent {
        id: String,
        /// Closest known component id, if any
        suggestion: Option<String>,
    },

    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("{message}")]
    Other {
        message: String,
    },
}

impl SyncError {
    /// Whether a transport-level failure is worth retrying against the same
    /// endpoint. Parse and validation failures are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NetworkError { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::IoError(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

/// Error wrapper that adds user-facing context to a [`SyncError`].
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: SyncError,
    /// Actionable suggestion, shown in green
    pub suggestion: Option<String>,
    /// Additional explanation, shown in yellow
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: SyncError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions where the
/// error type is recognized.
///
/// Unrecognized errors keep their full `anyhow` cause chain in the message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<SyncError>() {
        Ok(sync_error) => return create_error_context(sync_error),
        Err(error) => error,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(SyncError::PermissionDenied {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion(
                    "Check ownership of the game directory, or close programs holding its files open",
                );
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(SyncError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                    reason: io_error.to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(SyncError::Other {
        message,
    })
}

fn create_error_context(error: SyncError) -> ErrorContext {
    match error {
        e @ SyncError::ManifestUnavailable { .. } => ErrorContext::new(e)
            .with_suggestion("Check your internet connection, or add a reachable mirror to `endpoints` in the config")
            .with_details("No file was changed. Every endpoint was tried in priority order before giving up"),

        e @ SyncError::ManifestValidation { .. } => ErrorContext::new(e)
            .with_details("The server published a manifest that cannot be applied safely. Nothing was changed"),

        SyncError::CircularDependency { chain } => {
            let details = format!("Components cannot depend on themselves directly or indirectly: {chain}");
            ErrorContext::new(SyncError::CircularDependency { chain })
                .with_suggestion("Report the manifest to the server operator")
                .with_details(details)
        }

        e @ SyncError::IntegrityMismatch { .. } => ErrorContext::new(e)
            .with_suggestion("Run the sync again. If it keeps failing the mirror may be serving stale files")
            .with_details("The downloaded file was discarded and the previous version left in place"),

        e @ SyncError::ConflictingComponents { .. } => ErrorContext::new(e)
            .with_suggestion("Disable one of the two components first"),

        SyncError::UnknownComponent { id, suggestion } => {
            let hint = suggestion
                .as_ref()
                .map(|s| format!("Did you mean '{s}'?"))
                .unwrap_or_else(|| "Run 'modsync audit' to list the components in the manifest".to_string());
            ErrorContext::new(SyncError::UnknownComponent { id, suggestion }).with_suggestion(hint)
        }

        e @ SyncError::PermissionDenied { .. } => ErrorContext::new(e).with_suggestion(if cfg!(windows) {
            "Close the game and any program using its files, then retry"
        } else {
            "Check file permissions with 'ls -la'"
        }),

        e @ SyncError::ConfigError { .. } => ErrorContext::new(e)
            .with_suggestion("Check the TOML syntax in your config file (default: ~/.modsync/config.toml)"),

        e @ SyncError::TomlError(_) => ErrorContext::new(e)
            .with_suggestion("Check the TOML syntax in your config file. Verify quotes and brackets"),

        other => ErrorContext::new(other),
    }
}
