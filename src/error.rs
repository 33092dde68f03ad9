//! Error types for identity reconciliation.
//!
//! Parse failures are scoped to a single template file so one bad document
//! never aborts a whole classification pass. Provider errors carry no retry
//! machinery; retry and backoff belong to the transport layer behind the
//! backend traits.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during template handling and reconciliation.
#[derive(Debug, Error)]
pub enum Error {
    /// A template file could not be parsed
    #[error("failed to parse template {path}: {message}")]
    Parse {
        /// Path of the offending file
        path: PathBuf,
        /// Description of the parse failure
        message: String,
    },

    /// The document declares a template type outside the registry
    #[error("unknown template type: {value}")]
    UnknownTemplateType {
        /// The unrecognized `template_type` value
        value: String,
    },

    /// A repository operation failed
    #[error("git error: {message}")]
    Git {
        /// Description from the git backend
        message: String,
    },

    /// The provider has no such entity
    ///
    /// Fetch paths normalize this to an empty result; it only escapes when
    /// a caller asks for something that must exist.
    #[error("not found: {resource}")]
    NotFound {
        /// Identifier of the missing entity
        resource: String,
    },

    /// A provider call failed (permissions, throttling, validation)
    #[error("provider error: {message}")]
    Provider {
        /// Description from the provider
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a parse error for a specific file
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a git error with the given message
    pub fn git(message: impl Into<String>) -> Self {
        Self::Git {
            message: message.into(),
        }
    }

    /// Create a not-found error for the given entity
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a provider error with the given message
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Whether this error means "the entity does not exist"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for identity reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
