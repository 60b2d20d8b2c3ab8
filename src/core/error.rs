//! Typed error handling for the repokit repository layer
//!
//! This module provides the error taxonomy shared by every backend. Clients
//! can match specific variants instead of dealing with opaque error strings.
//!
//! # Error Categories
//!
//! - `Configuration`: the repository is missing a setting an operation needs
//! - `KeyNotFound`: an id-based get/set/remove targeted a missing id
//! - `ItemNotFound`: `first()`/`last()` found zero matches
//! - `DuplicateKey`: an insert collided with an existing id
//! - `Unsupported`: a backend cannot express a requested comparison kind
//! - `Validation`: a malformed operation operand or an item that does not
//!   fit the item model
//! - `Storage`: a store-native failure, wrapped with the backend name
//!
//! # Example
//!
//! ```rust,ignore
//! use repokit::prelude::*;
//!
//! match repo.get(json!("42")).await {
//!     Ok(item) => println!("found: {:?}", item),
//!     Err(RepoError::KeyNotFound { id }) => println!("no item with id {}", id),
//!     Err(e) => eprintln!("lookup failed: {}", e),
//! }
//! ```

use serde_json::Value;
use std::fmt;

/// The error type for all repository operations.
///
/// The core never swallows backend errors: store-native failures are wrapped
/// into [`RepoError::Storage`], or mapped into a more specific variant when
/// the distinction matters to callers (a unique-constraint violation becomes
/// [`RepoError::DuplicateKey`], a missing file on an id read becomes
/// [`RepoError::KeyNotFound`]). No variant is ever retried internally.
#[derive(Debug)]
pub enum RepoError {
    /// Repository used without a required setting (e.g. an id-field)
    Configuration {
        message: String,
    },

    /// Id-based lookup, update or removal targeted a missing id
    KeyNotFound {
        id: Value,
    },

    /// `first()` or `last()` called on an expression with zero matches
    ItemNotFound,

    /// Insert with an id-field value that already exists
    DuplicateKey {
        id: Value,
    },

    /// A backend cannot express a requested comparison kind
    Unsupported {
        backend: &'static str,
        operation: String,
    },

    /// Malformed comparison operand, or an item failing the item model's
    /// structural checks during conversion
    Validation {
        message: String,
    },

    /// Store-native error propagated from a backend
    Storage {
        backend: String,
        message: String,
    },
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoError::Configuration { message } => {
                write!(f, "Repository misconfigured: {}", message)
            }
            RepoError::KeyNotFound { id } => {
                write!(f, "Item with id {} not found", id)
            }
            RepoError::ItemNotFound => {
                write!(f, "No item matched the query")
            }
            RepoError::DuplicateKey { id } => {
                write!(f, "Item with id {} already exists", id)
            }
            RepoError::Unsupported { backend, operation } => {
                write!(f, "Backend '{}' does not support {}", backend, operation)
            }
            RepoError::Validation { message } => {
                write!(f, "Validation error: {}", message)
            }
            RepoError::Storage { backend, message } => {
                write!(f, "{} storage error: {}", backend, message)
            }
        }
    }
}

impl std::error::Error for RepoError {}

impl RepoError {
    /// Get the error code for programmatic handling and structured logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            RepoError::Configuration { .. } => "CONFIGURATION_ERROR",
            RepoError::KeyNotFound { .. } => "KEY_NOT_FOUND",
            RepoError::ItemNotFound => "ITEM_NOT_FOUND",
            RepoError::DuplicateKey { .. } => "DUPLICATE_KEY",
            RepoError::Unsupported { .. } => "UNSUPPORTED_OPERATION",
            RepoError::Validation { .. } => "VALIDATION_ERROR",
            RepoError::Storage { .. } => "STORAGE_ERROR",
        }
    }

    /// Build a `Configuration` error from anything displayable.
    pub fn configuration(message: impl fmt::Display) -> Self {
        RepoError::Configuration {
            message: message.to_string(),
        }
    }

    /// Build a `Validation` error from anything displayable.
    pub fn validation(message: impl fmt::Display) -> Self {
        RepoError::Validation {
            message: message.to_string(),
        }
    }

    /// Wrap a store-native error with the backend name.
    pub fn storage(backend: impl Into<String>, error: impl fmt::Display) -> Self {
        RepoError::Storage {
            backend: backend.into(),
            message: error.to_string(),
        }
    }

    /// Build an `Unsupported` error for a comparison kind or operation the
    /// backend cannot translate.
    pub fn unsupported(backend: &'static str, operation: impl fmt::Display) -> Self {
        RepoError::Unsupported {
            backend,
            operation: operation.to_string(),
        }
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Validation {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for RepoError {
    fn from(err: std::io::Error) -> Self {
        RepoError::Storage {
            backend: "file".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RepoError {
    fn from(err: serde_yaml::Error) -> Self {
        RepoError::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for RepoError {
    fn from(err: csv::Error) -> Self {
        RepoError::Storage {
            backend: "csv".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Storage {
            backend: "postgres".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "mongodb-backend")]
impl From<mongodb::error::Error> for RepoError {
    fn from(err: mongodb::error::Error) -> Self {
        RepoError::Storage {
            backend: "mongodb".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "rest")]
impl From<reqwest::Error> for RepoError {
    fn from(err: reqwest::Error) -> Self {
        RepoError::Storage {
            backend: "rest".to_string(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

// =============================================================================
// Tests
// =============================================================================
