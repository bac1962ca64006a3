//! Error types for the role-specific context domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

use crate::memory::MemoryScope;

/// The top-level error type for all context-service operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Role / tone registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error means "the thing asked for does not exist".
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Registry(e) => matches!(
                e,
                RegistryError::RoleNotFound(_) | RegistryError::ToneNotFound(_)
            ),
            Error::Memory(e) => matches!(e, MemoryError::NotFound { .. }),
            _ => false,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Tone not found: {0}")]
    ToneNotFound(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Memory not found: {scope}/{key}")]
    NotFound { scope: MemoryScope, key: String },

    #[error("Memory backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl MemoryError {
    pub fn not_found(scope: MemoryScope, key: impl Into<String>) -> Self {
        MemoryError::NotFound {
            scope,
            key: key.into(),
        }
    }

    /// True for failures that say nothing about the key itself (timeouts,
    /// unreachable backend).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, MemoryError::BackendUnavailable(_))
    }
}
