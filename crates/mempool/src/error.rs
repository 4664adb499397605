//! Error types for nebula-mempool
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.
//!
//! Contention inside the queues is never surfaced: CAS retries are handled
//! internally. What callers see is one of three classes:
//!
//! - capacity signals ([`PoolError::Exhausted`]) that may be retried,
//! - caller logic errors ([`PoolError::DoubleRelease`],
//!   [`PoolError::InvalidIndex`], [`PoolError::ForeignHandle`]) that leave
//!   the pool untouched,
//! - broken invariants ([`PoolError::BrokenInvariant`]) that mean the pool's
//!   safety contract no longer holds. Whether to abort is the caller's call,
//!   but these must never be swallowed.

use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{error, warn};

// ============================================================================
// Main Error Types
// ============================================================================

/// Object pool errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    // --- Capacity ---
    #[error("Object pool '{pool}' exhausted (capacity: {capacity})")]
    Exhausted { pool: String, capacity: usize },

    // --- Caller logic errors ---
    #[error("Double release of slot {index} in pool '{pool}'")]
    DoubleRelease { pool: String, index: usize },

    #[error("Invalid slot index {index} (capacity: {capacity})")]
    InvalidIndex { index: usize, capacity: usize },

    #[error("Handle released into pool '{pool}' it was not acquired from")]
    ForeignHandle { pool: String },

    // --- Invariant violations ---
    #[error("Broken invariant in {component}: {details}")]
    BrokenInvariant { component: String, details: String },

    // --- Setup ---
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Initialization failed: {reason}")]
    InitializationFailed { reason: String },
}

impl PoolError {
    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Check if the pool's safety invariant has been violated.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BrokenInvariant { .. })
    }

    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Exhausted { .. } => "MEMPOOL:POOL:EXHAUSTED",
            Self::DoubleRelease { .. } => "MEMPOOL:POOL:DOUBLE_RELEASE",
            Self::InvalidIndex { .. } => "MEMPOOL:POOL:INDEX",
            Self::ForeignHandle { .. } => "MEMPOOL:POOL:FOREIGN",
            Self::BrokenInvariant { .. } => "MEMPOOL:SYSTEM:INVARIANT",
            Self::InvalidConfig { .. } => "MEMPOOL:CONFIG:INVALID",
            Self::InitializationFailed { .. } => "MEMPOOL:SYSTEM:INIT",
        }
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create pool exhausted error
    pub fn exhausted(pool: &str, capacity: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(pool, capacity, "object pool exhausted");

        Self::Exhausted {
            pool: pool.to_string(),
            capacity,
        }
    }

    /// Create double release error
    pub fn double_release(pool: &str, index: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(pool, index, "double release rejected");

        Self::DoubleRelease {
            pool: pool.to_string(),
            index,
        }
    }

    /// Create invalid index error
    #[must_use]
    pub fn invalid_index(index: usize, capacity: usize) -> Self {
        Self::InvalidIndex { index, capacity }
    }

    /// Create foreign handle error
    pub fn foreign_handle(pool: &str) -> Self {
        Self::ForeignHandle {
            pool: pool.to_string(),
        }
    }

    /// Create broken invariant error
    pub fn broken_invariant(component: &str, details: &str) -> Self {
        #[cfg(feature = "logging")]
        error!(component, details, "pool invariant violated");

        Self::BrokenInvariant {
            component: component.to_string(),
            details: details.to_string(),
        }
    }

    /// Create invalid config error
    pub fn invalid_config(reason: &str) -> Self {
        Self::InvalidConfig {
            reason: reason.to_string(),
        }
    }

    /// Create initialization failed error
    pub fn initialization_failed(component: &str) -> Self {
        Self::InitializationFailed {
            reason: format!("failed to initialize {component}"),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for pool operations
pub type PoolResult<T> = core::result::Result<T, PoolError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PoolError::exhausted("frames", 64);
        assert!(error.to_string().contains("frames"));
        assert!(error.to_string().contains("64"));

        let error = PoolError::double_release("frames", 3);
        assert!(error.to_string().contains("slot 3"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PoolError::exhausted("p", 1).code(),
            "MEMPOOL:POOL:EXHAUSTED"
        );
        assert_eq!(
            PoolError::double_release("p", 0).code(),
            "MEMPOOL:POOL:DOUBLE_RELEASE"
        );
        assert_eq!(
            PoolError::broken_invariant("queue", "duplicate index").code(),
            "MEMPOOL:SYSTEM:INVARIANT"
        );
        assert_eq!(PoolError::invalid_index(9, 4).code(), "MEMPOOL:POOL:INDEX");
    }

    #[test]
    fn test_retryable() {
        assert!(PoolError::exhausted("p", 8).is_retryable());
        assert!(!PoolError::double_release("p", 0).is_retryable());
        assert!(!PoolError::invalid_config("zero capacity").is_retryable());
    }

    #[test]
    fn test_only_broken_invariant_is_fatal() {
        assert!(PoolError::broken_invariant("cache", "claim failed").is_fatal());
        assert!(!PoolError::exhausted("p", 8).is_fatal());
        assert!(!PoolError::double_release("p", 1).is_fatal());
        assert!(!PoolError::foreign_handle("p").is_fatal());
    }
}
