//! Error types for field operations
//!
//! Every error here is local and permanent: it is raised synchronously
//! before any network call, and retrying the same call yields the same error.

use thiserror::Error;

/// Result type alias for FieldSync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised while building, merging, applying or encoding operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// A value had the wrong shape for the operation
    #[error("{operation} requires {expected}, found {found}")]
    TypeMismatch {
        /// Operation that rejected the value
        operation: &'static str,
        /// Expected value kind
        expected: &'static str,
        /// Actual value kind
        found: &'static str,
    },

    /// Two queued operations cannot be composed
    #[error("{next} operation is invalid after previous {previous} operation")]
    InvalidOperationSequence {
        /// Kind of the pending operation
        previous: &'static str,
        /// Kind of the operation being queued
        next: &'static str,
    },

    /// Increment targeted a field holding something other than a number
    #[error("cannot increment a non-number type ({found})")]
    NonNumericIncrement {
        /// Actual value kind
        found: &'static str,
    },

    /// A pointer was requested for an object with no server id yet
    #[error("cannot encode a pointer to an unsaved {class_name} object")]
    UnsavedReference {
        /// Class of the unsaved object
        class_name: String,
    },

    /// The encoder was asked not to emit object references
    #[error("remote object references are not allowed here")]
    ReferenceNotAllowed,

    /// Relation edits must all target the same class
    #[error("related object must be of class {expected}, but {found} was passed in")]
    RelationClassMismatch {
        /// Target class already fixed for the relation
        expected: String,
        /// Class of the offending object
        found: String,
    },

    /// A relation edit with nothing to add and nothing to remove
    #[error("cannot create a relation operation with no objects")]
    EmptyRelation,

    /// A plain map used a key the wire format reserves for envelopes
    #[error("map key {0} is reserved by the wire format")]
    ReservedKey(String),

    /// NaN and infinities have no JSON encoding
    #[error("cannot encode non-finite number {0}")]
    NonFiniteNumber(f64),

    /// Malformed wire input
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SyncError {
    /// Create a type mismatch error.
    #[inline]
    pub fn type_mismatch(operation: &'static str, expected: &'static str, found: &'static str) -> Self {
        SyncError::TypeMismatch {
            operation,
            expected,
            found,
        }
    }

    /// Create an invalid operation sequence error.
    #[inline]
    pub fn invalid_sequence(previous: &'static str, next: &'static str) -> Self {
        SyncError::InvalidOperationSequence { previous, next }
    }

    /// Create a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        SyncError::Protocol(message.into())
    }

    /// Whether a merge was rejected
    pub fn is_invalid_sequence(&self) -> bool {
        matches!(self, SyncError::InvalidOperationSequence { .. })
    }

    /// Whether a value had the wrong shape
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, SyncError::TypeMismatch { .. })
    }
}
