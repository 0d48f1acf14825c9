//! FieldSync Core - Local field-operation tracking
//!
//! Objects mirrored from a remote persistence service are edited locally
//! before any network round-trip. This crate records those edits as field
//! operations that:
//! - Apply on top of the last known server value, so reads see pending edits
//! - Merge with the edit already queued for the same field
//! - Encode into the atomic update operations the remote service understands
//!
//! # Examples
//!
//! ```rust
//! use fieldsync_core::{FieldOperation, Value, WireEncoder, Encodable};
//!
//! let queued = FieldOperation::set(vec![1, 2, 3]);
//! let merged = FieldOperation::remove(vec![2])
//!     .unwrap()
//!     .merge_with_previous(Some(&queued))
//!     .unwrap();
//!
//! assert_eq!(merged, FieldOperation::set(vec![1, 3]));
//! assert_eq!(merged.encode().unwrap(), serde_json::json!([1, 3]));
//! ```

pub mod document;
pub mod encode;
pub mod error;
pub mod op;
pub mod queue;
pub mod value;

// Re-exports for convenience
pub use document::{Document, SharedDocument, SharedDocumentGuard};
pub use encode::{Encodable, Encoder, WireEncoder};
pub use error::{Result, SyncError};
pub use op::FieldOperation;
pub use queue::OperationQueue;
pub use value::{Number, ObjectRef, Pointer, RelationValue, RemoteObject, Value};

/// Field name within an object
pub type FieldName = String;

/// Server-assigned object identifier
pub type ObjectId = String;

/// Class (collection) name on the remote service
pub type ClassName = String;
