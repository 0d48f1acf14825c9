//! References to other remote objects
//!
//! A field can hold a reference to another remote object. The core only
//! needs three things from the referenced object: its class, its
//! server-assigned id (if it has been saved), and whether it carries unsaved
//! local edits. Two references may denote the same remote entity without
//! being the same in-memory instance, so identity checks go through these
//! capabilities rather than pointer equality alone.

use std::fmt;
use std::sync::Arc;

/// Capabilities the operation model needs from a referenced remote object
pub trait RemoteObject: fmt::Debug + Send + Sync {
    /// Class (collection) name on the remote service
    fn class_name(&self) -> String;

    /// Server-assigned identifier, `None` until first saved
    fn remote_id(&self) -> Option<String>;

    /// Whether the object has local edits not yet saved
    fn has_pending_local_edits(&self) -> bool;
}

/// A detached reference to a saved remote object
///
/// Produced when decoding wire pointers. It never carries local edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pointer {
    /// Class name
    pub class_name: String,

    /// Server-assigned id
    pub object_id: String,
}

impl Pointer {
    /// Create a pointer to `class_name` with id `object_id`
    pub fn new(class_name: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            object_id: object_id.into(),
        }
    }
}

impl RemoteObject for Pointer {
    fn class_name(&self) -> String {
        self.class_name.clone()
    }

    fn remote_id(&self) -> Option<String> {
        Some(self.object_id.clone())
    }

    fn has_pending_local_edits(&self) -> bool {
        false
    }
}

/// Shared handle to a remote object held inside a field value
///
/// Equality is instance identity: two handles are equal only when they point
/// at the same in-memory object.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn RemoteObject>);

impl ObjectRef {
    /// Wrap a remote object
    pub fn new<T: RemoteObject + 'static>(object: T) -> Self {
        ObjectRef(Arc::new(object))
    }

    /// Wrap an already shared remote object
    pub fn from_arc(object: Arc<dyn RemoteObject>) -> Self {
        ObjectRef(object)
    }

    /// Detached reference to a saved object
    pub fn pointer(class_name: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self::new(Pointer::new(class_name, object_id))
    }

    /// Class name of the referenced object
    pub fn class_name(&self) -> String {
        self.0.class_name()
    }

    /// Server id of the referenced object
    pub fn remote_id(&self) -> Option<String> {
        self.0.remote_id()
    }

    /// Whether the referenced object has unsaved local edits
    pub fn has_pending_local_edits(&self) -> bool {
        self.0.has_pending_local_edits()
    }

    /// Whether both handles point at the same in-memory object
    pub fn same_instance(&self, other: &ObjectRef) -> bool {
        // Compare data pointers only; vtable pointers may differ across codegen units
        Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
    }

    /// Whether `self`, as a stored element, denotes the same saved entity as
    /// `other`.
    ///
    /// A stored reference with pending local edits never matches, even when
    /// it denotes the same remote entity.
    pub fn matches_saved(&self, other: &ObjectRef) -> bool {
        if self.has_pending_local_edits() {
            return false;
        }
        match (self.remote_id(), other.remote_id()) {
            (Some(a), Some(b)) => a == b && self.class_name() == other.class_name(),
            _ => false,
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remote_id() {
            Some(id) => write!(f, "ObjectRef({}:{})", self.class_name(), id),
            None => write!(f, "ObjectRef({}:<unsaved>)", self.class_name()),
        }
    }
}

impl From<Pointer> for ObjectRef {
    fn from(pointer: Pointer) -> Self {
        ObjectRef::new(pointer)
    }
}
