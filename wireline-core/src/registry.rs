//! Concurrent object registry.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use wireline_protocol::Handle;

/// Handle-to-instance store for one registered object type.
///
/// A single lock guards both the handle counter and the map, held only for
/// the duration of the mutation; method invocation on a returned instance
/// happens outside the registry lock. Each instance sits behind its own
/// mutex, so concurrent method calls on the same handle from different
/// connections are serialized. Handles are monotonic from 0 and never
/// reused; instances are never removed for the life of the registry.
pub struct Registry<T> {
    inner: Mutex<RegistryInner<T>>,
}

struct RegistryInner<T> {
    next_handle: Handle,
    objects: HashMap<Handle, Arc<Mutex<T>>>,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                next_handle: 0,
                objects: HashMap::new(),
            }),
        }
    }

    /// Inserts a new instance and returns its freshly allocated handle.
    ///
    /// Never fails: handle allocation and insertion are a single atomic step
    /// under the registry lock.
    pub fn insert(&self, object: T) -> Handle {
        let mut inner = self.inner.lock();
        let handle = inner.next_handle;
        inner.next_handle += 1;
        inner.objects.insert(handle, Arc::new(Mutex::new(object)));
        handle
    }

    /// Looks up an instance by handle; empty for handles never allocated.
    pub fn get(&self, handle: Handle) -> Option<Arc<Mutex<T>>> {
        self.inner.lock().objects.get(&handle).cloned()
    }

    /// Returns the number of live instances.
    pub fn len(&self) -> usize {
        self.inner.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
