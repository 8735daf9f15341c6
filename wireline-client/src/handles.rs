//! Client-side record of remotely created instances.

use parking_lot::Mutex;
use wireline_protocol::Handle;

/// Set of instance handles this client has created on the server.
///
/// Purely bookkeeping: the server owns the instances, this set only remembers
/// which handles came back from successful creates so callers can enumerate
/// or validate them later.
#[derive(Default)]
pub struct HandleSet {
    handles: Mutex<Vec<Handle>>,
}

impl HandleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a handle; returns `false` if it was already recorded.
    pub fn register(&self, handle: Handle) -> bool {
        let mut handles = self.handles.lock();
        if handles.contains(&handle) {
            return false;
        }
        handles.push(handle);
        true
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.handles.lock().contains(&handle)
    }

    /// Returns all recorded handles in creation order.
    pub fn all(&self) -> Vec<Handle> {
        self.handles.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
