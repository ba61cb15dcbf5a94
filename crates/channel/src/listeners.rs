//! Listener registry: (category, callback) entries whose lifetime is
//! independent of any particular connection instance.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

/// Opaque handle to a registered listener. Never reused within a process.
pub type ListenerHandle = u64;

/// The fixed set of transport events a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    /// An inbound text frame.
    Message,
    /// A connection-open transition.
    Open,
}

/// Raw callback attached to a connection for one event category.
///
/// `Message` callbacks receive the raw text frame; typed decoding and kind
/// filtering happen in the per-listener wrapper installed by
/// `ChannelManager::listen_for`.
#[derive(Clone)]
pub enum ListenerCallback {
    Message(Arc<dyn Fn(&str) + Send + Sync>),
    Open(Arc<dyn Fn() + Send + Sync>),
}

impl ListenerCallback {
    pub fn category(&self) -> EventCategory {
        match self {
            ListenerCallback::Message(_) => EventCategory::Message,
            ListenerCallback::Open(_) => EventCategory::Open,
        }
    }
}

impl std::fmt::Debug for ListenerCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ListenerCallback")
            .field(&self.category())
            .finish()
    }
}

/// Ordered map from handle to callback. Iteration order is registration
/// order because handles increase monotonically.
#[derive(Debug, Default)]
pub(crate) struct ListenerRegistry {
    entries: BTreeMap<ListenerHandle, ListenerCallback>,
    next_handle: ListenerHandle,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store a callback under a fresh handle (previous maximum + 1, starting
    /// at 0). Handles are never reused, even after removal.
    pub(crate) fn insert(&mut self, callback: ListenerCallback) -> ListenerHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        debug!(handle, category = ?callback.category(), "registered listener");
        self.entries.insert(handle, callback);
        handle
    }

    pub(crate) fn remove(&mut self, handle: ListenerHandle) -> Option<ListenerCallback> {
        self.entries.remove(&handle)
    }

    pub(crate) fn contains(&self, handle: ListenerHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Entries in ascending handle order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (ListenerHandle, &ListenerCallback)> {
        self.entries.iter().map(|(handle, callback)| (*handle, callback))
    }

    /// Handle snapshot for sweeps that mutate the registry while iterating.
    pub(crate) fn handles(&self) -> Vec<ListenerHandle> {
        self.entries.keys().copied().collect()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
