//! Listener registry for editor notifications.
//!
//! Subscribers register a callback and get a `ListenerId` back; dropping
//! interest is an explicit `unsubscribe(id)`. Callbacks run synchronously in
//! subscription order.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handles are unique across every registry, so one `unsubscribe` can be
/// offered to several of them.
static NEXT_LISTENER: AtomicU64 = AtomicU64::new(1);

/// Handle returned by [`Listeners::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Callback<E> = Box<dyn FnMut(&E)>;

pub struct Listeners<E> {
    entries: Vec<(ListenerId, Callback<E>)>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl<E> Listeners<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER.fetch_add(1, Ordering::Relaxed));
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, callback) in &mut self.entries {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
