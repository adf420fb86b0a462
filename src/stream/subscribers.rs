use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::utils::lock;

type Callback<T> = dyn Fn(&T) + Send + Sync;

struct Entry<T> {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Box<Callback<T>>,
}

/// Callbacks registered for one topic.
///
/// Dispatch iterates a snapshot, so callbacks may subscribe or unsubscribe while an
/// event is being delivered.
pub(crate) struct SubscriberSet<T> {
    next_id: AtomicU64,
    entries: Mutex<Vec<Arc<Entry<T>>>>,
}

impl<T: 'static> SubscriberSet<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn add<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        lock(&self.entries).push(Arc::new(Entry {
            id,
            active: active.clone(),
            callback: Box::new(callback),
        }));

        let set: Arc<dyn Detach> = self.clone();
        Subscription {
            id,
            active,
            set: Arc::downgrade(&set),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Invoke every active callback with `event`. Returns how many ran to completion.
    ///
    /// A panicking callback is logged and skipped; the rest still receive the event.
    pub(crate) fn dispatch(&self, event: &T) -> usize {
        let snapshot: Vec<Arc<Entry<T>>> = lock(&self.entries).clone();
        let mut delivered = 0;
        for entry in snapshot {
            if !entry.active.load(Ordering::SeqCst) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| (entry.callback)(event))) {
                Ok(()) => delivered += 1,
                Err(_) => log::error!("Stream subscriber #{} panicked; event skipped for it", entry.id),
            }
        }
        delivered
    }
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<T: 'static> Detach for SubscriberSet<T> {
    fn detach(&self, id: u64) {
        lock(&self.entries).retain(|entry| entry.id != id);
    }
}

/// Handle for removing exactly one callback. Dropping it keeps the callback registered.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    set: Weak<dyn Detach>,
}

impl Subscription {
    /// Idempotent. Takes effect immediately, including for a dispatch already under way.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            if let Some(set) = self.set.upgrade() {
                set.detach(self.id);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
