//! Single-slot, latest-wins handoff between stages.
//!
//! Publishing overwrites any value the reader has not taken yet, so a slow
//! consumer never builds a backlog: it always wakes up to the newest value.
//! Overwritten values are counted so the pipeline can report drops.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

struct Shared<T> {
    value: Mutex<Option<T>>,
    notify: Notify,
    closed: AtomicBool,
    overwritten: AtomicU64,
}

/// Writing half of a latest-wins slot.
pub struct SlotWriter<T> {
    shared: Arc<Shared<T>>,
}

/// Reading half of a latest-wins slot.
pub struct SlotReader<T> {
    shared: Arc<Shared<T>>,
}

/// Create a connected writer/reader pair.
pub fn latest_slot<T>() -> (SlotWriter<T>, SlotReader<T>) {
    let shared = Arc::new(Shared {
        value: Mutex::new(None),
        notify: Notify::new(),
        closed: AtomicBool::new(false),
        overwritten: AtomicU64::new(0),
    });
    (
        SlotWriter {
            shared: shared.clone(),
        },
        SlotReader { shared },
    )
}

impl<T> SlotWriter<T> {
    /// Store `value`, replacing any unconsumed one.
    ///
    /// Returns `true` if an older value was dropped.
    pub fn publish(&self, value: T) -> bool {
        let replaced = {
            let mut slot = lock(&self.shared.value);
            slot.replace(value).is_some()
        };
        if replaced {
            self.shared.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.notify.notify_one();
        replaced
    }

    /// Withdraw a value the reader has not taken yet.
    ///
    /// Returns `true` if one was discarded.
    pub fn clear(&self) -> bool {
        lock(&self.shared.value).take().is_some()
    }

    /// Values dropped because a newer one arrived first.
    pub fn overwritten(&self) -> u64 {
        self.shared.overwritten.load(Ordering::Relaxed)
    }
}

impl<T> Drop for SlotWriter<T> {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.notify.notify_one();
    }
}

impl<T> SlotReader<T> {
    /// Wait for the next value and take it.
    ///
    /// Returns `None` once the writer is gone and the slot is empty.
    /// Cancel-safe: a value is only removed when the future completes.
    pub async fn take(&mut self) -> Option<T> {
        loop {
            if let Some(value) = self.try_take() {
                return Some(value);
            }
            if self.shared.closed.load(Ordering::Acquire) {
                return self.try_take();
            }
            self.shared.notify.notified().await;
        }
    }

    /// Take the current value without waiting.
    pub fn try_take(&mut self) -> Option<T> {
        lock(&self.shared.value).take()
    }

    /// Values dropped because a newer one arrived first.
    pub fn overwritten(&self) -> u64 {
        self.shared.overwritten.load(Ordering::Relaxed)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // The slot holds plain data; a panic elsewhere cannot leave it inconsistent.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
