//! Readers suspended on one query result
//!
//! A channel nobody has subscribed to holds its first `capacity` items for
//! readers that subscribe right after opening. It stops holding the producer
//! back as soon as some other reader of the same result is suspended, since
//! that reader can only make progress if parsing continues.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct Demand {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    waiting: AtomicUsize,
    arrived: Notify,
}

impl Demand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the caller as suspended until the guard is dropped
    pub fn reader(&self) -> ReaderGuard {
        self.inner.waiting.fetch_add(1, Ordering::SeqCst);
        self.inner.arrived.notify_waiters();
        ReaderGuard {
            inner: self.inner.clone(),
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.inner.waiting.load(Ordering::SeqCst) > 0
    }

    /// Resolves once some reader is suspended
    pub async fn reader_waiting(&self) {
        loop {
            let arrived = self.inner.arrived.notified();
            if self.is_waiting() {
                return;
            }
            arrived.await;
        }
    }
}

pub struct ReaderGuard {
    inner: Arc<Inner>,
}

impl Drop for ReaderGuard {
    fn drop(&mut self) {
        self.inner.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_waiting_resolves_when_a_reader_suspends() {
        let demand = Demand::new();
        let mut waiting = task::spawn(demand.reader_waiting());
        assert_pending!(waiting.poll());

        let guard = demand.reader();
        assert!(waiting.is_woken());
        assert_ready!(waiting.poll());
        assert!(demand.is_waiting());

        drop(guard);
        assert!(!demand.is_waiting());
    }
}
