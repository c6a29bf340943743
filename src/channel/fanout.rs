//! Single-producer, multi-subscriber sequence with per-subscriber cursors
//!
//! Every subscription starts at the first item and reads at its own pace.
//! The producer is held back once `capacity` items sit beyond the slowest
//! live cursor. An item is evicted only after every live subscriber has
//! read it; a subscription attempted after an eviction is rejected instead
//! of silently missing the head of the sequence.
//!
//! A full channel without live subscribers evicts from the head instead of
//! waiting once some other reader sharing its [`Demand`] is suspended.

use super::demand::Demand;
use crate::error::{common, ResultError};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Why an item could not be published
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("channel already completed")]
    Closed,
    #[error("channel cancelled by its subscribers")]
    Cancelled,
}

#[derive(Debug, Clone)]
enum End {
    Completed,
    Failed(ResultError),
}

struct State<T> {
    items: VecDeque<T>,
    /// Sequence number of `items[0]`
    head: u64,
    /// Subscriber id to the sequence number it reads next
    cursors: HashMap<u64, u64>,
    next_subscriber: u64,
    ever_subscribed: bool,
    evicted: bool,
    end: Option<End>,
    cancelled: bool,
    handles: usize,
}

impl<T> State<T> {
    fn evict(&mut self) -> bool {
        let Some(min) = self.cursors.values().copied().min() else {
            return false;
        };
        let mut popped = false;
        while self.head < min && self.items.pop_front().is_some() {
            self.head += 1;
            popped = true;
        }
        if popped {
            self.evicted = true;
        }
        popped
    }

    /// Nobody is left to read an unfinished channel
    fn should_cancel(&self) -> bool {
        !self.cancelled
            && self.end.is_none()
            && self.cursors.is_empty()
            && (self.ever_subscribed || self.handles == 0)
    }
}

struct Shared<T> {
    name: &'static str,
    capacity: usize,
    state: Mutex<State<T>>,
    item_ready: Notify,
    space_ready: Notify,
    on_cancel: Option<CancellationToken>,
    demand: Demand,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_locked(&self, state: &mut State<T>) {
        state.cancelled = true;
        if !state.items.is_empty() {
            state.head += state.items.len() as u64;
            state.items.clear();
            state.evicted = true;
        }
        tracing::debug!(channel = self.name, "channel cancelled by its subscribers");
        if let Some(token) = &self.on_cancel {
            token.cancel();
        }
        self.space_ready.notify_waiters();
    }
}

/// Create a channel holding at most `capacity` unread items
pub fn channel<T: Clone>(
    name: &'static str,
    capacity: usize,
    demand: &Demand,
) -> (Publisher<T>, Fanout<T>) {
    build(name, capacity, demand, None)
}

/// Like [`channel`], but cancelling the channel also cancels `token`
pub fn channel_with_token<T: Clone>(
    name: &'static str,
    capacity: usize,
    demand: &Demand,
    token: CancellationToken,
) -> (Publisher<T>, Fanout<T>) {
    build(name, capacity, demand, Some(token))
}

fn build<T: Clone>(
    name: &'static str,
    capacity: usize,
    demand: &Demand,
    on_cancel: Option<CancellationToken>,
) -> (Publisher<T>, Fanout<T>) {
    let shared = Arc::new(Shared {
        name,
        capacity: capacity.max(1),
        state: Mutex::new(State {
            items: VecDeque::new(),
            head: 0,
            cursors: HashMap::new(),
            next_subscriber: 0,
            ever_subscribed: false,
            evicted: false,
            end: None,
            cancelled: false,
            handles: 1,
        }),
        item_ready: Notify::new(),
        space_ready: Notify::new(),
        on_cancel,
        demand: demand.clone(),
    });
    (
        Publisher {
            shared: shared.clone(),
        },
        Fanout { shared },
    )
}

/// Producing half. Dropping it without `close` or `fail` fails the channel.
pub struct Publisher<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> Publisher<T> {
    /// Append an item, waiting while the channel is full
    pub async fn send(&self, item: T) -> Result<(), SendError> {
        let mut item = Some(item);
        loop {
            let space = self.shared.space_ready.notified();
            let unsubscribed = {
                let mut state = self.shared.lock();
                if state.cancelled {
                    return Err(SendError::Cancelled);
                }
                if state.end.is_some() {
                    return Err(SendError::Closed);
                }
                let full = state.items.len() >= self.shared.capacity;
                if full
                    && state.cursors.is_empty()
                    && (state.evicted || self.shared.demand.is_waiting())
                {
                    if !state.evicted {
                        tracing::debug!(
                            channel = self.shared.name,
                            "no subscribers, evicting unread items"
                        );
                    }
                    state.items.pop_front();
                    state.head += 1;
                    state.evicted = true;
                }
                if state.items.len() < self.shared.capacity {
                    if let Some(item) = item.take() {
                        state.items.push_back(item);
                    }
                    drop(state);
                    self.shared.item_ready.notify_waiters();
                    return Ok(());
                }
                state.cursors.is_empty()
            };

            if unsubscribed {
                tokio::select! {
                    biased;
                    _ = space => {}
                    _ = self.shared.demand.reader_waiting() => {}
                }
            } else {
                space.await;
            }
        }
    }

    /// Complete the channel normally. No-op once ended.
    pub fn close(&self) {
        self.finish(End::Completed);
    }

    /// Complete the channel with a failure. No-op once ended.
    pub fn fail(&self, err: ResultError) {
        self.finish(End::Failed(err));
    }

    fn finish(&self, end: End) {
        let mut state = self.shared.lock();
        if state.end.is_some() {
            return;
        }
        state.end = Some(end);
        drop(state);
        self.shared.item_ready.notify_waiters();
    }
}

impl<T> Drop for Publisher<T> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if state.end.is_none() {
            state.end = Some(End::Failed(common::abandoned(self.shared.name)));
            drop(state);
            self.shared.item_ready.notify_waiters();
        }
    }
}

/// Subscribing half, cloned freely by the result aggregate
pub struct Fanout<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Fanout<T> {
    fn clone(&self) -> Self {
        self.shared.lock().handles += 1;
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Fanout<T> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.handles -= 1;
        if state.should_cancel() {
            self.shared.cancel_locked(&mut state);
        }
    }
}

impl<T: Clone + Send + 'static> Fanout<T> {
    /// Start reading from the first item
    pub fn subscribe(&self) -> Subscription<T> {
        let mut state = self.shared.lock();
        if state.evicted {
            tracing::debug!(channel = self.shared.name, "late subscription rejected");
            return Subscription {
                shared: self.shared.clone(),
                id: None,
                rejected: Some(common::already_consumed(self.shared.name)),
            };
        }

        let id = state.next_subscriber;
        state.next_subscriber += 1;
        let head = state.head;
        state.cursors.insert(id, head);
        state.ever_subscribed = true;
        Subscription {
            shared: self.shared.clone(),
            id: Some(id),
            rejected: None,
        }
    }

    /// Subscribe and adapt to a `Stream`
    pub fn stream(&self) -> BoxStream<'static, Result<T, ResultError>> {
        self.subscribe().into_stream()
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }
}

/// One reader's cursor into a [`Fanout`]
pub struct Subscription<T> {
    shared: Arc<Shared<T>>,
    /// `None` once finished or when rejected
    id: Option<u64>,
    rejected: Option<ResultError>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    /// Next item, the terminal failure, or `None` at the end
    pub async fn next(&mut self) -> Option<Result<T, ResultError>> {
        if let Some(err) = self.rejected.take() {
            return Some(Err(err));
        }
        let id = self.id?;

        loop {
            let ready = self.shared.item_ready.notified();
            {
                let mut state = self.shared.lock();
                let cursor = state.cursors.get(&id).copied().unwrap_or(state.head);
                let index = (cursor - state.head) as usize;
                if let Some(item) = state.items.get(index).cloned() {
                    state.cursors.insert(id, cursor + 1);
                    let evicted = state.evict();
                    drop(state);
                    if evicted {
                        self.shared.space_ready.notify_waiters();
                    }
                    return Some(Ok(item));
                }

                if let Some(end) = state.end.clone() {
                    state.cursors.remove(&id);
                    drop(state);
                    self.id = None;
                    return match end {
                        End::Completed => None,
                        End::Failed(err) => Some(Err(err)),
                    };
                }
            }
            let _reader = self.shared.demand.reader();
            ready.await;
        }
    }

    pub fn into_stream(self) -> BoxStream<'static, Result<T, ResultError>> {
        stream::unfold(self, |mut sub| async move {
            let item = sub.next().await?;
            Some((item, sub))
        })
        .boxed()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        let mut state = self.shared.lock();
        state.cursors.remove(&id);
        if state.should_cancel() {
            self.shared.cancel_locked(&mut state);
        } else if state.evict() {
            drop(state);
            self.shared.space_ready.notify_waiters();
        }
    }
}
