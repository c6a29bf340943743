//! Single-resolution values
//!
//! A [`Resolver`] is consumed by `resolve`, so a value can be set at most
//! once. Every [`Eventual`] clone observes the same value, and readers that
//! arrive after resolution get the cached copy.

use tokio::sync::watch;

pub fn eventual<T: Clone>() -> (Resolver<T>, Eventual<T>) {
    let (tx, rx) = watch::channel(None);
    (Resolver { tx }, Eventual { rx })
}

pub struct Resolver<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> Resolver<T> {
    pub fn resolve(self, value: T) {
        self.tx.send_replace(Some(value));
    }
}

#[derive(Clone)]
pub struct Eventual<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> Eventual<T> {
    /// Wait for the value. `None` means the resolver was dropped unresolved.
    pub async fn get(&self) -> Option<T> {
        let mut rx = self.rx.clone();
        let value = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        value
    }

    /// The value if already resolved
    pub fn try_get(&self) -> Option<T> {
        self.rx.borrow().clone()
    }
}
