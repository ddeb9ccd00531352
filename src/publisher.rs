//! Single-value multicast with replay to late subscribers.
//!
//! A thin wrapper over `tokio::sync::watch`. The contract that matters is
//! late-subscriber replay: a subscriber attached to a publisher already
//! holding a value observes that value immediately, both via [`Subscription::current`]
//! and as the first item yielded by [`Subscription::next`]. Dropping one
//! subscription never affects the others.

use tokio::sync::watch;

#[derive(Debug)]
pub struct Publisher<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Publisher<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the held value and notify all subscribers. Publishing never
    /// fails, even with no subscribers attached.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// The value currently held.
    pub fn current(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let mut rx = self.tx.subscribe();
        // The held value counts as unseen so the first `next()` yields it.
        rx.mark_changed();
        Subscription { rx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One subscriber's view of a [`Publisher`].
#[derive(Debug, Clone)]
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// The value currently held, without waiting.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next value. The first call yields the value held at
    /// subscription time; returns `None` once the publisher is gone.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
