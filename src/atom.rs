//! A shared value which notifies subscribers every time it changes.
//!
//! Every change happens under an exclusive lock, so two concurrent updates never observe the same
//! previous value. Subscribers receive each new value in the order the changes happened, but values
//! are delivered after the exclusive section ends so a slow subscriber never blocks writers.

use std::{
    collections::BTreeMap,
    fmt,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    task::{Context, Poll},
};

use async_channel::{Receiver, Sender, TrySendError};
use futures::Stream;
use parking_lot::{Mutex, RwLock};

/// What happens when a subscriber's buffer is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop the oldest buffered value to make room. The subscriber skips values but always
    /// ends up with the latest one.
    #[default]
    DropOldest,
    /// Remove the subscriber. Its stream ends after the buffered values.
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomConfig {
    /// Number of values buffered per subscriber.
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for AtomConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            overflow: OverflowPolicy::DropOldest,
        }
    }
}

struct State<T> {
    value: T,
    subscribers: BTreeMap<u64, Sender<T>>,
}

struct Inner<T> {
    state: RwLock<State<T>>,
    // Taken before the state lock is released so deliveries keep the order of the changes.
    delivery: Mutex<()>,
    next_id: AtomicU64,
    config: AtomConfig,
}

/// A reactive value. Cloning an [`Atom`] gives another handle to the same value.
pub struct Atom<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Atom<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Atom<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Atom")
            .field("value", &state.value)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl<T: Default + Clone + Send + 'static> Default for Atom<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + 'static> Atom<T> {
    pub fn new(value: T) -> Self {
        Self::with_config(value, AtomConfig::default())
    }

    pub fn with_config(value: T, config: AtomConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State {
                    value,
                    subscribers: BTreeMap::new(),
                }),
                delivery: Mutex::new(()),
                next_id: AtomicU64::new(0),
                config: AtomConfig {
                    capacity: config.capacity.max(1),
                    ..config
                },
            }),
        }
    }

    /// Read the current value without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.state.read().value)
    }

    pub fn get(&self) -> T {
        self.read(T::clone)
    }

    /// Replace the value and notify every subscriber.
    pub fn set(&self, value: T) {
        self.update(|_| value);
    }

    /// Compute the next value from the previous one, install it and notify every subscriber.
    /// Returns the installed value.
    ///
    /// `f` runs while the value is exclusively locked. It must not access this atom, which includes
    /// dropping one of its subscriptions.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> T {
        match self.try_update(|prev| Ok::<_, std::convert::Infallible>(f(prev))) {
            Ok(next) => next,
            Err(never) => match never {},
        }
    }

    /// Like [`Atom::update`] but `f` may reject the transition. A rejected transition leaves the
    /// value untouched and nobody is notified.
    pub fn try_update<E>(&self, f: impl FnOnce(&T) -> Result<T, E>) -> Result<T, E> {
        let mut state = self.inner.state.write();

        let next = f(&state.value)?;
        state.value = next;

        state.subscribers.retain(|_, tx| !tx.is_closed());
        let subscribers = state.subscribers.values().cloned().collect::<Vec<_>>();
        let value = state.value.clone();

        let _delivery = self.inner.delivery.lock();
        drop(state);

        for tx in &subscribers {
            self.deliver(tx, value.clone());
        }

        Ok(value)
    }

    /// Subscribe to every future change. The current value is delivered first.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = async_channel::bounded(self.inner.config.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let mut state = self.inner.state.write();
        // The channel is empty and open so this can't fail.
        let _ = tx.try_send(state.value.clone());
        state.subscribers.insert(id, tx);
        drop(state);

        #[cfg(feature = "tracing")]
        tracing::trace!("atom subscriber {id} added");

        Subscription {
            id,
            rx: Box::pin(rx),
            atom: Arc::downgrade(&self.inner),
        }
    }

    /// Number of subscribers still receiving values.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .state
            .read()
            .subscribers
            .values()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    fn deliver(&self, tx: &Sender<T>, value: T) {
        match tx.try_send(value) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(value)) => match self.inner.config.overflow {
                OverflowPolicy::DropOldest => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("atom subscriber is full, dropping its oldest value");

                    let _ = tx.force_send(value);
                }
                OverflowPolicy::Disconnect => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("atom subscriber fell behind, disconnecting it");

                    // Removed from the map by the next update.
                    tx.close();
                }
            },
        }
    }
}

/// A stream of the values of an [`Atom`].
///
/// Dropping the subscription or calling [`Subscription::unsubscribe`] stops delivery. The stream
/// ends when the atom is dropped or the subscriber was disconnected for falling behind.
pub struct Subscription<T> {
    id: u64,
    rx: Pin<Box<Receiver<T>>>,
    atom: Weak<Inner<T>>,
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl<T> Subscription<T> {
    /// Stop receiving values. No value is delivered to this subscription afterwards.
    pub fn unsubscribe(self) {}

    /// Values waiting to be received.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.as_mut().poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rx.size_hint()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.rx.close();
        if let Some(atom) = self.atom.upgrade() {
            atom.state.write().subscribers.remove(&self.id);

            #[cfg(feature = "tracing")]
            tracing::trace!("atom subscriber {} removed", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[test]
    fn rejected_updates_keep_the_value() {
        let atom = Atom::new(1);
        let result = atom.try_update(|_| Err("nope"));
        assert_eq!(result, Err("nope"));
        assert_eq!(atom.get(), 1);
    }

    #[test]
    fn capacity_is_at_least_one() {
        let atom = Atom::with_config(
            0,
            AtomConfig {
                capacity: 0,
                overflow: OverflowPolicy::Disconnect,
            },
        );
        let sub = atom.subscribe();
        assert_eq!(sub.pending(), 1);
    }

    #[tokio::test]
    async fn dropping_the_atom_ends_subscriptions() {
        let atom = Atom::new("a".to_string());
        let mut sub = atom.subscribe();
        drop(atom);
        assert_eq!(sub.next().await.as_deref(), Some("a"));
        assert_eq!(sub.next().await, None);
    }
}
