//! Observer streams over the machine's broadcast channels.

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;

/// Why a [`Subscription`] produced no value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RecvError {
    /// The observer fell behind and this many values were skipped
    #[error("observer lagged behind by {0} values")]
    Lagged(u64),

    /// The machine was dropped; no further values will arrive
    #[error("machine closed")]
    Closed,

    /// Nothing is available right now (`try_recv` only)
    #[error("no value available")]
    Empty,
}

impl From<broadcast::error::RecvError> for RecvError {
    fn from(err: broadcast::error::RecvError) -> Self {
        match err {
            broadcast::error::RecvError::Lagged(n) => RecvError::Lagged(n),
            broadcast::error::RecvError::Closed => RecvError::Closed,
        }
    }
}

impl From<broadcast::error::TryRecvError> for RecvError {
    fn from(err: broadcast::error::TryRecvError) -> Self {
        match err {
            broadcast::error::TryRecvError::Lagged(n) => RecvError::Lagged(n),
            broadcast::error::TryRecvError::Closed => RecvError::Closed,
            broadcast::error::TryRecvError::Empty => RecvError::Empty,
        }
    }
}

/// One observer's view of a channel.
///
/// A state subscription starts with the value current at the moment of
/// subscribing, then follows every later change. Transition subscriptions
/// only see what happens after they subscribe.
#[derive(Debug)]
pub struct Subscription<T: Clone> {
    replay: Option<T>,
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    pub(crate) fn new(receiver: broadcast::Receiver<T>) -> Self {
        Self {
            replay: None,
            receiver,
        }
    }

    pub(crate) fn replaying(latest: T, receiver: broadcast::Receiver<T>) -> Self {
        Self {
            replay: Some(latest),
            receiver,
        }
    }

    /// Wait for the next value.
    pub async fn recv(&mut self) -> Result<T, RecvError> {
        if let Some(value) = self.replay.take() {
            return Ok(value);
        }
        Ok(self.receiver.recv().await?)
    }

    /// Take the next value if one is already buffered.
    pub fn try_recv(&mut self) -> Result<T, RecvError> {
        if let Some(value) = self.replay.take() {
            return Ok(value);
        }
        Ok(self.receiver.try_recv()?)
    }

    /// Drain everything currently buffered.
    ///
    /// Values lost to lag are skipped; draining continues with the oldest
    /// value still buffered.
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        loop {
            match self.try_recv() {
                Ok(value) => values.push(value),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Empty | RecvError::Closed) => break,
            }
        }
        values
    }
}

/// Latest-value cell that broadcasts every write.
///
/// Reading the cached value and subscribing happen under the same lock as
/// publishing, so a new observer never misses or duplicates a write.
#[derive(Debug)]
pub(crate) struct ReplayChannel<T: Clone> {
    latest: Mutex<T>,
    sender: broadcast::Sender<T>,
}

impl<T: Clone> ReplayChannel<T> {
    pub(crate) fn new(initial: T, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            latest: Mutex::new(initial),
            sender,
        }
    }

    pub(crate) fn current(&self) -> T {
        self.latest.lock().clone()
    }

    pub(crate) fn publish(&self, value: T) {
        let mut latest = self.latest.lock();
        *latest = value.clone();
        // No observers is fine
        let _ = self.sender.send(value);
    }

    pub(crate) fn subscribe(&self) -> Subscription<T> {
        let latest = self.latest.lock();
        Subscription::replaying(latest.clone(), self.sender.subscribe())
    }
}
