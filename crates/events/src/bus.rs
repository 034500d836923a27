//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is the **distribution** layer for events after they have been
//! persisted to the event store. It is intentionally lightweight:
//!
//! - **Transport-agnostic**: works with in-memory channels, message queues, etc.
//! - **At-least-once delivery**: events may be delivered multiple times;
//!   consumers (projections, the certificate issuer) must be idempotent.
//! - **No persistence**: the event store is the source of truth; if
//!   publication fails the events are still stored and can be republished.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to an event stream.
///
/// Each subscription gets a copy of all events published to the bus
/// (broadcast semantics). Subscriptions are designed for single-threaded
/// consumption; give each worker its own.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// `publish()` can fail; failures are surfaced to the caller (typically the
/// command dispatcher) which may retry. Since events are already persisted,
/// retrying publication is safe. Implementations must be `Send + Sync` so
/// multiple request threads can publish concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
