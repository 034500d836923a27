use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use coursemart_events::{EventBus, Subscription};

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Generic event worker loop.
///
/// - Subscribes to an event bus
/// - Applies an idempotent handler for each message
/// - Supports graceful shutdown
///
/// Projections and the certificate issuer both ride on this: handlers must
/// tolerate duplicates (at-least-once delivery).
#[derive(Debug)]
pub struct EventWorker;

impl EventWorker {
    /// Spawn a worker thread that processes events from a fresh bus
    /// subscription. The subscription is taken before this function returns,
    /// so events published afterwards are never missed.
    pub fn spawn<M, B, H, E>(name: &'static str, bus: B, mut handler: H) -> WorkerHandle
    where
        M: Send + 'static,
        B: EventBus<M> + Send + Sync + 'static,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Debug + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<M> = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &mut handler))
            .expect("failed to spawn event worker thread");

        WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

fn worker_loop<M, H, E>(
    name: &'static str,
    sub: Subscription<M>,
    shutdown_rx: mpsc::Receiver<()>,
    handler: &mut H,
) where
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Debug,
{
    let tick = Duration::from_millis(250);

    loop {
        // Shutdown check (non-blocking)
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(msg) => {
                if let Err(err) = handler(msg) {
                    warn!(worker = name, error = ?err, "event worker handler failed");
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}
