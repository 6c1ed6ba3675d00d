//! Server lifecycle: state machine, shutdown signaling, final usage flush.

use crate::aggregate::Aggregator;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// Grace period between answering a stop command and tearing the listener
/// down, so the acknowledgement can still reach the caller.
pub const STOP_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ServerState {
    Created = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
    Stopped = 4,
}

impl ServerState {
    fn from_u8(value: u8) -> ServerState {
        match value {
            0 => ServerState::Created,
            1 => ServerState::Starting,
            2 => ServerState::Running,
            3 => ServerState::Stopping,
            _ => ServerState::Stopped,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("no listener is waiting for the shutdown signal")]
pub struct StopError;

struct Inner {
    state: AtomicU8,
    finalized: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    aggregator: Arc<Aggregator>,
}

/// Cloneable handle on the server's lifecycle. The stop command, the
/// signal handler and the accept loop all share one.
#[derive(Clone)]
pub struct LifecycleHandle {
    inner: Arc<Inner>,
}

impl LifecycleHandle {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(ServerState::Created as u8),
                finalized: AtomicBool::new(false),
                shutdown_tx,
                aggregator,
            }),
        }
    }

    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    pub(crate) fn advance(&self, to: ServerState) {
        let prior = self.inner.state.swap(to as u8, Ordering::SeqCst);
        debug!("lifecycle: {:?} -> {to:?}", ServerState::from_u8(prior));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.inner.shutdown_tx.subscribe()
    }

    /// Run the final usage flush exactly once, whichever termination path
    /// gets here first (explicit stop or signal handler).
    pub fn finalize(&self) {
        if self
            .inner
            .finalized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("flushing usage before shutdown");
            self.inner.aggregator.flush_usage();
        }
    }

    /// Move to `Stopping`, flush usage and signal the accept loop.
    /// Idempotent: a second call once stopping is a no-op.
    pub fn stop(&self) -> Result<(), StopError> {
        if self.state() >= ServerState::Stopping {
            return Ok(());
        }
        self.advance(ServerState::Stopping);
        self.finalize();
        self.inner
            .shutdown_tx
            .send(())
            .map(|_| ())
            .map_err(|_| StopError)
    }

    /// Deferred stop used by the stop command: the acknowledgement response
    /// flushes during the grace period, then the listener goes down. A
    /// failed stop is unrecoverable and terminates the process.
    pub fn stop_after_grace(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(STOP_GRACE).await;
            if let Err(e) = handle.stop() {
                error!("asynchronous stop failed: {e}; terminating");
                std::process::exit(1);
            }
        });
    }
}
