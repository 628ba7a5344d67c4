//! Shutdown coordination for the control loop.
//!
//! The signal is latched: a task that subscribes or checks after the
//! trigger still sees it, and a cycle in progress is never interrupted
//! because the loop only looks between cycles.

use tokio::sync::watch;

/// Owner side of the stop request.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Task side of the stop request.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Request a stop. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once a stop was requested, or when the owner is gone.
    pub async fn wait(&mut self) {
        // An Err means the sender was dropped, which also means stop.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}
