//! Cooperative cancellation.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::Notify;

/// A cloneable flag that asks a running driver to stop.
///
/// Tripping it is sticky: once set, every clone reports it and every
/// pending or future [`Interrupt::cancelled`] resolves.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    tripped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trip(&self) {
        self.tripped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// Resolves once the interrupt has been tripped.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent trip is not missed.
            let notified = self.notify.notified();
            if self.is_tripped() {
                return;
            }
            notified.await;
        }
    }
}
