//! Cancellation token for stopping a run in flight
//!
//! Injected into the engine; when fired, the engine stops dispatching
//! new steps, lets in-flight steps finish, persists a final checkpoint
//! and returns a non-success result.

use std::sync::Arc;
use tokio::sync::watch;

/// Clonable cancellation flag shared across a run
#[derive(Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Fire the token; every clone observes it
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Wait until the token fires
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        while !*receiver.borrow_and_update() {
            if receiver.changed().await.is_err() {
                break;
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
