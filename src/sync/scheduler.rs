//! Debounced sync trigger.
//!
//! Edits arrive in bursts; each notification restarts a quiet timer, and one
//! sync cycle runs once the burst settles. Cycles run sequentially on this
//! task, so at most one is ever in flight. Notifications that land during a
//! cycle trigger a follow-up cycle rather than a concurrent one.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct SyncTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl SyncTrigger {
    pub fn notify(&self) {
        // Receiver gone means the scheduler shut down; nothing to do.
        let _ = self.tx.send(());
    }
}

pub fn channel() -> (SyncTrigger, mpsc::UnboundedReceiver<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SyncTrigger { tx }, rx)
}

/// Runs `sync` once per settled burst of notifications until every trigger
/// handle is dropped.
pub async fn run_debounced<F, Fut>(
    mut rx: mpsc::UnboundedReceiver<()>,
    quiet: Duration,
    mut sync: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    while rx.recv().await.is_some() {
        loop {
            match tokio::time::timeout(quiet, rx.recv()).await {
                // Another edit landed inside the quiet window; keep waiting.
                Ok(Some(())) => continue,
                // All triggers dropped; run the final cycle and stop.
                Ok(None) => {
                    sync().await;
                    return;
                }
                Err(_) => break,
            }
        }
        sync().await;
    }
}
