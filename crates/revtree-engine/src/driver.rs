//! Background flushing of debounce windows.
//!
//! A host without its own timer loop can hand the controller to
//! [`start_flush_driver`], which ticks it on a fixed interval so drag
//! gestures commit even when no further event arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use revtree_storage::{InMemorySnapshotStore, SnapshotStore};

use crate::controller::HistoryController;
use crate::host::EditorHost;

/// A controller shared between the host and the flush driver.
pub type SharedController<H, S = InMemorySnapshotStore> = Arc<Mutex<HistoryController<H, S>>>;

pub fn share<H, S>(controller: HistoryController<H, S>) -> SharedController<H, S> {
    Arc::new(Mutex::new(controller))
}

/// Spawns a task that calls [`HistoryController::tick`] every `interval`.
///
/// The task exits on the first tick after the controller is disposed.
pub fn start_flush_driver<H, S>(
    controller: SharedController<H, S>,
    interval: Duration,
) -> JoinHandle<()>
where
    H: EditorHost + Send + 'static,
    S: SnapshotStore + Send + 'static,
{
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        loop {
            tick.tick().await;
            let mut guard = controller.lock().await;
            if guard.is_disposed() {
                tracing::debug!("flush driver stopping: controller disposed");
                break;
            }
            match guard.tick() {
                Ok(true) => tracing::trace!("flush driver committed a pending gesture"),
                Ok(false) => {}
                Err(err) => tracing::warn!("flush driver tick failed: {}", err),
            }
        }
    })
}
