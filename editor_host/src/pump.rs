//! Delivery of watcher events to views.
//!
//! Views are single-threaded, so the pump runs on the host's local task set
//! and reconciles one event at a time.

use paneview_core::view::ChangeOutcome;
use paneview_core::watch::{FileEvent, FileWatchHub};
use std::rc::Rc;
use tokio::sync::mpsc;

/// Dispatches events until the channel closes. Returns how many were handled.
pub async fn run(hub: Rc<FileWatchHub>, mut events: mpsc::UnboundedReceiver<FileEvent>) -> usize {
    let mut handled = 0;
    while let Some(event) = events.recv().await {
        let outcomes = hub.dispatch(&event).await;
        log::debug!("{:?} {}: {:?}", event.kind, event.path.display(), outcomes);
        handled += 1;
    }
    log::debug!("file event channel closed after {} events", handled);
    handled
}

/// Dispatches the events already queued, without waiting for more.
pub async fn drain(
    hub: &FileWatchHub,
    events: &mut mpsc::UnboundedReceiver<FileEvent>,
) -> Vec<ChangeOutcome> {
    let mut outcomes = Vec::new();
    while let Ok(event) = events.try_recv() {
        outcomes.extend(hub.dispatch(&event).await);
    }
    outcomes
}
