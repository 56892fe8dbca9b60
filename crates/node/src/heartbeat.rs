//! Coordinator heartbeat trigger
//!
//! Command completion can request an out-of-cycle store heartbeat so the
//! coordinator learns the command's status without waiting for the next
//! periodic report. The transport drains the notifier's channel.

use atoll_core::region::RegionId;
use tokio::sync::mpsc;
use tracing::warn;

pub trait Heartbeat: Send + Sync {
    /// Ask the heartbeat layer to report this region soon.
    fn trigger_store_heartbeat(&self, region_id: RegionId);
}

/// Channel-backed trigger; the receiver side belongs to the heartbeat loop.
pub struct HeartbeatNotifier {
    tx: mpsc::UnboundedSender<RegionId>,
}

impl HeartbeatNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RegionId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Heartbeat for HeartbeatNotifier {
    fn trigger_store_heartbeat(&self, region_id: RegionId) {
        if self.tx.send(region_id).is_err() {
            warn!(
                "heartbeat channel closed, dropping trigger for region {}",
                region_id
            );
        }
    }
}
