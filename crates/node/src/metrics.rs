//! Region metrics
//!
//! A node-wide prometheus registry plus per-region handles. Handles are
//! registered when a region is created and dropped when it is deleted; the
//! replication engine updates the per-region gauges.

use std::collections::HashMap;
use std::sync::Arc;

use atoll_core::command::RegionCmdKind;
use atoll_core::region::RegionId;
use parking_lot::Mutex;
use prometheus::{IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};
use tracing::warn;

/// Metrics handle for one region
pub struct RegionMetrics {
    region_id: RegionId,
    applied_index: IntGauge,
}

impl RegionMetrics {
    pub fn region_id(&self) -> RegionId {
        self.region_id
    }

    pub fn set_applied_index(&self, applied_index: u64) {
        self.applied_index.set(applied_index as i64);
    }
}

// Manual Debug impl because prometheus types don't derive Debug.
impl std::fmt::Debug for RegionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionMetrics")
            .field("region_id", &self.region_id)
            .finish_non_exhaustive()
    }
}

/// Node-wide region metrics registry
pub struct RegionMetricsRegistry {
    registry: Registry,
    region_count: IntGauge,
    commands_total: IntCounterVec,
    applied_index: IntGaugeVec,
    regions: Mutex<HashMap<RegionId, Arc<RegionMetrics>>>,
}

impl RegionMetricsRegistry {
    pub fn new() -> Self {
        let registry = Registry::new();

        let region_count = IntGauge::with_opts(Opts::new(
            "atoll_regions",
            "Regions currently tracked by this node",
        ))
        .expect("region_count gauge");
        let commands_total = IntCounterVec::new(
            Opts::new(
                "atoll_region_commands_total",
                "Finished region control commands, by kind and outcome",
            ),
            &["kind", "outcome"],
        )
        .expect("commands_total counter vec");
        let applied_index = IntGaugeVec::new(
            Opts::new(
                "atoll_region_applied_index",
                "Raft applied index, per region",
            ),
            &["region"],
        )
        .expect("applied_index gauge vec");

        registry
            .register(Box::new(region_count.clone()))
            .expect("register region_count");
        registry
            .register(Box::new(commands_total.clone()))
            .expect("register commands_total");
        registry
            .register(Box::new(applied_index.clone()))
            .expect("register applied_index");

        Self {
            registry,
            region_count,
            commands_total,
            applied_index,
            regions: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register metrics for a region. Idempotent: an existing handle is
    /// returned as is.
    pub fn add_region(&self, region_id: RegionId) -> Arc<RegionMetrics> {
        let mut regions = self.regions.lock();
        if let Some(existing) = regions.get(&region_id) {
            return existing.clone();
        }
        let label = region_id.to_string();
        let handle = Arc::new(RegionMetrics {
            region_id,
            applied_index: self.applied_index.with_label_values(&[label.as_str()]),
        });
        regions.insert(region_id, handle.clone());
        self.region_count.set(regions.len() as i64);
        handle
    }

    /// Drop a region's metrics. Unknown regions are a no-op.
    pub fn remove_region(&self, region_id: RegionId) {
        let mut regions = self.regions.lock();
        if regions.remove(&region_id).is_none() {
            return;
        }
        self.region_count.set(regions.len() as i64);
        let label = region_id.to_string();
        if let Err(e) = self.applied_index.remove_label_values(&[label.as_str()]) {
            warn!("remove applied_index gauge for region {}: {}", region_id, e);
        }
    }

    /// Count a finished command by kind and outcome.
    pub fn observe_command(&self, kind: RegionCmdKind, ok: bool) {
        let outcome = if ok { "done" } else { "fail" };
        let kind = kind.to_string();
        self.commands_total
            .with_label_values(&[kind.as_str(), outcome])
            .inc();
    }
}

impl Default for RegionMetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent_and_remove_updates_count() {
        let metrics = RegionMetricsRegistry::new();

        let first = metrics.add_region(100);
        let second = metrics.add_region(100);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(metrics.region_count.get(), 1);

        metrics.remove_region(100);
        assert_eq!(metrics.region_count.get(), 0);
        metrics.remove_region(100);
    }

    #[test]
    fn test_observe_command_counts_by_outcome() {
        let metrics = RegionMetricsRegistry::new();
        metrics.observe_command(RegionCmdKind::Create, true);
        metrics.observe_command(RegionCmdKind::Create, false);
        metrics.observe_command(RegionCmdKind::Create, false);

        let done = metrics
            .commands_total
            .with_label_values(&["CREATE", "done"])
            .get();
        let fail = metrics
            .commands_total
            .with_label_values(&["CREATE", "fail"])
            .get();
        assert_eq!(done, 1);
        assert_eq!(fail, 2);
    }
}
