//! Region controller
//!
//! Routes coordinator commands to per-region executors and drives their
//! lifecycle: one `ControlExecutor` per live region for strict per-region
//! serialization, plus one shared executor for commands that must outlive or
//! precede a region's own executor (PURGE, DESTROY_EXECUTOR).
//!
//! Dispatch order is the durability contract: dedup against the command log,
//! persist with status NONE, then enqueue. A crash after dispatch returns OK
//! therefore always leaves a recoverable command behind.

pub mod executor;
pub mod tasks;

use std::collections::HashMap;
use std::sync::Arc;

use atoll_core::command::{CmdStatus, RegionCmd, RegionCmdKind};
use atoll_core::error::{Error, ErrorKind, Result};
use atoll_core::region::RegionId;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::services::Services;
use executor::ControlExecutor;
pub use tasks::{pre_validator, spec, CommandSpec, PreValidateFn};

pub struct RegionController {
    services: Arc<Services>,
    shared_executor: Arc<ControlExecutor>,
    executors: Mutex<HashMap<RegionId, Arc<ControlExecutor>>>,
}

impl RegionController {
    /// Build the controller and bind it into the service context.
    pub fn new(services: Arc<Services>) -> Arc<Self> {
        let controller = Arc::new(Self {
            services: services.clone(),
            shared_executor: Arc::new(ControlExecutor::new("shared")),
            executors: Mutex::new(HashMap::new()),
        });
        services.set_region_controller(&controller);
        controller
    }

    /// Start the shared executor and one executor per alive region.
    pub fn init(&self) {
        self.shared_executor.init();
        for region in self.services.region_meta.all_alive_regions() {
            self.register_executor(region.id());
        }
    }

    /// Re-dispatch every command the log still holds with status NONE.
    ///
    /// Goes through `inner_dispatch`: the commands are already persisted,
    /// `dispatch` would reject them as repeats.
    pub fn recover(&self) {
        let pending = self.services.command_log.commands_by_status(CmdStatus::None);
        if pending.is_empty() {
            return;
        }
        info!("recover {} pending region control commands", pending.len());
        for cmd in pending {
            let (id, region_id) = (cmd.id, cmd.region_id);
            if let Err(e) = self.inner_dispatch(Arc::new(cmd)) {
                error!(
                    "recover command {} for region {} failed: {}",
                    id, region_id, e
                );
            }
        }
    }

    /// Stop every executor, draining queued work first.
    pub async fn destroy(&self) {
        let executors: Vec<Arc<ControlExecutor>> =
            self.executors.lock().drain().map(|(_, e)| e).collect();
        for executor in executors {
            executor.stop().await;
        }
        self.shared_executor.stop().await;
    }

    /// Idempotent: creates and starts the region's executor if absent.
    pub fn register_executor(&self, region_id: RegionId) {
        let mut executors = self.executors.lock();
        if !executors.contains_key(&region_id) {
            let executor = Arc::new(ControlExecutor::new(format!("region-{}", region_id)));
            executor.init();
            executors.insert(region_id, executor);
        }
    }

    /// Remove the region's executor, then stop it outside the map lock:
    /// stopping joins the worker, and its queued tasks may need the map.
    pub async fn unregister_executor(&self, region_id: RegionId) {
        let executor = self.executors.lock().remove(&region_id);
        if let Some(executor) = executor {
            executor.stop().await;
            debug!("unregistered control executor of region {}", region_id);
        }
    }

    pub fn has_executor(&self, region_id: RegionId) -> bool {
        self.executors.lock().contains_key(&region_id)
    }

    /// Region ids with a live executor, ascending.
    pub fn region_ids(&self) -> Vec<RegionId> {
        let mut ids: Vec<RegionId> = self.executors.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn executor(&self, region_id: RegionId) -> Option<Arc<ControlExecutor>> {
        self.executors.lock().get(&region_id).cloned()
    }

    /// Accept a coordinator command: dedup, persist with status NONE, route.
    pub fn dispatch(&self, cmd: RegionCmd) -> Result<()> {
        if self.services.command_log.is_exist(cmd.id) {
            return Err(Error::new(
                ErrorKind::RegionRepeatCommand,
                format!("repeat region control command {}", cmd.id),
            ));
        }
        self.services.command_log.add_command(&cmd)?;
        self.inner_dispatch(Arc::new(cmd))
    }

    /// Route an already-persisted command to its executor.
    pub(crate) fn inner_dispatch(&self, cmd: Arc<RegionCmd>) -> Result<()> {
        debug!(
            "dispatch region control command: region {} id {} {}",
            cmd.region_id,
            cmd.id,
            cmd.kind()
        );

        if cmd.kind() == RegionCmdKind::Create {
            self.register_executor(cmd.region_id);
        }

        let executor = match cmd.kind() {
            // PURGE and DESTROY_EXECUTOR target regions whose own executor
            // is gone or being torn down.
            RegionCmdKind::Purge | RegionCmdKind::DestroyExecutor => {
                Some(self.shared_executor.clone())
            }
            _ => self.executor(cmd.region_id),
        };
        let Some(executor) = executor else {
            error!(
                "no control executor for region {} (command {})",
                cmd.region_id, cmd.id
            );
            return Err(Error::new(
                ErrorKind::RegionNotFound,
                format!("no control executor for region {}", cmd.region_id),
            ));
        };

        if !tasks::spec(cmd.kind()).supported {
            error!("unsupported region control command {}", cmd.kind());
            return Err(Error::internal(format!(
                "region control command {} is not supported",
                cmd.kind()
            )));
        }

        let task = Box::pin(tasks::run(self.services.clone(), cmd));
        if !executor.execute(task) {
            return Err(Error::internal("execute region control command failed"));
        }
        Ok(())
    }
}
