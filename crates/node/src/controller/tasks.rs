//! Region command handlers
//!
//! One handler per command kind. Each has a `validate` that re-checks
//! preconditions inside the executor (state may have moved since ingress)
//! and an `execute` that does the work; `run` wraps them with the common
//! post-run behavior: write the final command status, then heartbeat the
//! coordinator when the command asks for it.
//!
//! Commands are delivered at least once, so every handler tolerates
//! re-execution: state guards turn repeated steps into no-ops or terminal
//! failures.

use std::sync::Arc;

use atoll_core::command::{
    ChangePeerRequest, CmdRequest, CmdStatus, CreateRequest, RegionCmd, RegionCmdKind,
    SplitRequest,
};
use atoll_core::error::{Error, ErrorKind, Result};
use atoll_core::region::{Peer, Region, RegionDefinition, RegionId, RegionState, RegionType};
use chrono::Utc;
use futures::future::BoxFuture;
use tracing::{debug, error, info, warn};

use crate::engine::{WriteData, STORE_DATA_CF};
use crate::meta::RaftMeta;
use crate::services::Services;

/// Per-kind dispatch behavior, kept in one table so the heartbeat and
/// validation exceptions stay auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Unsupported kinds are rejected at dispatch
    pub supported: bool,
    /// Heartbeat the coordinator after the run when `cmd.is_notify` is set
    pub notify_on_finish: bool,
    /// Whether `pre_validator` returns a function for this kind
    pub has_pre_validator: bool,
}

pub const fn spec(kind: RegionCmdKind) -> CommandSpec {
    match kind {
        RegionCmdKind::Create
        | RegionCmdKind::Delete
        | RegionCmdKind::Split
        | RegionCmdKind::ChangePeer
        | RegionCmdKind::TransferLeader
        | RegionCmdKind::Purge
        | RegionCmdKind::UpdateDefinition
        | RegionCmdKind::SwitchSplit
        | RegionCmdKind::HoldVectorIndex => CommandSpec {
            supported: true,
            notify_on_finish: true,
            has_pre_validator: true,
        },
        RegionCmdKind::Stop => CommandSpec {
            supported: true,
            notify_on_finish: false,
            has_pre_validator: true,
        },
        RegionCmdKind::Snapshot
        | RegionCmdKind::DestroyExecutor
        | RegionCmdKind::SnapshotVectorIndex => CommandSpec {
            supported: true,
            notify_on_finish: false,
            has_pre_validator: false,
        },
        RegionCmdKind::Merge => CommandSpec {
            supported: false,
            notify_on_finish: false,
            has_pre_validator: false,
        },
    }
}

/// Cheap synchronous-rejection check run at RPC ingress, before the command
/// is persisted. No side effects.
pub type PreValidateFn = fn(Arc<Services>, RegionCmd) -> BoxFuture<'static, Result<()>>;

pub fn pre_validator(kind: RegionCmdKind) -> Option<PreValidateFn> {
    match kind {
        RegionCmdKind::Create => Some(|services, cmd| {
            Box::pin(async move { create::validate(&services, cmd.region_id) })
        }),
        RegionCmdKind::Delete => Some(|services, cmd| {
            Box::pin(async move { delete::validate(&services, cmd.region_id) })
        }),
        RegionCmdKind::Split => Some(|services, cmd| {
            Box::pin(async move {
                match &cmd.request {
                    CmdRequest::Split(req) => split::validate(&services, req).await,
                    _ => Err(payload_mismatch(&cmd)),
                }
            })
        }),
        RegionCmdKind::ChangePeer => Some(|services, cmd| {
            Box::pin(async move {
                match &cmd.request {
                    CmdRequest::ChangePeer(req) => {
                        change_peer::validate(&services, &req.region_definition)
                    }
                    _ => Err(payload_mismatch(&cmd)),
                }
            })
        }),
        RegionCmdKind::TransferLeader => Some(|services, cmd| {
            Box::pin(async move {
                match &cmd.request {
                    CmdRequest::TransferLeader(req) => {
                        transfer_leader::validate(&services, cmd.region_id, &req.peer)
                    }
                    _ => Err(payload_mismatch(&cmd)),
                }
            })
        }),
        RegionCmdKind::Purge => Some(|services, cmd| {
            Box::pin(async move { purge::validate(&services, cmd.region_id) })
        }),
        RegionCmdKind::Stop => Some(|services, cmd| {
            Box::pin(async move { stop::validate(&services, cmd.region_id) })
        }),
        RegionCmdKind::UpdateDefinition => Some(|services, cmd| {
            Box::pin(async move { update_definition::validate(&services, cmd.region_id) })
        }),
        RegionCmdKind::SwitchSplit => Some(|services, cmd| {
            Box::pin(async move { switch_split::validate(&services, cmd.region_id) })
        }),
        RegionCmdKind::HoldVectorIndex => Some(|services, cmd| {
            Box::pin(async move { hold_vector_index::validate(&services, cmd.region_id) })
        }),
        RegionCmdKind::Merge
        | RegionCmdKind::Snapshot
        | RegionCmdKind::DestroyExecutor
        | RegionCmdKind::SnapshotVectorIndex => None,
    }
}

fn payload_mismatch(cmd: &RegionCmd) -> Error {
    Error::internal(format!(
        "command {} payload does not match kind {}",
        cmd.id,
        cmd.kind()
    ))
}

/// Task body: execute the handler, write the final status, heartbeat.
pub(crate) async fn run(services: Arc<Services>, cmd: Arc<RegionCmd>) {
    let result = execute(&services, &cmd).await;
    match &result {
        Ok(()) => debug!(
            "region {} command {} {} done",
            cmd.region_id,
            cmd.id,
            cmd.kind()
        ),
        Err(e) => warn!(
            "region {} command {} {} failed: {}",
            cmd.region_id,
            cmd.id,
            cmd.kind(),
            e
        ),
    }

    let status = if result.is_ok() {
        CmdStatus::Done
    } else {
        CmdStatus::Fail
    };
    if let Err(e) = services.command_log.update_status(cmd.id, status) {
        error!("update status of command {} failed: {}", cmd.id, e);
    }
    services.metrics.observe_command(cmd.kind(), result.is_ok());

    if spec(cmd.kind()).notify_on_finish && cmd.is_notify {
        services.heartbeat.trigger_store_heartbeat(cmd.region_id);
    }
}

async fn execute(services: &Arc<Services>, cmd: &RegionCmd) -> Result<()> {
    match &cmd.request {
        CmdRequest::Create(req) => create::execute(services, req).await,
        CmdRequest::Delete(req) => delete::execute(services, req.region_id).await,
        CmdRequest::Split(req) => split::execute(services, req).await,
        CmdRequest::Merge => Err(Error::internal("merge command is not supported")),
        CmdRequest::ChangePeer(req) => change_peer::execute(services, req).await,
        CmdRequest::TransferLeader(req) => {
            transfer_leader::execute(services, cmd.region_id, &req.peer).await
        }
        CmdRequest::Snapshot => services.engine.do_snapshot(cmd.region_id).await,
        CmdRequest::Purge(req) => purge::execute(services, req.region_id).await,
        CmdRequest::Stop(req) => stop::execute(services, req.region_id).await,
        CmdRequest::DestroyExecutor(req) => destroy_executor::execute(services, req.region_id).await,
        CmdRequest::SnapshotVectorIndex(req) => {
            snapshot_vector_index::execute(services, req.vector_index_id).await
        }
        CmdRequest::UpdateDefinition(req) => {
            update_definition::execute(services, cmd.region_id, &req.new_region_definition).await
        }
        CmdRequest::SwitchSplit(req) => {
            switch_split::execute(services, req.region_id, req.disable_split).await
        }
        CmdRequest::HoldVectorIndex(req) => {
            hold_vector_index::execute(services, req.region_id, req.is_hold).await
        }
    }
}

/// Check that this node leads the region's raft group.
fn check_leader(services: &Services, region_id: RegionId) -> Result<()> {
    if !services.engine.is_raft_store() {
        return Ok(());
    }
    let node = services
        .engine
        .node(region_id)
        .ok_or_else(|| Error::raft_not_found(region_id))?;
    if !node.is_leader() {
        let leader = node
            .leader()
            .map(|peer| peer.raft_location.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        return Err(Error::new(
            ErrorKind::RaftNotLeader,
            format!("region {} leader is {}", region_id, leader),
        ));
    }
    Ok(())
}

fn unix_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Timestamp-derived unique id for internally synthesized commands.
fn unique_cmd_id() -> u64 {
    Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_millis().saturating_mul(1_000_000))
        .max(0) as u64
}

mod create {
    use super::*;

    pub(super) fn validate(services: &Services, region_id: RegionId) -> Result<()> {
        match services.region_meta.get_region(region_id) {
            Some(region) if region.state() != RegionState::New => {
                Err(Error::region_exist(region_id))
            }
            _ => Ok(()),
        }
    }

    pub(super) async fn execute(services: &Arc<Services>, req: &CreateRequest) -> Result<()> {
        let region = Region::new(req.region_definition.clone());
        info!(
            "create region {} type {:?} range {} raw_range {}",
            region.id(),
            region.region_type(),
            region.range(),
            region.raw_range()
        );

        validate(services, region.id())?;

        let region = services.region_meta.add_region(region)?;
        let metrics = services.metrics.add_region(region.id());

        if services.engine.is_raft_store() {
            debug!("create region {} add raft node", region.id());
            let raft_meta = RaftMeta::new(region.id());
            services.raft_meta.add_raft_meta(raft_meta.clone())?;
            services
                .engine
                .add_node(&region, &raft_meta, metrics)
                .await?;
        }

        // Fresh regions go straight to NORMAL; split children park in
        // STANDBY until the parent's split commits.
        let state = if req.split_from_region_id == 0 {
            RegionState::Normal
        } else {
            RegionState::Standby
        };
        services.region_meta.update_state(region.id(), state)?;
        Ok(())
    }
}

mod delete {
    use super::*;

    pub(super) fn validate(services: &Services, region_id: RegionId) -> Result<()> {
        let region = services
            .region_meta
            .get_region(region_id)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::RegionNotFound,
                    format!("region {} not found, can't delete", region_id),
                )
            })?;
        validate_state(&region)
    }

    fn validate_state(region: &Region) -> Result<()> {
        match region.state() {
            RegionState::Deleting | RegionState::Deleted => Err(Error::new(
                ErrorKind::RegionDeleting,
                format!("region {} is deleting or deleted", region.id()),
            )),
            RegionState::Splitting | RegionState::Merging => Err(Error::region_state(
                region.id(),
                "state does not allow delete",
            )),
            _ => Ok(()),
        }
    }

    // Multi-step and not atomic: DELETING -> DELETED is the durable recovery
    // marker, and every step is a no-op when re-driven against its own
    // outcome.
    pub(super) async fn execute(services: &Arc<Services>, region_id: RegionId) -> Result<()> {
        info!("delete region {}", region_id);
        let region = services
            .region_meta
            .get_region(region_id)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::RegionNotFound,
                    format!("region {} not found, can't delete", region_id),
                )
            })?;
        validate_state(&region)?;

        services
            .region_meta
            .update_state(region_id, RegionState::Deleting)?;

        debug!("delete region {} drop data {}", region_id, region.physics_range());
        services
            .raw_engine
            .new_writer(STORE_DATA_CF)
            .kv_batch_delete_range(region.physics_range())?;

        if services.engine.is_raft_store() {
            debug!("delete region {} destroy raft node", region_id);
            services.engine.destroy_node(region_id).await?;
            services.log_storage.delete_storage(region_id);
        }

        services
            .region_meta
            .update_state(region_id, RegionState::Deleted)?;

        services.metrics.remove_region(region_id);
        services.raft_meta.delete_raft_meta(region_id)?;

        if services.is_index_node() {
            if let Some(vector_index) = &services.vector_index {
                if let Some(index) = vector_index.get_vector_index(region_id) {
                    vector_index.delete_vector_index(index.id());
                }
                vector_index.snapshot_manager().delete_snapshots(region_id);
            }
        }

        // The region's own executor cannot tear itself down; hand that to
        // the shared executor.
        let destroy = RegionCmd::new(
            unique_cmd_id(),
            region_id,
            unix_ms(),
            CmdRequest::DestroyExecutor(atoll_core::command::DestroyExecutorRequest { region_id }),
        );
        match services.region_controller() {
            Some(controller) => {
                if let Err(e) = controller.dispatch(destroy) {
                    error!(
                        "dispatch destroy executor command for region {} failed: {}",
                        region_id, e
                    );
                }
            }
            None => error!(
                "region controller not wired, leak executor for region {}",
                region_id
            ),
        }

        // Purge the row so the coordinator's orphan recycling sees it gone.
        debug!("purge region {}", region_id);
        services.region_meta.delete_region(region_id)?;
        Ok(())
    }
}

mod split {
    use super::*;

    pub(super) async fn validate(services: &Services, req: &SplitRequest) -> Result<()> {
        let parent_id = req.split_from_region_id;
        let child_id = req.split_to_region_id;

        let parent = services.region_meta.get_region(parent_id).ok_or_else(|| {
            Error::new(ErrorKind::RegionNotFound, "parent region not found")
        })?;
        services.region_meta.get_region(child_id).ok_or_else(|| {
            Error::new(ErrorKind::RegionNotFound, "child region not found")
        })?;

        if !parent
            .raw_range()
            .contains_strictly(&req.split_watershed_key)
        {
            return Err(Error::new(
                ErrorKind::KeyInvalid,
                "split watershed key is not inside the parent range",
            ));
        }

        match parent.state() {
            RegionState::Splitting => {
                return Err(Error::new(
                    ErrorKind::RegionSplitting,
                    format!("region {} is already splitting", parent_id),
                ))
            }
            RegionState::New
            | RegionState::Merging
            | RegionState::Deleting
            | RegionState::Deleted => {
                return Err(Error::region_state(parent_id, "state does not allow split"))
            }
            _ => {}
        }
        if parent.disable_split {
            return Err(Error::region_state(parent_id, "split is disabled"));
        }

        if services.engine.is_raft_store() {
            let node = services
                .engine
                .node(parent_id)
                .ok_or_else(|| Error::raft_not_found(parent_id))?;
            if !node.is_leader() {
                let leader = node
                    .leader()
                    .map(|peer| peer.raft_location.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                return Err(Error::new(
                    ErrorKind::RaftNotLeader,
                    format!("region {} leader is {}", parent_id, leader),
                ));
            }

            if parent.region_type() == RegionType::Index {
                check_followers_hold_index(services, parent_id, &node).await?;
            }
        }

        Ok(())
    }

    // An index split replays the watershed on every replica; a follower
    // without a materialized index cannot do that.
    async fn check_followers_hold_index(
        services: &Services,
        parent_id: RegionId,
        node: &Arc<dyn crate::engine::RaftNode>,
    ) -> Result<()> {
        let self_peer = node.peer();
        for peer in node.list_peers() {
            if peer == self_peer {
                continue;
            }
            let holds = match services
                .peer_client
                .check_vector_index(parent_id, &peer.raft_location)
                .await
            {
                Ok(holds) => holds,
                Err(e) => {
                    error!(
                        "check peer {} vector index {} failed: {}",
                        peer.raft_location, parent_id, e
                    );
                    false
                }
            };
            if !holds {
                return Err(Error::new(
                    ErrorKind::VectorIndexNotFound,
                    format!(
                        "vector index {} not found at peer {}",
                        parent_id, peer.raft_location
                    ),
                ));
            }
        }
        Ok(())
    }

    // The handler's contract ends at log submission: the split itself is
    // driven by the state-machine apply path.
    pub(super) async fn execute(services: &Arc<Services>, req: &SplitRequest) -> Result<()> {
        validate(services, req).await?;

        info!(
            "split region {} -> {} watershed {}",
            req.split_from_region_id,
            req.split_to_region_id,
            atoll_core::region::hex_string(&req.split_watershed_key)
        );
        services
            .engine
            .async_write(
                req.split_from_region_id,
                WriteData::Split {
                    from_region_id: req.split_from_region_id,
                    to_region_id: req.split_to_region_id,
                    watershed_key: req.split_watershed_key.clone(),
                },
            )
            .await
    }
}

mod change_peer {
    use super::*;

    pub(super) fn validate(services: &Services, definition: &RegionDefinition) -> Result<()> {
        let region = services
            .region_meta
            .get_region(definition.id)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::RegionNotFound,
                    format!("region {} not found, can't change peers", definition.id),
                )
            })?;
        if region.state() != RegionState::Normal {
            return Err(Error::region_state(
                definition.id,
                "state does not allow peer change",
            ));
        }
        check_leader(services, definition.id)
    }

    pub(super) async fn execute(services: &Arc<Services>, req: &ChangePeerRequest) -> Result<()> {
        let definition = &req.region_definition;
        debug!("change peer of region {}", definition.id);
        validate(services, definition)?;

        if services.engine.is_raft_store() {
            return services
                .engine
                .change_node(definition.id, definition.voters())
                .await;
        }
        Ok(())
    }
}

mod transfer_leader {
    use super::*;

    pub(super) fn validate(services: &Services, region_id: RegionId, peer: &Peer) -> Result<()> {
        let region = services
            .region_meta
            .get_region(region_id)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::RegionNotFound,
                    format!("region {} not found, can't transfer leader", region_id),
                )
            })?;
        if region.state() != RegionState::Normal {
            return Err(Error::region_state(
                region_id,
                "state does not allow leader transfer",
            ));
        }
        if peer.store_id == services.store_id {
            return Err(Error::new(
                ErrorKind::RaftTransferLeader,
                "peer is already the leader, no transfer needed",
            ));
        }
        if peer.raft_location.host.is_empty() || peer.raft_location.host == "0.0.0.0" {
            return Err(Error::new(
                ErrorKind::IllegalParameters,
                "peer raft location is invalid",
            ));
        }
        Ok(())
    }

    pub(super) async fn execute(
        services: &Arc<Services>,
        region_id: RegionId,
        peer: &Peer,
    ) -> Result<()> {
        debug!("transfer leader of region {} to {}", region_id, peer.raft_location);
        validate(services, region_id, peer)?;

        if services.engine.is_raft_store() {
            return services.engine.transfer_leader(region_id, peer).await;
        }
        Ok(())
    }
}

mod purge {
    use super::*;

    pub(super) fn validate(services: &Services, region_id: RegionId) -> Result<()> {
        let region = services
            .region_meta
            .get_region(region_id)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::RegionNotFound,
                    format!("region {} not found, can't purge", region_id),
                )
            })?;
        if region.state() != RegionState::Deleted {
            return Err(Error::new(
                ErrorKind::RegionDeleted,
                format!("region {} is not deleted, can't purge", region_id),
            ));
        }
        Ok(())
    }

    pub(super) async fn execute(services: &Arc<Services>, region_id: RegionId) -> Result<()> {
        debug!("purge region {}", region_id);
        validate(services, region_id)?;
        services.region_meta.delete_region(region_id)
    }
}

mod stop {
    use super::*;

    pub(super) fn validate(services: &Services, region_id: RegionId) -> Result<()> {
        let region = services
            .region_meta
            .get_region(region_id)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::RegionNotFound,
                    format!("region {} not found, can't stop", region_id),
                )
            })?;
        if region.state() != RegionState::Orphan {
            return Err(Error::region_state(region_id, "region is not orphan"));
        }
        Ok(())
    }

    // Stops replication without deleting data; DELETE is the destructive one.
    pub(super) async fn execute(services: &Arc<Services>, region_id: RegionId) -> Result<()> {
        debug!("stop region {}", region_id);
        validate(services, region_id)?;

        if services.engine.is_raft_store() {
            return services.engine.stop_node(region_id).await;
        }
        Ok(())
    }
}

mod destroy_executor {
    use super::*;

    pub(super) async fn execute(services: &Arc<Services>, region_id: RegionId) -> Result<()> {
        let controller = services
            .region_controller()
            .ok_or_else(|| Error::internal("region controller is not wired"))?;
        controller.unregister_executor(region_id).await;
        Ok(())
    }
}

mod snapshot_vector_index {
    use super::*;

    pub(super) async fn execute(
        services: &Arc<Services>,
        vector_index_id: RegionId,
    ) -> Result<()> {
        info!("save vector index snapshot {}", vector_index_id);
        services
            .region_meta
            .get_region(vector_index_id)
            .ok_or_else(|| Error::region_not_found(vector_index_id))?;

        let manager = services
            .vector_index
            .as_ref()
            .ok_or_else(|| Error::internal("vector index manager is not available"))?;
        let index = manager.get_vector_index(vector_index_id).ok_or_else(|| {
            Error::new(
                ErrorKind::VectorIndexNotFound,
                format!("vector index {} not found", vector_index_id),
            )
        })?;

        let snapshot_log_index = manager.snapshot_manager().save_snapshot(index.clone()).await?;
        manager.update_snapshot_log_id(index, snapshot_log_index);
        Ok(())
    }
}

mod update_definition {
    use super::*;

    pub(super) fn validate(services: &Services, region_id: RegionId) -> Result<()> {
        let region = services
            .region_meta
            .get_region(region_id)
            .ok_or_else(|| Error::region_not_found(region_id))?;
        if region.state() != RegionState::Normal {
            return Err(Error::region_state(
                region_id,
                "state does not allow definition update",
            ));
        }
        Ok(())
    }

    // The only supported update today is growing HNSW max_elements.
    pub(super) async fn execute(
        services: &Arc<Services>,
        region_id: RegionId,
        new_definition: &RegionDefinition,
    ) -> Result<()> {
        info!("update definition of region {}", region_id);
        validate(services, region_id)?;
        let region = services
            .region_meta
            .get_region(region_id)
            .ok_or_else(|| Error::region_not_found(region_id))?;

        let manager = services
            .vector_index
            .as_ref()
            .ok_or_else(|| Error::internal("vector index manager is not available"))?;
        let index = manager.get_vector_index(region_id).ok_or_else(|| {
            Error::new(
                ErrorKind::VectorIndexNotFound,
                format!("vector index {} not found", region_id),
            )
        })?;

        let Some(hnsw_parameter) = &new_definition.index_parameter.hnsw else {
            return Err(Error::new(
                ErrorKind::IllegalParameters,
                format!("no hnsw parameter in new definition of region {}", region_id),
            ));
        };
        let hnsw = index.as_hnsw().ok_or_else(|| {
            Error::new(
                ErrorKind::VectorIndexNotFound,
                format!("index {} is not hnsw", region_id),
            )
        })?;

        let old_max_elements = hnsw.max_elements().map_err(|e| {
            Error::new(
                ErrorKind::VectorIndexInternal,
                format!("get max elements of index {}: {}", region_id, e.message),
            )
        })?;
        if hnsw_parameter.max_elements <= old_max_elements {
            info!(
                "region {} new max elements {} <= old {}, skip resize",
                region_id, hnsw_parameter.max_elements, old_max_elements
            );
            return Ok(());
        }

        hnsw.resize_max_elements(hnsw_parameter.max_elements)
            .map_err(|e| {
                Error::new(
                    ErrorKind::VectorIndexInternal,
                    format!("resize index {}: {}", region_id, e.message),
                )
            })?;

        let mut updated = (*region).clone();
        updated.definition.index_parameter = new_definition.index_parameter.clone();
        services.region_meta.update_region(updated)?;

        info!(
            "region {} max elements resized {} -> {}",
            region_id, old_max_elements, hnsw_parameter.max_elements
        );
        Ok(())
    }
}

mod switch_split {
    use super::*;

    pub(super) fn validate(services: &Services, region_id: RegionId) -> Result<()> {
        services
            .region_meta
            .get_region(region_id)
            .map(|_| ())
            .ok_or_else(|| Error::region_not_found(region_id))
    }

    pub(super) async fn execute(
        services: &Arc<Services>,
        region_id: RegionId,
        disable_split: bool,
    ) -> Result<()> {
        info!("switch split of region {}: disable={}", region_id, disable_split);
        services.region_meta.set_disable_split(region_id, disable_split)
    }
}

mod hold_vector_index {
    use super::*;

    pub(super) fn validate(services: &Services, region_id: RegionId) -> Result<()> {
        services
            .region_meta
            .get_region(region_id)
            .ok_or_else(|| Error::region_not_found(region_id))?;

        // Runs on followers asked to (un)materialize the index locally, so
        // the node only needs to exist, not lead.
        if services.engine.is_raft_store() && services.engine.node(region_id).is_none() {
            return Err(Error::raft_not_found(region_id));
        }
        Ok(())
    }

    pub(super) async fn execute(
        services: &Arc<Services>,
        region_id: RegionId,
        is_hold: bool,
    ) -> Result<()> {
        validate(services, region_id)?;

        let manager = services
            .vector_index
            .as_ref()
            .ok_or_else(|| Error::internal("vector index manager is not available"))?;
        let index = manager.get_vector_index(region_id);

        if is_hold {
            if index.is_none() {
                match manager.load_or_build_vector_index(region_id).await {
                    Ok(()) => info!("load or build vector index {} finished", region_id),
                    // Best effort; the coordinator re-issues the hold if the
                    // index still is not there.
                    Err(e) => error!("load or build vector index {} failed: {}", region_id, e),
                }
            }
        } else if index.is_some() {
            info!("delete vector index {}", region_id);
            manager.delete_vector_index(region_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [RegionCmdKind; 14] = [
        RegionCmdKind::Create,
        RegionCmdKind::Delete,
        RegionCmdKind::Split,
        RegionCmdKind::Merge,
        RegionCmdKind::ChangePeer,
        RegionCmdKind::TransferLeader,
        RegionCmdKind::Snapshot,
        RegionCmdKind::Purge,
        RegionCmdKind::Stop,
        RegionCmdKind::DestroyExecutor,
        RegionCmdKind::SnapshotVectorIndex,
        RegionCmdKind::UpdateDefinition,
        RegionCmdKind::SwitchSplit,
        RegionCmdKind::HoldVectorIndex,
    ];

    #[test]
    fn test_only_merge_is_unsupported() {
        for kind in ALL_KINDS {
            assert_eq!(spec(kind).supported, kind != RegionCmdKind::Merge, "{kind}");
        }
    }

    #[test]
    fn test_notify_exceptions() {
        let silent = [
            RegionCmdKind::Snapshot,
            RegionCmdKind::Stop,
            RegionCmdKind::DestroyExecutor,
            RegionCmdKind::SnapshotVectorIndex,
            RegionCmdKind::Merge,
        ];
        for kind in ALL_KINDS {
            assert_eq!(
                spec(kind).notify_on_finish,
                !silent.contains(&kind),
                "{kind}"
            );
        }
    }

    #[test]
    fn test_pre_validator_presence_matches_command_table() {
        for kind in ALL_KINDS {
            assert_eq!(
                pre_validator(kind).is_some(),
                spec(kind).has_pre_validator,
                "{kind}"
            );
        }
    }

    #[test]
    fn test_unique_cmd_ids_advance() {
        let a = unique_cmd_id();
        let b = unique_cmd_id();
        assert!(b >= a);
        assert!(a > 0);
    }
}
