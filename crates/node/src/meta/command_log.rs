//! Command log
//!
//! Durable, ordered log of accepted region-control commands. A command is
//! persisted with status NONE before it reaches any executor, so a crash
//! after dispatch acknowledges never loses it; recovery re-dispatches every
//! NONE command it finds here.

use std::collections::BTreeMap;
use std::sync::Arc;

use atoll_core::command::{CmdStatus, RegionCmd};
use atoll_core::error::{Error, Result};
use atoll_core::region::RegionId;
use parking_lot::Mutex;
use tracing::warn;

use crate::meta::keys;
use crate::meta::store::MetaStore;

pub struct CommandLog {
    store: Arc<MetaStore>,
    commands: Mutex<BTreeMap<u64, RegionCmd>>,
}

impl CommandLog {
    pub fn new(store: Arc<MetaStore>) -> Self {
        Self {
            store,
            commands: Mutex::new(BTreeMap::new()),
        }
    }

    /// Hydrate the in-memory map from the persisted command rows.
    pub fn init(&self) -> Result<()> {
        let rows = self.store.scan_prefix(keys::prefix::COMMAND)?;
        let mut commands = self.commands.lock();
        for (key, value) in rows {
            let Some(command_id) = keys::parse_command_id(&key) else {
                warn!("skip malformed command key {:?}", key);
                continue;
            };
            let (cmd, _): (RegionCmd, usize) =
                bincode::serde::decode_from_slice(&value, bincode::config::standard())
                    .map_err(|e| Error::internal(format!("decode command {}: {}", command_id, e)))?;
            commands.insert(command_id, cmd);
        }
        Ok(())
    }

    fn persist(&self, cmd: &RegionCmd) -> Result<()> {
        let value = bincode::serde::encode_to_vec(cmd, bincode::config::standard())
            .map_err(|e| Error::internal(format!("encode command {}: {}", cmd.id, e)))?;
        self.store.put(&keys::command_key(cmd.id), &value)
    }

    pub fn is_exist(&self, command_id: u64) -> bool {
        self.commands.lock().contains_key(&command_id)
    }

    /// Persist and index a command. Duplicate ids are a warned no-op.
    pub fn add_command(&self, cmd: &RegionCmd) -> Result<()> {
        {
            let commands = self.commands.lock();
            if commands.contains_key(&cmd.id) {
                warn!("region control command {} already exists", cmd.id);
                return Ok(());
            }
        }
        self.persist(cmd)?;
        self.commands.lock().insert(cmd.id, cmd.clone());
        Ok(())
    }

    /// Set a command's final status. Unknown ids are ignored.
    pub fn update_status(&self, command_id: u64, status: CmdStatus) -> Result<()> {
        let updated = {
            let mut commands = self.commands.lock();
            match commands.get_mut(&command_id) {
                Some(cmd) => {
                    cmd.status = status;
                    cmd.clone()
                }
                None => return Ok(()),
            }
        };
        self.persist(&updated)
    }

    pub fn get_command(&self, command_id: u64) -> Option<RegionCmd> {
        self.commands.lock().get(&command_id).cloned()
    }

    /// Commands with the given status, ascending by id.
    pub fn commands_by_status(&self, status: CmdStatus) -> Vec<RegionCmd> {
        self.commands
            .lock()
            .values()
            .filter(|cmd| cmd.status == status)
            .cloned()
            .collect()
    }

    /// Commands targeting the given region, ascending by id.
    pub fn commands_by_region(&self, region_id: RegionId) -> Vec<RegionCmd> {
        self.commands
            .lock()
            .values()
            .filter(|cmd| cmd.region_id == region_id)
            .cloned()
            .collect()
    }

    /// Every known command, ascending by id.
    pub fn all_commands(&self) -> Vec<RegionCmd> {
        self.commands.lock().values().cloned().collect()
    }
}
