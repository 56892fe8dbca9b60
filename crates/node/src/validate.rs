//! Request validation helpers
//!
//! Shared checks used at RPC ingress before a request touches a region:
//! is the region serviceable, is a range well formed, do keys fall inside
//! the region.

use std::sync::Arc;

use atoll_core::error::{Error, ErrorKind, Result};
use atoll_core::region::{Region, RegionRange, RegionState};

/// Check that a region exists and can serve requests.
pub fn check_region_serviceable(region: Option<&Arc<Region>>) -> Result<()> {
    let Some(region) = region else {
        return Err(Error::new(ErrorKind::RegionNotFound, "region not found"));
    };
    let detail = match region.state() {
        RegionState::New => "region is new, waiting later",
        RegionState::Standby => "region is standby, waiting later",
        RegionState::Deleting => "region is deleting",
        RegionState::Deleted => "region is deleted",
        _ => return Ok(()),
    };
    Err(Error::new(
        ErrorKind::RegionUnavailable,
        format!("region {}: {}", region.id(), detail),
    ))
}

/// Check that a request range is well formed.
pub fn check_range(range: &RegionRange) -> Result<()> {
    if range.start_key.is_empty() || range.end_key.is_empty() {
        return Err(Error::new(ErrorKind::IllegalParameters, "range key is empty"));
    }
    if range.start_key >= range.end_key {
        return Err(Error::new(ErrorKind::IllegalParameters, "range is invalid"));
    }
    Ok(())
}

/// Check that every key falls inside the region's range.
pub fn check_keys_in_range(range: &RegionRange, keys: &[&[u8]]) -> Result<()> {
    for key in keys {
        if !range.contains(key) {
            return Err(Error::new(ErrorKind::KeyOutOfRange, "key out of range"));
        }
    }
    Ok(())
}
