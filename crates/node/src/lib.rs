//! Atoll store node
//!
//! Region control plane of a distributed key/value and vector database:
//! executes coordinator-issued region lifecycle commands against the local
//! replication engine, meta stores, metrics, and vector indexes.

pub mod config;
pub mod controller;
pub mod engine;
pub mod heartbeat;
pub mod meta;
pub mod metrics;
pub mod peer_client;
pub mod services;
pub mod validate;
pub mod vector_index;

pub use config::{Config, ConfigError};
pub use controller::RegionController;
pub use services::{NodeRole, Services};
