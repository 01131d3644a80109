//! Configuration Management Module
//!
//! Connection tunables loaded from a JSON file, all fields optional.

pub mod storage;
pub mod types;

pub use storage::{config_dir, config_file, ConfigStorage, StorageError};
pub use types::{BridgeConfig, HostKeyPolicy, CONFIG_VERSION};
