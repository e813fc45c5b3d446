//! Configuration module for parrot
//!
//! This module contains:
//! - `bridge`: Bridge tool location, server port and dump path

mod bridge;

pub use bridge::{BridgeConfig, BRIDGE_CONFIG, DEFAULT_ADB_PORT, DEFAULT_UI_DUMP_PATH};
