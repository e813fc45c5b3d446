//! Bridge tool configuration

use lazy_static::lazy_static;
use std::env;

/// Default port of the adb server
pub const DEFAULT_ADB_PORT: u16 = 5037;

/// On-device path that `uiautomator dump` writes to
pub const DEFAULT_UI_DUMP_PATH: &str = "/sdcard/view.xml";

/// Location and addressing of the bridge tool
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Program name or path of the bridge executable
    pub adb_path: String,
    /// Port of the bridge server
    pub port: u16,
    /// On-device path used for UI hierarchy dumps
    pub ui_dump_path: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            adb_path: env::var("PARROT_ADB_PATH").unwrap_or_else(|_| "adb".to_string()),
            port: env::var("PARROT_ADB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_ADB_PORT),
            ui_dump_path: env::var("PARROT_UI_DUMP_PATH")
                .unwrap_or_else(|_| DEFAULT_UI_DUMP_PATH.to_string()),
        }
    }
}

lazy_static! {
    /// Global bridge configuration instance, read once from the environment
    pub static ref BRIDGE_CONFIG: BridgeConfig = BridgeConfig::default();
}
