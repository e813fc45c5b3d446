//! parrot: Android device control over adb for automated UI testing
//!
//! This library provides:
//! - ADB (Android Debug Bridge) session and connection management
//! - A shell bridge addressing the selected device
//! - UI hierarchy dumps resolved to tap coordinates
//! - High-level device actions (keys, gestures, apps, screenshots)
//! - Name-based action dispatch for orchestration layers
//!
//! # Example
//!
//! ```no_run
//! use parrot::DeviceController;
//!
//! #[tokio::main]
//! async fn main() -> parrot::Result<()> {
//!     let mut controller = DeviceController::new();
//!     controller.select_device("emulator-5554");
//!
//!     controller.wake_screen().await?;
//!     controller.open_application("com.zilogic.z_calc").await?;
//!     controller.tap_element(None, Some("7")).await?;
//!
//!     let shot = controller.screenshot("calc.png").await?;
//!     println!("{}", shot.to_html());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod error;

// Configuration module
pub mod config;

// Device backend
pub mod adb;

// Orchestration adapter
pub mod actions;

// Re-export commonly used types and functions
pub use error::{AdbError, ConnectionAction, Result, ServerAction};

// Config re-exports
pub use config::{BridgeConfig, BRIDGE_CONFIG};

// ADB re-exports
pub use adb::{
    bounds_center, connection_failure_marker, default_screenshot_name, foreground_package,
    CommandExecutor, CommandResult, ConnectionType, Coordinate, DeviceController, DeviceInfo,
    DeviceSession, ProcessExecutor, ScreenDump, Screenshot, ShellBridge, UiInspector, UiNode,
};

// Actions re-exports
pub use actions::{parse_action, ActionHandler, ActionResult, SUPPORTED_ACTIONS};
