//! ADB (Android Debug Bridge) module for Android device control
//!
//! This module provides:
//! - `executor`: Process execution behind the `CommandExecutor` trait
//! - `connection`: Device session state, connect/disconnect and server control
//! - `shell`: Device-addressed shell, pull and exec-out commands
//! - `hierarchy`: UI hierarchy dumps, parsing and element resolution
//! - `device`: High-level device actions (keys, gestures, apps, files)
//! - `screenshot`: Screenshot encoding for reports

mod connection;
mod device;
mod executor;
mod hierarchy;
mod screenshot;
mod shell;

pub use connection::{
    connection_failure_marker, parse_devices, ConnectionType, DeviceInfo, DeviceSession,
    CONNECTION_ERROR_MARKERS,
};
pub use device::{
    escape_input_text, foreground_package, keycode, DeviceController, SwipeVector, SCROLL_DOWN,
    SCROLL_UP, SWIPE_LEFT_TO_RIGHT, SWIPE_RIGHT_TO_LEFT,
};
pub use executor::{CommandExecutor, CommandResult, ProcessExecutor};
pub use hierarchy::{bounds_center, Coordinate, Nodes, ScreenDump, UiInspector, UiNode};
pub use screenshot::{default_screenshot_name, Screenshot, REPORT_IMAGE_WIDTH};
pub use shell::ShellBridge;

#[cfg(test)]
pub(crate) use executor::fake;
#[cfg(test)]
pub(crate) use hierarchy::tests::CALCULATOR_XML;
