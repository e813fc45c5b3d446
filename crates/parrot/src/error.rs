//! Error types for device control operations

use std::fmt;
use thiserror::Error;

/// Bridge subcommand that changes the connection state of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    Connect,
    Disconnect,
}

impl ConnectionAction {
    /// Subcommand name understood by the bridge tool
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for ConnectionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bridge server lifecycle subcommand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerAction {
    Start,
    Stop,
}

impl ServerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start-server",
            Self::Stop => "kill-server",
        }
    }
}

impl fmt::Display for ServerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AdbError {
    #[error("Failed to {action} ADB device {device}: {marker}")]
    Connection {
        device: String,
        action: ConnectionAction,
        marker: &'static str,
    },

    #[error("Failed to adb {0}")]
    Server(ServerAction),

    #[error("Failed to execute `{command}` on {device}")]
    ShellCommand { command: String, device: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("No device selected")]
    NoDeviceSelected,

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, AdbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_names_device_action_and_marker() {
        let err = AdbError::Connection {
            device: "10.0.0.7:5555".to_string(),
            action: ConnectionAction::Connect,
            marker: "Connection refused",
        };
        assert_eq!(
            err.to_string(),
            "Failed to connect ADB device 10.0.0.7:5555: Connection refused"
        );
    }

    #[test]
    fn test_server_error_uses_subcommand_name() {
        assert_eq!(
            AdbError::Server(ServerAction::Stop).to_string(),
            "Failed to adb kill-server"
        );
    }
}
