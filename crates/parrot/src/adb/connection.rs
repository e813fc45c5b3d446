//! Device session state and connection management

use serde::Serialize;
use tracing::{info, warn};

use super::executor::CommandExecutor;
use crate::config::BRIDGE_CONFIG;
use crate::error::{AdbError, ConnectionAction, Result, ServerAction};

/// Substrings in connect/disconnect output that indicate failure.
///
/// The bridge tool reports connection problems only as free text, often with a
/// zero exit code, so these markers are the sole failure signal.
pub const CONNECTION_ERROR_MARKERS: [&str; 4] =
    ["error", "No route", "timed out", "Connection refused"];

/// Return the first failure marker contained in `output`, if any
pub fn connection_failure_marker(output: &str) -> Option<&'static str> {
    CONNECTION_ERROR_MARKERS
        .iter()
        .copied()
        .find(|marker| output.contains(marker))
}

/// Type of ADB connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Usb,
    Remote,
}

/// Entry of the `devices -l` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub status: String,
    pub connection_type: ConnectionType,
    pub model: Option<String>,
}

/// Parse the output of `adb devices -l`
pub fn parse_devices(output: &str) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("List of devices") || line.starts_with('*') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let device_id = parts[0].to_string();
        let connection_type = if device_id.contains(':') {
            ConnectionType::Remote
        } else {
            ConnectionType::Usb
        };
        let model = parts[2..]
            .iter()
            .find_map(|part| part.strip_prefix("model:"))
            .map(|m| m.to_string());

        devices.push(DeviceInfo {
            device_id,
            status: parts[1].to_string(),
            connection_type,
            model,
        });
    }

    devices
}

/// Selected device and bridge server addressing.
///
/// A session is plain data: selecting a device is an assignment and never
/// talks to the bridge. Operations that do talk to it borrow an executor.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    adb_path: String,
    port: u16,
    device: Option<String>,
}

impl DeviceSession {
    /// Create a session from [`BRIDGE_CONFIG`] with no device selected
    pub fn new() -> Self {
        Self {
            adb_path: BRIDGE_CONFIG.adb_path.clone(),
            port: BRIDGE_CONFIG.port,
            device: None,
        }
    }

    pub fn with_adb_path(mut self, adb_path: impl Into<String>) -> Self {
        self.adb_path = adb_path.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn adb_path(&self) -> &str {
        &self.adb_path
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Currently selected device, if any
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Select the device that subsequent shell operations target.
    ///
    /// Reachability is not checked here; an unknown device surfaces as a
    /// failure of the first command sent to it.
    pub fn select(&mut self, device_id: impl Into<String>) {
        let device_id = device_id.into();
        info!("Selected device {}", device_id);
        self.device = Some(device_id);
    }

    /// Build an argv for a bridge-wide subcommand
    pub(crate) fn command<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        std::iter::once(self.adb_path.clone())
            .chain(args.into_iter().map(Into::into))
            .collect()
    }

    /// Connect to a device over TCP/IP
    pub async fn connect<E: CommandExecutor>(&self, executor: &E, device: &str) -> Result<()> {
        self.change_connection(executor, device, ConnectionAction::Connect)
            .await
    }

    /// Disconnect a device connected over TCP/IP
    pub async fn disconnect<E: CommandExecutor>(&self, executor: &E, device: &str) -> Result<()> {
        self.change_connection(executor, device, ConnectionAction::Disconnect)
            .await
    }

    async fn change_connection<E: CommandExecutor>(
        &self,
        executor: &E,
        device: &str,
        action: ConnectionAction,
    ) -> Result<()> {
        let argv = self.command([action.as_str(), device]);
        let result = executor.execute(&argv, None).await?;

        if let Some(marker) = connection_failure_marker(&result.output) {
            warn!("adb {} {} failed: {}", action, device, result.output.trim());
            return Err(AdbError::Connection {
                device: device.to_string(),
                action,
                marker,
            });
        }
        Ok(())
    }

    /// Disconnect every remote device. Failures are ignored.
    pub async fn disconnect_all<E: CommandExecutor>(&self, executor: &E) {
        let argv = self.command(["disconnect"]);
        if let Err(e) = executor.execute(&argv, None).await {
            warn!("adb disconnect failed: {}", e);
        }
        info!("ADB Disconnect All");
    }

    /// Start the bridge server on the configured port
    pub async fn start_server<E: CommandExecutor>(&self, executor: &E) -> Result<()> {
        self.run_server(executor, ServerAction::Start).await
    }

    /// Stop the bridge server on the configured port
    pub async fn stop_server<E: CommandExecutor>(&self, executor: &E) -> Result<()> {
        self.run_server(executor, ServerAction::Stop).await
    }

    async fn run_server<E: CommandExecutor>(&self, executor: &E, action: ServerAction) -> Result<()> {
        let argv = self.command([action.as_str().to_string(), "-p".to_string(), self.port.to_string()]);
        let result = executor.execute(&argv, None).await?;
        if !result.success {
            return Err(AdbError::Server(action));
        }
        info!("ADB {} on port {}", action, self.port);
        Ok(())
    }

    /// List devices known to the bridge server
    pub async fn list_devices<E: CommandExecutor>(&self, executor: &E) -> Result<Vec<DeviceInfo>> {
        let argv = self.command(["devices", "-l"]);
        let result = executor.execute(&argv, None).await?;
        if !result.success {
            return Err(AdbError::CommandFailed(result.output.trim().to_string()));
        }
        Ok(parse_devices(&result.output))
    }
}

impl Default for DeviceSession {
    fn default() -> Self {
        Self::new()
    }
}
