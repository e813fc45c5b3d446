//! Device-addressed bridge commands

use std::fs::File;
use std::path::Path;

use tracing::{debug, warn};

use super::connection::DeviceSession;
use super::executor::{CommandExecutor, CommandResult};
use crate::error::{AdbError, Result};

/// Sends commands to the session's selected device.
///
/// Borrowed from a controller for the duration of one operation; all
/// device-addressed commands funnel through here so their failures look alike.
pub struct ShellBridge<'a, E> {
    executor: &'a E,
    session: &'a DeviceSession,
}

impl<'a, E: CommandExecutor> ShellBridge<'a, E> {
    pub fn new(executor: &'a E, session: &'a DeviceSession) -> Self {
        Self { executor, session }
    }

    fn device(&self) -> Result<&'a str> {
        self.session.device().ok_or(AdbError::NoDeviceSelected)
    }

    /// `[adb, -s, <device>, ...args]`
    fn device_command<S: AsRef<str>>(&self, args: &[S]) -> Result<Vec<String>> {
        let device = self.device()?;
        let mut argv = vec![
            self.session.adb_path().to_string(),
            "-s".to_string(),
            device.to_string(),
        ];
        argv.extend(args.iter().map(|a| a.as_ref().to_string()));
        Ok(argv)
    }

    fn check(&self, args: &[&str], result: CommandResult) -> Result<String> {
        if result.success {
            return Ok(result.output);
        }
        let device = self.device()?.to_string();
        let command = args.join(" ");
        warn!("`{}` failed on {}: {}", command, device, result.output.trim());
        Err(AdbError::ShellCommand { command, device })
    }

    /// Run `cmd` in the device shell and return its combined output
    pub async fn shell<S: AsRef<str>>(&self, cmd: &[S]) -> Result<String> {
        let mut args = vec!["shell"];
        args.extend(cmd.iter().map(|c| c.as_ref()));

        let argv = self.device_command(&args)?;
        let result = self.executor.execute(&argv, None).await?;
        self.check(&args[1..], result)
    }

    /// Copy a file from the device to the host
    pub async fn pull(&self, device_path: &str, host_path: &Path) -> Result<String> {
        let host = host_path.to_string_lossy();
        let args = ["pull", device_path, host.as_ref()];

        debug!("Pulling {} to {}", device_path, host);
        let argv = self.device_command(&args)?;
        let result = self.executor.execute(&argv, None).await?;
        self.check(&args, result)
    }

    /// Run an `exec-out` command with its raw stdout written to `file`
    pub async fn exec_out(&self, cmd: &[&str], file: File) -> Result<String> {
        let mut args = vec!["exec-out"];
        args.extend_from_slice(cmd);

        let argv = self.device_command(&args)?;
        let result = self.executor.execute(&argv, Some(file)).await?;
        self.check(&args, result)
    }
}
