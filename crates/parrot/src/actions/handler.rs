//! Action handler exposing controller operations by name
//!
//! Orchestration layers (agents, scripts) describe an action as a JSON object
//! such as `{"action": "tap_element", "text": "7"}`. The handler maps the name
//! to a [`DeviceController`] call; the controller itself knows nothing about
//! this mapping.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::adb::{default_screenshot_name, CommandExecutor, Coordinate, DeviceController};
use crate::error::{AdbError, Result};

/// Names understood by [`ActionHandler::execute`]
pub const SUPPORTED_ACTIONS: &[&str] = &[
    "select_device",
    "home",
    "take_screenshot",
    "pull_xml_screen",
    "scroll_down",
    "shell",
    "open_application",
    "close_current_application",
    "get_current_application_package_name",
    "tap",
    "tap_element",
    "wait",
    "find_string_in_file",
];

/// Result of an action execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: Option<String>,
}

impl ActionResult {
    /// Create a successful result
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Create a successful result carrying a value for the caller
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    /// Create a failure result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Dispatches named actions to a device controller
#[derive(Debug, Clone)]
pub struct ActionHandler {
    /// Where screenshots and hierarchy dumps go when no path is given
    output_dir: PathBuf,
}

impl ActionHandler {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Execute an action; errors are folded into a failed [`ActionResult`]
    pub async fn execute<E: CommandExecutor>(
        &self,
        controller: &mut DeviceController<E>,
        action: &HashMap<String, Value>,
    ) -> ActionResult {
        let name = action.get("action").and_then(|v| v.as_str()).unwrap_or("");
        debug!("Executing action {}", name);

        let result = match name {
            "select_device" => required_str(action, "device_name").map(|device| {
                controller.select_device(device);
                ActionResult::success()
            }),
            "home" => controller.home().await.map(|_| ActionResult::success()),
            "scroll_down" => controller.scroll_down().await.map(|_| ActionResult::success()),
            "take_screenshot" => self.handle_screenshot(controller, action).await,
            "pull_xml_screen" => self.handle_pull_xml(controller, action).await,
            "shell" => self.handle_shell(controller, action).await,
            "open_application" => match required_str(action, "package_name") {
                Ok(package) => controller
                    .open_application(package)
                    .await
                    .map(|_| ActionResult::success()),
                Err(e) => Err(e),
            },
            "close_current_application" => controller
                .close_current_application()
                .await
                .map(ActionResult::with_message),
            "get_current_application_package_name" => controller
                .current_application_package_name()
                .await
                .map(ActionResult::with_message),
            "tap" => self.handle_tap(controller, action).await,
            "tap_element" => self.handle_tap_element(controller, action).await,
            "wait" => self.handle_wait(action).await,
            "find_string_in_file" => self.handle_find_string(action),
            _ => Err(AdbError::CommandFailed(format!("Unknown action: {}", name))),
        };

        match result {
            Ok(r) => r,
            Err(e) => ActionResult::failure(format!("Action failed: {}", e)),
        }
    }

    fn output_path(&self, action: &HashMap<String, Value>, key: &str, default: String) -> PathBuf {
        action
            .get(key)
            .and_then(|v| v.as_str())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.output_dir.join(default))
    }

    async fn handle_screenshot<E: CommandExecutor>(
        &self,
        controller: &DeviceController<E>,
        action: &HashMap<String, Value>,
    ) -> Result<ActionResult> {
        let path = self.output_path(action, "outputfile", default_screenshot_name());
        let shot = controller.screenshot(&path).await?;
        Ok(ActionResult::with_message(shot.to_html()))
    }

    async fn handle_pull_xml<E: CommandExecutor>(
        &self,
        controller: &DeviceController<E>,
        action: &HashMap<String, Value>,
    ) -> Result<ActionResult> {
        let path = self.output_path(action, "output_file", "view.xml".to_string());
        controller.pull_ui_hierarchy(&path).await?;
        Ok(ActionResult::with_message(path.display().to_string()))
    }

    async fn handle_shell<E: CommandExecutor>(
        &self,
        controller: &DeviceController<E>,
        action: &HashMap<String, Value>,
    ) -> Result<ActionResult> {
        let cmd: Vec<String> = match action.get("cmd") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            _ => return Err(AdbError::CommandFailed("No shell command specified".into())),
        };
        if cmd.is_empty() {
            return Err(AdbError::CommandFailed("Empty shell command".into()));
        }

        let output = controller.shell(&cmd).await?;
        Ok(ActionResult::with_message(output.trim_end()))
    }

    async fn handle_tap<E: CommandExecutor>(
        &self,
        controller: &DeviceController<E>,
        action: &HashMap<String, Value>,
    ) -> Result<ActionResult> {
        let coords: Vec<i64> = action
            .get("coord")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_i64()).collect())
            .unwrap_or_default();

        if coords.len() != 2 {
            return Err(AdbError::CommandFailed(
                "Invalid tap coordinates, expected [x, y]".to_string(),
            ));
        }
        let to_i32 = |n: i64| {
            i32::try_from(n)
                .map_err(|_| AdbError::CommandFailed(format!("Coordinate {} out of range", n)))
        };

        let at = Coordinate::new(to_i32(coords[0])?, to_i32(coords[1])?);
        controller.tap(at).await?;
        Ok(ActionResult::with_message(at.to_string()))
    }

    async fn handle_tap_element<E: CommandExecutor>(
        &self,
        controller: &DeviceController<E>,
        action: &HashMap<String, Value>,
    ) -> Result<ActionResult> {
        let resource_id = action.get("resource_id").and_then(|v| v.as_str());
        let text = action.get("text").and_then(|v| v.as_str());
        if resource_id.is_none() && text.is_none() {
            return Err(AdbError::CommandFailed(
                "tap_element needs resource_id or text".to_string(),
            ));
        }

        let at = controller.tap_element(resource_id, text).await?;
        Ok(ActionResult::with_message(at.to_string()))
    }

    async fn handle_wait(&self, action: &HashMap<String, Value>) -> Result<ActionResult> {
        let seconds = match action.get("timeout") {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(1.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(1.0),
            _ => 1.0,
        };
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(AdbError::CommandFailed(format!(
                "Invalid wait duration: {}",
                seconds
            )));
        }

        sleep(Duration::from_secs_f64(seconds)).await;
        info!("Wait for {} seconds", seconds);
        Ok(ActionResult::success())
    }

    fn handle_find_string(&self, action: &HashMap<String, Value>) -> Result<ActionResult> {
        let needle = required_str(action, "string")?;
        let path = required_str(action, "inputfile")?;
        let contents = std::fs::read_to_string(path)?;

        if contents.contains(needle) {
            info!("{} is available in {}", needle, path);
            Ok(ActionResult::with_message("Available"))
        } else {
            Ok(ActionResult::failure(format!(
                "{} is not available in {}",
                needle, path
            )))
        }
    }
}

impl Default for ActionHandler {
    fn default() -> Self {
        Self::new(".")
    }
}

fn required_str<'a>(action: &'a HashMap<String, Value>, key: &str) -> Result<&'a str> {
    action
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AdbError::CommandFailed(format!("Missing argument: {}", key)))
}

/// Parse an action from a JSON object such as `{"action": "home"}`
pub fn parse_action(input: &str) -> std::result::Result<HashMap<String, Value>, String> {
    let action: HashMap<String, Value> = serde_json::from_str(input.trim())
        .map_err(|e| format!("Failed to parse action: {}", e))?;

    match action.get("action") {
        Some(Value::String(_)) => Ok(action),
        _ => Err(format!("Action has no \"action\" name: {}", input.trim())),
    }
}
