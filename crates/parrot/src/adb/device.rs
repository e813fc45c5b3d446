//! High-level device actions for UI testing

use std::fs::File;
use std::path::Path;

use tempfile::tempdir;
use tracing::{debug, info};

use super::connection::{DeviceInfo, DeviceSession};
use super::executor::{CommandExecutor, ProcessExecutor};
use super::hierarchy::{Coordinate, ScreenDump, UiInspector};
use super::screenshot::Screenshot;
use super::shell::ShellBridge;
use crate::config::BRIDGE_CONFIG;
use crate::error::{AdbError, Result};

/// Android key event codes used by the controller
pub mod keycode {
    pub const HOME: u32 = 3;
    pub const BACK: u32 = 4;
    pub const ENTER: u32 = 66;
    pub const SLEEP: u32 = 223;
    pub const WAKEUP: u32 = 224;
}

/// Fixed swipe gesture as `(x1, y1, x2, y2)` in device pixels
pub type SwipeVector = (i32, i32, i32, i32);

pub const SCROLL_DOWN: SwipeVector = (500, 1000, 300, 300);
pub const SCROLL_UP: SwipeVector = (300, 700, 500, 1500);
pub const SWIPE_RIGHT_TO_LEFT: SwipeVector = (1000, 500, 300, 300);
pub const SWIPE_LEFT_TO_RIGHT: SwipeVector = (700, 300, 1500, 500);

/// Shell pipeline that prints the `top-activity` line of `dumpsys activity`
const FOREGROUND_ACTIVITY_CMD: [&str; 5] = ["dumpsys", "activity", "|", "grep", "top-activity"];

/// Extract the foreground package from `dumpsys activity | grep top-activity` output.
///
/// Takes the second-to-last `/`-separated segment, then its last
/// `:`-separated segment, then its last whitespace-separated token. For
/// `"... 4242:com.example.app/u0a91 (top-activity)"` this is
/// `com.example.app`.
pub fn foreground_package(output: &str) -> Option<String> {
    let mut segments = output.rsplit('/');
    segments.next()?;
    let owner = segments.next()?;
    let package = owner.rsplit(':').next()?.split_whitespace().last()?;
    Some(package.to_string())
}

/// Escape text for the device shell's `input text` command
pub fn escape_input_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        match ch {
            '%' => escaped.push_str("%%"),
            ' ' => escaped.push_str("%s"),
            '\\' | '"' | '\'' | '`' | '$' | '!' | '?' | '&' | '|' | ';' | '(' | ')' | '[' | ']'
            | '{' | '}' | '<' | '>' | '*' | '~' | '#' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Drives one Android device through the bridge tool.
///
/// Holds the session state and the executor; every action runs to
/// completion before returning. Not meant to be shared between concurrent
/// callers.
pub struct DeviceController<E = ProcessExecutor> {
    executor: E,
    session: DeviceSession,
    ui_dump_path: String,
}

impl DeviceController<ProcessExecutor> {
    /// Create a controller that spawns real bridge processes
    pub fn new() -> Self {
        Self::with_executor(ProcessExecutor::new(), DeviceSession::new())
    }
}

impl Default for DeviceController<ProcessExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CommandExecutor> DeviceController<E> {
    pub fn with_executor(executor: E, session: DeviceSession) -> Self {
        Self {
            executor,
            session,
            ui_dump_path: BRIDGE_CONFIG.ui_dump_path.clone(),
        }
    }

    /// Override the on-device path used for hierarchy dumps
    pub fn with_ui_dump_path(mut self, path: impl Into<String>) -> Self {
        self.ui_dump_path = path.into();
        self
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn bridge(&self) -> ShellBridge<'_, E> {
        ShellBridge::new(&self.executor, &self.session)
    }

    pub fn inspector(&self) -> UiInspector<'_, E> {
        UiInspector::new(self.bridge(), &self.ui_dump_path)
    }

    // Session

    pub fn select_device(&mut self, device_id: impl Into<String>) {
        self.session.select(device_id);
    }

    pub async fn connect(&self, device: &str) -> Result<()> {
        self.session.connect(&self.executor, device).await
    }

    pub async fn disconnect(&self, device: &str) -> Result<()> {
        self.session.disconnect(&self.executor, device).await
    }

    pub async fn disconnect_all(&self) {
        self.session.disconnect_all(&self.executor).await
    }

    pub async fn start_server(&self) -> Result<()> {
        self.session.start_server(&self.executor).await
    }

    pub async fn stop_server(&self) -> Result<()> {
        self.session.stop_server(&self.executor).await
    }

    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        self.session.list_devices(&self.executor).await
    }

    /// Run an arbitrary command in the device shell
    pub async fn shell<S: AsRef<str>>(&self, cmd: &[S]) -> Result<String> {
        self.bridge().shell(cmd).await
    }

    // Keys

    /// Send a key event by numeric code or `KEYCODE_*` name
    pub async fn key_event(&self, code: &str) -> Result<()> {
        self.shell(&["input", "keyevent", code]).await?;
        Ok(())
    }

    async fn press(&self, code: u32) -> Result<()> {
        self.key_event(&code.to_string()).await
    }

    /// Turn the display off, even if it is already off
    pub async fn lock_screen(&self) -> Result<()> {
        self.press(keycode::SLEEP).await
    }

    /// Turn the display on; no effect if it is already awake
    pub async fn wake_screen(&self) -> Result<()> {
        self.press(keycode::WAKEUP).await
    }

    pub async fn home(&self) -> Result<()> {
        self.press(keycode::HOME).await
    }

    pub async fn back(&self) -> Result<()> {
        self.press(keycode::BACK).await
    }

    pub async fn enter_key(&self) -> Result<()> {
        self.press(keycode::ENTER).await
    }

    // Gestures

    pub async fn swipe(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<()> {
        let (x1, y1, x2, y2) = (x1.to_string(), y1.to_string(), x2.to_string(), y2.to_string());
        self.shell(&[
            "input",
            "swipe",
            x1.as_str(),
            y1.as_str(),
            x2.as_str(),
            y2.as_str(),
        ])
        .await?;
        Ok(())
    }

    async fn swipe_vector(&self, (x1, y1, x2, y2): SwipeVector) -> Result<()> {
        self.swipe(x1, y1, x2, y2).await
    }

    pub async fn scroll_down(&self) -> Result<()> {
        self.swipe_vector(SCROLL_DOWN).await
    }

    pub async fn scroll_up(&self) -> Result<()> {
        self.swipe_vector(SCROLL_UP).await
    }

    pub async fn swipe_right_to_left(&self) -> Result<()> {
        self.swipe_vector(SWIPE_RIGHT_TO_LEFT).await
    }

    pub async fn swipe_left_to_right(&self) -> Result<()> {
        self.swipe_vector(SWIPE_LEFT_TO_RIGHT).await
    }

    pub async fn tap(&self, at: Coordinate) -> Result<()> {
        let (x, y) = (at.x.to_string(), at.y.to_string());
        self.shell(&["input", "tap", x.as_str(), y.as_str()]).await?;
        Ok(())
    }

    /// Type into the focused field using `input text`
    pub async fn type_text(&self, text: &str) -> Result<()> {
        let escaped = escape_input_text(text);
        self.shell(&["input", "text", escaped.as_str()]).await?;
        Ok(())
    }

    // Applications

    /// Launch an application by package name
    pub async fn open_application(&self, package_name: &str) -> Result<()> {
        self.shell(&["monkey", "-p", package_name, "-v", "20"]).await?;
        Ok(())
    }

    /// Package name of the application owning the top activity
    pub async fn current_application_package_name(&self) -> Result<String> {
        let output = self.shell(&FOREGROUND_ACTIVITY_CMD).await?;
        foreground_package(&output).ok_or_else(|| {
            AdbError::ParseError(format!("no top activity in: {}", output.trim()))
        })
    }

    /// Force-stop the foreground application
    pub async fn close_current_application(&self) -> Result<String> {
        let package = self.current_application_package_name().await?;
        self.shell(&["am", "force-stop", package.as_str()]).await?;
        info!("Closed {}", package);
        Ok(package)
    }

    // Files

    /// Capture the screen as PNG into `output_path`
    pub async fn screenshot(&self, output_path: impl AsRef<Path>) -> Result<Screenshot> {
        let output_path = output_path.as_ref();
        if self.session.device().is_none() {
            return Err(AdbError::NoDeviceSelected);
        }
        let file = File::create(output_path)?;
        self.bridge()
            .exec_out(&["screencap", "-p"], file)
            .await?;
        Screenshot::from_file(output_path)
    }

    pub async fn copy_to_host(&self, device_path: &str, host_path: impl AsRef<Path>) -> Result<()> {
        self.bridge().pull(device_path, host_path.as_ref()).await?;
        Ok(())
    }

    /// Write the current UI hierarchy XML to `output_path`
    pub async fn pull_ui_hierarchy(&self, output_path: impl AsRef<Path>) -> Result<()> {
        self.inspector().dump_hierarchy(output_path.as_ref()).await
    }

    // UI elements

    /// Dump and parse the current screen through a scratch file
    pub async fn screen_dump(&self) -> Result<ScreenDump> {
        let scratch = tempdir()?;
        let host_path = scratch.path().join("view.xml");
        self.inspector().capture(&host_path).await
    }

    /// Tap the first element matching `resource_id` or `text`
    pub async fn tap_element(
        &self,
        resource_id: Option<&str>,
        text: Option<&str>,
    ) -> Result<Coordinate> {
        let dump = self.screen_dump().await?;
        let at = dump
            .resolve_coordinate(resource_id, text)
            .ok_or_else(|| AdbError::ElementNotFound(describe(resource_id, text)))?;
        debug!("Resolved {} to {}", describe(resource_id, text), at);
        self.tap(at).await?;
        Ok(at)
    }

    /// Visible text of the element with `resource_id`
    pub async fn element_text(&self, resource_id: &str) -> Result<String> {
        self.screen_dump()
            .await?
            .resolve_text(resource_id)
            .ok_or_else(|| AdbError::ElementNotFound(format!("resource-id={}", resource_id)))
    }
}

fn describe(resource_id: Option<&str>, text: Option<&str>) -> String {
    match (resource_id, text) {
        (Some(id), Some(text)) => format!("resource-id={} or text={:?}", id, text),
        (Some(id), None) => format!("resource-id={}", id),
        (None, Some(text)) => format!("text={:?}", text),
        (None, None) => "no selector".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adb::executor::fake::{Reply, ScriptedExecutor};
    use crate::adb::hierarchy::tests::CALCULATOR_XML;
    use base64::{engine::general_purpose, Engine as _};
    use tempfile::tempdir;

    fn controller(exec: ScriptedExecutor) -> DeviceController<ScriptedExecutor> {
        let session = DeviceSession::new().with_adb_path("adb");
        let mut controller =
            DeviceController::with_executor(exec, session).with_ui_dump_path("/sdcard/view.xml");
        controller.select_device("D1");
        controller
    }

    fn shell_args(call: &[String]) -> Vec<&str> {
        assert_eq!(&call[..4], ["adb", "-s", "D1", "shell"]);
        call[4..].iter().map(String::as_str).collect()
    }

    #[test]
    fn test_foreground_package_extraction() {
        assert_eq!(
            foreground_package("... com.foo.bar/com.foo.bar.Main top-activity").as_deref(),
            Some("com.foo.bar")
        );
        assert_eq!(
            foreground_package(
                "    Proc # 0: fg     T/A/TOP  LCM  t: 0 4242:com.zilogic.z_calc/u0a91 (top-activity)\n\n"
            )
            .as_deref(),
            Some("com.zilogic.z_calc")
        );
        assert_eq!(
            foreground_package("u0 com.example.app/com.example.app.MainActivity top-activity")
                .as_deref(),
            Some("com.example.app")
        );
        assert_eq!(foreground_package("nothing here\n"), None);
    }

    #[test]
    fn test_escape_input_text() {
        assert_eq!(escape_input_text("hello world"), "hello%sworld");
        assert_eq!(escape_input_text("50%"), "50%%");
        assert_eq!(escape_input_text("a&b;c"), "a\\&b\\;c");
        assert_eq!(escape_input_text("plain"), "plain");
    }

    #[tokio::test]
    async fn test_fixed_key_events() {
        let c = controller(ScriptedExecutor::new());
        c.lock_screen().await.unwrap();
        c.wake_screen().await.unwrap();
        c.home().await.unwrap();
        c.enter_key().await.unwrap();
        c.back().await.unwrap();

        let calls = c.executor().calls();
        let codes: Vec<Vec<&str>> = calls.iter().map(|call| shell_args(call)).collect();
        assert_eq!(
            codes,
            vec![
                vec!["input", "keyevent", "223"],
                vec!["input", "keyevent", "224"],
                vec!["input", "keyevent", "3"],
                vec!["input", "keyevent", "66"],
                vec!["input", "keyevent", "4"],
            ]
        );
    }

    #[tokio::test]
    async fn test_fixed_swipe_vectors() {
        let c = controller(ScriptedExecutor::new());
        c.scroll_down().await.unwrap();
        c.scroll_up().await.unwrap();
        c.swipe_right_to_left().await.unwrap();
        c.swipe_left_to_right().await.unwrap();

        let calls = c.executor().calls();
        let swipes: Vec<Vec<&str>> = calls.iter().map(|call| shell_args(call)).collect();
        assert_eq!(
            swipes,
            vec![
                vec!["input", "swipe", "500", "1000", "300", "300"],
                vec!["input", "swipe", "300", "700", "500", "1500"],
                vec!["input", "swipe", "1000", "500", "300", "300"],
                vec!["input", "swipe", "700", "300", "1500", "500"],
            ]
        );
    }

    #[tokio::test]
    async fn test_tap_and_open_application() {
        let c = controller(ScriptedExecutor::new());
        c.tap(Coordinate::new(200, 300)).await.unwrap();
        c.open_application("com.zilogic.z_calc").await.unwrap();

        let calls = c.executor().calls();
        assert_eq!(shell_args(&calls[0]), vec!["input", "tap", "200", "300"]);
        assert_eq!(
            shell_args(&calls[1]),
            vec!["monkey", "-p", "com.zilogic.z_calc", "-v", "20"]
        );
    }

    #[tokio::test]
    async fn test_close_current_application() {
        let exec = ScriptedExecutor::new().reply(Reply::ok(
            "  Proc # 0: fg     T/A/TOP  LCM  t: 0 4242:com.zilogic.z_calc/u0a91 (top-activity)\n",
        ));
        let c = controller(exec);

        let package = c.close_current_application().await.unwrap();

        assert_eq!(package, "com.zilogic.z_calc");
        let calls = c.executor().calls();
        assert_eq!(
            shell_args(&calls[0]),
            vec!["dumpsys", "activity", "|", "grep", "top-activity"]
        );
        assert_eq!(
            shell_args(&calls[1]),
            vec!["am", "force-stop", "com.zilogic.z_calc"]
        );
    }

    #[tokio::test]
    async fn test_current_package_without_top_activity() {
        let c = controller(ScriptedExecutor::new().reply(Reply::ok("")));
        assert!(matches!(
            c.current_application_package_name().await,
            Err(AdbError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_shell_surfaces_as_shell_error() {
        let c = controller(ScriptedExecutor::new().reply(Reply::fail("device offline")));
        assert!(matches!(
            c.home().await,
            Err(AdbError::ShellCommand { .. })
        ));
    }

    #[tokio::test]
    async fn test_screenshot_round_trip() {
        let png: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 1, 2, 255];
        let c = controller(ScriptedExecutor::new().reply(Reply::ok(png.clone())));
        let dir = tempdir().unwrap();
        let path = dir.path().join("screen.png");

        let shot = c.screenshot(&path).await.unwrap();

        assert_eq!(
            c.executor().calls(),
            vec![vec!["adb", "-s", "D1", "exec-out", "screencap", "-p"]]
        );
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, png);

        let html = shot.to_html();
        let payload = html
            .split("base64,")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap();
        assert_eq!(general_purpose::STANDARD.decode(payload).unwrap(), written);
        assert!(html.contains(r#"width="200""#));
    }

    #[tokio::test]
    async fn test_screenshot_without_device_leaves_file_untouched() {
        let c = DeviceController::with_executor(
            ScriptedExecutor::new(),
            DeviceSession::new().with_adb_path("adb"),
        );
        let dir = tempdir().unwrap();
        let path = dir.path().join("keep.png");
        std::fs::write(&path, b"previous").unwrap();

        assert!(matches!(
            c.screenshot(&path).await,
            Err(AdbError::NoDeviceSelected)
        ));
        assert_eq!(std::fs::read(&path).unwrap(), b"previous");
        assert!(c.executor().calls().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_screenshot_streams_real_process_stdout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let adb = dir.path().join("fake-adb");
        std::fs::write(&adb, "#!/bin/sh\nprintf PNGBYTES\nprintf noise >&2\n").unwrap();
        std::fs::set_permissions(&adb, std::fs::Permissions::from_mode(0o755)).unwrap();

        let session = DeviceSession::new().with_adb_path(adb.to_string_lossy());
        let mut c = DeviceController::with_executor(ProcessExecutor::new(), session);
        c.select_device("D1");
        let path = dir.path().join("screen.png");

        let shot = c.screenshot(&path).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"PNGBYTES");
        assert_eq!(shot.decode().unwrap(), b"PNGBYTES");
        assert!(shot.to_html().contains("base64,UE5HQllURVM="));
    }

    #[tokio::test]
    async fn test_pull_ui_hierarchy() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("screen.xml");
        let c = controller(ScriptedExecutor::new().with_file(CALCULATOR_XML));

        c.pull_ui_hierarchy(&out).await.unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), CALCULATOR_XML);
        let calls = c.executor().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            shell_args(&calls[0]),
            vec!["uiautomator", "dump", "/sdcard/view.xml"]
        );
        assert_eq!(calls[1][3], "pull");
    }

    #[tokio::test]
    async fn test_tap_element_by_resource_id() {
        let c = controller(ScriptedExecutor::new().with_file(CALCULATOR_XML));

        let at = c
            .tap_element(Some("com.zilogic.z_calc:id/btn_7"), None)
            .await
            .unwrap();

        assert_eq!(at, Coordinate::new(200, 300));
        let calls = c.executor().calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(shell_args(&calls[2]), vec!["input", "tap", "200", "300"]);
    }

    #[tokio::test]
    async fn test_tap_element_missing_is_element_not_found() {
        let c = controller(ScriptedExecutor::new().with_file(CALCULATOR_XML));

        let err = c.tap_element(None, Some("Divide")).await.unwrap_err();

        assert!(matches!(err, AdbError::ElementNotFound(_)));
        // dump and pull only, no tap
        assert_eq!(c.executor().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_element_text() {
        let c = controller(ScriptedExecutor::new().with_file(CALCULATOR_XML));
        assert_eq!(
            c.element_text("com.zilogic.z_calc:id/title").await.unwrap(),
            "Z Calc"
        );
        assert!(matches!(
            c.element_text("com.zilogic.z_calc:id/none").await,
            Err(AdbError::ElementNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_select_issues_no_commands() {
        let mut c = controller(ScriptedExecutor::new());
        c.select_device("D2");
        assert_eq!(c.session().device(), Some("D2"));
        assert!(c.executor().calls().is_empty());
    }
}
