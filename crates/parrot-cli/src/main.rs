//! parrot CLI - Command-line interface for Android device control
//!
//! Usage:
//!     parrot [OPTIONS] <COMMAND>
//!
//! Environment Variables:
//!     PARROT_DEVICE_ID: Device serial or address to drive
//!     PARROT_ADB_PATH: Path of the adb executable (default: adb)
//!     PARROT_ADB_PORT: Port of the adb server (default: 5037)
//!     PARROT_UI_DUMP_PATH: On-device path for UI dumps (default: /sdcard/view.xml)
//!     RUST_LOG: Log filter (default: info)

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use parrot::{
    default_screenshot_name, parse_action, ActionHandler, Coordinate, DeviceController,
    DeviceSession, ProcessExecutor, SUPPORTED_ACTIONS,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// parrot - Android device control for automated UI testing
#[derive(Parser, Debug)]
#[command(name = "parrot")]
#[command(about = "parrot - Android device control for automated UI testing")]
#[command(after_help = r#"Examples:
    # Check adb installation and attached devices
    parrot check

    # Connect to a device over TCP/IP and make it the target
    parrot connect 192.168.1.100:5555

    # Open an app and tap a button by its visible text
    parrot -d emulator-5554 open com.zilogic.z_calc
    parrot -d emulator-5554 tap-element --text 7

    # Save a screenshot and print the HTML snippet for a report
    parrot -d emulator-5554 screenshot calc.png --html

    # Run actions interactively, one JSON object per line
    parrot -d emulator-5554 actions
"#)]
struct Cli {
    /// Device serial or address
    #[arg(short = 'd', long, env = "PARROT_DEVICE_ID", global = true)]
    device_id: Option<String>,

    /// Path of the adb executable
    #[arg(long, env = "PARROT_ADB_PATH", global = true)]
    adb_path: Option<String>,

    /// adb server port
    #[arg(short = 'p', long, env = "PARROT_ADB_PORT", global = true)]
    port: Option<u16>,

    /// Only log warnings and errors
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check adb installation and connected devices
    Check,
    /// List devices known to the adb server
    Devices,
    /// Connect to a device over TCP/IP
    Connect { address: String },
    /// Disconnect a device, or all remote devices when no address is given
    Disconnect { address: Option<String> },
    /// Start the adb server on the configured port
    StartServer,
    /// Stop the adb server on the configured port
    StopServer,
    /// Run a command in the device shell
    Shell {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Send a fixed key press
    Key { key: Key },
    /// Send a key event by code or KEYCODE_* name
    KeyEvent { code: String },
    /// Scroll the screen
    Scroll { direction: ScrollDirection },
    /// Swipe horizontally across the screen
    Swipe { direction: SwipeDirection },
    /// Tap at pixel coordinates
    Tap { x: i32, y: i32 },
    /// Tap the first element matching a resource id or visible text
    TapElement {
        #[arg(long = "id")]
        resource_id: Option<String>,
        #[arg(long)]
        text: Option<String>,
    },
    /// Print the visible text of an element
    ElementText {
        #[arg(long = "id")]
        resource_id: String,
    },
    /// Type text into the focused field
    Type { text: String },
    /// Open an application by package name
    Open { package: String },
    /// Force-stop the foreground application
    Close,
    /// Print the package name of the foreground application
    CurrentApp,
    /// Capture the screen as PNG
    Screenshot {
        output: Option<PathBuf>,
        /// Also print the <img> tag for HTML reports
        #[arg(long)]
        html: bool,
    },
    /// Copy a file from the device to the host
    Pull { device_path: String, host_path: PathBuf },
    /// Save the UI hierarchy XML of the current screen
    DumpUi { output: PathBuf },
    /// Dump and parse the current screen, printed as JSON
    Inspect,
    /// Run one action given as JSON, or read actions from stdin when omitted
    Actions {
        json: Option<String>,
        /// Directory for screenshots and dumps without an explicit path
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Key {
    Home,
    Back,
    Enter,
    Lock,
    Wake,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScrollDirection {
    Up,
    Down,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SwipeDirection {
    LeftToRight,
    RightToLeft,
}

fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn build_controller(args: &Cli) -> DeviceController<ProcessExecutor> {
    let mut session = DeviceSession::new();
    if let Some(path) = &args.adb_path {
        session = session.with_adb_path(path);
    }
    if let Some(port) = args.port {
        session = session.with_port(port);
    }

    let mut controller = DeviceController::with_executor(ProcessExecutor::new(), session);
    if let Some(device_id) = &args.device_id {
        controller.select_device(device_id);
    }
    controller
}

/// Connect over TCP/IP and target the new device
async fn connect_and_select(controller: &mut DeviceController, address: &str) -> Result<()> {
    controller.connect(address).await?;
    controller.select_device(address);
    Ok(())
}

/// Check system requirements for driving a device
async fn check_system_requirements(controller: &DeviceController) -> bool {
    let adb_path = controller.session().adb_path();
    println!("\u{1F50D} Checking system requirements...");
    println!("{}", "-".repeat(50));

    print!("1. Checking ADB installation... ");
    io::stdout().flush().ok();

    if which::which(adb_path).is_err() {
        println!("\u{274C} FAILED");
        println!("   Error: {} is not installed or not in PATH.", adb_path);
        println!("   Solution: Install ADB:");
        println!("     - macOS: brew install android-platform-tools");
        println!("     - Linux: sudo apt install android-tools-adb");
        println!(
            "     - Windows: Download from https://developer.android.com/studio/releases/platform-tools"
        );
        println!("{}", "-".repeat(50));
        println!("\u{274C} System check failed. Please fix the issues above.");
        return false;
    }
    println!("\u{2705} OK");

    print!("2. Checking connected devices... ");
    io::stdout().flush().ok();

    let all_passed = match controller.list_devices().await {
        Ok(devices) => {
            let ready: Vec<&str> = devices
                .iter()
                .filter(|d| d.status == "device")
                .map(|d| d.device_id.as_str())
                .collect();
            if ready.is_empty() {
                println!("\u{274C} FAILED");
                println!("   Error: No devices connected.");
                println!("   Solution:");
                println!("     1. Enable USB debugging on your Android device");
                println!("     2. Connect via USB and authorize the connection");
                println!("     3. Or connect remotely: parrot connect <ip>:<port>");
                false
            } else {
                println!("\u{2705} OK ({} device(s): {})", ready.len(), ready.join(", "));
                true
            }
        }
        Err(e) => {
            println!("\u{274C} FAILED");
            println!("   Error: {}", e);
            false
        }
    };

    println!("{}", "-".repeat(50));
    if all_passed {
        println!("\u{2705} All system checks passed!");
    } else {
        println!("\u{274C} System check failed. Please fix the issues above.");
    }
    all_passed
}

/// Print the device table
async fn print_devices(controller: &DeviceController) -> Result<()> {
    let devices = controller.list_devices().await?;
    if devices.is_empty() {
        println!("No devices connected.");
        return Ok(());
    }

    println!("Connected devices:");
    println!("{}", "-".repeat(60));
    for device in devices {
        let status_icon = if device.status == "device" {
            "\u{2713}"
        } else {
            "\u{2717}"
        };
        let model_info = device
            .model
            .map(|m| format!(" ({})", m))
            .unwrap_or_default();
        println!(
            "  {} {:<30} [{:?}]{}",
            status_icon, device.device_id, device.connection_type, model_info
        );
    }
    Ok(())
}

/// Run one action and print its result as JSON
async fn run_action(
    handler: &ActionHandler,
    controller: &mut DeviceController,
    input: &str,
) -> Result<bool> {
    let action = parse_action(input).map_err(|e| anyhow!(e))?;
    let result = handler.execute(controller, &action).await;
    println!("{}", serde_json::to_string(&result)?);
    Ok(result.success)
}

/// Read actions from stdin until EOF or `quit`
async fn run_interactive_mode(
    handler: &ActionHandler,
    controller: &mut DeviceController,
) -> Result<()> {
    println!("\nEntering interactive mode. One JSON action per line, 'quit' to exit.");
    println!("Actions: {}\n", SUPPORTED_ACTIONS.join(", "));

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(_) => {
                println!("\n\nInterrupted. Goodbye!");
                break;
            }
        }

        let line = input.trim();
        if line.eq_ignore_ascii_case("quit")
            || line.eq_ignore_ascii_case("exit")
            || line.eq_ignore_ascii_case("q")
        {
            println!("Goodbye!");
            break;
        }
        if line.is_empty() {
            continue;
        }

        if let Err(e) = run_action(handler, controller, line).await {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.quiet);

    let mut controller = build_controller(&args);

    match args.command {
        Commands::Check => {
            if !check_system_requirements(&controller).await {
                std::process::exit(1);
            }
        }
        Commands::Devices => print_devices(&controller).await?,
        Commands::Connect { address } => {
            println!("Connecting to {}...", address);
            connect_and_select(&mut controller, &address).await?;
            println!("\u{2713} Connected to {}", address);
        }
        Commands::Disconnect { address: Some(address) } => {
            println!("Disconnecting from {}...", address);
            controller.disconnect(&address).await?;
            println!("\u{2713} Disconnected {}", address);
        }
        Commands::Disconnect { address: None } => {
            println!("Disconnecting all remote devices...");
            controller.disconnect_all().await;
        }
        Commands::StartServer => {
            controller.start_server().await?;
            println!("\u{2713} ADB server started");
        }
        Commands::StopServer => {
            controller.stop_server().await?;
            println!("\u{2713} ADB server stopped");
        }
        Commands::Shell { args } => {
            let output = controller.shell(&args).await?;
            print!("{}", output);
        }
        Commands::Key { key } => match key {
            Key::Home => controller.home().await?,
            Key::Back => controller.back().await?,
            Key::Enter => controller.enter_key().await?,
            Key::Lock => controller.lock_screen().await?,
            Key::Wake => controller.wake_screen().await?,
        },
        Commands::KeyEvent { code } => controller.key_event(&code).await?,
        Commands::Scroll { direction } => match direction {
            ScrollDirection::Up => controller.scroll_up().await?,
            ScrollDirection::Down => controller.scroll_down().await?,
        },
        Commands::Swipe { direction } => match direction {
            SwipeDirection::LeftToRight => controller.swipe_left_to_right().await?,
            SwipeDirection::RightToLeft => controller.swipe_right_to_left().await?,
        },
        Commands::Tap { x, y } => controller.tap(Coordinate::new(x, y)).await?,
        Commands::TapElement { resource_id, text } => {
            if resource_id.is_none() && text.is_none() {
                bail!("tap-element needs --id or --text");
            }
            let at = controller
                .tap_element(resource_id.as_deref(), text.as_deref())
                .await?;
            println!("\u{2713} Tapped {}", at);
        }
        Commands::ElementText { resource_id } => {
            println!("{}", controller.element_text(&resource_id).await?);
        }
        Commands::Type { text } => controller.type_text(&text).await?,
        Commands::Open { package } => controller.open_application(&package).await?,
        Commands::Close => {
            let package = controller.close_current_application().await?;
            println!("\u{2713} Closed {}", package);
        }
        Commands::CurrentApp => {
            println!("{}", controller.current_application_package_name().await?);
        }
        Commands::Screenshot { output, html } => {
            let output = output.unwrap_or_else(|| PathBuf::from(default_screenshot_name()));
            let shot = controller.screenshot(&output).await?;
            match shot.dimensions {
                Some((w, h)) => println!("\u{2713} Saved {} ({}x{})", output.display(), w, h),
                None => println!("\u{2713} Saved {}", output.display()),
            }
            if html {
                println!("{}", shot.to_html());
            }
        }
        Commands::Pull {
            device_path,
            host_path,
        } => {
            controller.copy_to_host(&device_path, &host_path).await?;
            println!("\u{2713} Pulled {} to {}", device_path, host_path.display());
        }
        Commands::DumpUi { output } => {
            controller.pull_ui_hierarchy(&output).await?;
            println!("\u{2713} Saved {}", output.display());
        }
        Commands::Inspect => {
            let dump = controller.screen_dump().await?;
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
        Commands::Actions { json, output_dir } => {
            let handler = ActionHandler::new(output_dir);
            match json {
                Some(json) => {
                    if !run_action(&handler, &mut controller, &json).await? {
                        std::process::exit(1);
                    }
                }
                None => run_interactive_mode(&handler, &mut controller).await?,
            }
        }
    }

    Ok(())
}
