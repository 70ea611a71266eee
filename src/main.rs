//! Multi Keyboard - per-device keystroke monitor
//!
//! Lists the keyboards raw input can tell apart and prints every key-down
//! with the keyboard it came from.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use multi_keyboard::{
    config::Config,
    keyboard::{DeviceActivity, KeyEvent},
    platform::{Capture, CaptureHost},
    rawinput::{DeviceRegistry, InputHost, RawInput},
    report::SessionReport,
};

/// Per-device keystroke monitor
#[derive(Parser, Debug)]
#[command(name = "multi-keyboard")]
#[command(version)]
#[command(about = "Tell apart keystrokes from several attached keyboards", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the keyboards the registry accepts
    List {
        /// Read devices from a capture file instead of the live system
        #[arg(long, value_name = "FILE")]
        capture: Option<PathBuf>,
    },
    /// Print key-downs from every keyboard until Ctrl-C
    Monitor {
        /// Record devices and packets to a capture file
        #[arg(long, value_name = "FILE")]
        record: Option<PathBuf>,
        /// Write a session report on exit
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
    /// Feed a capture file through the dispatcher
    Replay {
        /// Capture file to replay
        file: PathBuf,
        /// Write a session report when done
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.filter.as_str()),
    )
    .init();

    match args.command {
        Command::List { capture } => list(&config, capture.as_deref()),
        Command::Monitor { record, report } => monitor(&config, record.as_deref(), report.as_deref()),
        Command::Replay { file, report } => replay(&config, &file, report.as_deref()),
    }
}

fn list(config: &Config, capture: Option<&Path>) -> Result<()> {
    let mut registry = DeviceRegistry::new(config.registry.to_filter());

    match capture {
        Some(path) => {
            let capture = Capture::load(path)
                .with_context(|| format!("Failed to read capture {}", path.display()))?;
            registry.enumerate(&CaptureHost::new(capture))?;
        }
        None => enumerate_live(&mut registry)?,
    }

    print_registry(&registry);
    Ok(())
}

#[cfg(target_os = "windows")]
fn enumerate_live(registry: &mut DeviceRegistry) -> Result<()> {
    use multi_keyboard::platform::windows::WindowsHost;

    registry.enumerate(&WindowsHost)?;
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn enumerate_live(_registry: &mut DeviceRegistry) -> Result<()> {
    anyhow::bail!("Live raw input is only available on Windows; pass --capture FILE")
}

fn print_registry(registry: &DeviceRegistry) {
    let summary = registry.last_summary();
    println!(
        "Found {} keyboard(s) among {} raw input device(s):",
        registry.len(),
        summary.listed
    );
    for device in registry.iter() {
        println!("  {}: {}", device.handle, device.display_name());
        println!("      {}", device.raw_name);
    }
}

/// Print an event and add it to `activity`
fn on_key(activity: &Rc<RefCell<DeviceActivity>>) -> impl FnMut(&KeyEvent<'_>) + 'static {
    let activity = Rc::clone(activity);
    move |event| {
        println!(
            "{:<12} {:<8} {:<18} {:<14} {}",
            event.device.handle.to_string(),
            event.source.as_str(),
            event.short_text(),
            event.key_label,
            event.device.display_name()
        );
        activity.borrow_mut().record(event);
    }
}

fn write_report<H: InputHost>(
    config: &Config,
    path: &Path,
    started: Instant,
    raw: &RawInput<H>,
    activity: &DeviceActivity,
) -> Result<()> {
    let report = SessionReport::new(
        started.elapsed(),
        raw.registry(),
        activity,
        raw.stats(),
        config.report.include_idle_devices,
    );
    let path = if path.is_relative() {
        config.report.resolve(&path.to_string_lossy())
    } else {
        path.to_path_buf()
    };
    report
        .export_json(&path)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    info!("Report written to {}", path.display());
    Ok(())
}

fn replay(config: &Config, file: &Path, report: Option<&Path>) -> Result<()> {
    let started = Instant::now();
    let capture = Capture::load(file)
        .with_context(|| format!("Failed to read capture {}", file.display()))?;

    let mut raw = RawInput::register(CaptureHost::new(capture), &(), config.registry.to_filter())?;
    raw.enumerate()?;

    let activity = Rc::new(RefCell::new(DeviceActivity::new()));
    raw.subscribe(on_key(&activity));

    for message in raw.host().messages() {
        if let Err(e) = raw.handle_message(&message) {
            warn!("Packet {}: {}", message, e);
        }
    }

    let stats = raw.stats();
    println!(
        "\nReplayed {} packet(s): {} key event(s), {} ignored, {} failed",
        stats.processed, stats.emitted, stats.ignored, stats.failed
    );

    if let Some(path) = report {
        write_report(config, path, started, &raw, &activity.borrow())?;
    }
    Ok(())
}

#[cfg(target_os = "windows")]
fn monitor(config: &Config, record: Option<&Path>, report: Option<&Path>) -> Result<()> {
    use multi_keyboard::platform::windows::{run_message_loop, MessageWindow, WindowsHost};
    use multi_keyboard::rawinput::DispatchError;

    let started = Instant::now();
    let window = MessageWindow::create().context("Failed to create message window")?;
    let mut raw = RawInput::register(WindowsHost, &window.hwnd(), config.registry.to_filter())?;
    raw.enumerate()?;
    print_registry(raw.registry());

    let mut recording = match record {
        Some(_) => Some(Capture::snapshot(raw.host())?),
        None => None,
    };

    let activity = Rc::new(RefCell::new(DeviceActivity::new()));
    raw.subscribe(on_key(&activity));

    println!("\nListening, press Ctrl-C to stop.\n");
    run_message_loop(|lparam| {
        if let Some(capture) = recording.as_mut() {
            if let Ok(bytes) = raw.host().read_packet(&lparam) {
                capture.push_packet(raw.host().delivery_param(&lparam), bytes);
            }
        }
        match raw.handle_message(&lparam) {
            Ok(_) => {}
            Err(DispatchError::UnknownDevice(handle)) => {
                // Attached after the last enumeration
                info!("Re-enumerating after input from {}", handle);
                if let Err(e) = raw.enumerate() {
                    warn!("{}", e);
                }
            }
            Err(e) => warn!("{}", e),
        }
    })?;

    let stats = raw.stats();
    println!(
        "\nSession complete: {} key event(s) from {} keyboard(s)",
        stats.emitted,
        activity.borrow().active_devices()
    );

    if let (Some(path), Some(capture)) = (record, recording) {
        capture
            .save(path)
            .with_context(|| format!("Failed to write capture {}", path.display()))?;
        info!("Capture written to {}", path.display());
    }
    if let Some(path) = report {
        write_report(config, path, started, &raw, &activity.borrow())?;
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn monitor(_config: &Config, _record: Option<&Path>, _report: Option<&Path>) -> Result<()> {
    anyhow::bail!("Live monitoring is only available on Windows; use `replay` with a capture file")
}
