//! # OLED Clock Application Entry Point
//!
//! Wires configuration, logging, the widget registry, a frame sink and the
//! scheduler together. It runs against the keyboard by default, or against
//! the terminal with `--stdout` for development without hardware.
//!
//! ```text
//! oled-clock [--config <path>] [--stdout] [--frames <n>]
//! oled-clock --list-devices
//! oled-clock --autostart <enable|disable|toggle|status>
//! ```

#[cfg(test)]
mod tests;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use crossbeam_channel::Receiver;

use oled_clock_lib::autostart::{self, Autostart};
use oled_clock_lib::scheduler::{Scheduler, SystemClock};
use oled_clock_lib::transport::preview::PreviewSink;
use oled_clock_lib::transport::{self, FrameSink, HidBackend, HidTransport};
use oled_clock_lib::{Config, Registry, WidgetContext};

const USAGE: &str = "usage: oled-clock [--config <path>] [--stdout] [--frames <n>] \
                     [--list-devices] [--autostart <enable|disable|toggle|status>]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AutostartAction {
    Enable,
    Disable,
    Toggle,
    Status,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<PathBuf>,
    stdout: bool,
    frames: Option<u64>,
    list_devices: bool,
    autostart: Option<AutostartAction>,
    help: bool,
}

fn parse_args<I>(args: I) -> anyhow::Result<Args>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--stdout" => parsed.stdout = true,
            "--frames" => {
                let n = args.next().context("--frames needs a count")?;
                parsed.frames = Some(n.parse().with_context(|| format!("invalid frame count {n:?}"))?);
            }
            "--list-devices" => parsed.list_devices = true,
            "--autostart" => {
                let action = args.next().context("--autostart needs an action")?;
                parsed.autostart = Some(match action.as_str() {
                    "enable" => AutostartAction::Enable,
                    "disable" => AutostartAction::Disable,
                    "toggle" => AutostartAction::Toggle,
                    "status" => AutostartAction::Status,
                    other => bail!("unknown autostart action {other:?}"),
                });
            }
            "-h" | "--help" => parsed.help = true,
            other => bail!("unknown argument {other:?}\n{USAGE}"),
        }
    }
    Ok(parsed)
}

fn run_autostart(action: AutostartAction) -> anyhow::Result<()> {
    let entry = autostart::platform_autostart().context("resolving autostart entry")?;
    let enabled = match action {
        AutostartAction::Enable => entry.enable().map(|()| true),
        AutostartAction::Disable => entry.disable().map(|()| false),
        AutostartAction::Toggle => entry.toggle(),
        AutostartAction::Status => entry.is_enabled(),
    }
    .context("updating autostart")?;
    println!("autostart {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

fn list_devices() -> anyhow::Result<()> {
    let backend = transport::platform_backend().context("initialising HID backend")?;
    let devices = backend.enumerate().context("enumerating HID interfaces")?;
    if devices.is_empty() {
        println!("no HID interfaces found");
    }
    for device in devices {
        println!("{}  {}  {}", device.id, device.path.display(), device.name);
    }
    Ok(())
}

fn run_frames<S: FrameSink>(
    config: &Config,
    registry: &Registry,
    ctx: &WidgetContext,
    sink: S,
    shutdown: Receiver<()>,
    frames: Option<u64>,
) -> anyhow::Result<()> {
    let widgets = registry
        .build_all(&config.widgets, ctx)
        .context("building widgets")?;
    let mut scheduler = Scheduler::new(widgets, sink, SystemClock, &config.display).with_shutdown(shutdown);
    if let Some(n) = frames {
        scheduler = scheduler.with_frame_limit(n);
    }
    let stats = scheduler.run().context("frame loop stopped")?;
    log::debug!("Final stats: {stats:?}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }
    if let Some(action) = args.autostart {
        return run_autostart(action);
    }
    if args.list_devices {
        return list_devices();
    }

    let config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .context("loading configuration")?;

    // Workers and the Ctrl-C listener live on this runtime; the frame loop
    // itself stays on the main thread.
    let rt = tokio::runtime::Runtime::new()?;
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    rt.spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Interrupted, shutting down");
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                log::warn!("Cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        }
    });

    let ctx = WidgetContext::with_runtime(rt.handle().clone());
    let registry = Registry::with_builtins();
    let (width, height) = (config.display.width, config.display.height);

    let result = if args.stdout {
        let sink = PreviewSink::stdout(width, height);
        run_frames(&config, &registry, &ctx, sink, shutdown_rx, args.frames)
    } else {
        let backend = transport::platform_backend().context("initialising HID backend")?;
        let sink = HidTransport::open(
            backend,
            &config.device.devices,
            config.device.packet_format,
            (width, height),
            config.device.recovery(),
        )
        .context("opening keyboard display")?;
        run_frames(&config, &registry, &ctx, sink, shutdown_rx, args.frames)
    };

    rt.shutdown_timeout(Duration::from_secs(1));
    result
}
