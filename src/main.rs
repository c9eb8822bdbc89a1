//! TypeSpark - Main Entry Point
//!
//! Supports two modes:
//! - UI mode: tray icon, overlay and preferences surfaces (default)
//! - CLI mode: no tray, surface messages printed as JSON lines on stdout and
//!   surface requests read as JSON lines from stdin (--cli)
//!
//! `--ephemeral` keeps settings in memory for the session.

use anyhow::Result;
use std::env;
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use typespark::data::{FileBlobStore, MemoryBlobStore};
use typespark::platform::PlatformFactory;
use typespark::ui::{
    ChannelSurfaceFactory, SurfaceKind, SurfaceLink, SurfaceRegistry, SurfaceRequest,
};
use typespark::{AppConfig, BrokerHandle, GlobalKeyHook, Lifecycle, SettingsStore};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let cli_mode = args.iter().any(|a| a == "--cli" || a == "-c");
    let ephemeral = args.iter().any(|a| a == "--ephemeral");

    let config = AppConfig::load_or_default()?;
    init_logging(&config.general.log_filter);

    info!(
        "Starting TypeSpark v{} ({} mode)",
        env!("CARGO_PKG_VERSION"),
        if cli_mode { "CLI" } else { "UI" }
    );

    let store = if ephemeral {
        SettingsStore::new(MemoryBlobStore::new())
    } else {
        SettingsStore::new(FileBlobStore::new(config.settings_path()))
    };

    let factory = if cli_mode {
        ChannelSurfaceFactory::new(Box::new(attach_stdout))
    } else {
        ChannelSurfaceFactory::new(Box::new(attach_logging))
    };

    if !cli_mode && config.general.hide_dock_icon {
        PlatformFactory::hide_dock_icon();
    }

    let hook = GlobalKeyHook::platform()?;
    let mut lifecycle = Lifecycle::new(hook);
    let broker = lifecycle.ready(
        store,
        SurfaceRegistry::new(Box::new(factory)),
        PlatformFactory::create_pointer_source(),
    )?;

    if let Err(e) = lifecycle.start() {
        error!("TypeSpark cannot run without keyboard capture: {}", e);
        lifecycle.quit().await;
        return Err(e.into());
    }

    if cli_mode {
        info!("Listening for key presses, Ctrl-C to quit");
        serve_stdin(broker);
        tokio::signal::ctrl_c().await?;
    } else {
        run_ui(broker).await?;
    }

    lifecycle.quit().await;
    info!("Application exited");
    Ok(())
}

#[cfg(any(target_os = "windows", target_os = "macos"))]
async fn run_ui(broker: BrokerHandle) -> Result<()> {
    tokio::select! {
        result = typespark::ui::run_tray(broker) => result,
        signal = tokio::signal::ctrl_c() => Ok(signal?),
    }
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
async fn run_ui(_broker: BrokerHandle) -> Result<()> {
    info!("No tray on this platform, Ctrl-C to quit");
    tokio::signal::ctrl_c().await?;
    Ok(())
}

/// Rendering is done by the presentation host; without one, surface traffic
/// is traced.
fn attach_logging(link: SurfaceLink) {
    let SurfaceLink {
        kind,
        settings,
        mut messages,
        ..
    } = link;
    if kind == SurfaceKind::Preferences {
        info!(
            "Preferences opened at window-button offset ({}, {})",
            settings.traffic_light_position.x, settings.traffic_light_position.y
        );
    }
    tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            match serde_json::to_string(&message) {
                Ok(json) => tracing::debug!("[{}] {}", kind, json),
                Err(e) => warn!("[{}] unserializable message: {}", kind, e),
            }
        }
    });
}

fn attach_stdout(link: SurfaceLink) {
    let SurfaceLink {
        kind, mut messages, ..
    } = link;
    tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            if let Ok(json) = serde_json::to_string(&message) {
                print_line(kind.as_str(), &json);
            }
        }
    });
}

fn print_line(tag: &str, json: &str) {
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}\t{}", tag, json);
}

/// Read surface requests, one JSON object per line, and hand them to the
/// broker. Pulled settings are printed back tagged `get-settings`.
fn serve_stdin(broker: BrokerHandle) {
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();

    // Blocking stdin reads stay off the runtime.
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Stopped reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            let request: SurfaceRequest = match serde_json::from_str(&line) {
                Ok(request) => request,
                Err(e) => {
                    warn!("Ignoring malformed request {:?}: {}", line, e);
                    continue;
                }
            };
            match broker.serve(request).await {
                Ok(Some(settings)) => match serde_json::to_string(&settings) {
                    Ok(json) => print_line("get-settings", &json),
                    Err(e) => warn!("Unserializable settings: {}", e),
                },
                Ok(None) => {}
                Err(e) => {
                    error!("Request failed: {}", e);
                    break;
                }
            }
        }
    });
}

fn init_logging(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
