//! Hotkey daemon entry point.
//!
//! Loads the configuration, builds the platform adapters and runs the
//! [`HotkeyEngine`] until Ctrl-C.
//!
//! ```text
//! main()
//!  └─ Cli::parse()
//!  └─ load_or_init_config()    -- TOML file, written with stock bindings on first run
//!  └─ HotkeyEngine::new()
//!       ├─ reload_hotkeys()    -- build the chord registry
//!       └─ start()
//!            ├─ keyboard hook thread
//!            ├─ mouse hook thread
//!            ├─ hotkey-dispatch consumer
//!            └─ hotkey-watchdog
//! ```
//!
//! Usage: `hotkeyd [--config <path>]` (also `HOTKEYD_CONFIG`)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hotkey_core::HotkeyAction;
use hotkey_daemon::application::dispatch_queue::{ActionExecutor, ExecuteError};
use hotkey_daemon::application::engine::{EngineAdapters, EngineSettings, HotkeyEngine};
use hotkey_daemon::application::health_monitor::MonitorSettings;
use hotkey_daemon::infrastructure::storage::config::{self, AppConfig};

/// Executor used by the standalone daemon: reports matched actions in the log.
///
/// A host application supplies its own [`ActionExecutor`] that opens windows
/// or runs prompts.
struct LogExecutor;

impl ActionExecutor for LogExecutor {
    fn execute(&self, action: &HotkeyAction) -> Result<(), ExecuteError> {
        info!(%action, "hotkey triggered");
        Ok(())
    }
}

#[cfg(target_os = "windows")]
fn platform_adapters(executor: Arc<dyn ActionExecutor>) -> EngineAdapters {
    use hotkey_daemon::infrastructure::input_capture::windows::WindowsInputHook;
    use hotkey_daemon::infrastructure::key_release::windows::WindowsKeyReleaser;
    use hotkey_daemon::infrastructure::session::windows::ForegroundWindowDetector;

    EngineAdapters {
        keyboard: Arc::new(WindowsInputHook::keyboard()),
        mouse: Arc::new(WindowsInputHook::mouse()),
        releaser: Arc::new(WindowsKeyReleaser::new()),
        session: Arc::new(ForegroundWindowDetector::new()),
        executor,
    }
}

#[cfg(not(target_os = "windows"))]
fn platform_adapters(executor: Arc<dyn ActionExecutor>) -> EngineAdapters {
    use hotkey_daemon::infrastructure::input_capture::{HookKind, UnsupportedHook};
    use hotkey_daemon::infrastructure::key_release::NoopKeyReleaser;
    use hotkey_daemon::infrastructure::session::NeverLocked;

    EngineAdapters {
        keyboard: Arc::new(UnsupportedHook::new(HookKind::Keyboard)),
        mouse: Arc::new(UnsupportedHook::new(HookKind::Mouse)),
        releaser: Arc::new(NoopKeyReleaser),
        session: Arc::new(NeverLocked),
        executor,
    }
}

// ── CLI argument definitions ──────────────────────────────────────────────────

/// System-wide hotkey daemon.
#[derive(Debug, Parser)]
#[command(
    name = "hotkeyd",
    about = "Global hotkey engine with listener health monitoring",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    ///
    /// When omitted, the platform config file is used and created with the
    /// stock bindings if it does not exist yet.
    #[arg(short, long, env = "HOTKEYD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let loaded = match &cli.config {
        Some(path) => config::load_config_at(path),
        None => config::load_or_init_config(),
    };
    let level = loaded
        .as_ref()
        .map(|cfg| cfg.engine.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Level comes from the config file and is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)),
        )
        .init();

    info!("hotkeyd starting");

    let cfg = loaded.unwrap_or_else(|e| {
        warn!("failed to load configuration ({e}); using stock bindings");
        AppConfig::default()
    });

    let settings = EngineSettings {
        duplicate_policy: cfg.engine.duplicate_policy,
        monitor: MonitorSettings {
            interval: cfg.engine.monitor_interval(),
            idle_reset: cfg.engine.idle_reset(),
        },
    };
    let engine = HotkeyEngine::new(settings, platform_adapters(Arc::new(LogExecutor)));

    let count = engine
        .reload_hotkeys(&cfg.hotkeys)
        .context("hotkey configuration rejected")?;
    info!(bindings = count, "registry ready");

    if let Err(e) = engine.start() {
        error!("failed to start hotkey engine: {e}");
        return Err(e).context("hotkey engine did not start");
    }

    info!("hotkeyd ready.  Press Ctrl-C to exit.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for the shutdown signal")?;
    info!("shutdown signal received");

    engine.stop();
    info!("hotkeyd stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
