//! inpututil: hotkey daemon
//!
//! Loads a JSON hotkey profile, binds it to a coordinator polling the OS key
//! state and runs until Ctrl-C / SIGTERM.
//!
//! The profile path is the first argument, or `INPUTUTIL_PROFILE`, or
//! `~/.config/inpututil/profile.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use inpututil::lifecycle::ShutdownSignal;
use inpututil::{platform, Config, Coordinator, CoordinatorEvent, Profile};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "inpututil starting");

    // Load configuration
    let mut config = Config::load()?;
    if let Some(path) = std::env::args_os().nth(1) {
        config.profile_path = PathBuf::from(path);
    }
    info!(profile = %config.profile_path.display(), "configuration loaded");

    let profile = Profile::load(&config.profile_path)?;
    info!(
        hotkeys = profile.hotkeys.len(),
        target_window = ?profile.target_window,
        "profile loaded"
    );

    let backend = platform::system_backend().context("no input backend available")?;
    let mut coordinator = Coordinator::new(config, backend)?;
    profile.apply(&mut coordinator)?;

    let mut events = coordinator.subscribe();
    coordinator.start()?;

    let shutdown = ShutdownSignal::new();

    info!("coordinator started, waiting for hotkeys");

    tokio::select! {
        // Log coordinator events until it stops on its own
        _ = async {
            loop {
                match events.recv().await {
                    Ok(CoordinatorEvent::Stopped) => {
                        info!("coordinator stopped");
                        break;
                    }
                    Ok(CoordinatorEvent::CallbackFailed { label, message, .. }) => {
                        warn!(hotkey = %label, error = %message, "hotkey action failed");
                    }
                    Ok(event) => {
                        info!(%event, "coordinator event");
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {}

        // Wait for shutdown signal
        result = shutdown.wait() => {
            if let Err(e) = result {
                error!(?e, "signal handling failed");
            }
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    coordinator.stop();
    tokio::task::spawn_blocking(move || coordinator.join())
        .await
        .context("failed to join input threads")?;

    info!("inpututil stopped");

    Ok(())
}
