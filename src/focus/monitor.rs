//! Window focus monitor thread
//!
//! Polls the foreground window title at a coarser interval than the main
//! loop and writes it into the shared `FocusState`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::FocusState;
use crate::error::CoordinatorError;
use crate::events::CoordinatorEvent;
use crate::platform::InputBackend;
use crate::state::StateMachine;

/// Poll the backend once and store the title
pub(crate) fn refresh(
    backend: &dyn InputBackend,
    focus: &FocusState,
    event_tx: &broadcast::Sender<CoordinatorEvent>,
) {
    match backend.foreground_window_title() {
        Ok(title) => {
            if focus.update(title.clone()) {
                debug!(%title, "foreground window changed");
                let _ = event_tx.send(CoordinatorEvent::FocusChanged { title });
            }
        }
        Err(e) => {
            // Keep the previous title, try again next round
            warn!(error = %e, "failed to query foreground window");
        }
    }
}

/// Start the monitor; it runs until the state machine is stopped
pub(crate) fn spawn_monitor(
    backend: Arc<dyn InputBackend>,
    focus: Arc<FocusState>,
    state: Arc<StateMachine>,
    event_tx: broadcast::Sender<CoordinatorEvent>,
    delay: Duration,
) -> Result<JoinHandle<()>, CoordinatorError> {
    thread::Builder::new()
        .name("window-focus-monitor".to_string())
        .spawn(move || {
            info!(target_window = ?focus.target(), "window focus monitor started");

            while !state.is_stopped() {
                refresh(backend.as_ref(), &focus, &event_tx);
                thread::sleep(delay);
            }

            info!("window focus monitor stopped");
        })
        .map_err(|e| CoordinatorError::ThreadSpawn(e.to_string()))
}
