//! Main input loop
//!
//! Each cycle checks the pause key combination, applies focus gating and,
//! while running, signals every hotkey whose keys are all held.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::error::CoordinatorError;
use crate::events::Cause;
use crate::focus::FocusState;
use crate::hotkey::Hotkey;
use crate::keys::KeySet;
use crate::platform::InputBackend;
use crate::state::{State, StateMachine};

pub(crate) struct MainLoop {
    pub backend: Arc<dyn InputBackend>,
    pub state: Arc<StateMachine>,
    pub focus: Arc<FocusState>,
    pub hotkeys: Vec<Arc<Hotkey>>,
    pub pause_keys: KeySet,
    pub run_delay: Duration,
    pub pause_delay: Duration,
}

/// Pause key state carried between cycles
#[derive(Debug, Default)]
struct Edges {
    pause_keys_held: bool,
}

impl MainLoop {
    pub fn spawn(self) -> Result<JoinHandle<()>, CoordinatorError> {
        thread::Builder::new()
            .name("input-main-loop".to_string())
            .spawn(move || self.run())
            .map_err(|e| CoordinatorError::ThreadSpawn(e.to_string()))
    }

    fn run(self) {
        info!(
            hotkeys = self.hotkeys.len(),
            pause_keys = %self.pause_keys,
            run_delay_ms = self.run_delay.as_millis() as u64,
            pause_delay_ms = self.pause_delay.as_millis() as u64,
            "main input loop started"
        );

        let mut edges = Edges::default();
        loop {
            if self.state.is_stopped() {
                break;
            }

            self.check_pause_keys(&mut edges);
            self.check_focus();

            match self.state.state() {
                State::Running => {
                    self.dispatch();
                    thread::sleep(self.run_delay);
                }
                State::Paused => thread::sleep(self.pause_delay),
                State::NotStarted => thread::sleep(self.run_delay),
                State::Stopped => break,
            }
        }

        for hotkey in &self.hotkeys {
            hotkey.kill();
        }
        info!("main input loop stopped");
    }

    /// Toggle pause when the pause combination goes from released to held
    fn check_pause_keys(&self, edges: &mut Edges) {
        let held = self.pause_keys.all_down(self.backend.as_ref());
        if held && !edges.pause_keys_held {
            match self.state.pause_or_resume(Cause::PauseKeys) {
                Ok(state) => debug!(%state, "pause keys pressed"),
                Err(e) => debug!(error = %e, "pause keys ignored"),
            }
        }
        edges.pause_keys_held = held;
    }

    /// Keep the state in line with focus: running only while the target
    /// window is in the foreground. Applied every cycle, so it overrides
    /// manual and pause key changes.
    fn check_focus(&self) {
        let Some(matches) = self.focus.matches_target() else {
            return;
        };

        let result = match (matches, self.state.state()) {
            (true, State::Paused) => self.state.resume(Cause::Focus),
            (false, State::Running) => self.state.pause(Cause::Focus),
            _ => return,
        };
        if let Err(e) = result {
            debug!(error = %e, "focus gating ignored");
        }
    }

    /// Signal every hotkey whose keys are all down, in registration order
    fn dispatch(&self) {
        for hotkey in &self.hotkeys {
            if hotkey.keys().all_down(self.backend.as_ref()) && hotkey.execute() {
                trace!(hotkey = %hotkey.label(), "hotkey queued");
            }
        }
    }
}
