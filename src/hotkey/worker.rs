//! Per-hotkey execution loop
//!
//! The main loop only signals `execute()`; each hotkey runs its callback on
//! its own thread and then waits out its cooldown before it can be queued
//! again. Holding the keys down therefore fires once per cooldown rather
//! than once per poll.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info};

use super::binding::{Args, Callback, HotkeyBinding, HotkeyId};
use crate::error::CoordinatorError;
use crate::events::CoordinatorEvent;
use crate::keys::KeySet;

const IDLE: u8 = 0;
const QUEUED: u8 = 1;
const EXECUTING: u8 = 2;

/// A bound hotkey with its own execution thread
pub struct Hotkey {
    id: HotkeyId,
    label: String,
    keys: KeySet,
    cooldown: Duration,
    idle_delay: Duration,
    callback: Callback,
    args: Args,
    /// IDLE, QUEUED or EXECUTING; queued and executing never overlap
    phase: AtomicU8,
    alive: AtomicBool,
    event_tx: broadcast::Sender<CoordinatorEvent>,
}

impl Hotkey {
    pub(crate) fn new(
        id: HotkeyId,
        binding: HotkeyBinding,
        default_cooldown: Duration,
        idle_delay: Duration,
        event_tx: broadcast::Sender<CoordinatorEvent>,
    ) -> Self {
        Self {
            id,
            label: binding.label,
            keys: binding.keys,
            cooldown: binding.cooldown.unwrap_or(default_cooldown),
            idle_delay,
            callback: binding.callback,
            args: binding.args,
            phase: AtomicU8::new(IDLE),
            alive: AtomicBool::new(true),
            event_tx,
        }
    }

    pub fn id(&self) -> HotkeyId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Queue one run of the callback
    ///
    /// Does nothing while a run is already queued or executing. Returns
    /// whether a run was queued.
    pub fn execute(&self) -> bool {
        self.phase
            .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the callback is running or cooling down
    pub fn is_executing(&self) -> bool {
        self.phase.load(Ordering::Acquire) == EXECUTING
    }

    /// Ask the loop to exit at its next check
    pub fn kill(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Start the execution loop on a dedicated thread
    pub(crate) fn spawn(self: &Arc<Self>) -> Result<JoinHandle<()>, CoordinatorError> {
        let hotkey = Arc::clone(self);
        thread::Builder::new()
            .name(format!("hotkey-{}", self.id.index()))
            .spawn(move || hotkey.run())
            .map_err(|e| CoordinatorError::ThreadSpawn(e.to_string()))
    }

    fn run(&self) {
        debug!(hotkey = %self.label, "hotkey thread started");

        while self.is_alive() {
            if self
                .phase
                .compare_exchange(QUEUED, EXECUTING, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.invoke();
                thread::sleep(self.cooldown);
                self.phase.store(IDLE, Ordering::Release);
                continue;
            }
            thread::sleep(self.idle_delay);
        }

        debug!(hotkey = %self.label, "hotkey thread stopped");
    }

    /// Run the callback once, reporting errors and panics instead of dying
    fn invoke(&self) {
        info!(hotkey = %self.label, "hotkey fired");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(&self.args)));
        let message = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => format!("{e:#}"),
            Err(payload) => panic_message(payload.as_ref()),
        };

        error!(hotkey = %self.label, error = %message, "hotkey callback failed");
        let _ = self.event_tx.send(CoordinatorEvent::CallbackFailed {
            hotkey: self.id,
            label: self.label.clone(),
            message,
        });
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

impl std::fmt::Debug for Hotkey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hotkey")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("keys", &self.keys)
            .field("cooldown", &self.cooldown)
            .field("phase", &self.phase.load(Ordering::Relaxed))
            .field("alive", &self.is_alive())
            .finish()
    }
}
