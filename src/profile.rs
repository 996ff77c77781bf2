//! Hotkey profiles for the daemon
//!
//! A profile is a JSON file listing the target window, the pause keys and
//! the hotkeys with the action each one runs:
//!
//! ```json
//! {
//!   "target_window": "Untitled - Notepad",
//!   "pause_keys": ["ctrl", "PAUSE"],
//!   "hotkeys": [
//!     {
//!       "keys": ["ctrl", "alt", "k"],
//!       "cooldown_ms": 100,
//!       "action": { "type": "log", "message": "hello" }
//!     },
//!     {
//!       "label": "screenshot",
//!       "keys": ["SNAPSHOT"],
//!       "args": ["--region"],
//!       "kwargs": { "format": "png" },
//!       "action": { "type": "command", "program": "shot.exe" }
//!     }
//!   ]
//! }
//! ```

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::coordinator::Coordinator;
use crate::error::CoordinatorError;
use crate::hotkey::{Args, HotkeyBuilder};
use crate::keys::KeyCode;

/// Prefix of the environment variables carrying named args to commands
const ENV_PREFIX: &str = "INPUTUTIL_";

/// Parsed hotkey profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Pause dispatch unless this window has focus
    #[serde(default)]
    pub target_window: Option<String>,

    /// Keys that toggle pause/resume when all held
    #[serde(default)]
    pub pause_keys: Vec<KeyCode>,

    pub hotkeys: Vec<HotkeyEntry>,
}

/// One hotkey in a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HotkeyEntry {
    #[serde(default)]
    pub label: Option<String>,
    pub keys: Vec<KeyCode>,
    #[serde(default)]
    pub cooldown_ms: Option<u64>,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    pub action: Action,
}

/// What a profile hotkey does when it fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Write a log line with the hotkey arguments
    Log { message: String },

    /// Spawn a program. Positional args are appended to its argv and named
    /// args are passed as `INPUTUTIL_<NAME>` environment variables.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Action {
    pub fn run(&self, args: &Args) -> Result<()> {
        match self {
            Action::Log { message } => {
                info!(
                    text = %message,
                    args = %serde_json::to_string(args)?,
                    "hotkey action"
                );
                Ok(())
            }
            Action::Command { program, args: fixed } => {
                let child = Command::new(program)
                    .args(fixed)
                    .args(args.positional.iter().map(value_to_arg))
                    .envs(args.named.iter().map(|(name, value)| {
                        (format!("{ENV_PREFIX}{}", name.to_uppercase()), value_to_arg(value))
                    }))
                    .stdin(Stdio::null())
                    .spawn()
                    .with_context(|| format!("failed to spawn '{program}'"))?;
                info!(program = %program, pid = child.id(), "hotkey command spawned");
                reap(program.clone(), child)?;
                Ok(())
            }
        }
    }
}

/// Wait for a spawned command on a detached thread so it never lingers as a
/// zombie. The handle is only joined by tests.
fn reap(program: String, mut child: Child) -> Result<JoinHandle<Option<ExitStatus>>> {
    let pid = child.id();
    thread::Builder::new()
        .name(format!("reap-{pid}"))
        .spawn(move || match child.wait() {
            Ok(status) => {
                debug!(program = %program, pid, %status, "hotkey command exited");
                Some(status)
            }
            Err(e) => {
                warn!(program = %program, pid, error = %e, "failed to wait for hotkey command");
                None
            }
        })
        .context("failed to spawn command reaper thread")
}

/// Strings are passed bare, everything else as JSON
fn value_to_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Profile {
    /// Read and parse a profile file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid profile {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Bind everything in the profile to a coordinator that has not started
    pub fn apply(&self, coordinator: &mut Coordinator) -> Result<(), CoordinatorError> {
        if let Some(window) = &self.target_window {
            coordinator.set_active_window(window.clone())?;
        }
        if !self.pause_keys.is_empty() {
            coordinator.bind_pause_hotkey(self.pause_keys.clone())?;
        }

        for entry in &self.hotkeys {
            let action = entry.action.clone();
            let mut builder = HotkeyBuilder::new()
                .keys(entry.keys.clone())
                .args(Args {
                    positional: entry.args.clone(),
                    named: entry.kwargs.clone(),
                })
                .callback(move |args| action.run(args));
            if let Some(ms) = entry.cooldown_ms {
                builder = builder.cooldown(Duration::from_millis(ms));
            }
            if let Some(label) = &entry.label {
                builder = builder.label(label.clone());
            }
            coordinator.bind_hotkey(builder)?;
        }
        Ok(())
    }
}
