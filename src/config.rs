//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::error::CoordinatorError;

/// Main loop sleep between cycles while running
pub const DEFAULT_RUN_DELAY: Duration = Duration::from_millis(20);
/// Main loop sleep between cycles while paused
pub const DEFAULT_PAUSE_DELAY: Duration = Duration::from_secs(2);
/// Interval between foreground window queries
pub const DEFAULT_WINDOW_DETECT_DELAY: Duration = Duration::from_secs(2);
/// Hotkey loop sleep while nothing is queued
pub const DEFAULT_HOTKEY_IDLE_DELAY: Duration = Duration::from_millis(20);
/// Cooldown for bindings that do not set one
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(20);

/// Coordinator timing and daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub run_delay: Duration,
    pub pause_delay: Duration,
    pub window_detect_delay: Duration,
    pub hotkey_idle_delay: Duration,
    pub default_cooldown: Duration,

    /// Hotkey profile read by the daemon
    pub profile_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_delay: DEFAULT_RUN_DELAY,
            pause_delay: DEFAULT_PAUSE_DELAY,
            window_detect_delay: DEFAULT_WINDOW_DETECT_DELAY,
            hotkey_idle_delay: DEFAULT_HOTKEY_IDLE_DELAY,
            default_cooldown: DEFAULT_COOLDOWN,
            profile_path: PathBuf::from("profile.json"),
        }
    }
}

impl Config {
    /// Config with the given main loop delays and defaults for the rest
    pub fn new(run_delay: Duration, pause_delay: Duration) -> Self {
        Self {
            run_delay,
            pause_delay,
            ..Self::default()
        }
    }

    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let millis = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(value) => {
                    let ms: u64 = value
                        .trim()
                        .parse()
                        .with_context(|| format!("{key} must be a number of milliseconds"))?;
                    Ok(Duration::from_millis(ms))
                }
                None => Ok(default),
            }
        };

        let profile_path = match lookup("INPUTUTIL_PROFILE") {
            Some(path) => PathBuf::from(path),
            None => {
                let home = lookup("HOME")
                    .or_else(|| lookup("USERPROFILE"))
                    .context("neither HOME nor USERPROFILE is set")?;
                PathBuf::from(home)
                    .join(".config")
                    .join("inpututil")
                    .join("profile.json")
            }
        };

        let config = Self {
            run_delay: millis("INPUTUTIL_RUN_DELAY_MS", DEFAULT_RUN_DELAY)?,
            pause_delay: millis("INPUTUTIL_PAUSE_DELAY_MS", DEFAULT_PAUSE_DELAY)?,
            window_detect_delay: millis("INPUTUTIL_WINDOW_DELAY_MS", DEFAULT_WINDOW_DETECT_DELAY)?,
            hotkey_idle_delay: millis("INPUTUTIL_IDLE_DELAY_MS", DEFAULT_HOTKEY_IDLE_DELAY)?,
            default_cooldown: millis("INPUTUTIL_COOLDOWN_MS", DEFAULT_COOLDOWN)?,
            profile_path,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject delays that would turn a polling loop into a busy spin
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        let delays = [
            ("run delay", self.run_delay),
            ("pause delay", self.pause_delay),
            ("window detect delay", self.window_detect_delay),
            ("hotkey idle delay", self.hotkey_idle_delay),
        ];
        for (name, delay) in delays {
            if delay.is_zero() {
                return Err(CoordinatorError::invalid_argument(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}
