//! inpututil: global hotkeys driven by polling loops
//!
//! Bind key combinations to callbacks, optionally restrict dispatch to one
//! focused window, then start the coordinator:
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use inpututil::{Config, Coordinator, HotkeyBuilder, KeyCode};
//!
//! fn main() -> anyhow::Result<()> {
//!     let backend = inpututil::platform::system_backend()?;
//!     let mut coordinator = Coordinator::new(Config::default(), backend)?;
//!
//!     coordinator.bind_hotkey(
//!         HotkeyBuilder::new()
//!             .keys([KeyCode::CONTROL, KeyCode::MENU, KeyCode::KEY_K])
//!             .cooldown(Duration::from_millis(100))
//!             .callback(|_| {
//!                 println!("pressed");
//!                 Ok(())
//!             }),
//!     )?;
//!     coordinator.bind_pause_hotkey([KeyCode::CONTROL, KeyCode::PAUSE])?;
//!     coordinator.set_active_window("Untitled - Notepad")?;
//!     coordinator.start()?;
//!
//!     std::thread::sleep(Duration::from_secs(60));
//!     coordinator.stop();
//!     coordinator.join();
//!     Ok(())
//! }
//! ```
//!
//! Threads:
//! - window focus monitor: polls the foreground window title
//! - one per hotkey: runs the callback, then cools down
//! - main input loop: pause keys, focus gating, hotkey dispatch

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod focus;
pub mod hotkey;
pub mod keys;
pub mod lifecycle;
pub mod platform;
pub mod profile;
pub mod state;

pub use config::Config;
pub use coordinator::{Coordinator, CoordinatorHandle};
pub use error::CoordinatorError;
pub use events::{Cause, CoordinatorEvent};
pub use hotkey::{Args, HotkeyBuilder, HotkeyId};
pub use keys::{KeyCode, KeySet};
pub use platform::{BackendError, InputBackend, ScriptedBackend};
pub use profile::Profile;
pub use state::State;
