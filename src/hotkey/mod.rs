//! Hotkey bindings and their execution loops
//!
//! A binding ties a key combination to a callback. Once the coordinator
//! starts, every binding becomes a `Hotkey` with its own thread that runs the
//! callback when signalled and then cools down.

mod binding;
mod worker;

pub use binding::{Args, Callback, HotkeyBinding, HotkeyBuilder, HotkeyId};
pub use worker::Hotkey;
