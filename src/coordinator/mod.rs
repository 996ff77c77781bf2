//! Input coordinator
//!
//! Owns the hotkey registry, the pause key combination and the target
//! window, and runs the loops that turn held keys into callbacks:
//!
//! - one window focus monitor thread
//! - one execution thread per hotkey
//! - the main input loop
//!
//! All bindings must be made before `start()`. Afterwards the coordinator
//! can only be paused, resumed and stopped.

mod main_loop;

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::CoordinatorError;
use crate::events::{Cause, CoordinatorEvent};
use crate::focus::{self, FocusState};
use crate::hotkey::{Hotkey, HotkeyBinding, HotkeyBuilder, HotkeyId};
use crate::keys::KeySet;
use crate::platform::InputBackend;
use crate::state::{State, StateMachine};

use main_loop::MainLoop;

/// Capacity of the event broadcast channel
const EVENT_CAPACITY: usize = 64;

/// Clonable control handle, usable from callbacks and other threads
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    state: Arc<StateMachine>,
    event_tx: broadcast::Sender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    pub fn state(&self) -> State {
        self.state.state()
    }

    pub fn is_stopped(&self) -> bool {
        self.state.is_stopped()
    }

    /// Pause hotkey dispatch
    pub fn pause(&self) -> Result<(), CoordinatorError> {
        self.state.pause(Cause::Manual)
    }

    /// Resume hotkey dispatch; fails before start and after stop
    pub fn resume(&self) -> Result<(), CoordinatorError> {
        self.state.resume(Cause::Manual)
    }

    pub fn pause_or_resume(&self) -> Result<State, CoordinatorError> {
        self.state.pause_or_resume(Cause::Manual)
    }

    /// Stop every loop for good
    pub fn stop(&self) {
        self.state.stop();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.event_tx.subscribe()
    }
}

/// Registers hotkeys and runs the polling loops
pub struct Coordinator {
    config: Config,
    backend: Arc<dyn InputBackend>,
    handle: CoordinatorHandle,
    bindings: Vec<HotkeyBinding>,
    pause_keys: KeySet,
    active_window: Option<String>,
    hotkeys: Vec<Arc<Hotkey>>,
    threads: Vec<JoinHandle<()>>,
}

impl Coordinator {
    /// Create a coordinator polling the given backend
    pub fn new(config: Config, backend: Arc<dyn InputBackend>) -> Result<Self, CoordinatorError> {
        config.validate()?;

        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let handle = CoordinatorHandle {
            state: Arc::new(StateMachine::new(event_tx.clone())),
            event_tx,
        };

        Ok(Self {
            config,
            backend,
            handle,
            bindings: Vec::new(),
            pause_keys: KeySet::new(),
            active_window: None,
            hotkeys: Vec::new(),
            threads: Vec::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn handle(&self) -> CoordinatorHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.handle.subscribe()
    }

    pub fn state(&self) -> State {
        self.handle.state()
    }

    /// Number of hotkeys bound so far
    pub fn hotkey_count(&self) -> usize {
        self.bindings.len() + self.hotkeys.len()
    }

    /// Bind a key combination to a callback
    pub fn bind_hotkey(&mut self, builder: HotkeyBuilder) -> Result<HotkeyId, CoordinatorError> {
        self.ensure_not_started("hotkeys must be bound before start()")?;
        let binding = builder.build()?;
        let id = HotkeyId(self.bindings.len());

        info!(
            hotkey = %binding.label(),
            keys = %binding.keys(),
            cooldown_ms = binding
                .cooldown
                .unwrap_or(self.config.default_cooldown)
                .as_millis() as u64,
            "hotkey bound"
        );
        self.bindings.push(binding);
        Ok(id)
    }

    /// Add keys to the combination that toggles pause/resume when all held
    pub fn bind_pause_hotkey(&mut self, keys: impl Into<KeySet>) -> Result<(), CoordinatorError> {
        self.ensure_not_started("pause keys must be bound before start()")?;
        let keys = keys.into();
        if keys.is_empty() {
            return Err(CoordinatorError::invalid_argument(
                "pause keys must contain at least one key code",
            ));
        }

        self.pause_keys.extend(keys.iter());
        info!(pause_keys = %self.pause_keys, "pause hotkey bound");
        Ok(())
    }

    /// Only dispatch hotkeys while the window with this title has focus
    pub fn set_active_window(&mut self, name: impl Into<String>) -> Result<(), CoordinatorError> {
        self.ensure_not_started("active window must be set before start()")?;
        let name = name.into();
        info!(window = %name, "active window set");
        self.active_window = Some(name);
        Ok(())
    }

    /// Launch the focus monitor, every hotkey thread and the main loop
    pub fn start(&mut self) -> Result<(), CoordinatorError> {
        if self.state() != State::NotStarted {
            return Err(CoordinatorError::AlreadyStarted);
        }
        if self.bindings.is_empty() {
            return Err(CoordinatorError::NoHotkeysRegistered);
        }

        let event_tx = self.handle.event_tx.clone();
        let focus_state = Arc::new(FocusState::new(self.active_window.clone()));
        // First title is read up front so the main loop starts with a focus decision
        focus::refresh(self.backend.as_ref(), &focus_state, &event_tx);

        let default_cooldown = self.config.default_cooldown;
        let idle_delay = self.config.hotkey_idle_delay;
        self.hotkeys = self
            .bindings
            .drain(..)
            .enumerate()
            .map(|(index, binding)| {
                Arc::new(Hotkey::new(
                    HotkeyId(index),
                    binding,
                    default_cooldown,
                    idle_delay,
                    event_tx.clone(),
                ))
            })
            .collect();

        if let Err(e) = self.spawn_loops(focus_state) {
            error!(error = %e, "failed to start input loops");
            self.shutdown();
            return Err(e);
        }
        Ok(())
    }

    fn spawn_loops(&mut self, focus_state: Arc<FocusState>) -> Result<(), CoordinatorError> {
        let state = Arc::clone(&self.handle.state);

        self.threads.push(focus::spawn_monitor(
            Arc::clone(&self.backend),
            Arc::clone(&focus_state),
            Arc::clone(&state),
            self.handle.event_tx.clone(),
            self.config.window_detect_delay,
        )?);

        for hotkey in &self.hotkeys {
            self.threads.push(hotkey.spawn()?);
        }

        state.start(self.hotkeys.len())?;

        let main_loop = MainLoop {
            backend: Arc::clone(&self.backend),
            state,
            focus: focus_state,
            hotkeys: self.hotkeys.clone(),
            pause_keys: self.pause_keys.clone(),
            run_delay: self.config.run_delay,
            pause_delay: self.config.pause_delay,
        };
        self.threads.push(main_loop.spawn()?);
        Ok(())
    }

    pub fn pause(&self) -> Result<(), CoordinatorError> {
        self.handle.pause()
    }

    pub fn resume(&self) -> Result<(), CoordinatorError> {
        self.handle.resume()
    }

    pub fn pause_or_resume(&self) -> Result<State, CoordinatorError> {
        self.handle.pause_or_resume()
    }

    /// Stop the coordinator; loops exit after their current sleep or callback
    pub fn stop(&self) {
        self.shutdown();
    }

    /// Wait for every spawned thread to exit. Call after `stop()`.
    pub fn join(&mut self) {
        for thread in self.threads.drain(..) {
            let name = thread.thread().name().unwrap_or("unnamed").to_string();
            if thread.join().is_err() {
                warn!(thread = %name, "input thread panicked");
            }
        }
    }

    fn shutdown(&self) {
        self.handle.stop();
        for hotkey in &self.hotkeys {
            hotkey.kill();
        }
    }

    fn ensure_not_started(&self, msg: &str) -> Result<(), CoordinatorError> {
        match self.state() {
            State::NotStarted => Ok(()),
            _ => Err(CoordinatorError::invalid_state(msg)),
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyCode;
    use crate::platform::ScriptedBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    fn fast_config() -> Config {
        Config {
            run_delay: Duration::from_millis(5),
            pause_delay: Duration::from_millis(10),
            window_detect_delay: Duration::from_millis(5),
            hotkey_idle_delay: Duration::from_millis(2),
            default_cooldown: Duration::from_millis(1),
            ..Config::default()
        }
    }

    fn setup(config: Config) -> (Coordinator, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::new());
        let coordinator = Coordinator::new(config, backend.clone()).unwrap();
        (coordinator, backend)
    }

    fn counter_hotkey(keys: impl Into<KeySet>) -> (HotkeyBuilder, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        let builder = HotkeyBuilder::new().keys(keys).callback(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (builder, counter)
    }

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    fn finish(mut coordinator: Coordinator) {
        coordinator.stop();
        coordinator.join();
    }

    #[test]
    fn test_new_rejects_zero_delay() {
        let backend = Arc::new(ScriptedBackend::new());
        let config = Config::new(Duration::ZERO, Duration::from_secs(1));
        assert!(matches!(
            Coordinator::new(config, backend),
            Err(CoordinatorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_start_without_hotkeys() {
        let (mut coordinator, backend) = setup(fast_config());
        assert_eq!(coordinator.start(), Err(CoordinatorError::NoHotkeysRegistered));

        thread::sleep(Duration::from_millis(30));
        assert!(coordinator.threads.is_empty());
        assert_eq!(backend.title_queries(), 0);
        assert_eq!(backend.key_queries(), 0);
        assert_eq!(coordinator.state(), State::NotStarted);
    }

    #[test]
    fn test_start_twice() {
        let (mut coordinator, _) = setup(fast_config());
        let (builder, _) = counter_hotkey(KeyCode::F1);
        coordinator.bind_hotkey(builder).unwrap();

        coordinator.start().unwrap();
        assert_eq!(coordinator.state(), State::Running);
        assert_eq!(coordinator.start(), Err(CoordinatorError::AlreadyStarted));
        assert_eq!(coordinator.start(), Err(CoordinatorError::AlreadyStarted));

        finish(coordinator);
    }

    #[test]
    fn test_bind_validation() {
        let (mut coordinator, _) = setup(fast_config());
        let err = coordinator
            .bind_hotkey(HotkeyBuilder::new().keys(KeyCode::F1))
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidArgument(_)));

        let err = coordinator.bind_pause_hotkey(Vec::<KeyCode>::new()).unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidArgument(_)));
        assert_eq!(coordinator.hotkey_count(), 0);
    }

    #[test]
    fn test_bind_after_start_rejected() {
        let (mut coordinator, _) = setup(fast_config());
        let (builder, _) = counter_hotkey(KeyCode::F1);
        assert_eq!(coordinator.bind_hotkey(builder).unwrap(), HotkeyId(0));
        coordinator.start().unwrap();

        let (builder, _) = counter_hotkey(KeyCode::F2);
        assert!(matches!(
            coordinator.bind_hotkey(builder),
            Err(CoordinatorError::InvalidState(_))
        ));
        assert!(matches!(
            coordinator.bind_pause_hotkey(KeyCode::PAUSE),
            Err(CoordinatorError::InvalidState(_))
        ));
        assert!(matches!(
            coordinator.set_active_window("Editor"),
            Err(CoordinatorError::InvalidState(_))
        ));
        assert_eq!(coordinator.hotkey_count(), 1);

        finish(coordinator);
    }

    #[test]
    fn test_hotkey_fires_only_while_all_keys_held() {
        let (mut coordinator, backend) = setup(fast_config());
        let (builder, counter) =
            counter_hotkey([KeyCode::CONTROL, KeyCode::MENU, KeyCode::KEY_K]);
        coordinator.bind_hotkey(builder).unwrap();
        coordinator.start().unwrap();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        backend.press_all([KeyCode::CONTROL, KeyCode::MENU]);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        backend.press(KeyCode::KEY_K);
        assert!(wait_for(|| counter.load(Ordering::SeqCst) >= 1));

        backend.release_all();
        thread::sleep(Duration::from_millis(50));
        let settled = counter.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(counter.load(Ordering::SeqCst), settled);

        finish(coordinator);
    }

    #[test]
    fn test_held_keys_fire_once_per_cooldown() {
        let config = Config {
            run_delay: Duration::from_millis(20),
            hotkey_idle_delay: Duration::from_millis(20),
            ..fast_config()
        };
        let (mut coordinator, backend) = setup(config);
        let (builder, counter) =
            counter_hotkey([KeyCode::CONTROL, KeyCode::MENU, KeyCode::KEY_K]);
        coordinator
            .bind_hotkey(builder.cooldown(Duration::from_millis(100)))
            .unwrap();
        coordinator.start().unwrap();

        backend.press_all([KeyCode::CONTROL, KeyCode::MENU, KeyCode::KEY_K]);
        thread::sleep(Duration::from_secs(1));
        backend.release_all();

        let fired = counter.load(Ordering::SeqCst);
        assert!((6..=11).contains(&fired), "fired {fired} times");

        finish(coordinator);
    }

    #[test]
    fn test_focus_pauses_and_resumes() {
        let (mut coordinator, backend) = setup(fast_config());
        let (builder, counter) = counter_hotkey(KeyCode::F5);
        coordinator.bind_hotkey(builder).unwrap();
        coordinator.set_active_window("Target").unwrap();

        backend.set_foreground("Target");
        coordinator.start().unwrap();
        assert_eq!(coordinator.state(), State::Running);

        backend.set_foreground("Other");
        assert!(wait_for(|| coordinator.state() == State::Paused));

        // Keys are ignored while paused
        backend.press(KeyCode::F5);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        backend.set_foreground("Target");
        assert!(wait_for(|| coordinator.state() == State::Running));
        assert!(wait_for(|| counter.load(Ordering::SeqCst) >= 1));

        finish(coordinator);
    }

    #[test]
    fn test_focus_events_are_published() {
        let (mut coordinator, backend) = setup(fast_config());
        let (builder, _) = counter_hotkey(KeyCode::F5);
        coordinator.bind_hotkey(builder).unwrap();
        coordinator.set_active_window("Target").unwrap();
        let mut rx = coordinator.subscribe();

        backend.set_foreground("Elsewhere");
        coordinator.start().unwrap();

        let paused = tokio_test::block_on(async {
            loop {
                match rx.recv().await {
                    Ok(CoordinatorEvent::Paused { cause }) => break cause,
                    Ok(_) => continue,
                    Err(e) => panic!("event channel failed: {e}"),
                }
            }
        });
        assert_eq!(paused, Cause::Focus);

        finish(coordinator);
    }

    #[test]
    fn test_manual_resume_is_undone_while_unfocused() {
        let (mut coordinator, backend) = setup(fast_config());
        let (builder, counter) = counter_hotkey(KeyCode::F5);
        coordinator.bind_hotkey(builder).unwrap();
        coordinator.set_active_window("Target").unwrap();
        backend.set_foreground("Other");
        coordinator.start().unwrap();
        assert!(wait_for(|| coordinator.state() == State::Paused));

        backend.press(KeyCode::F5);
        coordinator.resume().unwrap();
        assert!(wait_for(|| coordinator.state() == State::Paused));

        // Stays paused while another window has focus
        thread::sleep(Duration::from_millis(100));
        assert_eq!(coordinator.state(), State::Paused);
        assert!(counter.load(Ordering::SeqCst) <= 1);

        finish(coordinator);
    }

    #[test]
    fn test_manual_pause_is_undone_while_focused() {
        let (mut coordinator, backend) = setup(fast_config());
        let (builder, _) = counter_hotkey(KeyCode::F5);
        coordinator.bind_hotkey(builder).unwrap();
        coordinator.set_active_window("Target").unwrap();
        backend.set_foreground("Target");
        coordinator.start().unwrap();

        coordinator.pause().unwrap();
        assert!(wait_for(|| coordinator.state() == State::Running));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(coordinator.state(), State::Running);

        finish(coordinator);
    }

    #[test]
    fn test_pause_keys_toggle_on_press() {
        let (mut coordinator, backend) = setup(fast_config());
        let (builder, _) = counter_hotkey(KeyCode::F5);
        coordinator.bind_hotkey(builder).unwrap();
        coordinator
            .bind_pause_hotkey([KeyCode::CONTROL, KeyCode::PAUSE])
            .unwrap();
        coordinator.start().unwrap();

        backend.press_all([KeyCode::CONTROL, KeyCode::PAUSE]);
        assert!(wait_for(|| coordinator.state() == State::Paused));

        // Holding the combination does not keep toggling
        thread::sleep(Duration::from_millis(60));
        assert_eq!(coordinator.state(), State::Paused);

        backend.release(KeyCode::PAUSE);
        thread::sleep(Duration::from_millis(40));
        backend.press(KeyCode::PAUSE);
        assert!(wait_for(|| coordinator.state() == State::Running));

        finish(coordinator);
    }

    #[test]
    fn test_stop_is_terminal() {
        let (mut coordinator, _) = setup(fast_config());
        assert!(matches!(
            coordinator.resume(),
            Err(CoordinatorError::InvalidState(_))
        ));

        let (builder, _) = counter_hotkey(KeyCode::F1);
        coordinator.bind_hotkey(builder).unwrap();
        coordinator.start().unwrap();

        coordinator.stop();
        assert_eq!(coordinator.state(), State::Stopped);
        assert!(matches!(
            coordinator.resume(),
            Err(CoordinatorError::InvalidState(_))
        ));

        coordinator.join();
        assert!(coordinator.threads.is_empty());
        assert!(coordinator.hotkeys.iter().all(|h| !h.is_alive()));
        assert_eq!(coordinator.start(), Err(CoordinatorError::AlreadyStarted));
    }

    #[test]
    fn test_callback_can_stop_through_handle() {
        let (mut coordinator, backend) = setup(fast_config());
        let handle = coordinator.handle();
        coordinator
            .bind_hotkey(HotkeyBuilder::new().keys(KeyCode::ESCAPE).callback(move |_| {
                handle.stop();
                Ok(())
            }))
            .unwrap();
        coordinator.start().unwrap();

        backend.press(KeyCode::ESCAPE);
        assert!(wait_for(|| coordinator.state() == State::Stopped));
        coordinator.join();
    }

    #[test]
    fn test_callback_failure_is_published() {
        let (mut coordinator, backend) = setup(fast_config());
        coordinator
            .bind_hotkey(
                HotkeyBuilder::new()
                    .keys(KeyCode::F9)
                    .label("broken")
                    .callback(|_| Err(anyhow::anyhow!("no such file"))),
            )
            .unwrap();
        let mut rx = coordinator.subscribe();
        coordinator.start().unwrap();
        backend.press(KeyCode::F9);

        let failure = tokio_test::block_on(async {
            loop {
                match rx.recv().await {
                    Ok(CoordinatorEvent::CallbackFailed { label, message, .. }) => {
                        break (label, message)
                    }
                    Ok(_) => continue,
                    Err(e) => panic!("event channel failed: {e}"),
                }
            }
        });
        assert_eq!(failure, ("broken".to_string(), "no such file".to_string()));

        finish(coordinator);
    }

    #[test]
    fn test_drop_stops_coordinator() {
        let (mut coordinator, _) = setup(fast_config());
        let (builder, _) = counter_hotkey(KeyCode::F1);
        coordinator.bind_hotkey(builder).unwrap();
        coordinator.start().unwrap();

        let handle = coordinator.handle();
        drop(coordinator);
        assert!(handle.is_stopped());
    }
}
