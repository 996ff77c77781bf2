//! Win32 backend: `GetAsyncKeyState` and the foreground window title

use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;
use windows::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW,
};

use super::{BackendError, InputBackend};
use crate::keys::KeyCode;

/// Most significant bit of `GetAsyncKeyState`: key is down right now
const KEY_DOWN_MASK: u16 = 0x8000;

/// Queries the Win32 API directly; holds no state
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsBackend;

impl WindowsBackend {
    pub fn new() -> Self {
        Self
    }
}

impl InputBackend for WindowsBackend {
    fn is_key_down(&self, key: KeyCode) -> bool {
        let state = unsafe { GetAsyncKeyState(i32::from(key.code())) };
        (state as u16) & KEY_DOWN_MASK != 0
    }

    fn foreground_window_title(&self) -> Result<String, BackendError> {
        unsafe {
            let hwnd = GetForegroundWindow();
            // No foreground window, e.g. while focus is switching
            if hwnd.0.is_null() {
                return Ok(String::new());
            }

            let len = GetWindowTextLengthW(hwnd);
            if len <= 0 {
                return Ok(String::new());
            }

            let mut buffer = vec![0u16; len as usize + 1];
            let copied = GetWindowTextW(hwnd, &mut buffer);
            if copied < 0 {
                return Err(BackendError::Os("GetWindowTextW failed".to_string()));
            }
            Ok(String::from_utf16_lossy(&buffer[..copied as usize]))
        }
    }
}
