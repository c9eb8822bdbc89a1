use crate::error::HookError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Screen coordinates of the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: i32,
    pub y: i32,
}

/// Receives the keycode of every physical key press. Called on the hook's
/// own thread; implementations must only forward, never block.
pub type KeySink = Arc<dyn Fn(u32) + Send + Sync + 'static>;

/// Trait for platform-specific global keyboard listening
pub trait KeyboardHookProvider: Send + Sync {
    /// Install the system-wide listener. Returns once the OS has accepted or
    /// refused it.
    fn install(&self, sink: KeySink) -> Result<(), HookError>;
    /// Remove the listener. Safe to call when not installed.
    fn uninstall(&self);
}

/// Trait for sampling the current pointer location
pub trait PointerSource: Send + Sync {
    fn position(&self) -> Option<PointerPosition>;
}

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "macos")]
pub mod macos;

/// Pointer source for targets without a native implementation.
pub struct NoPointer;

impl PointerSource for NoPointer {
    fn position(&self) -> Option<PointerPosition> {
        None
    }
}

/// Factory for creating platform-specific implementations
pub struct PlatformFactory;

impl PlatformFactory {
    pub fn create_keyboard_hook() -> Result<Box<dyn KeyboardHookProvider>, HookError> {
        #[cfg(target_os = "windows")]
        return Ok(Box::new(windows::WindowsKeyboardHook::new()));
        #[cfg(target_os = "macos")]
        return Ok(Box::new(macos::MacosKeyboardHook::new()));
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        Err(HookError::Unsupported)
    }

    pub fn create_pointer_source() -> Box<dyn PointerSource> {
        #[cfg(target_os = "windows")]
        return Box::new(windows::WindowsPointer);
        #[cfg(target_os = "macos")]
        return Box::new(macos::MacosPointer);
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        Box::new(NoPointer)
    }

    /// Hide the Dock icon so the app lives only in the menu bar.
    pub fn hide_dock_icon() {
        #[cfg(target_os = "macos")]
        macos::hide_dock_icon();
    }
}
