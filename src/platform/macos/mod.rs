#![allow(unexpected_cfgs)]
use crate::error::HookError;
use crate::platform::{KeySink, KeyboardHookProvider, PointerPosition, PointerSource};
use std::sync::Mutex;

mod native {
    use block::ConcreteBlock;
    use cocoa::appkit::{NSApplication, NSApplicationActivationPolicy};
    use cocoa::base::{id, nil};
    use core_graphics::event::CGEvent;
    use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
    use objc::{class, msg_send, sel, sel_impl};

    use crate::platform::KeySink;

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrusted() -> bool;
    }

    pub fn is_accessibility_enabled() -> bool {
        unsafe { AXIsProcessTrusted() }
    }

    const KEY_DOWN_MASK: u64 = 1 << 10;

    /// Register an `NSEvent` global key-down monitor; returns its handle.
    pub fn add_key_down_monitor(sink: KeySink) -> Option<usize> {
        unsafe {
            let block = ConcreteBlock::new(move |event: id| {
                let key_code: u16 = msg_send![event, keyCode];
                sink(u32::from(key_code));
            });
            let block = block.copy();

            let monitor: id = msg_send![class!(NSEvent),
                addGlobalMonitorForEventsMatchingMask: KEY_DOWN_MASK
                handler: &*block];

            if monitor.is_null() {
                None
            } else {
                let _: id = msg_send![monitor, retain];
                Some(monitor as usize)
            }
        }
    }

    pub fn remove_monitor(handle: usize) {
        unsafe {
            let monitor = handle as id;
            let _: () = msg_send![class!(NSEvent), removeMonitor: monitor];
            let _: () = msg_send![monitor, release];
        }
    }

    pub fn pointer_location() -> Option<(f64, f64)> {
        let source = CGEventSource::new(CGEventSourceStateID::CombinedSessionState).ok()?;
        let event = CGEvent::new(source).ok()?;
        let point = event.location();
        Some((point.x, point.y))
    }

    pub fn hide_dock_icon() {
        unsafe {
            let app = NSApplication::sharedApplication(nil);
            app.setActivationPolicy_(
                NSApplicationActivationPolicy::NSApplicationActivationPolicyAccessory,
            );
        }
    }
}

/// Global key-down monitor. Requires the accessibility / input-monitoring
/// grant; without it the OS silently delivers nothing, so the grant is
/// checked up front.
pub struct MacosKeyboardHook {
    monitor_handle: Mutex<Option<usize>>,
}

impl MacosKeyboardHook {
    pub fn new() -> Self {
        Self {
            monitor_handle: Mutex::new(None),
        }
    }
}

impl KeyboardHookProvider for MacosKeyboardHook {
    fn install(&self, sink: KeySink) -> Result<(), HookError> {
        let mut handle = self
            .monitor_handle
            .lock()
            .map_err(|_| HookError::Install("monitor state poisoned".to_string()))?;
        if handle.is_some() {
            return Ok(());
        }

        if !native::is_accessibility_enabled() {
            return Err(HookError::PermissionDenied(
                "grant Accessibility access in System Settings > Privacy & Security".to_string(),
            ));
        }

        let monitor = native::add_key_down_monitor(sink)
            .ok_or_else(|| HookError::Install("NSEvent refused the global monitor".to_string()))?;
        *handle = Some(monitor);
        tracing::info!("Global key-down monitor installed");
        Ok(())
    }

    fn uninstall(&self) {
        if let Ok(mut handle) = self.monitor_handle.lock() {
            if let Some(monitor) = handle.take() {
                native::remove_monitor(monitor);
                tracing::info!("Global key-down monitor removed");
            }
        }
    }
}

impl Drop for MacosKeyboardHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

pub struct MacosPointer;

impl PointerSource for MacosPointer {
    fn position(&self) -> Option<PointerPosition> {
        let (x, y) = native::pointer_location()?;
        Some(PointerPosition {
            x: x.round() as i32,
            y: y.round() as i32,
        })
    }
}

pub fn hide_dock_icon() {
    native::hide_dock_icon();
}
