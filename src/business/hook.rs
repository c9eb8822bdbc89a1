//! Global Input Hook
//!
//! Wraps the platform keyboard listener. The hook thread only turns each key
//! press into a [`RawKeydown`] on an unbounded channel; everything else
//! happens on the application loop.

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::HookError;
use crate::platform::{KeySink, KeyboardHookProvider, PlatformFactory};

/// A key press as captured, before any enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeydown {
    pub keycode: u32,
}

/// Process-wide keyboard hook with idempotent start/stop.
pub struct GlobalKeyHook {
    provider: Box<dyn KeyboardHookProvider>,
    running: bool,
}

impl GlobalKeyHook {
    pub fn new(provider: Box<dyn KeyboardHookProvider>) -> Self {
        Self {
            provider,
            running: false,
        }
    }

    /// Hook backed by the native implementation for this OS.
    pub fn platform() -> Result<Self, HookError> {
        Ok(Self::new(PlatformFactory::create_keyboard_hook()?))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Install the listener, forwarding key presses into `tx`. No-op when
    /// already running.
    pub fn start(&mut self, tx: UnboundedSender<RawKeydown>) -> Result<(), HookError> {
        if self.running {
            tracing::debug!("Keyboard hook already running");
            return Ok(());
        }
        self.provider.install(channel_sink(tx))?;
        self.running = true;
        tracing::info!("Keyboard hook started");
        Ok(())
    }

    /// Uninstall the listener. No-op when not running.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.provider.uninstall();
        self.running = false;
        tracing::info!("Keyboard hook stopped");
    }
}

impl Drop for GlobalKeyHook {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sink that marshals keycodes onto the application loop. Sending on an
/// unbounded channel never blocks; a closed loop drops the key.
fn channel_sink(tx: UnboundedSender<RawKeydown>) -> KeySink {
    Arc::new(move |keycode| {
        let _ = tx.send(RawKeydown { keycode });
    })
}
