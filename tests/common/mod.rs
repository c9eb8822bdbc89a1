//! Shared fakes for integration tests: a keyboard hook driven by the test,
//! a fixed pointer, and a surface host that keeps every surface's inbox.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use typespark::platform::{KeySink, KeyboardHookProvider, PointerPosition, PointerSource};
use typespark::ui::{ChannelSurface, Surface, SurfaceFactory, SurfaceKind, SurfaceMessage};
use typespark::{BrokerHandle, HookError, Settings, SurfaceError};

pub const POINTER: PointerPosition = PointerPosition { x: 512, y: 384 };

/// Keyboard hook whose key presses come from [`FakeKeyboard::press`].
#[derive(Clone, Default)]
pub struct FakeKeyboard {
    sink: Arc<Mutex<Option<KeySink>>>,
    deny: bool,
}

impl FakeKeyboard {
    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::default()
        }
    }

    /// Simulate a physical key press. Returns false when no hook is installed.
    pub fn press(&self, keycode: u32) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => {
                sink(keycode);
                true
            }
            None => false,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }
}

impl KeyboardHookProvider for FakeKeyboard {
    fn install(&self, sink: KeySink) -> Result<(), HookError> {
        if self.deny {
            return Err(HookError::PermissionDenied(
                "input monitoring not granted".to_string(),
            ));
        }
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn uninstall(&self) {
        self.sink.lock().unwrap().take();
    }
}

pub struct FixedPointer;

impl PointerSource for FixedPointer {
    fn position(&self) -> Option<PointerPosition> {
        Some(POINTER)
    }
}

/// Presentation host: builds channel surfaces and keeps their inboxes so
/// tests can read what each surface received or tear one down.
#[derive(Clone, Default)]
pub struct TestHost {
    inner: Arc<Mutex<HostState>>,
}

#[derive(Default)]
struct HostState {
    created: Vec<SurfaceKind>,
    surfaces: HashMap<SurfaceKind, ChannelSurface>,
    inboxes: HashMap<SurfaceKind, UnboundedReceiver<SurfaceMessage>>,
}

impl TestHost {
    pub fn created(&self, kind: SurfaceKind) -> usize {
        let state = self.inner.lock().unwrap();
        state.created.iter().filter(|k| **k == kind).count()
    }

    /// Close the window from the user's side. The inbox is kept so tests can
    /// check that nothing arrives afterwards.
    pub fn destroy(&self, kind: SurfaceKind) {
        let state = self.inner.lock().unwrap();
        if let Some(surface) = state.surfaces.get(&kind) {
            surface.destroy();
        }
    }

    /// Everything received so far, without waiting.
    pub fn drain(&self, kind: SurfaceKind) -> Vec<SurfaceMessage> {
        let mut state = self.inner.lock().unwrap();
        let mut out = Vec::new();
        if let Some(rx) = state.inboxes.get_mut(&kind) {
            while let Ok(message) = rx.try_recv() {
                out.push(message);
            }
        }
        out
    }

    /// Wait for the next message on `kind`'s inbox.
    pub async fn next(&self, kind: SurfaceKind) -> Option<SurfaceMessage> {
        let mut rx = self.inner.lock().unwrap().inboxes.remove(&kind)?;
        let message = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .ok()
            .flatten();
        self.inner.lock().unwrap().inboxes.insert(kind, rx);
        message
    }
}

impl SurfaceFactory for TestHost {
    fn create(
        &self,
        kind: SurfaceKind,
        _settings: &Settings,
        _broker: &BrokerHandle,
    ) -> Result<Box<dyn Surface>, SurfaceError> {
        let (surface, rx) = ChannelSurface::new(kind);
        let mut state = self.inner.lock().unwrap();
        state.created.push(kind);
        state.surfaces.insert(kind, surface.clone());
        state.inboxes.insert(kind, rx);
        Ok(Box::new(surface))
    }
}
