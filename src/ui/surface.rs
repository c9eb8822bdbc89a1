//! Presentation surfaces
//!
//! A surface is anything that renders for the user: the click-through
//! overlay canvas or the preferences window. The core only needs to know
//! whether one is alive and how to hand it a message.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::business::BrokerHandle;
use crate::data::settings::{MAX_SCATTER_INTENSITY, MIN_SCATTER_INTENSITY};
use crate::data::{ChromeOffset, PartialSettings, Settings};
use crate::error::SurfaceError;
use crate::platform::PointerPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Overlay,
    Preferences,
}

impl SurfaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceKind::Overlay => "overlay",
            SurfaceKind::Preferences => "preferences",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical key press, as delivered to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeydownEvent {
    pub keycode: u32,
    pub pointer: Option<PointerPosition>,
}

/// Messages pushed to a surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum SurfaceMessage {
    #[serde(rename = "keydown-event")]
    Keydown(KeydownEvent),
    #[serde(rename = "update-settings")]
    SettingsUpdated(Settings),
    Focus,
    #[serde(rename = "set-window-button-position")]
    SetWindowButtonPosition(ChromeOffset),
}

/// Requests a surface sends to the broker, on the same `channel`/`payload`
/// framing as [`SurfaceMessage`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum SurfaceRequest {
    /// Pull the durable settings value.
    GetSettings,
    /// Push a partial update.
    UpdateSettings(PartialSettings),
}

impl SurfaceRequest {
    /// Bring user input into the ranges the preferences controls offer.
    pub fn validated(self) -> Self {
        match self {
            SurfaceRequest::UpdateSettings(mut partial) => {
                partial.scatter_intensity = partial
                    .scatter_intensity
                    .map(|v| v.clamp(MIN_SCATTER_INTENSITY, MAX_SCATTER_INTENSITY));
                SurfaceRequest::UpdateSettings(partial)
            }
            other => other,
        }
    }
}

/// A live or destroyed presentation target.
pub trait Surface: Send {
    fn kind(&self) -> SurfaceKind;
    /// Checked immediately before every push; a surface can be torn down at
    /// any time.
    fn is_alive(&self) -> bool;
    /// Deliver a message. Must not block and must not fail loudly.
    fn push(&self, message: SurfaceMessage);

    fn focus(&self) {
        self.push(SurfaceMessage::Focus);
    }

    /// Move the window-chrome buttons (preferences only).
    fn set_window_button_position(&self, offset: ChromeOffset) {
        self.push(SurfaceMessage::SetWindowButtonPosition(offset));
    }
}

/// Builds surfaces on demand. `broker` is the client a surface uses to pull
/// and push settings.
pub trait SurfaceFactory: Send {
    fn create(
        &self,
        kind: SurfaceKind,
        settings: &Settings,
        broker: &BrokerHandle,
    ) -> Result<Box<dyn Surface>, SurfaceError>;
}

/// Surface backed by a channel. The presentation host owns the receiver;
/// dropping it, or calling [`ChannelSurface::destroy`], kills the surface.
#[derive(Clone)]
pub struct ChannelSurface {
    kind: SurfaceKind,
    tx: UnboundedSender<SurfaceMessage>,
    destroyed: Arc<AtomicBool>,
}

impl ChannelSurface {
    pub fn new(kind: SurfaceKind) -> (Self, UnboundedReceiver<SurfaceMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let surface = Self {
            kind,
            tx,
            destroyed: Arc::new(AtomicBool::new(false)),
        };
        (surface, rx)
    }

    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

impl Surface for ChannelSurface {
    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn is_alive(&self) -> bool {
        !self.destroyed.load(Ordering::SeqCst) && !self.tx.is_closed()
    }

    fn push(&self, message: SurfaceMessage) {
        if !self.is_alive() {
            return;
        }
        let _ = self.tx.send(message);
    }
}

/// Everything a presentation host needs to drive one new surface.
pub struct SurfaceLink {
    pub kind: SurfaceKind,
    /// Settings at creation time.
    pub settings: Settings,
    /// Messages pushed to the surface.
    pub messages: UnboundedReceiver<SurfaceMessage>,
    /// Where the surface sends its [`SurfaceRequest`]s.
    pub broker: BrokerHandle,
}

/// Called with the link of every new surface.
pub type AttachFn = Box<dyn Fn(SurfaceLink) + Send + Sync + 'static>;

/// Factory producing [`ChannelSurface`]s and handing each receiver to the
/// presentation host.
pub struct ChannelSurfaceFactory {
    attach: AttachFn,
    created: Mutex<Vec<ChannelSurface>>,
}

impl ChannelSurfaceFactory {
    pub fn new(attach: AttachFn) -> Self {
        Self {
            attach,
            created: Mutex::new(Vec::new()),
        }
    }

    /// Handles to every surface built so far, for hosts that tear windows
    /// down from outside.
    pub fn created(&self) -> Vec<ChannelSurface> {
        self.created
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl SurfaceFactory for ChannelSurfaceFactory {
    fn create(
        &self,
        kind: SurfaceKind,
        settings: &Settings,
        broker: &BrokerHandle,
    ) -> Result<Box<dyn Surface>, SurfaceError> {
        let (surface, messages) = ChannelSurface::new(kind);
        (self.attach)(SurfaceLink {
            kind,
            settings: settings.clone(),
            messages,
            broker: broker.clone(),
        });
        if let Ok(mut created) = self.created.lock() {
            created.push(surface.clone());
        }
        Ok(Box::new(surface))
    }
}
