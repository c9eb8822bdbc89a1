//! Synchronization Broker
//!
//! Routes hook key presses to the overlay and settings traffic between the
//! store and every surface. A single task owns the broker, so every
//! operation below runs to completion before the next one starts.

use std::ops::ControlFlow;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::business::hook::RawKeydown;
use crate::data::{PartialSettings, Settings, SettingsCache, SettingsStore};
use crate::error::{BrokerError, StoreError, SurfaceError};
use crate::platform::PointerSource;
use crate::ui::{
    KeydownEvent, Registration, SurfaceKind, SurfaceMessage, SurfaceRegistry, SurfaceRequest,
};

/// Requests accepted by the broker task.
#[derive(Debug)]
pub enum BrokerRequest {
    /// `get-settings`: defaults-merged durable value.
    GetSettings { reply: oneshot::Sender<Settings> },
    /// `update-settings`: merge, cache, persist, broadcast.
    UpdateSettings {
        partial: PartialSettings,
        reply: Option<oneshot::Sender<Result<Settings, StoreError>>>,
    },
    OpenPreferences {
        reply: oneshot::Sender<Result<Registration, SurfaceError>>,
    },
    Shutdown,
}

pub struct Broker {
    store: SettingsStore,
    cache: SettingsCache,
    registry: SurfaceRegistry,
    pointer: Box<dyn PointerSource>,
    handle: BrokerHandle,
    requests: Option<UnboundedReceiver<BrokerRequest>>,
    delivered: u64,
    dropped: u64,
}

impl Broker {
    /// Load settings into the cache. No surface is created yet.
    pub fn new(
        store: SettingsStore,
        registry: SurfaceRegistry,
        pointer: Box<dyn PointerSource>,
    ) -> Self {
        let settings = store.load();
        tracing::info!("Settings loaded from {}", store.location().display());
        let cache = SettingsCache::new(settings);
        let (tx, requests) = mpsc::unbounded_channel();
        let handle = BrokerHandle {
            tx,
            settings: cache.subscribe(),
        };
        Self {
            store,
            cache,
            registry,
            pointer,
            handle,
            requests: Some(requests),
            delivered: 0,
            dropped: 0,
        }
    }

    /// Client for this broker. Requests queue until [`Broker::run`] starts.
    pub fn handle(&self) -> BrokerHandle {
        self.handle.clone()
    }

    /// Cached settings.
    pub fn settings(&self) -> Settings {
        self.cache.snapshot()
    }

    pub fn create_overlay(&mut self) -> Result<Registration, SurfaceError> {
        let settings = self.cache.snapshot();
        self.registry.create_overlay(&settings, &self.handle)
    }

    pub fn open_preferences(&mut self) -> Result<Registration, SurfaceError> {
        let settings = self.cache.snapshot();
        self.registry.register_preferences(&settings, &self.handle)
    }

    /// Enrich a key press and push it to the overlay. Returns the event if
    /// it was delivered; with no live overlay it is dropped, not queued.
    pub fn dispatch_keydown(&mut self, key: RawKeydown) -> Option<KeydownEvent> {
        if !self.registry.is_alive(SurfaceKind::Overlay) {
            self.dropped += 1;
            tracing::trace!("Overlay unavailable, dropped keycode {}", key.keycode);
            return None;
        }

        let pointer = if self.cache.read(|s| s.use_mouse_pos) {
            self.pointer.position()
        } else {
            None
        };
        let event = KeydownEvent {
            keycode: key.keycode,
            pointer,
        };

        if self
            .registry
            .push(SurfaceKind::Overlay, SurfaceMessage::Keydown(event))
        {
            self.delivered += 1;
            Some(event)
        } else {
            self.dropped += 1;
            None
        }
    }

    /// Settings pull. Reads storage, never fails.
    pub fn get_settings(&self) -> Settings {
        self.store.load()
    }

    /// Settings push: merge, replace the cache, persist, then broadcast the
    /// full value to every live surface.
    ///
    /// On a write failure the cache keeps the new value and the error is
    /// returned; nothing is broadcast, since storage does not hold it.
    pub fn update_settings(&mut self, partial: &PartialSettings) -> Result<Settings, StoreError> {
        let merged = self.store.merge(partial);
        self.cache.replace(merged.clone());

        if let Err(e) = self.store.save(&merged) {
            tracing::error!("Failed to persist settings: {}", e);
            return Err(e);
        }

        let receivers = self
            .registry
            .broadcast(&SurfaceMessage::SettingsUpdated(merged.clone()));
        tracing::debug!("Settings broadcast to {} surface(s)", receivers);

        if partial.traffic_light_position.is_some() {
            if let Some(preferences) = self.registry.get(SurfaceKind::Preferences) {
                preferences.set_window_button_position(merged.traffic_light_position);
            }
        }

        Ok(merged)
    }

    fn handle_request(&mut self, request: BrokerRequest) -> ControlFlow<()> {
        match request {
            BrokerRequest::GetSettings { reply } => {
                let _ = reply.send(self.get_settings());
            }
            BrokerRequest::UpdateSettings { partial, reply } => {
                let result = self.update_settings(&partial);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            BrokerRequest::OpenPreferences { reply } => {
                let result = self.open_preferences();
                if let Err(ref e) = result {
                    tracing::error!("Failed to open preferences: {}", e);
                }
                let _ = reply.send(result);
            }
            BrokerRequest::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Application loop: serve key presses and requests until shutdown.
    pub async fn run(mut self, mut keys: UnboundedReceiver<RawKeydown>) {
        tracing::info!("Broker running");
        let mut requests = match self.requests.take() {
            Some(requests) => requests,
            None => return,
        };
        loop {
            // Pending key presses are served before queued requests.
            tokio::select! {
                biased;
                Some(key) = keys.recv() => {
                    self.dispatch_keydown(key);
                }
                Some(request) = requests.recv() => {
                    if self.handle_request(request).is_break() {
                        break;
                    }
                }
                else => break,
            }
        }
        tracing::debug!(
            "Broker stopped ({} delivered, {} dropped)",
            self.delivered,
            self.dropped
        );
    }

    /// Move the broker onto its own task.
    pub fn spawn(self, keys: UnboundedReceiver<RawKeydown>) -> (BrokerHandle, JoinHandle<()>) {
        let handle = self.handle();
        let task = tokio::spawn(self.run(keys));
        (handle, task)
    }
}

/// Cloneable client for the broker task, handed to surface hosts and the
/// tray.
#[derive(Clone)]
pub struct BrokerHandle {
    tx: UnboundedSender<BrokerRequest>,
    settings: watch::Receiver<Settings>,
}

impl BrokerHandle {
    fn send(&self, request: BrokerRequest) -> Result<(), BrokerError> {
        self.tx.send(request).map_err(|_| BrokerError::Closed)
    }

    /// Cached settings, without a round trip to the broker.
    pub fn cached_settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    pub async fn get_settings(&self) -> Result<Settings, BrokerError> {
        let (reply, rx) = oneshot::channel();
        self.send(BrokerRequest::GetSettings { reply })?;
        rx.await.map_err(|_| BrokerError::Closed)
    }

    /// Fire-and-forget settings push.
    pub fn update_settings(&self, partial: PartialSettings) {
        if self
            .send(BrokerRequest::UpdateSettings {
                partial,
                reply: None,
            })
            .is_err()
        {
            tracing::warn!("Settings update dropped: broker stopped");
        }
    }

    /// Settings push that reports the persisted value or the write error.
    pub async fn update_settings_confirmed(
        &self,
        partial: PartialSettings,
    ) -> Result<Settings, BrokerError> {
        let (reply, rx) = oneshot::channel();
        self.send(BrokerRequest::UpdateSettings {
            partial,
            reply: Some(reply),
        })?;
        Ok(rx.await.map_err(|_| BrokerError::Closed)??)
    }

    pub async fn open_preferences(&self) -> Result<Registration, BrokerError> {
        let (reply, rx) = oneshot::channel();
        self.send(BrokerRequest::OpenPreferences { reply })?;
        Ok(rx.await.map_err(|_| BrokerError::Closed)??)
    }

    /// Serve one request decoded from a surface. `get-settings` yields the
    /// pulled value; `update-settings` is a push and yields nothing.
    pub async fn serve(&self, request: SurfaceRequest) -> Result<Option<Settings>, BrokerError> {
        match request.validated() {
            SurfaceRequest::GetSettings => self.get_settings().await.map(Some),
            SurfaceRequest::UpdateSettings(partial) => {
                self.update_settings(partial);
                Ok(None)
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.send(BrokerRequest::Shutdown);
    }
}
