//! In-memory settings cache.
//!
//! One writer (the broker) replaces the whole value; any number of readers
//! take snapshots without touching storage.

use tokio::sync::watch;

use crate::data::settings::Settings;

pub struct SettingsCache {
    tx: watch::Sender<Settings>,
}

impl SettingsCache {
    pub fn new(initial: Settings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Current value.
    pub fn snapshot(&self) -> Settings {
        self.tx.borrow().clone()
    }

    /// Inspect the current value without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&Settings) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Whole-value replace, visible to every reader at once.
    pub fn replace(&self, settings: Settings) {
        self.tx.send_replace(settings);
    }

    /// Read-only view for other components.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }
}
