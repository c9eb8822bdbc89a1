//! Settings Store
//!
//! Durable settings on top of an opaque blob store. Reads are lenient (any
//! failure yields defaults); writes are strict and report their error.

use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::data::settings::{PartialSettings, Settings};
use crate::error::StoreError;

/// Durable single-record storage.
pub trait BlobStore: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    fn read(&self) -> io::Result<Option<String>>;
    fn write(&self, contents: &str) -> io::Result<()>;
    /// Human-readable location, used in logs and errors.
    fn location(&self) -> PathBuf;
}

/// File-backed blob. Writes go through a sibling temp file and a rename, so a
/// reader never sees a half-written record.
pub struct FileBlobStore {
    path: PathBuf,
}

impl FileBlobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/TypeSpark/settings.json`, falling back to the working
    /// directory when the platform has no config dir.
    pub fn default_path() -> PathBuf {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("TypeSpark")
            .join("settings.json")
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)
    }

    fn location(&self) -> PathBuf {
        self.path.clone()
    }
}

/// In-process blob, for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryBlobStore {
    contents: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail with a permission error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self) -> io::Result<Option<String>> {
        self.contents
            .lock()
            .map(|c| c.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory store poisoned"))
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "writes disabled",
            ));
        }
        let mut guard = self
            .contents
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory store poisoned"))?;
        *guard = Some(contents.to_string());
        Ok(())
    }

    fn location(&self) -> PathBuf {
        PathBuf::from("<memory>")
    }
}

impl<T: BlobStore + ?Sized> BlobStore for std::sync::Arc<T> {
    fn read(&self) -> io::Result<Option<String>> {
        (**self).read()
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        (**self).write(contents)
    }

    fn location(&self) -> PathBuf {
        (**self).location()
    }
}

/// Settings persistence with default-merge semantics.
pub struct SettingsStore {
    blob: Box<dyn BlobStore>,
}

impl SettingsStore {
    pub fn new(blob: impl BlobStore + 'static) -> Self {
        Self {
            blob: Box::new(blob),
        }
    }

    /// Read the persisted value layered over defaults. Never fails: a missing,
    /// unreadable or corrupt record yields the default schema.
    pub fn load(&self) -> Settings {
        let raw = match self.blob.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Settings::default(),
            Err(e) => {
                tracing::warn!(
                    "Failed to read settings from {}: {}",
                    self.blob.location().display(),
                    e
                );
                return Settings::default();
            }
        };

        match overlay_on_defaults(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(
                    "Ignoring corrupt settings at {}: {}",
                    self.blob.location().display(),
                    e
                );
                Settings::default()
            }
        }
    }

    /// Persist the full value.
    pub fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        let content = serde_json::to_string(settings)?;
        self.blob.write(&content).map_err(|source| StoreError::Write {
            path: self.blob.location(),
            source,
        })?;
        tracing::debug!("Settings saved to {}", self.blob.location().display());
        Ok(())
    }

    /// `load() ⊕ partial`, not persisted.
    pub fn merge(&self, partial: &PartialSettings) -> Settings {
        self.load().merged(partial)
    }

    pub fn location(&self) -> PathBuf {
        self.blob.location()
    }
}

/// Key-level defaulting: every schema key missing from the record, or holding
/// a value of the wrong type, keeps its default. Unknown keys are discarded.
/// Only a record that is not a JSON object is an error.
fn overlay_on_defaults(raw: &str) -> Result<Settings, serde_json::Error> {
    let persisted: Map<String, Value> = serde_json::from_str(raw)?;
    let known = match serde_json::to_value(Settings::default())? {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let mut accepted = Map::new();
    for (key, value) in persisted {
        if !known.contains_key(&key) {
            continue;
        }
        let single = Value::Object(Map::from_iter([(key.clone(), value.clone())]));
        match serde_json::from_value::<PartialSettings>(single) {
            Ok(_) => {
                accepted.insert(key, value);
            }
            Err(e) => tracing::warn!("Ignoring persisted `{}`, keeping its default: {}", key, e),
        }
    }

    let partial: PartialSettings = serde_json::from_value(Value::Object(accepted))?;
    Ok(Settings::default().merged(&partial))
}
