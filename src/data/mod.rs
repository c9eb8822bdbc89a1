//! Data module for configuration and settings persistence

mod cache;
mod config;
pub mod settings;
mod store;

pub use cache::SettingsCache;
pub use config::{AppConfig, GeneralConfig};
pub use settings::{ChromeOffset, ColorType, PartialSettings, Settings, ShapeType, SoundType};
pub use store::{BlobStore, FileBlobStore, MemoryBlobStore, SettingsStore};
