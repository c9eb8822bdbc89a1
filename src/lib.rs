//! TypeSpark - keystroke visual feedback
//!
//! Captures system-wide key presses and drives a transparent overlay that
//! renders per-keystroke effects, while a preferences surface edits the
//! effect settings live.

pub mod business;
pub mod data;
pub mod error;
pub mod platform;
pub mod ui;

pub use business::{Broker, BrokerHandle, GlobalKeyHook, Lifecycle, LifecycleState, RawKeydown};
pub use data::{AppConfig, PartialSettings, Settings, SettingsStore};
pub use error::{BrokerError, HookError, LifecycleError, StoreError, SurfaceError};
