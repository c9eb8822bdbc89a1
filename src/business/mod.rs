//! Input capture, settings brokering and process lifecycle

mod broker;
mod hook;
mod lifecycle;

pub use broker::{Broker, BrokerHandle, BrokerRequest};
pub use hook::{GlobalKeyHook, RawKeydown};
pub use lifecycle::{Lifecycle, LifecycleState};
