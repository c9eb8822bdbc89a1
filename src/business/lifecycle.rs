//! Lifecycle Controller
//!
//! `NotStarted -> Ready -> Running -> Stopped`, once per process. A hook
//! install failure moves to `Failed`, which is terminal.

use std::fmt;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use crate::business::broker::{Broker, BrokerHandle};
use crate::business::hook::{GlobalKeyHook, RawKeydown};
use crate::data::SettingsStore;
use crate::error::LifecycleError;
use crate::platform::PointerSource;
use crate::ui::SurfaceRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Ready,
    Running,
    Stopped,
    Failed(String),
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::NotStarted => f.write_str("not started"),
            LifecycleState::Ready => f.write_str("ready"),
            LifecycleState::Running => f.write_str("running"),
            LifecycleState::Stopped => f.write_str("stopped"),
            LifecycleState::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

pub struct Lifecycle {
    state: LifecycleState,
    hook: GlobalKeyHook,
    key_tx: Option<UnboundedSender<RawKeydown>>,
    broker: Option<BrokerHandle>,
    broker_task: Option<JoinHandle<()>>,
}

impl Lifecycle {
    pub fn new(hook: GlobalKeyHook) -> Self {
        Self {
            state: LifecycleState::NotStarted,
            hook,
            key_tx: None,
            broker: None,
            broker_task: None,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn is_hook_running(&self) -> bool {
        self.hook.is_running()
    }

    fn invalid(&self, action: &'static str) -> LifecycleError {
        LifecycleError::InvalidTransition {
            action,
            state: self.state.to_string(),
        }
    }

    /// Load settings into the cache, create the overlay and start the broker
    /// task. Must be called inside a tokio runtime.
    pub fn ready(
        &mut self,
        store: SettingsStore,
        registry: SurfaceRegistry,
        pointer: Box<dyn PointerSource>,
    ) -> Result<BrokerHandle, LifecycleError> {
        if self.state != LifecycleState::NotStarted {
            return Err(self.invalid("enter ready"));
        }

        let mut broker = Broker::new(store, registry, pointer);
        if let Err(e) = broker.create_overlay() {
            self.state = LifecycleState::Failed(e.to_string());
            return Err(e.into());
        }

        let (key_tx, key_rx) = mpsc::unbounded_channel();
        let (handle, task) = broker.spawn(key_rx);
        self.key_tx = Some(key_tx);
        self.broker = Some(handle.clone());
        self.broker_task = Some(task);
        self.state = LifecycleState::Ready;
        tracing::info!("Lifecycle ready");
        Ok(handle)
    }

    /// Install the keyboard hook. A refusal is terminal.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Ready {
            return Err(self.invalid("start"));
        }
        let key_tx = match self.key_tx.clone() {
            Some(tx) => tx,
            None => return Err(self.invalid("start")),
        };

        match self.hook.start(key_tx) {
            Ok(()) => {
                self.state = LifecycleState::Running;
                tracing::info!("Lifecycle running");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Keyboard hook could not be installed: {}", e);
                self.state = LifecycleState::Failed(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Stop the hook, then the broker task. Runs once; later calls are no-ops.
    pub async fn quit(&mut self) {
        if self.state == LifecycleState::Stopped {
            return;
        }

        self.hook.stop();
        self.key_tx = None;

        if let Some(handle) = self.broker.take() {
            handle.shutdown();
        }
        if let Some(task) = self.broker_task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Broker task ended abnormally: {}", e);
            }
        }

        if !matches!(self.state, LifecycleState::Failed(_)) {
            self.state = LifecycleState::Stopped;
        }
        tracing::info!("Lifecycle stopped");
    }
}
