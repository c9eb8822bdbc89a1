//! Presentation Surface Registry
//!
//! Holds at most one overlay and at most one preferences surface.

use crate::business::BrokerHandle;
use crate::data::Settings;
use crate::error::SurfaceError;
use crate::ui::surface::{Surface, SurfaceFactory, SurfaceKind, SurfaceMessage};

/// Outcome of a preferences request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub created: bool,
}

pub struct SurfaceRegistry {
    factory: Box<dyn SurfaceFactory>,
    overlay: Option<Box<dyn Surface>>,
    preferences: Option<Box<dyn Surface>>,
}

impl SurfaceRegistry {
    pub fn new(factory: Box<dyn SurfaceFactory>) -> Self {
        Self {
            factory,
            overlay: None,
            preferences: None,
        }
    }

    fn slot(&self, kind: SurfaceKind) -> Option<&dyn Surface> {
        match kind {
            SurfaceKind::Overlay => self.overlay.as_deref(),
            SurfaceKind::Preferences => self.preferences.as_deref(),
        }
    }

    /// Live handle for `kind`, if any.
    pub fn get(&self, kind: SurfaceKind) -> Option<&dyn Surface> {
        self.slot(kind).filter(|s| s.is_alive())
    }

    pub fn is_alive(&self, kind: SurfaceKind) -> bool {
        self.get(kind).is_some()
    }

    /// Create the overlay unless a live one exists.
    pub fn create_overlay(
        &mut self,
        settings: &Settings,
        broker: &BrokerHandle,
    ) -> Result<Registration, SurfaceError> {
        if self.is_alive(SurfaceKind::Overlay) {
            return Ok(Registration { created: false });
        }
        self.overlay = Some(self.factory.create(SurfaceKind::Overlay, settings, broker)?);
        tracing::info!("Overlay surface created");
        Ok(Registration { created: true })
    }

    /// Focus the live preferences surface, or build a new one.
    pub fn register_preferences(
        &mut self,
        settings: &Settings,
        broker: &BrokerHandle,
    ) -> Result<Registration, SurfaceError> {
        if let Some(existing) = self.get(SurfaceKind::Preferences) {
            existing.focus();
            tracing::debug!("Preferences already open, focused");
            return Ok(Registration { created: false });
        }
        self.preferences = Some(
            self.factory
                .create(SurfaceKind::Preferences, settings, broker)?,
        );
        tracing::info!("Preferences surface created");
        Ok(Registration { created: true })
    }

    /// Push to one surface. Returns whether it was alive to receive it.
    pub fn push(&self, kind: SurfaceKind, message: SurfaceMessage) -> bool {
        match self.get(kind) {
            Some(surface) => {
                surface.push(message);
                true
            }
            None => false,
        }
    }

    /// Push the same message to every live surface. Returns the receiver count.
    pub fn broadcast(&self, message: &SurfaceMessage) -> usize {
        [SurfaceKind::Overlay, SurfaceKind::Preferences]
            .into_iter()
            .filter(|kind| self.push(*kind, message.clone()))
            .count()
    }
}
