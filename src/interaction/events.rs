//! Synthetic pointer events
//!
//! The engine never touches a host UI directly. It describes each activation
//! as an [`InjectedEvent`] and hands it to an [`EventSink`].

use serde::Serialize;
use std::fmt;

use super::hit_test::ElementRef;
use crate::device::DeviceId;

/// Kind of synthetic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Pointer over element
    Hover,
    /// Button down
    Press,
    /// Button up
    Release,
    /// Activation
    Click,
    /// Keyboard focus for text entry
    Focus,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hover => "hover",
            Self::Press => "press",
            Self::Release => "release",
            Self::Click => "click",
            Self::Focus => "focus",
        };
        f.write_str(name)
    }
}

/// One synthetic event aimed at a resolved element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjectedEvent {
    /// Originating device
    pub device: DeviceId,
    /// Event kind
    pub kind: EventKind,
    /// Target element
    pub target: ElementRef,
    /// X in the target document's coordinates
    pub x: f64,
    /// Y in the target document's coordinates
    pub y: f64,
}

/// Injection seam: delivers synthetic events to the host
#[cfg_attr(test, mockall::automock)]
pub trait EventSink {
    /// Deliver one event
    fn inject(&mut self, event: InjectedEvent);
}

/// Sink that keeps every event, for embedding hosts that drain in batches
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Vec<InjectedEvent>,
}

impl RecordingSink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far
    pub fn events(&self) -> &[InjectedEvent] {
        &self.events
    }

    /// Kinds received so far, in order
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.iter().map(|e| e.kind).collect()
    }

    /// Remove and return everything received
    pub fn drain(&mut self) -> Vec<InjectedEvent> {
        std::mem::take(&mut self.events)
    }
}

impl EventSink for RecordingSink {
    fn inject(&mut self, event: InjectedEvent) {
        self.events.push(event);
    }
}
