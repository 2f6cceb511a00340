use serde::Serialize;

use mediabus_core::{EventType, ServerId};

/// A single message on the bus.
///
/// Events are:
/// - **addressed** to exactly one server by id
/// - **opaque**: `arg` is a word-sized value the bus never interprets
/// - **owned once**: not `Clone`; sending moves the event into the bus, and
///   whichever inbox holds it owns it until a consumer pops it
///
/// Richer payloads are conveyed by having `arg` reference memory the
/// application manages itself.
#[derive(Debug, PartialEq, Eq)]
pub struct Event {
    destination: ServerId,
    event_type: EventType,
    arg: usize,
}

impl Event {
    /// Create an event for `destination` with an empty (`0`) payload slot.
    pub fn allocate(destination: ServerId, event_type: EventType) -> Self {
        Self {
            destination,
            event_type,
            arg: 0,
        }
    }

    pub fn with_arg(mut self, arg: usize) -> Self {
        self.arg = arg;
        self
    }

    pub fn set_arg(&mut self, arg: usize) {
        self.arg = arg;
    }

    pub fn destination(&self) -> ServerId {
        self.destination
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn arg(&self) -> usize {
        self.arg
    }

    /// Copyable snapshot of the event's fields.
    pub fn info(&self) -> EventInfo {
        EventInfo {
            destination: self.destination,
            event_type: self.event_type,
            arg: self.arg,
        }
    }
}

/// Read-only snapshot of an [`Event`], returned by peeking an inbox.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EventInfo {
    pub destination: ServerId,
    pub event_type: EventType,
    pub arg: usize,
}
