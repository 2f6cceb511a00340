//! Producer-side abstraction.
//!
//! ## Ownership
//!
//! Both operations take the [`Event`] by value. After a call returns, the event
//! belongs to the bus: it is either in a destination inbox, queued on the main
//! server, or already destroyed by the dispatcher.
//!
//! ## Errors
//!
//! A successful return reports only that the send itself happened. Delivery
//! outcome (including a drop for an unknown destination) is never reported
//! back to the sender.
//!
//! ## Shutdown
//!
//! Producers must stop sending once `Registry::release` has been called.
//! Events sent afterwards are never delivered.

use std::sync::Arc;

use mediabus_core::BusResult;

use crate::event::Event;
use crate::registry::Shared;
use crate::transport;

/// Something events can be sent to.
pub trait EventSink: Send + Sync {
    /// Queue `event` on the main server; the transport loop routes it later.
    fn send(&self, event: Event) -> BusResult<()>;

    /// Route `event` on the calling thread before returning.
    fn send_sync(&self, event: Event) -> BusResult<()>;
}

impl<S> EventSink for Arc<S>
where
    S: EventSink + ?Sized,
{
    fn send(&self, event: Event) -> BusResult<()> {
        (**self).send(event)
    }

    fn send_sync(&self, event: Event) -> BusResult<()> {
        (**self).send_sync(event)
    }
}

/// Cloneable producer handle obtained from `Registry::sender`.
#[derive(Debug, Clone)]
pub struct Sender {
    shared: Arc<Shared>,
}

impl Sender {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

impl EventSink for Sender {
    fn send(&self, event: Event) -> BusResult<()> {
        transport::send_async(&self.shared, event);
        Ok(())
    }

    fn send_sync(&self, event: Event) -> BusResult<()> {
        transport::send_sync(&self.shared, event);
        Ok(())
    }
}
