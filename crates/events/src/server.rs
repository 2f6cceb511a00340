//! Servers: named, uniquely-identified inboxes.
//!
//! ## Lock order
//!
//! Each server guards its inbox with its own lock. The registry lock is always
//! taken **before** a server lock, never after. This is enforced by the
//! signatures below:
//!
//! - [`Server::get`] / [`Server::peek`] take only the server lock.
//! - Routed appends ([`Server::push_tail`]) and destructive drains require a
//!   [`RegistryLock`] borrow, so they are only reachable while the registry
//!   lock is already held.
//! - The one unrouted append ([`Server::post`]) is restricted to the main
//!   server and takes no other lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use mediabus_core::ServerId;

use crate::event::{Event, EventInfo};
use crate::lock;
use crate::registry::RegistryLock;

/// Longest accepted server name, in bytes.
pub const MAX_SERVER_NAME_LEN: usize = 1023;

/// Name given to servers whose requested name is too long.
pub const UNKNOWN_SERVER_NAME: &str = "Unknown";

/// Reserved name of the main server.
pub const MAIN_SERVER_NAME: &str = "SERVER-MAIN";

/// A named actor with an ordered (FIFO) inbox of [`Event`]s.
///
/// Servers are shared as `Arc<Server>`: the registry keeps one reference for
/// routing, the consumer keeps another to drain the inbox at its own pace.
#[derive(Debug)]
pub struct Server {
    id: ServerId,
    name: String,
    inbox: Mutex<VecDeque<Event>>,
    registered: AtomicBool,
}

impl Server {
    /// Create an unregistered server with an empty inbox.
    ///
    /// Names longer than [`MAX_SERVER_NAME_LEN`] are replaced as a whole by
    /// [`UNKNOWN_SERVER_NAME`]; they are not truncated.
    pub fn allocate(id: ServerId, name: &str) -> Arc<Self> {
        let name = if name.len() > MAX_SERVER_NAME_LEN {
            UNKNOWN_SERVER_NAME.to_string()
        } else {
            name.to_string()
        };

        Arc::new(Self {
            id,
            name,
            inbox: Mutex::new(VecDeque::new()),
            registered: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> ServerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        lock(&self.inbox).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inbox).is_empty()
    }

    /// Whether this server is currently registered in a registry.
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Pop the oldest pending event. Ownership moves to the caller.
    pub fn get(&self) -> Option<Event> {
        let event = lock(&self.inbox).pop_front();
        if let Some(ev) = &event {
            debug!(server = %self.name, event_type = %ev.event_type(), "got event");
        }
        event
    }

    /// Look at the oldest pending event without removing it.
    ///
    /// Returns a copy; the inbox lock is released before this returns.
    pub fn peek(&self) -> Option<EventInfo> {
        let head = lock(&self.inbox).front().map(Event::info);
        if let Some(info) = &head {
            debug!(server = %self.name, event_type = %info.event_type, "peeked event");
        }
        head
    }

    /// Append a routed event. Caller holds the registry lock.
    pub(crate) fn push_tail(&self, _held: &RegistryLock<'_>, event: Event) {
        self.append(event);
    }

    /// Queue an event on the main server without routing it.
    pub(crate) fn post(&self, event: Event) {
        debug_assert!(self.id.is_main(), "only the main server accepts unrouted events");
        let pending = self.append(event);
        debug!(pending, "event queued on main server");
    }

    /// Destroy every pending event, returning how many were discarded.
    pub(crate) fn drain(&self, _held: &RegistryLock<'_>) -> usize {
        let mut inbox = lock(&self.inbox);
        let discarded = inbox.len();
        inbox.clear();
        discarded
    }

    /// Claim this server for a registry. Returns `false` if already claimed.
    pub(crate) fn mark_registered(&self) -> bool {
        self.registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn mark_unregistered(&self) {
        self.registered.store(false, Ordering::Release);
    }

    fn append(&self, event: Event) -> usize {
        let mut inbox = lock(&self.inbox);
        inbox.push_back(event);
        inbox.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediabus_core::EventType;

    #[test]
    fn allocate_keeps_names_up_to_the_limit() {
        let name = "a".repeat(MAX_SERVER_NAME_LEN);
        let server = Server::allocate(ServerId::new(1), &name);
        assert_eq!(server.name(), name);
        assert_eq!(server.id(), ServerId::new(1));
        assert!(server.is_empty());
        assert!(!server.is_registered());
    }

    #[test]
    fn overlong_name_is_replaced_not_truncated() {
        let name = "a".repeat(MAX_SERVER_NAME_LEN + 1);
        let server = Server::allocate(ServerId::new(1), &name);
        assert_eq!(server.name(), UNKNOWN_SERVER_NAME);
    }

    #[test]
    fn get_and_peek_on_empty_inbox() {
        let server = Server::allocate(ServerId::new(1), "empty");
        assert!(server.peek().is_none());
        assert!(server.get().is_none());
    }

    #[test]
    fn peek_returns_a_detached_copy() {
        let main = Server::allocate(ServerId::MAIN, MAIN_SERVER_NAME);
        main.post(Event::allocate(ServerId::new(0x100), EventType::new(4)).with_arg(17));

        let info = main.peek().unwrap();
        // The inbox lock is not held: the head can be popped while the copy lives.
        let event = main.get().unwrap();

        assert_eq!(info, event.info());
        assert_eq!(info.arg, 17);
        assert!(main.peek().is_none());
    }

    #[test]
    fn main_server_posts_in_fifo_order() {
        let main = Server::allocate(ServerId::MAIN, MAIN_SERVER_NAME);
        for ty in [1u32, 2, 3] {
            main.post(Event::allocate(ServerId::new(0x100), EventType::new(ty)));
        }
        assert_eq!(main.len(), 3);

        // peek does not consume
        assert_eq!(main.peek().map(|i| i.event_type.get()), Some(1));
        assert_eq!(main.len(), 3);

        let order: Vec<u32> = std::iter::from_fn(|| main.get())
            .map(|ev| ev.event_type().get())
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(main.is_empty());
    }

    #[test]
    fn registration_claim_is_exclusive() {
        let server = Server::allocate(ServerId::new(5), "claimed");
        assert!(server.mark_registered());
        assert!(!server.mark_registered());
        server.mark_unregistered();
        assert!(server.mark_registered());
    }
}
