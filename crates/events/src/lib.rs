//! In-process event bus.
//!
//! Producers post [`Event`]s addressed by [`ServerId`]; each registered
//! [`Server`] owns a FIFO inbox that its consumer drains at its own pace.
//!
//! - [`Registry::send_sync`] routes on the caller's thread.
//! - [`Registry::send`] queues on the main server (id 0); a background
//!   transport loop routes it within about one poll interval.
//! - Events for unknown ids are dropped (logged, counted), never bounced.
//!
//! ```no_run
//! use mediabus_events::{Event, EventType, Registry, Server, ServerId};
//!
//! const DECODER: ServerId = ServerId::new(0x100);
//! const FRAME_READY: EventType = EventType::new(1);
//!
//! let registry = Registry::create()?;
//! let decoder = Server::allocate(DECODER, "decoder");
//! registry.register(&decoder)?;
//!
//! registry.send_sync(Event::allocate(DECODER, FRAME_READY).with_arg(42))?;
//! if let Some(event) = decoder.get() {
//!     assert_eq!(event.arg(), 42);
//! }
//!
//! registry.remove(&decoder)?;
//! registry.release();
//! # Ok::<(), mediabus_events::BusError>(())
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod config;
pub mod event;
pub mod registry;
pub mod server;
pub mod sink;
pub mod stats;
mod transport;

pub use config::{BusConfig, ConfigError};
pub use event::{Event, EventInfo};
pub use registry::Registry;
pub use server::{MAIN_SERVER_NAME, MAX_SERVER_NAME_LEN, Server, UNKNOWN_SERVER_NAME};
pub use sink::{EventSink, Sender};
pub use stats::BusStats;

pub use mediabus_core::{BusError, BusResult, EventType, ServerId};

/// Lock a mutex, recovering from poisoning.
///
/// Queue and table mutations never leave partial state behind, so a panic on
/// another thread does not invalidate the data.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
