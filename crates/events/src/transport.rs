//! Transport loop and dispatch.
//!
//! ```text
//! send_sync ───────────────────────────────► dispatch ──► destination inbox
//!                                                │
//! send ──► main inbox ──► transport loop ────────┘  (unknown id: dropped)
//! ```
//!
//! ## Loop states
//! - `Running`: pop the main inbox; dispatch what was popped
//! - idle: nothing popped, sleep `poll_interval` (no lock held), back to `Running`
//! - `Terminated`: exit flag seen at the top of an iteration; thread returns
//!
//! There is no wake-on-enqueue signal: async latency is bounded by the poll
//! interval, not eliminated.

use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

use mediabus_core::{BusError, BusResult};

use crate::event::Event;
use crate::registry::Shared;

/// Start the transport loop thread for `shared`.
///
/// Thread names may not contain NUL bytes; such a name is rejected here
/// instead of reaching the OS.
pub(crate) fn spawn(shared: Arc<Shared>) -> BusResult<thread::JoinHandle<()>> {
    let name = shared.config.loop_thread_name.clone();
    if name.contains('\0') {
        return Err(BusError::invalid(format!(
            "transport loop thread name {name:?} contains a NUL byte"
        )));
    }
    thread::Builder::new()
        .name(name)
        .spawn(move || transport_loop(&shared))
        .map_err(|e| BusError::allocation(format!("transport loop thread: {e}")))
}

fn transport_loop(shared: &Shared) {
    info!("event transport loop started");

    loop {
        if shared.exit_requested() {
            break;
        }

        let Some(event) = shared.main().get() else {
            thread::sleep(shared.config.poll_interval);
            continue;
        };

        if event.destination().is_main() {
            // Re-queueing on main would spin forever.
            warn!(event_type = %event.event_type(), "dropping event addressed to the main server");
            shared.stats.record_dropped();
            continue;
        }

        dispatch(shared, event);
    }

    shared.mark_loop_exited();
    info!("event transport loop stopped");
}

/// Route `event` to its destination inbox, or destroy it.
///
/// Holds the registry lock for the lookup and the append (registry lock, then
/// server lock). The sender is never told about a drop.
pub(crate) fn dispatch(shared: &Shared, event: Event) {
    let table = shared.lock_table();

    match table.find(event.destination()) {
        Some(server) => {
            debug!(
                server = %server.name(),
                event_type = %event.event_type(),
                "dispatching event"
            );
            server.push_tail(&table, event);
            shared.stats.record_delivered();
        }
        None => {
            let err = BusError::ServerNotFound(event.destination());
            error!(
                error = %err,
                kind = err.as_label(),
                destination = %event.destination(),
                event_type = %event.event_type(),
                "dropping undeliverable event"
            );
            shared.stats.record_dropped();
            drop(event);
        }
    }
}

pub(crate) fn send_sync(shared: &Shared, event: Event) {
    shared.stats.record_sync_sent();
    dispatch(shared, event);
}

pub(crate) fn send_async(shared: &Shared, event: Event) {
    shared.stats.record_async_sent();
    debug!(
        destination = %event.destination(),
        event_type = %event.event_type(),
        "event sent"
    );
    shared.main().post(event);
}
