//! Server registry (one per bus instance).
//!
//! The registry owns:
//! - the set of registered servers, including the main server (id 0)
//! - the registry lock guarding that set
//! - the exit flag observed by the transport loop
//! - the transport loop's join handle
//!
//! ## Lifecycle
//!
//! ```text
//! Registry::create ──► register(S) ──► send / send_sync ──► remove(S) ──► release
//!        │                                                                  │
//!        └── spawns transport loop                 sets exit flag, joins ───┘
//! ```
//!
//! Servers must be removed before `release`; any still registered at that point
//! lose their pending events (logged, counted as `discarded`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use tracing::{error, info, warn};

use mediabus_core::{BusError, BusResult, ServerId};

use crate::config::BusConfig;
use crate::event::Event;
use crate::lock;
use crate::server::{MAIN_SERVER_NAME, Server};
use crate::sink::{EventSink, Sender};
use crate::stats::{BusStats, StatsCounters};
use crate::transport;

/// Registered servers in insertion order.
///
/// Order carries no meaning beyond the linear lookup scan.
#[derive(Debug, Default)]
pub(crate) struct ServerTable {
    servers: Vec<Arc<Server>>,
}

impl ServerTable {
    pub(crate) fn find(&self, id: ServerId) -> Option<&Arc<Server>> {
        self.servers.iter().find(|s| s.id() == id)
    }

    fn position(&self, server: &Arc<Server>) -> Option<usize> {
        self.servers.iter().position(|s| Arc::ptr_eq(s, server))
    }
}

/// Proof that the registry lock is held.
pub(crate) type RegistryLock<'a> = MutexGuard<'a, ServerTable>;

/// State shared between the registry handle, senders and the transport loop.
#[derive(Debug)]
pub(crate) struct Shared {
    table: Mutex<ServerTable>,
    main: Arc<Server>,
    exit: AtomicBool,
    loop_exited: AtomicBool,
    pub(crate) stats: StatsCounters,
    pub(crate) config: BusConfig,
}

impl Shared {
    /// Fresh state with an allocated, not yet registered, main server.
    pub(crate) fn new(config: BusConfig) -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(ServerTable::default()),
            main: Server::allocate(ServerId::MAIN, MAIN_SERVER_NAME),
            exit: AtomicBool::new(false),
            loop_exited: AtomicBool::new(false),
            stats: StatsCounters::default(),
            config,
        })
    }

    pub(crate) fn lock_table(&self) -> RegistryLock<'_> {
        lock(&self.table)
    }

    pub(crate) fn main(&self) -> &Arc<Server> {
        &self.main
    }

    pub(crate) fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }

    /// Set the exit flag under the registry lock.
    pub(crate) fn request_exit(&self) {
        let _table = self.lock_table();
        self.exit.store(true, Ordering::Release);
    }

    /// Called by the transport loop as its last step.
    pub(crate) fn mark_loop_exited(&self) {
        self.loop_exited.store(true, Ordering::Release);
    }

    pub(crate) fn loop_exited(&self) -> bool {
        self.loop_exited.load(Ordering::Acquire)
    }
}

/// Handle to one bus instance.
///
/// Dropping a registry without calling [`Registry::release`] performs the same
/// shutdown.
#[derive(Debug)]
pub struct Registry {
    shared: Arc<Shared>,
    join: Option<thread::JoinHandle<()>>,
}

impl Registry {
    /// Create a registry with default configuration and start its transport loop.
    pub fn create() -> BusResult<Self> {
        Self::with_config(BusConfig::default())
    }

    /// Create a registry and start its transport loop.
    ///
    /// If the loop thread cannot be spawned, the main server and the shared
    /// state are unwound before the error is returned.
    pub fn with_config(config: BusConfig) -> BusResult<Self> {
        let shared = Shared::new(config);
        register_locked(&mut shared.lock_table(), shared.main())?;
        let join = start_transport(&shared)?;

        info!(
            thread = %shared.config.loop_thread_name,
            poll_interval = ?shared.config.poll_interval,
            "event registry created"
        );

        Ok(Self {
            shared,
            join: Some(join),
        })
    }

    /// Register a server so events addressed to its id are routed to it.
    ///
    /// O(n) in the number of registered servers.
    pub fn register(&self, server: &Arc<Server>) -> BusResult<()> {
        let mut table = self.shared.lock_table();
        register_locked(&mut table, server)?;
        info!(
            server = %server.name(),
            server_id = %server.id(),
            server_count = table.servers.len(),
            "server registered"
        );
        Ok(())
    }

    /// Unregister a server and destroy its pending events.
    ///
    /// Pending events are **not** delivered anywhere. Consumers needing a full
    /// drain must `get` everything before removing. The id may be reused by a
    /// new server afterwards.
    pub fn remove(&self, server: &Arc<Server>) -> BusResult<()> {
        if Arc::ptr_eq(server, &self.shared.main) {
            return Err(BusError::invalid("the main server is removed only by release"));
        }

        let mut table = self.shared.lock_table();
        let Some(index) = table.position(server) else {
            return Err(BusError::invalid(format!(
                "server {} ({}) is not registered here",
                server.name(),
                server.id()
            )));
        };
        remove_locked(&mut table, index, &self.shared.stats);
        Ok(())
    }

    /// Post an event to the main server for later routing by the transport loop.
    ///
    /// Delivery happens within roughly one poll interval. Must not be called
    /// after shutdown has begun.
    pub fn send(&self, event: Event) -> BusResult<()> {
        transport::send_async(&self.shared, event);
        Ok(())
    }

    /// Route an event on the calling thread.
    ///
    /// When this returns, the event is in its destination inbox, or it was
    /// dropped because no server matched.
    pub fn send_sync(&self, event: Event) -> BusResult<()> {
        transport::send_sync(&self.shared, event);
        Ok(())
    }

    /// Cloneable producer handle for other threads.
    pub fn sender(&self) -> Sender {
        Sender::new(self.shared.clone())
    }

    pub fn main_server(&self) -> &Arc<Server> {
        self.shared.main()
    }

    /// Registered servers, main included.
    pub fn server_count(&self) -> usize {
        self.shared.lock_table().servers.len()
    }

    pub fn contains(&self, id: ServerId) -> bool {
        self.shared.lock_table().find(id).is_some()
    }

    pub fn config(&self) -> &BusConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> BusStats {
        self.shared.stats.snapshot()
    }

    /// Stop the transport loop and tear down every remaining server.
    ///
    /// Blocks until the loop thread has exited (at most about one poll
    /// interval). Remove user servers first; any still registered lose their
    /// pending events.
    pub fn release(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(join) = self.join.take() else {
            return;
        };

        // The join happens outside the registry lock so a dispatch in flight
        // can finish.
        self.shared.request_exit();
        if join.join().is_err() {
            error!("transport loop panicked before shutdown");
        }

        let mut table = self.shared.lock_table();
        let leftover = table.servers.iter().filter(|s| !s.id().is_main()).count();
        if leftover > 0 {
            warn!(
                servers = leftover,
                "releasing registry with user servers still registered; their events are discarded"
            );
        }

        while !table.servers.is_empty() {
            let last = table.servers.len() - 1;
            remove_locked(&mut table, last, &self.shared.stats);
        }

        info!("event registry released");
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl EventSink for Registry {
    fn send(&self, event: Event) -> BusResult<()> {
        Registry::send(self, event)
    }

    fn send_sync(&self, event: Event) -> BusResult<()> {
        Registry::send_sync(self, event)
    }
}

/// Spawn the transport loop, unregistering the main server if that fails.
fn start_transport(shared: &Arc<Shared>) -> BusResult<thread::JoinHandle<()>> {
    transport::spawn(shared.clone()).inspect_err(|err| {
        error!(error = %err, kind = err.as_label(), "transport loop creation failed");
        let mut table = shared.lock_table();
        table.servers.retain(|s| !Arc::ptr_eq(s, shared.main()));
        shared.main().mark_unregistered();
    })
}

fn register_locked(table: &mut RegistryLock<'_>, server: &Arc<Server>) -> BusResult<()> {
    if table.find(server.id()).is_some() {
        error!(server = %server.name(), server_id = %server.id(), "server registered before");
        return Err(BusError::DuplicateRegistration(server.id()));
    }
    if !server.mark_registered() {
        return Err(BusError::invalid(format!(
            "server {} ({}) is registered in another registry",
            server.name(),
            server.id()
        )));
    }
    table.servers.push(server.clone());
    Ok(())
}

fn remove_locked(table: &mut RegistryLock<'_>, index: usize, stats: &StatsCounters) {
    let server = table.servers.remove(index);
    let discarded = server.drain(table);
    stats.record_discarded(discarded);

    if discarded > 0 {
        warn!(
            server = %server.name(),
            discarded,
            "removed server with pending events; events discarded"
        );
    }
    if !server.is_empty() {
        warn!(server = %server.name(), "inbox not empty after remove");
    }

    server.mark_unregistered();
    info!(server = %server.name(), server_id = %server.id(), "server removed");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use mediabus_core::EventType;

    #[test]
    fn create_registers_main_server() {
        let registry = Registry::create().unwrap();
        assert_eq!(registry.server_count(), 1);
        assert!(registry.contains(ServerId::MAIN));
        assert_eq!(registry.main_server().name(), MAIN_SERVER_NAME);
        assert!(registry.main_server().is_registered());
        registry.release();
    }

    #[test]
    fn duplicate_id_is_rejected_and_count_grows_by_one() {
        let registry = Registry::create().unwrap();
        let first = Server::allocate(ServerId::new(0x100), "first");
        let second = Server::allocate(ServerId::new(0x100), "second");

        registry.register(&first).unwrap();
        let err = registry.register(&second).unwrap_err();

        assert_eq!(err, BusError::DuplicateRegistration(ServerId::new(0x100)));
        assert_eq!(registry.server_count(), 2);
        assert!(!second.is_registered());

        registry.remove(&first).unwrap();
        registry.release();
    }

    #[test]
    fn user_server_cannot_claim_main_id() {
        let registry = Registry::create().unwrap();
        let impostor = Server::allocate(ServerId::MAIN, "impostor");

        assert_eq!(
            registry.register(&impostor).unwrap_err(),
            BusError::DuplicateRegistration(ServerId::MAIN)
        );
        registry.release();
    }

    #[test]
    fn server_belongs_to_one_registry() {
        let a = Registry::create().unwrap();
        let b = Registry::create().unwrap();
        let server = Server::allocate(ServerId::new(0x200), "shared");

        a.register(&server).unwrap();
        assert!(matches!(
            b.register(&server),
            Err(BusError::InvalidArgument(_))
        ));
        assert!(matches!(b.remove(&server), Err(BusError::InvalidArgument(_))));

        a.remove(&server).unwrap();
        b.register(&server).unwrap();
        b.remove(&server).unwrap();

        a.release();
        b.release();
    }

    #[test]
    fn main_server_cannot_be_removed_directly() {
        let registry = Registry::create().unwrap();
        let main = registry.main_server().clone();
        assert!(matches!(
            registry.remove(&main),
            Err(BusError::InvalidArgument(_))
        ));
        assert_eq!(registry.server_count(), 1);
        registry.release();
    }

    #[test]
    fn remove_discards_pending_events_and_frees_the_id() {
        let registry = Registry::create().unwrap();
        let server = Server::allocate(ServerId::new(0x300), "doomed");
        registry.register(&server).unwrap();

        for ty in 0..4u32 {
            registry.send_sync(Event::allocate(ServerId::new(0x300), EventType::new(ty))).unwrap();
        }
        assert_eq!(server.len(), 4);

        registry.remove(&server).unwrap();
        assert!(server.is_empty());
        assert!(!server.is_registered());
        assert!(!registry.contains(ServerId::new(0x300)));
        assert_eq!(registry.stats().discarded, 4);

        let replacement = Server::allocate(ServerId::new(0x300), "replacement");
        registry.register(&replacement).unwrap();
        assert!(replacement.get().is_none());
        registry.remove(&replacement).unwrap();
        registry.release();
    }

    #[test]
    fn release_tears_down_leftover_servers() {
        let registry = Registry::create().unwrap();
        let forgotten = Server::allocate(ServerId::new(0x400), "forgotten");
        registry.register(&forgotten).unwrap();
        registry.send_sync(Event::allocate(ServerId::new(0x400), EventType::new(1))).unwrap();

        registry.release();

        assert!(!forgotten.is_registered());
        assert!(forgotten.is_empty());
    }

    #[test]
    fn release_returns_after_the_loop_has_exited() {
        let registry =
            Registry::with_config(BusConfig::default().with_poll_interval(Duration::from_millis(50)))
                .unwrap();
        let shared = registry.shared.clone();
        assert!(!shared.loop_exited());

        registry.release();

        assert!(shared.loop_exited());
        // The loop thread's handle is gone along with the registry's.
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[test]
    fn failed_loop_start_unwinds_the_main_server() {
        let shared = Shared::new(BusConfig::default().with_loop_thread_name("transport\0loop"));
        register_locked(&mut shared.lock_table(), shared.main()).unwrap();
        assert!(shared.main().is_registered());

        let err = start_transport(&shared).unwrap_err();

        assert!(matches!(err, BusError::InvalidArgument(_)));
        assert!(!shared.main().is_registered());
        assert!(shared.lock_table().find(ServerId::MAIN).is_none());
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[test]
    fn invalid_thread_name_fails_creation_without_panicking() {
        let config = BusConfig::default().with_loop_thread_name("bad\0name");
        assert!(matches!(
            Registry::with_config(config),
            Err(BusError::InvalidArgument(_))
        ));

        // A later bus starts normally.
        Registry::create().unwrap().release();
    }

    #[test]
    fn drop_shuts_down_like_release() {
        let main = {
            let registry = Registry::create().unwrap();
            registry.main_server().clone()
        };
        assert!(!main.is_registered());
    }
}
