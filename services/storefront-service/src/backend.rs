// =============================================================================
// BACKEND SELECTOR
// =============================================================================
// Process-wide record of whether PostgreSQL is reachable, and the one place
// that turns that state into "which store serves this call".
//
// LIFECYCLE:
//   Unknown ──probe ok──▶ Connected ──probe fails──▶ Disconnected
//      │                      ▲                           │
//      └────probe fails───────┼───────────▶ Disconnected  │
//                             └────────probe ok───────────┘
//
// - Starts as `Unknown`; only the database monitor moves it.
// - Every record operation reads it fresh (no caching, no queueing).
// - Anything other than `Connected` routes to the file store.
// - Switching back and forth never copies data between the stores.
// =============================================================================

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;

use crate::metrics;
use crate::store::postgres::PgDatabase;
use crate::store::{Backend, Filter, Patch, Record, RecordStore, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unknown,
    Connected,
    Disconnected,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ConnectionState::Connected,
            2 => ConnectionState::Disconnected,
            _ => ConnectionState::Unknown,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Unknown => 0,
            ConnectionState::Connected => 1,
            ConnectionState::Disconnected => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Unknown => "unknown",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

/// Cheap to clone; all clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct BackendSelector {
    state: Arc<AtomicU8>,
}

impl BackendSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector pinned to a given state, for wiring tests against either
    /// backend.
    #[cfg(test)]
    pub fn with_state(state: ConnectionState) -> Self {
        let selector = Self::new();
        selector.transition(state);
        selector
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Backend that record operations are currently routed to.
    pub fn active_backend(&self) -> Backend {
        match self.state() {
            ConnectionState::Connected => Backend::Database,
            _ => Backend::File,
        }
    }

    /// Move to `next`, returning the previous state.
    pub(crate) fn transition(&self, next: ConnectionState) -> ConnectionState {
        let previous = ConnectionState::from_u8(self.state.swap(next.as_u8(), Ordering::AcqRel));
        if previous != next {
            metrics::set_backend_connected(next == ConnectionState::Connected);
        }
        previous
    }
}

// =============================================================================
// ROUTING STORE
// =============================================================================
/// A `RecordStore` that forwards each call to the file store or the
/// database store, chosen fresh per call from the selector.
///
/// A single call commits to one backend; it is never retried on the other.
pub struct StoreRouter<T: Record> {
    file: Arc<dyn RecordStore<T>>,
    database: Option<Arc<dyn RecordStore<T>>>,
    selector: BackendSelector,
}

impl<T: Record> StoreRouter<T> {
    pub fn new(
        file: Arc<dyn RecordStore<T>>,
        database: Option<Arc<dyn RecordStore<T>>>,
        selector: BackendSelector,
    ) -> Self {
        Self {
            file,
            database,
            selector,
        }
    }

    fn active(&self) -> &dyn RecordStore<T> {
        match (self.selector.state(), &self.database) {
            (ConnectionState::Connected, Some(database)) => database.as_ref(),
            _ => self.file.as_ref(),
        }
    }
}

fn observe<R>(
    backend: Backend,
    collection: &'static str,
    operation: &'static str,
    start: Instant,
    result: StoreResult<R>,
) -> StoreResult<R> {
    metrics::record_store_operation(backend, collection, operation, start.elapsed());
    if result.is_err() {
        metrics::record_store_error(backend, collection, operation);
    }
    result
}

#[async_trait]
impl<T: Record> RecordStore<T> for StoreRouter<T> {
    fn backend(&self) -> Backend {
        self.active().backend()
    }

    async fn list(&self, filter: &Filter) -> Vec<T> {
        let store = self.active();
        let start = Instant::now();
        let records = store.list(filter).await;
        metrics::record_store_operation(store.backend(), T::COLLECTION, "list", start.elapsed());
        records
    }

    async fn get(&self, id: &str) -> Option<T> {
        let store = self.active();
        let start = Instant::now();
        let record = store.get(id).await;
        metrics::record_store_operation(store.backend(), T::COLLECTION, "get", start.elapsed());
        record
    }

    async fn create(&self, record: T) -> StoreResult<T> {
        let store = self.active();
        let start = Instant::now();
        let result = store.create(record).await;
        observe(store.backend(), T::COLLECTION, "create", start, result)
    }

    async fn update(&self, id: &str, patch: Patch) -> StoreResult<Option<T>> {
        let store = self.active();
        let start = Instant::now();
        let result = store.update(id, patch).await;
        observe(store.backend(), T::COLLECTION, "update", start, result)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let store = self.active();
        let start = Instant::now();
        let result = store.delete(id).await;
        observe(store.backend(), T::COLLECTION, "delete", start, result)
    }

    async fn count(&self, filter: &Filter) -> usize {
        let store = self.active();
        let start = Instant::now();
        let count = store.count(filter).await;
        metrics::record_store_operation(store.backend(), T::COLLECTION, "count", start.elapsed());
        count
    }
}

// =============================================================================
// DATABASE MONITOR
// =============================================================================
/// Probe the database forever, driving the selector's lifecycle.
///
/// On the first healthy probe after any non-connected state the schema is
/// migrated (once per process) and `on_connect` runs before the selector
/// flips to `Connected`, so callers never see a half-initialized database.
pub async fn monitor_database<F, Fut>(
    database: PgDatabase,
    selector: BackendSelector,
    interval: Duration,
    mut on_connect: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut migrated = false;

    loop {
        ticker.tick().await;

        let healthy = database.health_check().await;
        let current = selector.state();

        if healthy && current != ConnectionState::Connected {
            if !migrated {
                if let Err(e) = database.run_migrations().await {
                    tracing::warn!(error = %e, "Database reachable but migrations failed");
                    mark_disconnected(&selector);
                    continue;
                }
                migrated = true;
            }

            on_connect().await;
            selector.transition(ConnectionState::Connected);
            tracing::info!("Database connected, routing records to PostgreSQL");
        } else if !healthy {
            mark_disconnected(&selector);
        }
    }
}

fn mark_disconnected(selector: &BackendSelector) {
    let previous = selector.transition(ConnectionState::Disconnected);
    if previous != ConnectionState::Disconnected {
        tracing::warn!(
            previous = previous.as_str(),
            "Database unreachable, falling back to file store"
        );
    }
}
