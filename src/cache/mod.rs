//! Predictive prefetching cache core.
//!
//! This module contains the cache data structures and the concurrency
//! machinery around them:
//! - [`store`]: resident key → value mapping with insertion-order stamps
//! - [`inflight`]: single-flight table of pending loads
//! - [`history`]: bounded record of recent accesses
//! - [`prediction`]: likelihoods → ordered desired prefetch set
//! - [`scheduler`]: set reconciliation under the prefetch cap
//! - [`worker`]: the background coordinator task
//! - [`evictor`]: pluggable eviction policies
//! - [`stats`]: counter snapshots

pub mod evictor;
pub mod history;
pub mod inflight;
pub mod prediction;
pub mod scheduler;
pub mod stats;
pub mod store;
pub(crate) mod worker;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::events::{CacheEvent, EventSink};
use crate::predictors::AccessPredictor;
use crate::provider::DataProvider;
use crate::Key;

use evictor::{EvictionPolicy, OldestFirst};
use history::AccessHistory;
use inflight::{Begin, InFlightTable, LoadKind, LoadState, LoadTicket};
use stats::CacheStats;
use store::ResidentStore;
use worker::{Worker, WorkerMsg};

/// Mutex-guarded cache state. Held only for short, bounded sections and
/// never across an `.await` or a call into user code.
pub(crate) struct Inner<V> {
    pub(crate) store: ResidentStore<V>,
    pub(crate) table: InFlightTable<V>,
    pub(crate) history: AccessHistory,
    pub(crate) stats: CacheStats,
    pub(crate) policy: Box<dyn EvictionPolicy>,
    pub(crate) max_keys_cached: usize,
    pub(crate) closed: bool,
}

impl<V> Inner<V> {
    /// Commit a finished load if its ticket is still current. Eviction
    /// runs in the same critical section, so the resident cap holds at
    /// every observable point. Eviction events are appended to `events`.
    pub(crate) fn commit(
        &mut self,
        key: Key,
        ticket: LoadTicket,
        value: Arc<V>,
        weight: usize,
        events: &mut Vec<CacheEvent>,
    ) -> bool {
        if self.closed {
            return false;
        }
        if self.table.finish(key, ticket).is_none() {
            return false;
        }
        self.store.insert(key, value, weight);
        self.evict_over_cap(events);
        true
    }

    /// Shed entries until the resident cap is honoured again.
    fn evict_over_cap(&mut self, events: &mut Vec<CacheEvent>) {
        while self.store.len() > self.max_keys_cached {
            let excess = self.store.len() - self.max_keys_cached;
            let victims = self.policy.select_victims(&self.store.metas(), excess);
            let mut removed_any = false;
            for key in victims {
                if self.store.remove(key).is_some() {
                    self.stats.evictions += 1;
                    removed_any = true;
                    events.push(CacheEvent::Evict { key });
                }
            }
            if !removed_any {
                break;
            }
        }
        if self.store.len() > self.max_keys_cached {
            // The policy failed to shed enough entries. The cap cannot be
            // honoured, so fail closed rather than grow without bound.
            self.closed = true;
            let message = format!(
                "eviction policy {} left {} residents over a cap of {}",
                self.policy.name(),
                self.store.len(),
                self.max_keys_cached
            );
            error!("{message}");
            events.push(CacheEvent::WorkerError { error: message });
        }
    }
}

/// State shared between the cache handle, the worker, and load tasks.
pub(crate) struct Shared<P: DataProvider> {
    pub(crate) provider: Arc<P>,
    pub(crate) predictor: Arc<dyn AccessPredictor>,
    pub(crate) config: CacheConfig,
    pub(crate) inner: Mutex<Inner<P::Value>>,
    pub(crate) notify: mpsc::UnboundedSender<WorkerMsg<P::Value>>,
    pub(crate) on_event: Option<EventSink>,
}

impl<P: DataProvider> Shared<P> {
    pub(crate) fn inner(&self) -> MutexGuard<'_, Inner<P::Value>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Deliver an event with the lock released.
    pub(crate) fn emit(&self, event: &CacheEvent) {
        if let Some(sink) = &self.on_event {
            sink(event);
        }
    }

    pub(crate) fn emit_all(&self, events: &[CacheEvent]) {
        for event in events {
            self.emit(event);
        }
    }
}

/// Builder for [`DynamicPrefetchCache`], for when the default eviction
/// policy or the silent event stream is not what you want.
pub struct CacheBuilder<P: DataProvider> {
    provider: Arc<P>,
    predictor: Arc<dyn AccessPredictor>,
    config: CacheConfig,
    policy: Box<dyn EvictionPolicy>,
    on_event: Option<EventSink>,
}

impl<P: DataProvider> CacheBuilder<P> {
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn eviction_policy(mut self, policy: impl EvictionPolicy) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn on_event(mut self, sink: impl Fn(&CacheEvent) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Arc::new(sink));
        self
    }

    /// Construct the cache and start its background worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> DynamicPrefetchCache<P> {
        let mut config = self.config;
        if config.max_keys_cached == 0 {
            warn!("max_keys_cached must be at least 1; clamping");
            config.max_keys_cached = 1;
        }

        let policy_name = self.policy.name();
        let (notify, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                store: ResidentStore::new(),
                table: InFlightTable::new(),
                history: AccessHistory::new(config.history_size),
                stats: CacheStats::default(),
                policy: self.policy,
                max_keys_cached: config.max_keys_cached,
                closed: false,
            }),
            provider: self.provider,
            predictor: self.predictor,
            config,
            notify,
            on_event: self.on_event,
        });

        info!(
            max_keys_cached = shared.config.max_keys_cached,
            max_keys_prefetched = shared.config.max_keys_prefetched,
            history_size = shared.config.history_size,
            policy = policy_name,
            "cache started"
        );

        let worker = Worker::new(Arc::clone(&shared), rx);
        let handle = tokio::spawn(worker.run());

        DynamicPrefetchCache {
            shared,
            worker: Mutex::new(Some(handle)),
        }
    }
}

/// A keyed in-memory cache that speculatively pre-loads the entries a
/// pluggable predictor expects to be requested next.
///
/// `get` returns resident values immediately, joins a load already in
/// flight for the same key, or loads synchronously otherwise. A
/// background worker keeps up to `max_keys_prefetched` speculative loads
/// converged on the current prediction, and the resident set is bounded
/// by `max_keys_cached` under the configured eviction policy.
pub struct DynamicPrefetchCache<P: DataProvider> {
    shared: Arc<Shared<P>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<P: DataProvider> DynamicPrefetchCache<P> {
    /// Create a cache with the default eviction policy (oldest-first)
    /// and no event sink. Must be called from within a tokio runtime.
    pub fn new(
        provider: Arc<P>,
        predictor: Arc<dyn AccessPredictor>,
        config: CacheConfig,
    ) -> Self {
        Self::builder(provider, predictor).config(config).build()
    }

    pub fn builder(provider: Arc<P>, predictor: Arc<dyn AccessPredictor>) -> CacheBuilder<P> {
        CacheBuilder {
            provider,
            predictor,
            config: CacheConfig::default(),
            policy: Box::new(OldestFirst),
            on_event: None,
        }
    }

    /// Look up `key`, loading it if necessary.
    ///
    /// The access is recorded and the worker notified before any load
    /// starts, so the predictor sees it even across a long provider
    /// call. Concurrent calls for the same key share one load.
    pub async fn get(&self, key: Key) -> Result<Arc<P::Value>, CacheError> {
        enum Action<V> {
            Hit(Arc<V>),
            Join(watch::Receiver<LoadState<V>>),
            Load {
                ticket: LoadTicket,
                publisher: watch::Sender<LoadState<V>>,
            },
        }

        let action = {
            let mut inner = self.shared.inner();
            if inner.closed {
                return Err(CacheError::Closed);
            }
            inner.history.record(key);
            if let Some(value) = inner.store.lookup(key) {
                inner.stats.hits += 1;
                Action::Hit(value)
            } else {
                inner.stats.misses += 1;
                match inner.table.begin(key, LoadKind::Client) {
                    Begin::Joined { waiter } => Action::Join(waiter),
                    Begin::New { ticket, publisher } => Action::Load { ticket, publisher },
                }
            }
        };

        let _ = self.shared.notify.send(WorkerMsg::Access(key));

        match action {
            Action::Hit(value) => Ok(value),
            Action::Join(mut waiter) => {
                let state = waiter
                    .wait_for(|state| !matches!(state, LoadState::Pending))
                    .await
                    .map_err(|_| CacheError::Closed)?;
                match &*state {
                    LoadState::Ready(value) => Ok(Arc::clone(value)),
                    LoadState::Failed(error) => Err(CacheError::Load {
                        key,
                        cause: Arc::clone(error),
                    }),
                    LoadState::Pending => Err(CacheError::Closed),
                }
            }
            Action::Load { ticket, publisher } => {
                self.load_for_client(key, ticket, publisher).await
            }
        }
    }

    /// Run a client-driven load with the lock released, publish the
    /// result to any waiters, then commit.
    async fn load_for_client(
        &self,
        key: Key,
        ticket: LoadTicket,
        publisher: watch::Sender<LoadState<P::Value>>,
    ) -> Result<Arc<P::Value>, CacheError> {
        self.shared.emit(&CacheEvent::LoadStart { key });

        match self.shared.provider.load(key).await {
            Ok(value) => {
                let value = Arc::new(value);
                let weight = self.shared.provider.value_weight(value.as_ref());
                let _ = publisher.send(LoadState::Ready(Arc::clone(&value)));

                let mut evictions = Vec::new();
                let committed = {
                    let mut inner = self.shared.inner();
                    inner.commit(key, ticket, Arc::clone(&value), weight, &mut evictions)
                };
                if committed {
                    self.shared.emit(&CacheEvent::LoadComplete { key });
                    self.shared.emit_all(&evictions);
                }
                Ok(value)
            }
            Err(error) => {
                let error = Arc::new(error);
                let _ = publisher.send(LoadState::Failed(Arc::clone(&error)));
                {
                    let mut inner = self.shared.inner();
                    let _ = inner.table.finish(key, ticket);
                }
                self.shared.emit(&CacheEvent::LoadError {
                    key,
                    error: error.to_string(),
                });
                Err(CacheError::Load { key, cause: error })
            }
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.shared.inner();
        let mut stats = inner.stats;
        stats.active_prefetch_tasks = inner.table.prefetch_count();
        stats
    }

    /// Currently resident keys, oldest first. Diagnostic.
    pub fn resident_keys(&self) -> Vec<Key> {
        self.shared.inner().store.iter_by_age()
    }

    /// Tear the cache down: cancel outstanding speculative loads, stop
    /// the worker within the configured grace period, and release all
    /// resident entries. Idempotent and safe to call concurrently.
    pub async fn close(&self) {
        let handle = {
            self.worker
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .take()
        };
        let Some(mut handle) = handle else {
            return;
        };

        let _ = self.shared.notify.send(WorkerMsg::Shutdown);

        if tokio::time::timeout(self.shared.config.shutdown_grace(), &mut handle)
            .await
            .is_err()
        {
            warn!("cache worker did not stop within the grace period; aborting");
            handle.abort();
            let mut inner = self.shared.inner();
            inner.closed = true;
            let cancelled = inner.table.drain();
            inner.stats.prefetch_cancelled += cancelled as u64;
            inner.store.clear();
        }
    }
}

impl<P: DataProvider> Drop for DynamicPrefetchCache<P> {
    fn drop(&mut self) {
        let handle = {
            self.worker
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .take()
        };
        if handle.is_some() {
            // Best effort: the worker drains and exits on this message.
            let _ = self.shared.notify.send(WorkerMsg::Shutdown);
        }
    }
}
