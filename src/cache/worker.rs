//! Background worker: the single coordinator for speculative loads.
//!
//! The worker blocks on a notification channel fed by client accesses,
//! load completions, and shutdown. On every notification it re-derives
//! the desired prefetch set from the predictor and reconciles the
//! in-flight set toward it, spawning and cancelling load tasks.
//!
//! The internal lock is taken only for short, bounded sections; the
//! predictor and provider are always invoked with it released.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::inflight::{Begin, LoadKind, LoadState, LoadTicket};
use crate::cache::{prediction, scheduler, Shared};
use crate::events::CacheEvent;
use crate::provider::DataProvider;
use crate::Key;

/// Notifications driving the worker.
pub(crate) enum WorkerMsg<V> {
    /// A client requested `key`; posted by `get` before any load starts.
    Access(Key),
    /// A speculative load finished (either way).
    LoadDone {
        key: Key,
        ticket: LoadTicket,
        result: Result<Arc<V>, Arc<anyhow::Error>>,
    },
    /// Teardown requested.
    Shutdown,
}

pub(crate) struct Worker<P: DataProvider> {
    shared: Arc<Shared<P>>,
    rx: tokio::sync::mpsc::UnboundedReceiver<WorkerMsg<P::Value>>,
    last_access: Option<Key>,
}

impl<P: DataProvider> Worker<P> {
    pub(crate) fn new(
        shared: Arc<Shared<P>>,
        rx: tokio::sync::mpsc::UnboundedReceiver<WorkerMsg<P::Value>>,
    ) -> Self {
        Self {
            shared,
            rx,
            last_access: None,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!("cache worker started");
        while let Some(msg) = self.rx.recv().await {
            match msg {
                WorkerMsg::Access(key) => self.last_access = Some(key),
                WorkerMsg::LoadDone {
                    key,
                    ticket,
                    result,
                } => self.finish_prefetch(key, ticket, result),
                WorkerMsg::Shutdown => break,
            }
            if self.shared.inner().closed {
                break;
            }
            self.reconcile();
        }
        self.shutdown();
        debug!("cache worker stopped");
    }

    /// Handle a completed speculative load: commit it unless it has been
    /// cancelled or superseded, then rebalance under the new resident set.
    fn finish_prefetch(
        &self,
        key: Key,
        ticket: LoadTicket,
        result: Result<Arc<P::Value>, Arc<anyhow::Error>>,
    ) {
        match result {
            Ok(value) => {
                let weight = self.shared.provider.value_weight(value.as_ref());
                let mut evictions = Vec::new();
                let committed = {
                    let mut inner = self.shared.inner();
                    let committed = inner.commit(key, ticket, value, weight, &mut evictions);
                    if committed {
                        inner.stats.prefetch_completed += 1;
                    }
                    committed
                };
                if committed {
                    debug!(key, "prefetch committed");
                    self.shared.emit(&CacheEvent::PrefetchSuccess { key });
                    self.shared.emit_all(&evictions);
                } else {
                    debug!(key, "discarded stale prefetch result");
                }
            }
            Err(error) => {
                let recorded = {
                    let mut inner = self.shared.inner();
                    if !inner.closed && inner.table.finish(key, ticket).is_some() {
                        inner.stats.prefetch_errors += 1;
                        true
                    } else {
                        false
                    }
                };
                if recorded {
                    warn!(key, %error, "prefetch load failed");
                    self.shared.emit(&CacheEvent::PrefetchError {
                        key,
                        error: error.to_string(),
                    });
                }
            }
        }
    }

    /// One reconciliation pass: prediction → desired set → issue/cancel.
    fn reconcile(&mut self) {
        let cap = self.shared.config.max_keys_prefetched;
        if cap == 0 {
            return;
        }
        let Some(current) = self.last_access else {
            return;
        };

        let (history, resident) = {
            let inner = self.shared.inner();
            if inner.closed {
                return;
            }
            (inner.history.snapshot(), inner.store.keys())
        };

        let likelihoods = match self.shared.predictor.likelihoods(current, &history) {
            Ok(scores) => scores,
            Err(error) => {
                warn!(%error, "predictor failed; skipping reconciliation pass");
                self.shared.emit(&CacheEvent::WorkerError {
                    error: error.to_string(),
                });
                return;
            }
        };

        let desired = prediction::rank_candidates(likelihoods, current, &resident, cap);

        let mut started = Vec::new();
        {
            let mut inner = self.shared.inner();
            if inner.closed {
                return;
            }
            let in_flight = inner.table.prefetch_keys();
            let plan = scheduler::reconcile(&in_flight, &desired, cap);

            for key in plan.cancel {
                if inner.table.cancel(key) {
                    inner.stats.prefetch_cancelled += 1;
                    debug!(key, "cancelled prefetch");
                }
            }

            for key in plan.issue {
                // The snapshot above may be slightly stale; re-check
                // residency and single-flight under the lock.
                if inner.store.contains(key) || inner.table.contains(key) {
                    continue;
                }
                if let Begin::New { ticket, publisher } =
                    inner.table.begin(key, LoadKind::Prefetch)
                {
                    inner.stats.prefetch_issued += 1;
                    started.push((key, ticket, publisher));
                }
            }
        }

        for (key, ticket, publisher) in started {
            debug!(key, "issued prefetch");
            self.shared.emit(&CacheEvent::PrefetchStart { key });
            spawn_load(&self.shared, key, ticket, publisher);
        }
    }

    /// Drain outstanding loads and release resident memory.
    fn shutdown(&self) {
        let (cancelled, released) = {
            let mut inner = self.shared.inner();
            inner.closed = true;
            let cancelled = inner.table.drain();
            inner.stats.prefetch_cancelled += cancelled as u64;
            let released = inner.store.len();
            inner.store.clear();
            (cancelled, released)
        };
        info!(cancelled, released, "cache worker shut down");
    }
}

/// Run one speculative load to completion. The result is published to
/// the completion cell first (so waiting clients are served even if the
/// load was cancelled meanwhile), then handed to the worker for commit.
fn spawn_load<P: DataProvider>(
    shared: &Arc<Shared<P>>,
    key: Key,
    ticket: LoadTicket,
    publisher: watch::Sender<LoadState<P::Value>>,
) {
    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        let result = match shared.provider.load(key).await {
            Ok(value) => Ok(Arc::new(value)),
            Err(error) => Err(Arc::new(error)),
        };
        let state = match &result {
            Ok(value) => LoadState::Ready(Arc::clone(value)),
            Err(error) => LoadState::Failed(Arc::clone(error)),
        };
        let _ = publisher.send(state);
        let _ = shared.notify.send(WorkerMsg::LoadDone {
            key,
            ticket,
            result,
        });
    });
}
