//! Bounded, paced, cancellable enrichment of fetched items.
//!
//! Workers pull `(index, item)` pairs from a shared queue, wait on the
//! provider's pacing gate, fetch the item's page, and overlay whatever
//! metadata it carries. The output always has the input's length and order:
//! an item whose page could not be used is returned as it came in.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use feedrelay_shared::{FeedRelayError, Item, ProviderConfig};
use feedrelay_sources::HttpTransport;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::metadata;

/// Only the first MiB of a page is parsed.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default worker count.
pub const DEFAULT_WORKERS: usize = 10;

// ---------------------------------------------------------------------------
// Pacing gate
// ---------------------------------------------------------------------------

/// Releases at most one caller per `delay`, shared by all workers of one
/// provider. A zero delay never blocks.
struct Pacer {
    interval: Option<Mutex<Interval>>,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        let interval = (!delay.is_zero()).then(|| {
            let mut interval = tokio::time::interval(delay);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Mutex::new(interval)
        });
        Self { interval }
    }

    /// Returns `false` if cancelled while waiting.
    async fn wait(&self, cancel: &CancellationToken) -> bool {
        let Some(interval) = &self.interval else {
            return !cancel.is_cancelled();
        };
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = async { interval.lock().await.tick().await } => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Overlays page metadata onto items with a bounded worker pool.
#[derive(Clone)]
pub struct Enricher {
    transport: Arc<dyn HttpTransport>,
    workers: usize,
}

impl Enricher {
    pub fn new(transport: Arc<dyn HttpTransport>, workers: usize) -> Self {
        Self {
            transport,
            workers: workers.max(1),
        }
    }

    /// Enrich `items`, returning a vector of the same length and order.
    ///
    /// After `cancel` fires no new page fetch starts and in-flight fetches
    /// are abandoned; pages already read are still applied. All workers are
    /// joined before this returns.
    #[instrument(skip_all, fields(provider = %provider.id, items = items.len()))]
    pub async fn enrich(
        &self,
        items: Vec<Item>,
        provider: &ProviderConfig,
        cancel: &CancellationToken,
    ) -> Vec<Item> {
        if items.is_empty() {
            return items;
        }

        let mut out = items.clone();
        let worker_count = items.len().min(self.workers);
        let queue = Arc::new(Mutex::new(
            items.into_iter().enumerate().collect::<VecDeque<_>>(),
        ));
        let pacer = Arc::new(Pacer::new(provider.request_delay()));
        let headers = Arc::new(provider.headers.clone());

        let mut set = JoinSet::new();
        for _ in 0..worker_count {
            let worker = Worker {
                transport: Arc::clone(&self.transport),
                queue: Arc::clone(&queue),
                pacer: Arc::clone(&pacer),
                headers: Arc::clone(&headers),
                cancel: cancel.clone(),
            };
            set.spawn(worker.run());
        }

        let mut enriched = 0usize;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(results) => {
                    for (idx, item) in results {
                        out[idx] = item;
                        enriched += 1;
                    }
                }
                Err(e) => warn!(error = %e, "enrichment worker panicked"),
            }
        }

        info!(
            enriched,
            total = out.len(),
            workers = worker_count,
            cancelled = cancel.is_cancelled(),
            "enrichment finished"
        );
        out
    }
}

struct Worker {
    transport: Arc<dyn HttpTransport>,
    queue: Arc<Mutex<VecDeque<(usize, Item)>>>,
    pacer: Arc<Pacer>,
    headers: Arc<BTreeMap<String, String>>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) -> Vec<(usize, Item)> {
        let mut done = Vec::new();
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let Some((idx, mut item)) = self.queue.lock().await.pop_front() else {
                break;
            };
            if !self.pacer.wait(&self.cancel).await {
                break;
            }

            let response = match self.transport.get(&item.url, &self.headers, &self.cancel).await {
                Ok(response) => response,
                Err(FeedRelayError::Cancelled) => break,
                Err(e) => {
                    debug!(url = %item.url, error = %e, "page fetch failed, keeping original");
                    continue;
                }
            };

            if !response.is_success() {
                debug!(url = %item.url, status = response.status, "page not usable, keeping original");
                continue;
            }

            let body = &response.body[..response.body.len().min(MAX_BODY_BYTES)];
            let meta = metadata::extract(&String::from_utf8_lossy(body));
            if meta.is_empty() {
                debug!(url = %item.url, "no metadata found");
                continue;
            }

            metadata::overlay(&mut item, meta);
            done.push((idx, item));
        }
        done
    }
}
