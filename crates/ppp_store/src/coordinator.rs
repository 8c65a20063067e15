//! Single-flight population of the PPP cache.
//!
//! State machine: `Empty -> Fetching -> Populated`, with `Fetching -> Empty`
//! on failure so the next caller retries. Every caller that arrives while a
//! fetch is in flight awaits the same shared handle and sees the same outcome.
//! The pipeline runs on its own task, so a caller that stops waiting does not
//! stop the fetch for anyone else.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use common::config::ParserConfig;
use common::Error;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use worldbank_client::{parse_workbook_bytes, SourceFetcher};

use crate::cache::{CacheStatus, SharedSnapshot, Snapshot};
use crate::clock::Clock;
use crate::currency::CurrencyLookup;

/// Outcome shared between every waiter of one population attempt.
pub type PopulateResult = Result<SharedSnapshot, Arc<Error>>;

type InFlight = Shared<BoxFuture<'static, PopulateResult>>;

enum CacheState {
    Empty,
    Fetching { generation: u64, handle: InFlight },
    Populated(SharedSnapshot),
}

struct StateCell {
    cache: CacheState,
    last_error: Option<String>,
}

struct Inner {
    state: Mutex<StateCell>,
    next_generation: AtomicU64,
    attempts: AtomicU64,
    fetcher: Arc<dyn SourceFetcher>,
    currencies: Arc<dyn CurrencyLookup>,
    clock: Arc<dyn Clock>,
    parser: ParserConfig,
}

/// Owns the cache and guarantees at most one population in flight.
#[derive(Clone)]
pub struct FetchCoordinator {
    inner: Arc<Inner>,
}

impl FetchCoordinator {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        currencies: Arc<dyn CurrencyLookup>,
        clock: Arc<dyn Clock>,
        parser: ParserConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(StateCell {
                    cache: CacheState::Empty,
                    last_error: None,
                }),
                next_generation: AtomicU64::new(1),
                attempts: AtomicU64::new(0),
                fetcher,
                currencies,
                clock,
                parser,
            }),
        }
    }

    /// Populate the cache if needed and return the committed generation.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn ensure_populated(&self) -> PopulateResult {
        let handle = {
            let mut state = self.inner.state.lock().await;
            match &state.cache {
                CacheState::Populated(snapshot) => return Ok(Arc::clone(snapshot)),
                CacheState::Fetching { generation, handle } => {
                    debug!("Joining in-flight population (generation {})", generation);
                    handle.clone()
                }
                CacheState::Empty => {
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
                    let handle = Inner::start(Arc::clone(&self.inner), generation);
                    state.cache = CacheState::Fetching {
                        generation,
                        handle: handle.clone(),
                    };
                    handle
                }
            }
        };

        handle.await
    }

    /// Current generation without triggering a fetch.
    pub async fn snapshot(&self) -> Option<SharedSnapshot> {
        match &self.inner.state.lock().await.cache {
            CacheState::Populated(snapshot) => Some(Arc::clone(snapshot)),
            _ => None,
        }
    }

    pub async fn status(&self) -> CacheStatus {
        match self.inner.state.lock().await.cache {
            CacheState::Empty => CacheStatus::Empty,
            CacheState::Fetching { .. } => CacheStatus::Fetching,
            CacheState::Populated(_) => CacheStatus::Populated,
        }
    }

    /// Message of the most recent failed attempt; cleared by a successful one.
    pub async fn last_error(&self) -> Option<String> {
        self.inner.state.lock().await.last_error.clone()
    }

    /// Number of population attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.inner.attempts.load(Ordering::SeqCst)
    }
}

impl Inner {
    /// Spawn the pipeline and wrap its join handle in a shareable future.
    fn start(inner: Arc<Self>, generation: u64) -> InFlight {
        let task = tokio::spawn(Self::populate(Arc::clone(&inner), generation));

        async move {
            match task.await {
                Ok(result) => result,
                Err(join_err) => {
                    let err = Arc::new(Error::Other(format!(
                        "population task aborted: {join_err}"
                    )));
                    inner.commit(generation, Err(Arc::clone(&err))).await;
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }

    #[instrument(skip(inner), fields(source = %inner.fetcher.describe()))]
    async fn populate(inner: Arc<Self>, generation: u64) -> PopulateResult {
        inner.attempts.fetch_add(1, Ordering::SeqCst);
        info!("Populating PPP cache (generation {})", generation);

        let result = inner.load().await.map(Arc::new).map_err(Arc::new);
        inner.commit(generation, result.clone()).await;
        result
    }

    async fn load(&self) -> Result<Snapshot, Error> {
        let bytes = self.fetcher.fetch().await?;

        let parser = self.parser.clone();
        let parsed = tokio::task::spawn_blocking(move || parse_workbook_bytes(bytes, &parser))
            .await
            .map_err(|e| Error::Other(format!("parse task failed: {e}")))??;

        if parsed.is_empty() {
            warn!("{}", Error::EmptyResult);
        }

        Ok(Snapshot::from_parsed(
            parsed,
            self.currencies.as_ref(),
            self.clock.now(),
        ))
    }

    /// Swap in the outcome, unless a newer generation already owns the state.
    async fn commit(&self, generation: u64, result: PopulateResult) {
        let mut state = self.state.lock().await;
        let current = matches!(
            state.cache,
            CacheState::Fetching { generation: g, .. } if g == generation
        );
        if !current {
            debug!("Discarding stale population result (generation {})", generation);
            return;
        }

        match result {
            Ok(snapshot) => {
                info!(
                    "PPP cache populated: {} countries, latest year {:?}",
                    snapshot.countries.len(),
                    snapshot.latest_year
                );
                state.cache = CacheState::Populated(snapshot);
                state.last_error = None;
            }
            Err(err) => {
                warn!("PPP cache population failed, cache reset: {}", err);
                state.cache = CacheState::Empty;
                state.last_error = Some(err.to_string());
            }
        }
    }
}
