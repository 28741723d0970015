//! Process-wide query cache with single-flight fetches and
//! invalidate-and-refetch semantics.
//!
//! Consumers call [`QueryCache::read`] with a key and an async fetcher;
//! the cache serves fresh entries without touching the network, shares
//! one in-flight fetch per key between concurrent readers, and keeps
//! the last good value visible while a refresh is running or after a
//! refresh fails (stale-while-revalidate).
//!
//! Only this module writes entries. Mutations request invalidation by
//! resource name; the next read of an invalidated key refetches.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::ApiError;

use super::CacheKey;

/// Default staleness window in seconds when none is configured.
const DEFAULT_STALE_SECS: i64 = 60;

/// Lifecycle of a cache entry as seen by a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of a cache entry handed to a consumer.
///
/// `data` and `error` can both be present: a failed refresh keeps the
/// last good value visible alongside the failure.
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    pub status: QueryStatus,
    pub error: Option<Arc<ApiError>>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            fetched_at: None,
        }
    }

    /// State for a read that failed before any fetch could start,
    /// e.g. a missing session.
    pub fn from_error(error: ApiError) -> Self {
        Self {
            data: None,
            status: QueryStatus::Error,
            error: Some(Arc::new(error)),
            fetched_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
            fetched_at: self.fetched_at,
        }
    }
}

/// Per-read options.
#[derive(Clone, Default)]
pub struct ReadOptions {
    /// Refetch even if the entry is fresh. During an in-flight fetch
    /// this starts a newer fetch; the older response is discarded.
    pub force_refresh: bool,
    /// Staleness window override for this read.
    pub staleness: Option<Duration>,
    /// Consumer-scoped cancellation. Cancelling abandons the wait, not
    /// the shared fetch.
    pub cancel: Option<CancellationToken>,
}

impl ReadOptions {
    pub fn force() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }
}

type AnyValue = Arc<dyn Any + Send + Sync>;

struct StoredValue {
    data: AnyValue,
    fetched_at: DateTime<Utc>,
}

struct InFlight {
    seq: u64,
    done: watch::Receiver<bool>,
}

#[derive(Default)]
struct CacheEntry {
    value: Option<StoredValue>,
    error: Option<Arc<ApiError>>,
    /// Set by invalidation; cleared by the next successful fetch.
    stale: bool,
    /// Sequence of the newest fetch started for this key.
    latest_seq: u64,
    /// Sequence of the newest fetch result applied. A result with a
    /// lower sequence than this is superseded and discarded.
    applied_seq: u64,
    in_flight: Option<InFlight>,
}

impl CacheEntry {
    fn is_fresh(&self, staleness: Duration) -> bool {
        if self.stale || self.error.is_some() {
            return false;
        }
        match &self.value {
            Some(value) => Utc::now() - value.fetched_at < staleness,
            None => false,
        }
    }
}

struct CacheInner {
    staleness: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

/// Keyed cache of server-fetched collections.
/// Clone is cheap - the entry store is shared behind an Arc.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_staleness(Duration::seconds(DEFAULT_STALE_SECS))
    }

    /// Create a cache with a custom default staleness window.
    pub fn with_staleness(staleness: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                staleness,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.inner.entries.lock().expect("cache lock poisoned")
    }

    /// Read a cache entry, fetching if absent or stale.
    pub async fn read<T, F, Fut>(&self, key: &CacheKey, fetcher: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        self.read_with(key, fetcher, ReadOptions::default()).await
    }

    /// Read a cache entry with explicit options.
    ///
    /// The fetcher runs in a spawned task so the shared entry is
    /// populated even when every waiting consumer goes away; dropping
    /// or cancelling the returned future never cancels the fetch.
    pub async fn read_with<T, F, Fut>(
        &self,
        key: &CacheKey,
        fetcher: F,
        options: ReadOptions,
    ) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let staleness = options.staleness.unwrap_or(self.inner.staleness);

        // Decide under the lock; the lock is never held across an await.
        let mut spawn_fetch: Option<(u64, watch::Sender<bool>)> = None;
        let done_rx = {
            let mut entries = self.lock_entries();
            let entry = entries.entry(key.clone()).or_default();

            if !options.force_refresh && entry.is_fresh(staleness) {
                debug!(key = %key, "Cache hit");
                return snapshot(entry);
            }

            match (&entry.in_flight, options.force_refresh) {
                (Some(in_flight), false) => {
                    debug!(key = %key, "Joining in-flight fetch");
                    in_flight.done.clone()
                }
                _ => {
                    entry.latest_seq += 1;
                    let seq = entry.latest_seq;
                    let (done_tx, done) = watch::channel(false);
                    entry.in_flight = Some(InFlight {
                        seq,
                        done: done.clone(),
                    });
                    spawn_fetch = Some((seq, done_tx));
                    done
                }
            }
        };

        if let Some((seq, done_tx)) = spawn_fetch {
            debug!(key = %key, seq, "Starting fetch");
            let future = fetcher();
            let cache = self.clone();
            let task_key = key.clone();
            tokio::spawn(async move {
                let result = future.await;
                cache.apply_fetch_result::<T>(&task_key, seq, result);
                let _ = done_tx.send(true);
            });
        }

        match &options.cancel {
            Some(cancel) => {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(key = %key, "Read cancelled while fetch in flight");
                    }
                    _ = wait_done(done_rx) => {}
                }
            }
            None => wait_done(done_rx).await,
        }

        self.peek(key)
    }

    /// Snapshot the current state of a key without triggering a fetch.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &CacheKey) -> QueryState<T> {
        let entries = self.lock_entries();
        entries.get(key).map(snapshot).unwrap_or_else(QueryState::idle)
    }

    /// Mark every entry of a resource stale, across all filter variants.
    /// The next read of each marked key refetches. Unknown resources
    /// are a no-op.
    pub fn invalidate(&self, resource: &str) {
        let mut entries = self.lock_entries();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.matches_resource(resource) {
                entry.stale = true;
                count += 1;
            }
        }
        debug!(resource, count, "Invalidated cache entries");
    }

    /// Mark a single entry stale.
    pub fn invalidate_key(&self, key: &CacheKey) {
        let mut entries = self.lock_entries();
        if let Some(entry) = entries.get_mut(key) {
            entry.stale = true;
            debug!(key = %key, "Invalidated cache entry");
        }
    }

    fn apply_fetch_result<T: Send + Sync + 'static>(
        &self,
        key: &CacheKey,
        seq: u64,
        result: Result<T, ApiError>,
    ) {
        let mut entries = self.lock_entries();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };

        if seq > entry.applied_seq {
            entry.applied_seq = seq;
            match result {
                Ok(data) => {
                    debug!(key = %key, seq, "Fetch succeeded");
                    entry.value = Some(StoredValue {
                        data: Arc::new(data),
                        fetched_at: Utc::now(),
                    });
                    entry.error = None;
                    entry.stale = false;
                }
                Err(error) => {
                    // Keep the last good value visible alongside the failure
                    warn!(key = %key, seq, error = %error, "Fetch failed");
                    entry.error = Some(Arc::new(error));
                }
            }
        } else {
            debug!(
                key = %key,
                seq,
                applied_seq = entry.applied_seq,
                "Discarding superseded fetch result"
            );
        }

        if entry.in_flight.as_ref().map(|f| f.seq) == Some(seq) {
            entry.in_flight = None;
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, key: &CacheKey, age: Duration) {
        let mut entries = self.lock_entries();
        if let Some(entry) = entries.get_mut(key) {
            if let Some(value) = entry.value.as_mut() {
                value.fetched_at = Utc::now() - age;
            }
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot<T: Send + Sync + 'static>(entry: &CacheEntry) -> QueryState<T> {
    let data = entry
        .value
        .as_ref()
        .and_then(|v| v.data.clone().downcast::<T>().ok());
    let type_mismatch = entry.value.is_some() && data.is_none();

    let error = if type_mismatch {
        Some(Arc::new(ApiError::InvalidResponse(
            "cached value has a different type for this key".to_string(),
        )))
    } else {
        entry.error.clone()
    };

    let status = if type_mismatch {
        QueryStatus::Error
    } else if entry.in_flight.is_some() {
        QueryStatus::Loading
    } else if entry.error.is_some() {
        QueryStatus::Error
    } else if data.is_some() {
        QueryStatus::Success
    } else {
        QueryStatus::Idle
    };

    QueryState {
        data,
        status,
        error,
        fetched_at: entry.value.as_ref().map(|v| v.fetched_at),
    }
}

async fn wait_done(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        // A dropped sender means the fetch task is gone; stop waiting.
        if rx.changed().await.is_err() {
            return;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
