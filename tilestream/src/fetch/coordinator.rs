//! Network fetch orchestration.
//!
//! The [`FetchCoordinator`] owns everything between "this tile is not
//! cached" and "here is its terminal state":
//!
//! - **Deduplication** — at most one network fetch per key is ever in
//!   flight; a second request for an in-flight key is rejected so the
//!   caller can wait on the first instead.
//! - **Concurrency bound** — a semaphore admits a fixed number of
//!   concurrent downloads process-wide; the rest queue.
//! - **Retry** — transient failures retry with a linear backoff of
//!   `retry_delay * attempt`; configuration failures never retry.
//! - **Decode** — a response body is decoded as an image inside the same
//!   attempt; a corrupt payload is as retryable as a dropped connection.
//!
//! Completions run on the Tokio runtime handle the coordinator was built
//! with and arrive in no particular order across keys. Within a key,
//! attempts are strictly sequential.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::cache::{CachedTile, FetchFailure, TileImage, TileKey};
use crate::coord::TileCoord;
use crate::fetch::http::TileHttpClient;
use crate::provider::{resolve_url, ProviderConfig};

/// Tuning knobs for the fetch coordinator.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum concurrent downloads across all keys.
    pub max_concurrent: usize,

    /// Total attempts per fetch, including the first.
    pub max_attempts: u32,

    /// Base delay for linear backoff; attempt N waits `retry_delay * N`
    /// before attempt N+1.
    pub retry_delay: Duration,

    /// Upper bound on a single HTTP attempt. A timed-out attempt counts
    /// against the attempt budget like any other failure.
    pub request_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Completion handler invoked with the fetch's terminal tile state.
pub type FetchCompletion = Box<dyn FnOnce(CachedTile) + Send + 'static>;

/// Orchestrates tile downloads with dedup, bounded concurrency and retry.
pub struct FetchCoordinator {
    http: Arc<dyn TileHttpClient>,
    config: FetchConfig,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<TileKey>>>,
    runtime: Handle,
    cancel: CancellationToken,
}

impl FetchCoordinator {
    /// Creates a coordinator that spawns its fetch tasks on `runtime`.
    pub fn new(http: Arc<dyn TileHttpClient>, config: FetchConfig, runtime: Handle) -> Self {
        let max_concurrent = config.max_concurrent.max(1);
        Self {
            http,
            config,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            runtime,
            cancel: CancellationToken::new(),
        }
    }

    /// Starts a fetch for `key` unless one is already in flight.
    ///
    /// Returns `false` if the key was already being fetched — the caller's
    /// `on_done` is dropped and the original fetch's completion stands
    /// (register a waiter with the service layer to observe it). Returns
    /// `true` if this call started the fetch.
    ///
    /// URL resolution happens here: a resolution error is a non-retryable
    /// configuration failure and completes immediately, on the caller's
    /// thread, without touching the network. Callers must therefore not
    /// hold locks that `on_done` acquires.
    pub fn spawn_fetch(
        &self,
        key: TileKey,
        coord: TileCoord,
        provider: ProviderConfig,
        on_done: FetchCompletion,
    ) -> bool {
        if !self.in_flight.lock().insert(key) {
            trace!(key = %key, "fetch already in flight, coalescing");
            return false;
        }

        let url = match resolve_url(&provider, &coord) {
            Ok(url) => url,
            Err(e) => {
                warn!(key = %key, error = %e, "tile URL resolution failed");
                self.in_flight.lock().remove(&key);
                on_done(CachedTile::failed(
                    coord,
                    FetchFailure::Configuration(e.to_string()),
                    0,
                ));
                return true;
            }
        };

        let http = Arc::clone(&self.http);
        let semaphore = Arc::clone(&self.semaphore);
        let in_flight = Arc::clone(&self.in_flight);
        let cancel = self.cancel.clone();
        let config = self.config.clone();

        self.runtime.spawn(async move {
            let _permit = tokio::select! {
                permit = semaphore.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        in_flight.lock().remove(&key);
                        return;
                    }
                },
                _ = cancel.cancelled() => {
                    in_flight.lock().remove(&key);
                    return;
                }
            };

            let result = run_attempts(http.as_ref(), &url, coord, &config, &cancel).await;

            // Clear the marker before completing so a caller reacting to
            // the completion can immediately start a fresh fetch.
            in_flight.lock().remove(&key);

            if let Some(tile) = result {
                on_done(tile);
            }
        });

        true
    }

    /// Whether a fetch for `key` is currently in flight.
    pub fn is_in_flight(&self, key: &TileKey) -> bool {
        self.in_flight.lock().contains(key)
    }

    /// Number of fetches currently in flight (including queued ones).
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Cancels all outstanding fetches. Tasks blocked on admission or
    /// between retries exit promptly; their completions are never invoked.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Runs the attempt loop for one fetch.
///
/// Returns `None` only when cancelled mid-retry.
async fn run_attempts(
    http: &dyn TileHttpClient,
    url: &str,
    coord: TileCoord,
    config: &FetchConfig,
    cancel: &CancellationToken,
) -> Option<CachedTile> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt: u32 = 1;

    loop {
        match attempt_fetch(http, url, config.request_timeout).await {
            Ok(image) => {
                debug!(url, attempt, "tile fetched");
                return Some(CachedTile::loaded(coord, image, attempt - 1));
            }
            Err(failure) if !failure.is_retryable() => {
                warn!(url, error = %failure, "tile fetch failed, not retryable");
                return Some(CachedTile::failed(coord, failure, attempt - 1));
            }
            Err(failure) => {
                if attempt >= max_attempts {
                    warn!(url, attempts = attempt, error = %failure, "tile fetch exhausted retries");
                    return Some(CachedTile::failed(coord, failure, max_attempts));
                }

                let delay = config.retry_delay * attempt;
                debug!(
                    url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %failure,
                    "tile fetch attempt failed, backing off"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return None,
                }
                attempt += 1;
            }
        }
    }
}

/// One fetch-then-decode attempt, bounded by the request timeout.
async fn attempt_fetch(
    http: &dyn TileHttpClient,
    url: &str,
    timeout: Duration,
) -> Result<Arc<TileImage>, FetchFailure> {
    let body = match tokio::time::timeout(timeout, http.get(url)).await {
        Ok(result) => result?,
        Err(_) => return Err(FetchFailure::Timeout(timeout)),
    };

    decode_image(&body)
}

/// Decodes a PNG/JPEG body into an RGBA raster.
fn decode_image(body: &Bytes) -> Result<Arc<TileImage>, FetchFailure> {
    let decoded = image::load_from_memory(body)
        .map_err(|e| FetchFailure::Decode(e.to_string()))?
        .into_rgba8();

    let (width, height) = decoded.dimensions();
    Ok(Arc::new(TileImage::new(
        width,
        height,
        Bytes::from(decoded.into_raw()),
    )))
}
