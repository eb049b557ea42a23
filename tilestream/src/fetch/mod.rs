//! Fetch coordinator
//!
//! Orchestrates network retrieval of tiles: deduplicates in-flight
//! requests, bounds total concurrency with a semaphore, retries transient
//! failures with linear backoff, and decodes response bodies into raster
//! buffers before handing them to the caller.

mod coordinator;
mod http;

pub use coordinator::{FetchCompletion, FetchConfig, FetchCoordinator};
pub use http::{BoxFuture, ReqwestTileClient, TileHttpClient};

#[cfg(test)]
pub use http::tests::MockTileClient;
