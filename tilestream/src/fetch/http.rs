//! HTTP client abstraction for testability.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;

use crate::cache::FetchFailure;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for tile HTTP GET operations.
///
/// This abstraction allows dependency injection and easier testing by
/// enabling mock clients; the coordinator only ever sees this interface.
pub trait TileHttpClient: Send + Sync {
    /// Performs an HTTP GET and returns the response body.
    ///
    /// A non-2xx status is an error, mapped to [`FetchFailure::Status`].
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, FetchFailure>>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestTileClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTileClient {
    /// Creates a client with the given per-request timeout and User-Agent.
    ///
    /// Tile servers commonly reject anonymous traffic, so the User-Agent
    /// identifies the application on every request.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.to_string())
            .build()?;

        Ok(Self { client, timeout })
    }

    /// The configured per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl TileHttpClient for ReqwestTileClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, FetchFailure>> {
        Box::pin(async move {
            let response = self.client.get(url).send().await.map_err(|e| {
                if e.is_timeout() {
                    FetchFailure::Timeout(self.timeout)
                } else {
                    FetchFailure::Transport(e.to_string())
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchFailure::Status(status.as_u16()));
            }

            response.bytes().await.map_err(|e| {
                if e.is_timeout() {
                    FetchFailure::Timeout(self.timeout)
                } else {
                    FetchFailure::Transport(format!("failed to read response body: {e}"))
                }
            })
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Scripted HTTP client for tests.
    ///
    /// Replays a fixed response for every request, optionally after a
    /// delay, and records the URLs it was asked for.
    pub struct MockTileClient {
        response: Result<Bytes, FetchFailure>,
        delay: Option<Duration>,
        requests: Mutex<Vec<String>>,
    }

    impl MockTileClient {
        pub fn new(response: Result<Bytes, FetchFailure>) -> Self {
            Self {
                response,
                delay: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Delays every response, simulating a slow network.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Number of GET requests observed.
        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }

        /// URLs requested, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().clone()
        }
    }

    impl TileHttpClient for MockTileClient {
        fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, FetchFailure>> {
            self.requests.lock().push(url.to_string());
            let response = self.response.clone();
            let delay = self.delay;
            Box::pin(async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                response
            })
        }
    }

    #[tokio::test]
    async fn test_mock_client_replays_response() {
        let mock = MockTileClient::new(Ok(Bytes::from_static(&[1, 2, 3])));
        let body = mock.get("http://example.com/1").await.unwrap();
        assert_eq!(body, Bytes::from_static(&[1, 2, 3]));
        assert_eq!(mock.request_count(), 1);
        assert_eq!(mock.requests(), vec!["http://example.com/1".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_client_error() {
        let mock = MockTileClient::new(Err(FetchFailure::Status(404)));
        let result = mock.get("http://example.com/missing").await;
        assert_eq!(result, Err(FetchFailure::Status(404)));
    }

    #[test]
    fn test_reqwest_client_construction() {
        let client = ReqwestTileClient::new(Duration::from_secs(10), "tilestream-test/0.1");
        assert!(client.is_ok());
        assert_eq!(client.unwrap().timeout(), Duration::from_secs(10));
    }
}
