//! Scripted transport for tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use super::{ApiError, ApiRequest, RawResponse, Transport};

/// A hand-rolled [`Transport`] that records requests and replays responses.
///
/// Supports:
/// - A fixed response (used for every call), **or**
/// - A sequence of responses (one per call, repeating the last if exhausted).
/// - Optional per-call latency.
pub struct MockTransport {
    /// Pending responses, reversed so `pop()` yields the next one.
    responses: Mutex<Vec<Result<RawResponse, ApiError>>>,
    fallback: Result<RawResponse, ApiError>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    /// Create a mock that always answers with `response`.
    pub fn new(response: RawResponse) -> Self {
        Self::with_results(vec![Ok(response)])
    }

    /// Create a mock that always fails with `error` before any response.
    pub fn failing(error: ApiError) -> Self {
        Self::with_results(vec![Err(error)])
    }

    /// Create a mock that answers in order, repeating the last response.
    pub fn with_sequence(responses: Vec<RawResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(mut results: Vec<Result<RawResponse, ApiError>>) -> Self {
        assert!(!results.is_empty(), "sequence must have at least one response");
        results.reverse();
        let fallback = results[0].clone();
        Self {
            responses: Mutex::new(results),
            fallback,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Set simulated network latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn next_result(&self) -> Result<RawResponse, ApiError> {
        match self.responses.lock() {
            Ok(mut seq) => seq.pop().unwrap_or_else(|| self.fallback.clone()),
            Err(_) => self.fallback.clone(),
        }
    }
}

impl Transport for MockTransport {
    fn get<'a>(
        &'a self,
        request: &'a ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, ApiError>> + Send + 'a>> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        let result = self.next_result();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            result
        })
    }
}
