//! Mock [`WalletAdapter`] for testing.
//!
//! [`ScriptedAdapter`] pops the next scripted result on every call and falls
//! back to a default once the script runs out: a fresh `session-{n}` on
//! connect, `Ok(())` on disconnect, or a fixed error when built with
//! [`ScriptedAdapter::always_failing`].
//!
//! Results are taken when the call starts, so the n-th call always gets the
//! n-th result regardless of how long earlier calls take.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::ConnectResult;
use crate::error::AdapterError;
use crate::port::{SharedAdapter, WalletAdapter};

pub struct ScriptedAdapter {
    name: String,
    connect_results: Mutex<VecDeque<Result<ConnectResult, AdapterError>>>,
    disconnect_results: Mutex<VecDeque<Result<(), AdapterError>>>,
    fallback_error: Option<AdapterError>,
    delay: Duration,
    connect_count: AtomicU32,
    disconnect_count: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            connect_results: Mutex::new(VecDeque::new()),
            disconnect_results: Mutex::new(VecDeque::new()),
            fallback_error: None,
            delay: Duration::ZERO,
            connect_count: AtomicU32::new(0),
            disconnect_count: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
        }
    }

    /// An adapter whose connect fails with `err` once the script is empty.
    pub fn always_failing(err: AdapterError) -> Self {
        Self {
            fallback_error: Some(err),
            ..Self::new()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_connect_results(mut self, results: Vec<Result<ConnectResult, AdapterError>>) -> Self {
        self.connect_results = Mutex::new(results.into());
        self
    }

    pub fn with_disconnect_results(mut self, results: Vec<Result<(), AdapterError>>) -> Self {
        self.disconnect_results = Mutex::new(results.into());
        self
    }

    /// Make every call sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Wrap in an `Arc` so tests can keep the concrete handle for assertions.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Type-erased handle to pass to the manager.
    pub fn handle(self: &Arc<Self>) -> SharedAdapter {
        Arc::clone(self) as SharedAdapter
    }

    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> u32 {
        self.disconnect_count.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were ever in progress at once.
    pub fn max_concurrency(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn answer<T>(&self, result: T) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = FlightGuard(&self.in_flight);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        result
    }
}

impl Default for ScriptedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter even when the call is cancelled.
struct FlightGuard<'a>(&'a AtomicU32);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletAdapter for ScriptedAdapter {
    async fn connect(&self) -> Result<ConnectResult, AdapterError> {
        let call = self.connect_count.fetch_add(1, Ordering::SeqCst) + 1;
        let scripted = self.connect_results.lock().pop_front();
        let result = scripted.unwrap_or_else(|| match &self.fallback_error {
            Some(err) => Err(err.clone()),
            None => Ok(ConnectResult::new(format!("session-{call}"))),
        });
        self.answer(result).await
    }

    async fn disconnect(&self) -> Result<(), AdapterError> {
        self.disconnect_count.fetch_add(1, Ordering::SeqCst);
        let result = self.disconnect_results.lock().pop_front().unwrap_or(Ok(()));
        self.answer(result).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_default_sessions() {
        let adapter = ScriptedAdapter::new().with_connect_results(vec![Err(
            AdapterError::connection_failed("offline"),
        )]);

        assert!(adapter.connect().await.is_err());
        let second = adapter.connect().await.unwrap();
        assert_eq!(second.session_id.as_str(), "session-2");
        assert_eq!(adapter.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_always_failing_keeps_failing() {
        let adapter = ScriptedAdapter::always_failing(AdapterError::connection_failed("down"))
            .with_name("flaky");
        assert_eq!(adapter.name(), "flaky");
        for _ in 0..3 {
            assert!(adapter.connect().await.is_err());
        }
        assert!(adapter.disconnect().await.is_ok());
    }
}
