//! Mock protocol engine for testing
//!
//! Provides a scripted [`MockEngine`] implementation of [`Engine`] to enable
//! comprehensive testing without a live server: injectable failures per
//! operation, injectable last-error detail, recorded publishes and
//! subscriptions, a way to fire deliveries into the registered sink, and
//! create/destroy counters for every handle type so tests can prove the
//! connector leaks nothing.

use crate::connector::delivery::DeliverySink;
use crate::engine::{Engine, EngineResult, LastError, Status};
use crate::message::Message;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

/// Handle create/destroy tallies, incremented by the mock handle types.
///
/// Destruction is counted in `Drop`, so a handle released by any path (an
/// explicit engine release call or a plain drop) lands in the tally.
#[derive(Debug, Default)]
pub struct ResourceCounters {
    options_created: AtomicUsize,
    options_destroyed: AtomicUsize,
    connections_created: AtomicUsize,
    connections_destroyed: AtomicUsize,
    subscriptions_created: AtomicUsize,
    subscriptions_destroyed: AtomicUsize,
}

impl ResourceCounters {
    pub fn options_created(&self) -> usize {
        self.options_created.load(Ordering::SeqCst)
    }
    pub fn options_destroyed(&self) -> usize {
        self.options_destroyed.load(Ordering::SeqCst)
    }
    pub fn connections_created(&self) -> usize {
        self.connections_created.load(Ordering::SeqCst)
    }
    pub fn connections_destroyed(&self) -> usize {
        self.connections_destroyed.load(Ordering::SeqCst)
    }
    pub fn subscriptions_created(&self) -> usize {
        self.subscriptions_created.load(Ordering::SeqCst)
    }
    pub fn subscriptions_destroyed(&self) -> usize {
        self.subscriptions_destroyed.load(Ordering::SeqCst)
    }

    /// True when every created handle has been destroyed.
    pub fn balanced(&self) -> bool {
        self.options_created() == self.options_destroyed()
            && self.connections_created() == self.connections_destroyed()
            && self.subscriptions_created() == self.subscriptions_destroyed()
    }
}

/// Mock options handle. Records what was configured onto it.
#[derive(Debug)]
pub struct MockOptions {
    counters: Arc<ResourceCounters>,
    /// Public identity installed via `set_nkey_from_seed`.
    pub nkey_public: Option<String>,
    /// Whether a seed was supplied. The seed itself is not retained, per the
    /// engine contract.
    pub seed_installed: bool,
    /// URL installed via `set_url`.
    pub url: Option<String>,
}

impl Drop for MockOptions {
    fn drop(&mut self) {
        self.counters.options_destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock connection handle.
#[derive(Debug)]
pub struct MockConnection {
    counters: Arc<ResourceCounters>,
    /// URL the connection was established against.
    pub url: String,
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.counters
            .connections_destroyed
            .fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock subscription handle.
#[derive(Debug)]
pub struct MockSubscription {
    counters: Arc<ResourceCounters>,
    /// Subject the subscription was registered for.
    pub subject: String,
}

impl Drop for MockSubscription {
    fn drop(&mut self) {
        self.counters
            .subscriptions_destroyed
            .fetch_add(1, Ordering::SeqCst);
    }
}

/// Scripted protocol engine for tests.
#[derive(Default)]
pub struct MockEngine {
    counters: Arc<ResourceCounters>,
    fail_create_options: StdMutex<Option<Status>>,
    fail_nkey: StdMutex<Option<Status>>,
    fail_url: StdMutex<Option<Status>>,
    fail_connect: StdMutex<Option<Status>>,
    fail_publish: StdMutex<Option<Status>>,
    fail_subscribe: StdMutex<Option<Status>>,
    last_error: StdMutex<Option<LastError>>,
    published: Mutex<Vec<(String, String)>>,
    subscribed_subjects: Mutex<Vec<String>>,
    sink: StdMutex<Option<DeliverySink>>,
    unsubscribe_calls: AtomicUsize,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle lifecycle tallies.
    pub fn counters(&self) -> &ResourceCounters {
        &self.counters
    }

    /// Make the next connect attempts fail with `status`, planting `detail`
    /// on the last-error channel.
    pub fn reject_connect(&self, status: Status, detail: &str) {
        *self.lock(&self.fail_connect) = Some(status);
        *self.lock(&self.last_error) = Some(LastError {
            status: Status::IoError,
            message: detail.to_string(),
        });
    }

    /// Make credential installation fail with `status`.
    pub fn reject_nkey(&self, status: Status) {
        *self.lock(&self.fail_nkey) = Some(status);
    }

    /// Make URL installation fail with `status`.
    pub fn reject_url(&self, status: Status) {
        *self.lock(&self.fail_url) = Some(status);
    }

    /// Make publish attempts fail with `status`.
    pub fn reject_publish(&self, status: Status) {
        *self.lock(&self.fail_publish) = Some(status);
    }

    /// Make subscribe attempts fail with `status`.
    pub fn reject_subscribe(&self, status: Status) {
        *self.lock(&self.fail_subscribe) = Some(status);
    }

    /// All (subject, payload) pairs accepted by publish.
    pub async fn published(&self) -> Vec<(String, String)> {
        self.published.lock().await.clone()
    }

    /// All subjects that were subscribed.
    pub async fn subscribed_subjects(&self) -> Vec<String> {
        self.subscribed_subjects.lock().await.clone()
    }

    /// Number of unsubscribe calls the engine has seen.
    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    /// Push an inbound message into the registered delivery sink, as the
    /// engine's delivery context would.
    ///
    /// Returns false when no subscription sink is registered (including
    /// after unsubscribe, which detaches the sink).
    pub fn fire_delivery(&self, subject: &str, payload: &[u8]) -> bool {
        let sink = self.lock(&self.sink).clone();
        match sink {
            Some(sink) => {
                sink.deliver(Message::new(
                    subject.to_string(),
                    Bytes::copy_from_slice(payload),
                ));
                true
            }
            None => false,
        }
    }

    fn lock<'a, T>(&self, mutex: &'a StdMutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn scripted_failure(&self, slot: &StdMutex<Option<Status>>) -> Option<Status> {
        *self.lock(slot)
    }
}

#[async_trait]
impl Engine for MockEngine {
    type Options = MockOptions;
    type Connection = MockConnection;
    type Subscription = MockSubscription;

    fn create_options(&self) -> EngineResult<MockOptions> {
        if let Some(status) = self.scripted_failure(&self.fail_create_options) {
            return Err(status);
        }
        self.counters.options_created.fetch_add(1, Ordering::SeqCst);
        Ok(MockOptions {
            counters: Arc::clone(&self.counters),
            nkey_public: None,
            seed_installed: false,
            url: None,
        })
    }

    fn set_nkey_from_seed(
        &self,
        options: &mut MockOptions,
        public_key: &str,
        seed: &str,
    ) -> EngineResult<()> {
        if let Some(status) = self.scripted_failure(&self.fail_nkey) {
            return Err(status);
        }
        if public_key.is_empty() || seed.is_empty() {
            return Err(Status::InvalidArg);
        }
        options.nkey_public = Some(public_key.to_string());
        options.seed_installed = true;
        Ok(())
    }

    fn set_url(&self, options: &mut MockOptions, url: &str) -> EngineResult<()> {
        if let Some(status) = self.scripted_failure(&self.fail_url) {
            return Err(status);
        }
        options.url = Some(url.to_string());
        Ok(())
    }

    async fn connect(&self, options: &mut MockOptions) -> EngineResult<MockConnection> {
        if let Some(status) = self.scripted_failure(&self.fail_connect) {
            return Err(status);
        }
        let url = options.url.clone().ok_or(Status::InvalidArg)?;
        if !options.seed_installed {
            return Err(Status::AuthFailed);
        }
        self.counters
            .connections_created
            .fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            counters: Arc::clone(&self.counters),
            url,
        })
    }

    async fn publish(
        &self,
        _connection: &MockConnection,
        subject: &str,
        payload: &str,
    ) -> EngineResult<()> {
        if let Some(status) = self.scripted_failure(&self.fail_publish) {
            return Err(status);
        }
        self.published
            .lock()
            .await
            .push((subject.to_string(), payload.to_string()));
        Ok(())
    }

    async fn subscribe(
        &self,
        _connection: &MockConnection,
        subject: &str,
        sink: DeliverySink,
    ) -> EngineResult<MockSubscription> {
        if let Some(status) = self.scripted_failure(&self.fail_subscribe) {
            return Err(status);
        }
        self.subscribed_subjects.lock().await.push(subject.to_string());
        *self.lock(&self.sink) = Some(sink);
        self.counters
            .subscriptions_created
            .fetch_add(1, Ordering::SeqCst);
        Ok(MockSubscription {
            counters: Arc::clone(&self.counters),
            subject: subject.to_string(),
        })
    }

    async fn unsubscribe(
        &self,
        _connection: &MockConnection,
        subscription: MockSubscription,
    ) -> EngineResult<()> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        // No further deliveries once unsubscribe returns.
        *self.lock(&self.sink) = None;
        drop(subscription);
        Ok(())
    }

    async fn disconnect(&self, connection: MockConnection) -> EngineResult<()> {
        drop(connection);
        Ok(())
    }

    fn status_text(&self, status: Status) -> String {
        let text = match status {
            Status::Error => "generic engine error",
            Status::ProtocolError => "protocol violation",
            Status::IoError => "i/o error",
            Status::ConnectionClosed => "connection closed",
            Status::NoServer => "no server available",
            Status::Timeout => "operation timed out",
            Status::InvalidArg => "invalid argument",
            Status::InvalidSubject => "invalid subject",
            Status::AuthFailed => "authentication failed",
            Status::NoMemory => "out of memory",
        };
        text.to_string()
    }

    fn last_error(&self) -> Option<LastError> {
        self.lock(&self.last_error).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::delivery::Dispatcher;
    use crate::message::Notification;

    #[tokio::test]
    async fn test_mock_engine_records_publishes() {
        let engine = MockEngine::new();
        let mut options = engine.create_options().unwrap();
        engine.set_nkey_from_seed(&mut options, "U1", "SU1").unwrap();
        engine.set_url(&mut options, "nats://localhost:4222").unwrap();
        let connection = engine.connect(&mut options).await.unwrap();

        engine.publish(&connection, "orders.new", "hello").await.unwrap();

        let published = engine.published().await;
        assert_eq!(
            published,
            vec![("orders.new".to_string(), "hello".to_string())]
        );
    }

    #[tokio::test]
    async fn test_mock_engine_connect_requires_configuration() {
        let engine = MockEngine::new();
        let mut options = engine.create_options().unwrap();

        // No URL staged.
        assert_eq!(engine.connect(&mut options).await.err(), Some(Status::InvalidArg));

        engine.set_url(&mut options, "nats://localhost:4222").unwrap();
        // No credentials staged.
        assert_eq!(engine.connect(&mut options).await.err(), Some(Status::AuthFailed));
    }

    #[tokio::test]
    async fn test_mock_engine_scripted_connect_failure_sets_last_error() {
        let engine = MockEngine::new();
        engine.reject_connect(Status::NoServer, "connection refused");

        let mut options = engine.create_options().unwrap();
        engine.set_nkey_from_seed(&mut options, "U1", "SU1").unwrap();
        engine.set_url(&mut options, "nats://localhost:4222").unwrap();

        assert_eq!(engine.connect(&mut options).await.err(), Some(Status::NoServer));
        let last = engine.last_error().unwrap();
        assert_eq!(last.message, "connection refused");
    }

    #[tokio::test]
    async fn test_handle_drop_reaches_counters() {
        let engine = MockEngine::new();
        {
            let mut options = engine.create_options().unwrap();
            engine.set_nkey_from_seed(&mut options, "U1", "SU1").unwrap();
            engine.set_url(&mut options, "nats://localhost:4222").unwrap();
            let connection = engine.connect(&mut options).await.unwrap();
            engine.disconnect(connection).await.unwrap();
        }
        assert!(engine.counters().balanced());
    }

    #[tokio::test]
    async fn test_unsubscribe_detaches_sink() {
        let engine = MockEngine::new();
        let mut options = engine.create_options().unwrap();
        engine.set_nkey_from_seed(&mut options, "U1", "SU1").unwrap();
        engine.set_url(&mut options, "nats://localhost:4222").unwrap();
        let connection = engine.connect(&mut options).await.unwrap();

        let dispatcher = Arc::new(Dispatcher::new());
        dispatcher.install(|_: Notification| {});
        let sink = DeliverySink::new(&dispatcher);

        let subscription = engine.subscribe(&connection, "alerts.*", sink).await.unwrap();
        assert!(engine.fire_delivery("alerts.cpu", b"92%"));

        engine.unsubscribe(&connection, subscription).await.unwrap();
        assert!(!engine.fire_delivery("alerts.cpu", b"93%"));
        assert_eq!(engine.unsubscribe_calls(), 1);
    }
}
