//! Client facade and connection lifecycle
//!
//! [`NatsClient`] owns the engine handles (options, connection, subscription)
//! and sequences their lifecycle: lazy options creation, credential and URL
//! configuration, network connect, publish/subscribe guarded by the connected
//! flag, and ordered teardown. Each handle is exclusively owned by one client
//! and never exposed to callers.

use crate::connector::delivery::{DeliverySink, Dispatcher};
use crate::engine::{Engine, Status};
use crate::error::{ClientError, ErrorReport, Op};
use crate::message::{is_valid_subject, Notification};
use crate::ClientConfig;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// A pub/sub client over a protocol engine.
///
/// All methods run on the caller's task; only the subscription handler runs
/// on the engine's delivery context. Connect performs no retry — retry policy
/// belongs to the caller — and close is always safe, including with no prior
/// connect.
///
/// Teardown order on close: subscription, then connection (disconnect before
/// release), then options. After `close()` the client is back in its initial
/// state and `connect` may establish a fresh session.
pub struct NatsClient<E: Engine> {
    engine: Arc<E>,
    options: Option<E::Options>,
    connection: Option<E::Connection>,
    subscription: Option<E::Subscription>,
    dispatcher: Arc<Dispatcher>,
    connected: bool,
}

impl<E: Engine> NatsClient<E> {
    /// Create a client over its own engine instance.
    pub fn new(engine: E) -> Self {
        Self::from_shared(Arc::new(engine))
    }

    /// Create a client over a shared engine instance.
    ///
    /// The handles the client acquires remain exclusively its own; only the
    /// engine itself is shared.
    pub fn from_shared(engine: Arc<E>) -> Self {
        Self {
            engine,
            options: None,
            connection: None,
            subscription: None,
            dispatcher: Arc::new(Dispatcher::new()),
            connected: false,
        }
    }

    /// Whether the last connect attempt fully succeeded and no close has
    /// happened since.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Connect to the server with an NKey credential pair.
    ///
    /// Sequence: create the options handle if absent, install the credential
    /// pair, install the URL, then attempt the network connect. Every step
    /// aborts the call on failure; connect failures are additionally enriched
    /// with the engine's last-error detail. The options handle survives a
    /// failed attempt and is reused by the next call.
    ///
    /// `seed` is borrowed for the duration of this call and never retained.
    ///
    /// Calling this while already connected attempts a second network connect
    /// and, on success, replaces the prior connection handle; check
    /// [`is_connected`](Self::is_connected) first to avoid that.
    pub async fn connect(
        &mut self,
        public_key: &str,
        seed: &str,
        url: &str,
    ) -> Result<(), ClientError> {
        if self.connected {
            warn!(url, "connect called while already connected; the prior connection handle will be replaced on success");
        }

        if Url::parse(url).is_err() {
            return Err(ClientError::InvalidServerUrl(url.to_string()));
        }

        // Lazy options handle: created on first attempt, reused afterwards.
        let mut options = match self.options.take() {
            Some(options) => options,
            None => match self.engine.create_options() {
                Ok(options) => options,
                Err(status) => {
                    self.connected = false;
                    return Err(self.engine_error(Op::CreateOptions, status, false));
                }
            },
        };

        if let Err(status) = self
            .engine
            .set_nkey_from_seed(&mut options, public_key, seed)
        {
            self.options = Some(options);
            self.connected = false;
            return Err(self.engine_error(Op::ConfigureCredentials, status, false));
        }

        if let Err(status) = self.engine.set_url(&mut options, url) {
            self.options = Some(options);
            self.connected = false;
            return Err(self.engine_error(Op::ConfigureUrl, status, false));
        }

        match self.engine.connect(&mut options).await {
            Ok(connection) => {
                self.options = Some(options);
                if self.connection.replace(connection).is_some() {
                    debug!("replaced existing connection handle");
                }
                self.connected = true;
                info!(url, "connected");
                Ok(())
            }
            Err(status) => {
                self.options = Some(options);
                self.connected = false;
                // Last-error must be the very next query after the failing
                // connect for its content to relate to it.
                Err(self.engine_error(Op::Connect, status, true))
            }
        }
    }

    /// Connect using a loaded [`ClientConfig`], resolving the seed from the
    /// configured environment variable.
    pub async fn connect_with_config(&mut self, config: &ClientConfig) -> Result<(), ClientError> {
        let seed = config.resolve_seed()?;
        self.connect(&config.nkey_public, &seed, &config.server_url)
            .await
    }

    /// Publish a text payload on a subject.
    ///
    /// Fails locally, without touching the engine, when not connected. The
    /// result reflects send-acceptance only; publish is fire-and-forget.
    pub async fn publish(&self, subject: &str, message: &str) -> Result<(), ClientError> {
        if !self.connected {
            debug!(subject, "publish skipped: not connected");
            return Err(ClientError::NotConnected);
        }
        if !is_valid_subject(subject, false) {
            return Err(ClientError::InvalidSubject(subject.to_string()));
        }
        let connection = self.connection.as_ref().ok_or(ClientError::NotConnected)?;

        self.engine
            .publish(connection, subject, message)
            .await
            .map_err(|status| self.engine_error(Op::Publish, status, false))?;

        debug!(subject, bytes = message.len(), "published");
        Ok(())
    }

    /// Subscribe to a subject, replacing any existing subscription.
    ///
    /// At most one subscription is active per client: a prior handle is
    /// unsubscribed and released before the new registration, and `handler`
    /// replaces the previously registered handler (last-subscribe-wins).
    ///
    /// `handler` runs on the engine's delivery context, concurrently with the
    /// caller, arbitrarily after this call returns. It must not block.
    pub async fn subscribe<F>(&mut self, subject: &str, handler: F) -> Result<(), ClientError>
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        if !self.connected {
            debug!(subject, "subscribe skipped: not connected");
            return Err(ClientError::NotConnected);
        }
        if !is_valid_subject(subject, true) {
            return Err(ClientError::InvalidSubject(subject.to_string()));
        }
        let connection = self.connection.as_ref().ok_or(ClientError::NotConnected)?;

        // Release the previous subscription first; its handle is consumed
        // whether or not the engine reports the release cleanly.
        if let Some(previous) = self.subscription.take() {
            if let Err(status) = self.engine.unsubscribe(connection, previous).await {
                warn!(?status, "failed to release previous subscription; handle dropped");
            }
        }

        self.dispatcher.install(handler);
        let sink = DeliverySink::new(&self.dispatcher);

        match self.engine.subscribe(connection, subject, sink).await {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                info!(subject, "subscribed");
                Ok(())
            }
            Err(status) => {
                self.dispatcher.clear();
                Err(self.engine_error(Op::Subscribe, status, false))
            }
        }
    }

    /// Close the session and release all owned handles.
    ///
    /// Release order: subscription, then connection (with a disconnect step),
    /// then options. Each step is a no-op when the handle is absent, so close
    /// with no prior connect is safe. Engine release failures are logged, not
    /// surfaced; the handles are gone either way.
    pub async fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            match self.connection.as_ref() {
                Some(connection) => {
                    if let Err(status) = self.engine.unsubscribe(connection, subscription).await {
                        warn!(?status, "unsubscribe during close failed; handle dropped");
                    }
                }
                // No connection to unsubscribe through; dropping the handle
                // releases it.
                None => drop(subscription),
            }
        }
        self.dispatcher.clear();

        if let Some(connection) = self.connection.take() {
            if let Err(status) = self.engine.disconnect(connection).await {
                warn!(?status, "disconnect during close failed; handle dropped");
            }
        }

        self.options = None;
        self.connected = false;
        debug!("client closed");
    }

    fn engine_error(&self, op: Op, status: Status, fetch_detail: bool) -> ClientError {
        let report = ErrorReport::capture(self.engine.as_ref(), status, fetch_detail);
        error!(%op, ?status, "{report}");
        ClientError::Engine { op, report }
    }
}

impl<E: Engine> Drop for NatsClient<E> {
    fn drop(&mut self) {
        // Async teardown cannot run here; callers should close() explicitly
        // before dropping a connected client. Detach the handler so a late
        // delivery cannot reach a client that is going away; the weak
        // back-reference held by the engine dies with the dispatcher.
        self.dispatcher.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;

    const PUBLIC_KEY: &str = "UAM5XVXITKBGPGHBXSMF3L7EFJLEQ4U7FW6AWR3KLMSL54HZPU4H4B3I";
    const SEED: &str = "SUAIBDPBAUTWCWBKIO6XHQNINK5FWJW4OHLXC3HQ2KFE4PEJUA44CNHTC4";
    const URL: &str = "nats://127.0.0.1:4222";

    #[tokio::test]
    async fn test_new_client_is_not_connected() {
        let client = NatsClient::new(MockEngine::new());
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url_before_engine() {
        let engine = Arc::new(MockEngine::new());
        let mut client = NatsClient::from_shared(Arc::clone(&engine));

        let result = client.connect(PUBLIC_KEY, SEED, "not a url").await;

        assert!(matches!(result, Err(ClientError::InvalidServerUrl(_))));
        assert_eq!(engine.counters().options_created(), 0);
    }

    #[tokio::test]
    async fn test_options_handle_is_reused_across_attempts() {
        let engine = Arc::new(MockEngine::new());
        let mut client = NatsClient::from_shared(Arc::clone(&engine));

        client.connect(PUBLIC_KEY, SEED, URL).await.unwrap();
        client.connect(PUBLIC_KEY, SEED, URL).await.unwrap();

        // One options handle across both attempts.
        assert_eq!(engine.counters().options_created(), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_leaves_client_unconnected() {
        let engine = Arc::new(MockEngine::new());
        engine.reject_connect(Status::NoServer, "dial tcp: connection refused");
        let mut client = NatsClient::from_shared(Arc::clone(&engine));

        let result = client.connect(PUBLIC_KEY, SEED, URL).await;

        assert!(result.is_err());
        assert!(!client.is_connected());
        // Options handle survives the failed attempt for the next call.
        assert_eq!(engine.counters().options_created(), 1);
        assert_eq!(engine.counters().options_destroyed(), 0);
    }

    #[tokio::test]
    async fn test_credential_rejection_aborts_without_network() {
        let engine = Arc::new(MockEngine::new());
        engine.reject_nkey(Status::InvalidArg);
        let mut client = NatsClient::from_shared(Arc::clone(&engine));

        let result = client.connect(PUBLIC_KEY, "bad-seed", URL).await;

        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(Status::InvalidArg));
        assert!(!client.is_connected());
        assert_eq!(engine.counters().connections_created(), 0);
    }

    #[tokio::test]
    async fn test_publish_requires_connection() {
        let engine = Arc::new(MockEngine::new());
        let client = NatsClient::from_shared(Arc::clone(&engine));

        let result = client.publish("orders.new", "hello").await;

        assert!(matches!(result, Err(ClientError::NotConnected)));
        assert!(engine.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_publish_rejects_invalid_subject() {
        let engine = Arc::new(MockEngine::new());
        let mut client = NatsClient::from_shared(Arc::clone(&engine));
        client.connect(PUBLIC_KEY, SEED, URL).await.unwrap();

        let result = client.publish("orders..new", "hello").await;

        assert!(matches!(result, Err(ClientError::InvalidSubject(_))));
        assert!(engine.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_publish_wildcard_subject_is_rejected() {
        let engine = Arc::new(MockEngine::new());
        let mut client = NatsClient::from_shared(Arc::clone(&engine));
        client.connect(PUBLIC_KEY, SEED, URL).await.unwrap();

        let result = client.publish("orders.*", "hello").await;

        assert!(matches!(result, Err(ClientError::InvalidSubject(_))));
    }

    #[tokio::test]
    async fn test_subscribe_requires_connection() {
        let engine = Arc::new(MockEngine::new());
        let mut client = NatsClient::from_shared(Arc::clone(&engine));

        let result = client.subscribe("alerts.*", |_| {}).await;

        assert!(matches!(result, Err(ClientError::NotConnected)));
        assert_eq!(engine.counters().subscriptions_created(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_failure_clears_handler() {
        let engine = Arc::new(MockEngine::new());
        let mut client = NatsClient::from_shared(Arc::clone(&engine));
        client.connect(PUBLIC_KEY, SEED, URL).await.unwrap();

        engine.reject_subscribe(Status::InvalidSubject);
        let result = client.subscribe("alerts.*", |_| {}).await;

        assert!(result.is_err());
        assert!(!client.dispatcher.has_handler());
    }

    #[tokio::test]
    async fn test_close_then_reconnect_uses_fresh_handles() {
        let engine = Arc::new(MockEngine::new());
        let mut client = NatsClient::from_shared(Arc::clone(&engine));

        client.connect(PUBLIC_KEY, SEED, URL).await.unwrap();
        client.close().await;
        assert!(!client.is_connected());

        client.connect(PUBLIC_KEY, SEED, URL).await.unwrap();
        assert!(client.is_connected());

        // A fresh options handle after close, not the released one.
        assert_eq!(engine.counters().options_created(), 2);
        assert_eq!(engine.counters().options_destroyed(), 1);
    }
}
