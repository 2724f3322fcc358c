//! Protocol engine boundary
//!
//! This module defines the contract the connector expects from an underlying
//! NATS protocol engine: opaque, exclusively-owned handles for options,
//! connections, and subscriptions, coarse status codes for every operation,
//! and a deferred last-error query for richer diagnostics.
//!
//! The engine owns all wire-level concerns (framing, TLS, reconnect policy,
//! server discovery). The connector never inspects handle internals; it only
//! sequences their lifecycle and forwards payloads across the boundary.

use crate::connector::delivery::DeliverySink;
use async_trait::async_trait;

/// Result of a single engine operation, carrying the coarse status on failure.
pub type EngineResult<T> = Result<T, Status>;

/// Coarse status codes reported by the protocol engine.
///
/// These drive control flow in the connector. Human-readable text for a code
/// comes from [`Engine::status_text`]; richer context for a just-failed call
/// comes from [`Engine::last_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Status {
    /// Generic engine failure.
    Error,
    /// Protocol-level violation detected by the engine.
    ProtocolError,
    /// I/O failure while talking to the server.
    IoError,
    /// The connection has been closed.
    ConnectionClosed,
    /// No server could be reached at the configured URL.
    NoServer,
    /// The operation timed out inside the engine.
    Timeout,
    /// An argument was rejected before any network activity.
    InvalidArg,
    /// The subject was rejected by the engine.
    InvalidSubject,
    /// The server rejected the supplied credentials.
    AuthFailed,
    /// The engine ran out of an internal resource.
    NoMemory,
}

/// Detail captured from the engine's deferred last-error channel.
///
/// Only meaningful when queried as the immediately next action after a
/// failing call on the same engine; the channel is not a historical log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    /// Secondary status recorded alongside the detail text.
    pub status: Status,
    /// Engine-supplied description of the failure.
    pub message: String,
}

/// The external messaging protocol engine.
///
/// Implementations bind a real protocol engine (or a test double) behind the
/// handle-based API the connector drives. All three handle types are owned
/// values: release operations consume them, so double-release is impossible
/// and dropping a handle is always safe for the caller.
///
/// Deliveries for a registered subscription are pushed into the provided
/// [`DeliverySink`] on an execution context owned and scheduled by the
/// engine, concurrently with whatever the caller is doing. After
/// [`unsubscribe`](Engine::unsubscribe) returns, the engine must not invoke
/// the sink again.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Configuration handle: credentials and server URL staged before connect.
    type Options: Send + 'static;
    /// Live connection handle.
    type Connection: Send + Sync + 'static;
    /// Active subscription handle.
    type Subscription: Send + Sync + 'static;

    /// Create a fresh options handle.
    fn create_options(&self) -> EngineResult<Self::Options>;

    /// Install an NKey credential pair onto the options handle.
    ///
    /// The seed is borrowed for the duration of this call only; the engine
    /// must derive whatever it needs before returning and not retain the
    /// buffer.
    fn set_nkey_from_seed(
        &self,
        options: &mut Self::Options,
        public_key: &str,
        seed: &str,
    ) -> EngineResult<()>;

    /// Set the target server URL on the options handle.
    fn set_url(&self, options: &mut Self::Options, url: &str) -> EngineResult<()>;

    /// Attempt the network connect using the staged options.
    ///
    /// On failure the last-error channel holds detail until the next engine
    /// call.
    async fn connect(&self, options: &mut Self::Options) -> EngineResult<Self::Connection>;

    /// Send a text payload on a subject.
    ///
    /// The result reflects send-acceptance only, not broker delivery; the
    /// engine's own buffering governs actual wire delivery.
    async fn publish(
        &self,
        connection: &Self::Connection,
        subject: &str,
        payload: &str,
    ) -> EngineResult<()>;

    /// Register a delivery sink for a subject.
    ///
    /// The engine invokes `sink` for every matching inbound message on its
    /// own delivery context, arbitrarily after this call returns.
    async fn subscribe(
        &self,
        connection: &Self::Connection,
        subject: &str,
        sink: DeliverySink,
    ) -> EngineResult<Self::Subscription>;

    /// Release a subscription handle.
    ///
    /// This is the synchronization point for delivery: once it returns, no
    /// further sink invocations occur for that subscription.
    async fn unsubscribe(
        &self,
        connection: &Self::Connection,
        subscription: Self::Subscription,
    ) -> EngineResult<()>;

    /// Close and release a connection handle.
    async fn disconnect(&self, connection: Self::Connection) -> EngineResult<()>;

    /// Engine-provided human-readable text for a coarse status code.
    fn status_text(&self, status: Status) -> String;

    /// Query the deferred last-error channel.
    ///
    /// Callers must invoke this as the very next action after detecting a
    /// relevant failure; after a success or unrelated activity the content
    /// is undefined.
    fn last_error(&self) -> Option<LastError>;
}
