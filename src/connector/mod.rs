//! Connection lifecycle and subscription delivery
//!
//! The module is split into two focused sub-modules:
//!
//! - [`client`] - handle ownership, connect/publish/subscribe/close
//!   sequencing, and the connected-flag guards
//! - [`delivery`] - the asynchronous delivery path from the engine's own
//!   execution context into user handler code
//!
//! # Usage
//!
//! ```rust,no_run
//! use natslink::{NatsClient, testing::MockEngine};
//!
//! # tokio_test::block_on(async {
//! let mut client = NatsClient::new(MockEngine::new());
//! client
//!     .connect("UAM5...", "SUAI...", "nats://127.0.0.1:4222")
//!     .await?;
//! client.publish("orders.new", "hello").await?;
//! client.close().await;
//! # Ok::<(), natslink::ClientError>(())
//! # });
//! ```

pub mod client;
pub mod delivery;

// Re-export public types for convenience
pub use client::NatsClient;
pub use delivery::{DeliverySink, Dispatcher, MessageHandler};
