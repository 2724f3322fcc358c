//! natslink - a client-side NATS connector
//!
//! Authenticated connection establishment, message publication, and
//! subject-based subscription delivery over a pluggable protocol engine.
//!
//! # Overview
//!
//! This crate provides the connection lifecycle and subscription delivery
//! engine for a pub/sub client:
//! - [`NatsClient`] - connect / publish / subscribe / close facade owning
//!   the engine handles
//! - [`Engine`] - the protocol-engine boundary (wire protocol, TLS, and
//!   reconnect policy live behind it, out of scope here)
//! - [`ClientConfig`] - TOML-loadable connection settings with
//!   environment-variable indirection for the NKey seed
//! - [`testing::MockEngine`] - scripted engine double for tests
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use natslink::{NatsClient, testing::MockEngine};
//!
//! # tokio_test::block_on(async {
//! let mut client = NatsClient::new(MockEngine::new());
//!
//! client
//!     .connect(
//!         "UAM5XVXITKBGPGHBXSMF3L7EFJLEQ4U7FW6AWR3KLMSL54HZPU4H4B3I",
//!         "SUAIBDPBAUTWCWBKIO6XHQNINK5FWJW4OHLXC3HQ2KFE4PEJUA44CNHTC4",
//!         "nats://127.0.0.1:4222",
//!     )
//!     .await?;
//!
//! client.publish("orders.new", "hello").await?;
//!
//! client
//!     .subscribe("alerts.*", |notification| {
//!         println!("{}: {}", notification.subject, notification.text);
//!     })
//!     .await?;
//!
//! client.close().await;
//! # Ok::<(), natslink::ClientError>(())
//! # });
//! ```
//!
//! Subscription handlers run on the engine's own delivery context,
//! asynchronously with respect to the caller; see
//! [`NatsClient::subscribe`] for the teardown contract.

pub mod config;
pub mod connector;
pub mod engine;
pub mod error;
pub mod message;
pub mod testing;

pub use config::{ClientConfig, ConfigError};
pub use connector::delivery::{DeliverySink, Dispatcher, MessageHandler};
pub use connector::NatsClient;
pub use engine::{Engine, EngineResult, LastError, Status};
pub use error::{ClientError, ErrorReport, Op};
pub use message::{is_valid_subject, Message, Notification};
