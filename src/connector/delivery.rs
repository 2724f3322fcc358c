//! Asynchronous subscription delivery
//!
//! Inbound messages arrive on an execution context owned by the protocol
//! engine, concurrently with whatever the caller's thread is doing. The
//! pieces here keep that boundary safe:
//!
//! - [`Dispatcher`] holds the single registered handler behind a mutex, so a
//!   `subscribe` replacing the handler races cleanly with an in-flight
//!   delivery reading it.
//! - [`DeliverySink`] is the non-owning back-reference handed to the engine:
//!   a `Weak` pointer to the dispatcher plus a lookup-by-upgrade, never a
//!   raw-pointer cast. A delivery that arrives after the owning client is
//!   gone resolves to nothing and is dropped.
//!
//! Delivery never blocks beyond the handler itself and never propagates a
//! failure back into the engine's delivery context.

use crate::message::{Message, Notification};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, warn};

/// The user-supplied subscription handler.
///
/// Invoked on the engine's delivery context; it must not block or perform
/// long-running work, since that path is shared with the engine's own event
/// processing.
pub type MessageHandler = Arc<dyn Fn(Notification) + Send + Sync + 'static>;

/// Holds the single registered handler for a client.
///
/// The dispatch point itself is stateless; all per-client data flows through
/// the handler slot.
#[derive(Default)]
pub struct Dispatcher {
    handler: Mutex<Option<MessageHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler, replacing any previous one.
    pub fn install<F>(&self, handler: F)
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        let mut slot = self.handler.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(handler));
    }

    /// Detach the current handler, if any.
    pub fn clear(&self) {
        let mut slot = self.handler.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    pub fn has_handler(&self) -> bool {
        self.handler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Forward a notification to the registered handler.
    ///
    /// The slot lock is released before the handler runs, so a concurrent
    /// `install` is never blocked on user code.
    fn dispatch(&self, notification: Notification) {
        let handler = {
            let slot = self.handler.lock().unwrap_or_else(|e| e.into_inner());
            slot.clone()
        };
        match handler {
            Some(handler) => handler(notification),
            None => {
                debug!(
                    subject = %notification.subject,
                    "delivery with no registered handler; dropping"
                );
            }
        }
    }
}

/// Non-owning delivery entry point handed to the protocol engine.
///
/// Cloneable and cheap; the engine may invoke [`deliver`](Self::deliver) from
/// its own threads arbitrarily after registration. It holds no ownership of
/// the client: once the client is dropped, deliveries resolve to nothing.
#[derive(Clone)]
pub struct DeliverySink {
    dispatcher: Weak<Dispatcher>,
}

impl DeliverySink {
    pub(crate) fn new(dispatcher: &Arc<Dispatcher>) -> Self {
        Self {
            dispatcher: Arc::downgrade(dispatcher),
        }
    }

    /// Decode an inbound message and forward it to the registered handler.
    ///
    /// Copies everything it needs out of the message before returning; the
    /// engine may reclaim the message's memory immediately afterward. Never
    /// fails: malformed payloads decode with replacement, and deliveries for
    /// a dropped client or an empty handler slot are silently discarded.
    pub fn deliver(&self, message: Message) {
        let Some(dispatcher) = self.dispatcher.upgrade() else {
            warn!(
                subject = %message.subject,
                "delivery after client teardown; dropping"
            );
            return;
        };
        dispatcher.dispatch(Notification::from(message));
    }
}
