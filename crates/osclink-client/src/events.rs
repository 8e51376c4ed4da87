//! Client event surface
//!
//! Fan-out is an explicit observer list: every subscriber holds the
//! receiving end of an unbounded channel and gets its own clone of each
//! event. Unbounded so the dispatch path never blocks on a slow
//! subscriber; closed subscribers are pruned on the next publish.

use parking_lot::Mutex;
use rosc::{OscBundle, OscMessage, OscPacket};
use tokio::sync::mpsc;

/// Notifications emitted by the client's reception path
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Any packet decoded successfully (message or bundle), emitted
    /// unconditionally before classification
    PacketReceived(OscPacket),
    /// A bundle, emitted before any of its children (nested bundles
    /// included, depth-first pre-order)
    BundleReceived(OscBundle),
    /// A message that passed filtering (top-level or nested in a bundle)
    MessageReceived(OscMessage),
    /// Inbound bytes failed to decode as OSC, or the reception path hit
    /// a fatal transport error
    ReceiveFailed(String),
}

/// Observer list publishing [`ClientEvent`]s to any number of subscribers
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ClientEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ClientEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Publish an event to every live subscriber
    pub fn publish(&self, event: ClientEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
