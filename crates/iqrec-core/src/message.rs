//! Control-plane messages and publish/subscribe ports.

use tokio::sync::mpsc::{self, UnboundedSender};

use crate::value::Value;

/// Receiver half of a message subscription.
///
/// `try_recv` and `blocking_recv` work without a running async runtime.
pub type MessageReceiver = mpsc::UnboundedReceiver<Message>;

/// An opaque ordered key-value structure delivered to message
/// subscribers.
///
/// Retune commands are the single-entry case: the command name mapped to
/// the new center frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    entries: Vec<(String, Value)>,
}

impl Message {
    /// A message with a single named value.
    pub fn single(name: impl Into<String>, value: Value) -> Self {
        Self {
            entries: vec![(name.into(), value)],
        }
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }
}

/// An output message port fanning out to any number of subscribers.
///
/// Publication is a non-blocking enqueue with no acknowledgement, no
/// retry, and no backpressure from subscribers; a subscriber that has gone
/// away is skipped.
#[derive(Debug, Default)]
pub struct MessagePort {
    subscribers: Vec<UnboundedSender<Message>>,
}

impl MessagePort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and hand back its receiving end.
    pub fn subscribe(&mut self) -> MessageReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `message` to every live subscriber.
    pub fn publish(&self, message: &Message) {
        for subscriber in &self.subscribers {
            if subscriber.send(message.clone()).is_err() {
                tracing::trace!("message subscriber dropped; skipping");
            }
        }
    }
}
