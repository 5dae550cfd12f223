// Ready-made completion listeners

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::transactions::traits::CompletionListener;
use crate::transactions::types::TransactionResult;

/// One callback received by a listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Completed {
        result: TransactionResult,
        name: String,
    },
    TimedOut {
        name: String,
    },
}

impl ListenerEvent {
    pub fn name(&self) -> &str {
        match self {
            ListenerEvent::Completed { name, .. } | ListenerEvent::TimedOut { name } => name,
        }
    }
}

/// Forwards every callback into an async channel, so callers can await outcomes
#[derive(Debug)]
pub struct ChannelListener {
    events: mpsc::UnboundedSender<ListenerEvent>,
}

impl ChannelListener {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ListenerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { events }), receiver)
    }

    fn forward(&self, event: ListenerEvent) {
        if self.events.send(event).is_err() {
            debug!("Listener receiver dropped; discarding transaction event");
        }
    }
}

impl CompletionListener for ChannelListener {
    fn on_completed(&self, result: TransactionResult, name: &str) {
        self.forward(ListenerEvent::Completed {
            result,
            name: name.to_string(),
        });
    }

    fn on_timeout(&self, name: &str) {
        self.forward(ListenerEvent::TimedOut {
            name: name.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_listener_forwards_both_callbacks() {
        let (listener, mut events) = ChannelListener::new();
        listener.on_completed(TransactionResult::succeeded(), "answer");
        listener.on_timeout("hold");

        let first = events.recv().await.unwrap();
        assert_eq!(first.name(), "answer");
        assert!(matches!(first, ListenerEvent::Completed { .. }));

        let second = events.recv().await.unwrap();
        assert_eq!(
            second,
            ListenerEvent::TimedOut {
                name: "hold".to_string()
            }
        );
    }

    #[test]
    fn test_dropped_receiver_is_tolerated() {
        let (listener, events) = ChannelListener::new();
        drop(events);
        listener.on_timeout("answer");
    }
}
