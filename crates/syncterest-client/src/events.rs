//! Client event fan-out.
//!
//! Services publish [`ClientEvent`]s on a broadcast channel; embedding
//! shells subscribe and translate them into whatever their UI layer
//! needs. Failed sends mean nobody is listening, which is fine.

use tokio::sync::broadcast;

use syncterest_shared::types::{ConversationId, UserId};
use syncterest_store::Notification;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The realtime transport came up or went down.
    ConnectionChanged { connected: bool },

    /// New messages were appended to an open conversation.
    MessagesAppended {
        conversation_id: ConversationId,
        count: usize,
    },

    /// An open conversation's messages changed in place (reactions,
    /// deletions).
    MessagesUpdated { conversation_id: ConversationId },

    /// The set of users typing on a topic changed.
    ComposingChanged {
        topic: String,
        users: Vec<(UserId, String)>,
    },

    /// The set of users present on a topic changed.
    PresenceChanged { topic: String, online: Vec<UserId> },

    NotificationArrived { notification: Notification },

    CallStateChanged {
        in_call: bool,
        is_muted: bool,
        is_video_enabled: bool,
    },

    /// An operation failed and the failure should be shown to the user.
    ErrorSurfaced { message: String },
}

/// Shared broadcast sender. Cloning shares the bus.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ClientEvent) {
        // A send error only means there are no subscribers right now.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(ClientEvent::ConnectionChanged { connected: true });

        match rx.recv().await.unwrap() {
            ClientEvent::ConnectionChanged { connected } => assert!(connected),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn emit_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        bus.emit(ClientEvent::ErrorSurfaced {
            message: "nobody listening".into(),
        });
    }
}
