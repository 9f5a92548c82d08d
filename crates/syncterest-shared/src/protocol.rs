use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ConversationId, UserId};

/// Broadcast event names. These are a private convention between the hooks
/// on either end of a channel, not a documented protocol.
pub const EVENT_TYPING: &str = "typing";
pub const EVENT_CALL_OFFER: &str = "call-offer";
pub const EVENT_CALL_ANSWER: &str = "call-answer";
pub const EVENT_ICE_CANDIDATE: &str = "ice-candidate";
pub const EVENT_HANG_UP: &str = "hang-up";

/// All messages exchanged on a realtime channel, as JSON frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeMessage {
    /// Client requests a subscription to a topic.
    Join {
        topic: String,
        config: ChannelConfig,
    },

    /// Client leaves a topic.
    Leave { topic: String },

    /// Client announces its own presence on a topic.
    Track { topic: String, meta: PresenceMeta },

    /// Ad hoc broadcast on a topic.
    Broadcast {
        topic: String,
        event: String,
        payload: Value,
    },

    /// Full presence snapshot for a topic. Always replaces local state.
    PresenceState {
        topic: String,
        state: PresenceSnapshot,
    },

    /// Incremental presence change between snapshots.
    PresenceDiff {
        topic: String,
        joins: HashMap<String, PresenceMeta>,
        leaves: HashMap<String, PresenceMeta>,
    },

    /// A database row changed under a topic's change filter.
    PostgresChange {
        topic: String,
        table: String,
        change: ChangeKind,
        record: Value,
    },

    /// Server acknowledged a subscription.
    Subscribed { topic: String },

    /// Server closed a channel.
    Closed { topic: String },

    /// Keep-alive.
    Heartbeat,
}

impl RealtimeMessage {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

/// Per-channel subscription options sent with a join.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Track and receive presence state on this channel.
    pub presence: bool,
    /// Receive our own broadcasts back.
    pub self_broadcast: bool,
    /// Tables whose row changes should be delivered on this channel.
    pub tables: Vec<String>,
}

impl ChannelConfig {
    pub fn with_presence() -> Self {
        Self {
            presence: true,
            ..Self::default()
        }
    }

    pub fn with_tables(tables: &[&str]) -> Self {
        Self {
            tables: tables.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One participant's presence metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresenceMeta {
    pub user_id: UserId,
    pub online_at: DateTime<Utc>,
}

/// Aggregate presence: participant id (as string key) to metadata.
pub type PresenceSnapshot = HashMap<String, PresenceMeta>;

/// Payload of a `typing` broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypingPayload {
    pub user_id: UserId,
    pub display_name: String,
}

/// Payload of a `call-offer` broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallOfferPayload {
    pub sender: UserId,
    pub target: UserId,
    pub conversation_id: ConversationId,
    pub sdp: String,
}

/// Payload of a `call-answer` broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallAnswerPayload {
    pub sender: UserId,
    pub target: UserId,
    pub conversation_id: ConversationId,
    pub sdp: String,
}

/// Payload of an `ice-candidate` broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IceCandidatePayload {
    pub sender: UserId,
    pub target: UserId,
    pub conversation_id: ConversationId,
    pub candidate: String,
}

/// Payload of a `hang-up` broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HangupPayload {
    pub sender: UserId,
    pub conversation_id: ConversationId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_roundtrip() {
        let payload = serde_json::to_value(TypingPayload {
            user_id: UserId::new(),
            display_name: "ada".into(),
        })
        .unwrap();

        let msg = RealtimeMessage::Broadcast {
            topic: "typing:channel:abc".into(),
            event: EVENT_TYPING.into(),
            payload,
        };

        let bytes = msg.to_bytes().unwrap();
        let restored = RealtimeMessage::from_bytes(&bytes).unwrap();
        assert_eq!(msg, restored);
    }

    #[test]
    fn presence_state_roundtrip() {
        let user = UserId::new();
        let mut state = PresenceSnapshot::new();
        state.insert(
            user.to_string(),
            PresenceMeta {
                user_id: user,
                online_at: Utc::now(),
            },
        );

        let msg = RealtimeMessage::PresenceState {
            topic: "live-users".into(),
            state,
        };

        let restored = RealtimeMessage::from_bytes(&msg.to_bytes().unwrap()).unwrap();
        match restored {
            RealtimeMessage::PresenceState { state, .. } => {
                assert!(state.contains_key(&user.to_string()))
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn change_kind_uses_uppercase_wire_names() {
        assert_eq!(
            serde_json::to_string(&ChangeKind::Insert).unwrap(),
            "\"INSERT\""
        );
    }
}
