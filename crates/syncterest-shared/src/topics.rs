//! Realtime topic naming conventions.
//!
//! Topic strings are the identity of a channel subscription; every
//! constructor lives here so the convention exists in exactly one place.

use chrono::{DateTime, Utc};

use crate::types::{ChannelId, ConversationId, UserId};

/// Direct/group conversation channel: broadcasts + row-insert events.
pub fn chat(conversation_id: ConversationId) -> String {
    format!("chat:{conversation_id}")
}

/// Per-channel presence heartbeats.
pub fn channel_presence(channel_id: ChannelId) -> String {
    format!("channel-presence-{channel_id}")
}

/// Per-channel typing broadcasts.
pub fn channel_typing(channel_id: ChannelId) -> String {
    format!("typing:channel:{channel_id}")
}

/// Per-channel database change feed (messages and reactions).
pub fn channel_changes(channel_id: ChannelId) -> String {
    format!("channel:{channel_id}")
}

/// Global presence of users sharing a live location.
pub const LIVE_USERS: &str = "live-users";

/// Database change feed for live activities.
pub const LIVE_ACTIVITIES: &str = "live-activities-db-changes";

/// Global notification fan-out.
pub const NOTIFICATIONS: &str = "public:notifications";

/// Per-user joined-channels feed. Carries a mount timestamp so each mount
/// gets a distinct topic; the registry replaces any previous one.
pub fn joined_channels(user_id: UserId, mounted_at: DateTime<Utc>) -> String {
    format!("joined-channels-{user_id}-{}", mounted_at.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_shapes() {
        let conv = ConversationId::new();
        let chan = ChannelId::new();

        assert_eq!(chat(conv), format!("chat:{conv}"));
        assert_eq!(channel_presence(chan), format!("channel-presence-{chan}"));
        assert_eq!(channel_typing(chan), format!("typing:channel:{chan}"));
        assert_eq!(channel_changes(chan), format!("channel:{chan}"));
    }
}
