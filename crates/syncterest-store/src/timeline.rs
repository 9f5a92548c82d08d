//! In-memory message timeline for one open conversation.
//!
//! Sends append optimistically; the eventual realtime insert event is
//! deduplicated against what is already shown by message id -- the id
//! check is the sole dedup mechanism, there is no sequence or version
//! guarantee beyond it.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{MessageView, Reaction};
use syncterest_shared::types::{ConversationId, MessageId, UserId};

/// Outcome of a reaction toggle, telling the caller which backend call to
/// issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionToggle {
    /// No existing (user, emoji) entry: add one.
    Added(Reaction),
    /// An existing entry was found in cached data: remove it.
    Removed(Reaction),
}

/// Messages and reactions currently rendered for a conversation.
#[derive(Debug)]
pub struct ConversationTimeline {
    conversation_id: ConversationId,
    messages: Vec<MessageView>,
    reactions: HashMap<MessageId, Vec<Reaction>>,
}

impl ConversationTimeline {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            messages: Vec::new(),
            reactions: HashMap::new(),
        }
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Load a fetched page, replacing current state. Messages are kept
    /// oldest-first for rendering.
    pub fn load(&mut self, mut messages: Vec<MessageView>) {
        messages.sort_by(|a, b| a.message.created_at.cmp(&b.message.created_at));
        self.messages = messages;
    }

    /// Optimistic append on send. The caller has already cleared the
    /// compose form.
    pub fn append_local(&mut self, message: MessageView) {
        self.messages.push(message);
    }

    /// Merge a realtime-delivered row. A message whose id is already
    /// present is a no-op; returns whether the list grew.
    pub fn merge_remote(&mut self, message: MessageView) -> bool {
        if self.contains(message.message.id) {
            debug!(id = %message.message.id.short(), "duplicate realtime message dropped");
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.iter().any(|m| m.message.id == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[MessageView] {
        &self.messages
    }

    // -- Reactions --------------------------------------------------------

    /// Replace the cached reactions for a message.
    pub fn set_reactions(&mut self, message_id: MessageId, reactions: Vec<Reaction>) {
        self.reactions.insert(message_id, reactions);
    }

    pub fn reactions(&self, message_id: MessageId) -> &[Reaction] {
        self.reactions
            .get(&message_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Toggle an emoji for a user against the locally cached reaction
    /// list. If a (user, emoji) entry exists it is removed, otherwise one
    /// is added. This is a client-observed check, not a server-enforced
    /// constraint.
    pub fn toggle_reaction(
        &mut self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> ReactionToggle {
        let list = self.reactions.entry(message_id).or_default();

        if let Some(pos) = list
            .iter()
            .position(|r| r.user_id == user_id && r.emoji == emoji)
        {
            let removed = list.remove(pos);
            return ReactionToggle::Removed(removed);
        }

        let reaction = Reaction {
            id: uuid::Uuid::new_v4(),
            message_id,
            user_id,
            emoji: emoji.to_string(),
            created_at: now,
        };
        list.push(reaction.clone());
        ReactionToggle::Added(reaction)
    }

    /// Reaction count for one message.
    pub fn reaction_count(&self, message_id: MessageId) -> usize {
        self.reactions(message_id).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use chrono::Utc;

    fn view(conversation_id: ConversationId, body: &str) -> MessageView {
        MessageView {
            message: Message {
                id: MessageId::new(),
                conversation_id,
                sender_id: UserId::new(),
                body: body.into(),
                attachment_url: None,
                created_at: Utc::now(),
            },
            sender_username: Some("ada".into()),
            sender_avatar_url: None,
        }
    }

    #[test]
    fn duplicate_remote_message_is_noop() {
        let conversation = ConversationId::new();
        let mut timeline = ConversationTimeline::new(conversation);

        let message = view(conversation, "hello");
        timeline.append_local(message.clone());
        assert_eq!(timeline.len(), 1);

        // Realtime event for the optimistically appended message.
        assert!(!timeline.merge_remote(message));
        assert_eq!(timeline.len(), 1);

        // A genuinely new message grows the list by exactly one.
        assert!(timeline.merge_remote(view(conversation, "second")));
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn load_sorts_oldest_first() {
        let conversation = ConversationId::new();
        let mut timeline = ConversationTimeline::new(conversation);

        let mut older = view(conversation, "older");
        older.message.created_at = Utc::now() - chrono::Duration::minutes(5);
        let newer = view(conversation, "newer");

        // Fetch returns newest first.
        timeline.load(vec![newer, older]);
        assert_eq!(timeline.messages()[0].message.body, "older");
    }

    #[test]
    fn reaction_toggle_adds_then_removes() {
        let conversation = ConversationId::new();
        let mut timeline = ConversationTimeline::new(conversation);
        let message_id = MessageId::new();
        let user = UserId::new();
        let now = Utc::now();

        let first = timeline.toggle_reaction(message_id, user, "🔥", now);
        assert!(matches!(first, ReactionToggle::Added(_)));
        assert_eq!(timeline.reaction_count(message_id), 1);

        let second = timeline.toggle_reaction(message_id, user, "🔥", now);
        assert!(matches!(second, ReactionToggle::Removed(_)));
        assert_eq!(timeline.reaction_count(message_id), 0);
    }

    #[test]
    fn one_entry_per_user_emoji_pair() {
        let conversation = ConversationId::new();
        let mut timeline = ConversationTimeline::new(conversation);
        let message_id = MessageId::new();
        let ada = UserId::new();
        let grace = UserId::new();
        let now = Utc::now();

        timeline.toggle_reaction(message_id, ada, "🔥", now);
        timeline.toggle_reaction(message_id, ada, "❤️", now);
        timeline.toggle_reaction(message_id, grace, "🔥", now);
        assert_eq!(timeline.reaction_count(message_id), 3);

        // Toggling an existing pair removes only that pair.
        timeline.toggle_reaction(message_id, ada, "🔥", now);
        assert_eq!(timeline.reaction_count(message_id), 2);
        assert!(timeline
            .reactions(message_id)
            .iter()
            .all(|r| !(r.user_id == ada && r.emoji == "🔥")));
    }
}
