//! Direct and group messaging.
//!
//! Sends are optimistic: the message is appended locally before the
//! backend confirms, and the realtime insert event that follows is
//! deduplicated by id. The insert payload lacks the sender join, so the
//! handler re-fetches the full row before merging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use syncterest_realtime::{SocketCommand, Subscription, TypingCoordinator};
use syncterest_shared::constants::{BUCKET_CHAT_ATTACHMENTS, MAX_ATTACHMENT_SIZE};
use syncterest_shared::protocol::{ChannelConfig, TypingPayload, EVENT_TYPING};
use syncterest_shared::topics;
use syncterest_shared::types::{ConversationId, MessageId};
use syncterest_shared::validation::MessageDraft;
use syncterest_store::{ConversationTimeline, Message, MessageView, QueryKey, ReactionToggle};

use crate::api::rest::{eq, tables};
use crate::api::rpc::functions;
use crate::error::{ClientError, Result};
use crate::events::ClientEvent;
use crate::services::ServiceContext;
use crate::state::Session;

/// One row of the conversation list, as returned by the aggregate RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub is_group: bool,
    pub title: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
struct UserArg {
    p_user_id: String,
}

#[derive(Debug, Serialize)]
struct MarkReadArgs {
    p_conversation_id: String,
    p_user_id: String,
}

#[derive(Debug, Serialize)]
struct NewMessageRow<'a> {
    id: MessageId,
    conversation_id: ConversationId,
    sender_id: syncterest_shared::types::UserId,
    body: &'a str,
    attachment_url: Option<&'a str>,
}

/// Sender profile columns embedded in a joined message select.
#[derive(Debug, Deserialize)]
struct SenderJoin {
    username: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JoinedMessageRow {
    #[serde(flatten)]
    message: Message,
    #[serde(default)]
    profiles: Option<SenderJoin>,
}

impl From<JoinedMessageRow> for MessageView {
    fn from(row: JoinedMessageRow) -> Self {
        let (sender_username, sender_avatar_url) = match row.profiles {
            Some(join) => (join.username, join.avatar_url),
            None => (None, None),
        };
        MessageView {
            message: row.message,
            sender_username,
            sender_avatar_url,
        }
    }
}

pub struct MessagingService {
    ctx: ServiceContext,
}

impl MessagingService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Conversation list with last-message preview and unread count.
    pub async fn list_conversations(&self, session: &Session) -> Result<Vec<ConversationSummary>> {
        let result = self
            .ctx
            .api
            .rpc(
                functions::CONVERSATIONS_WITH_LAST_MESSAGE,
                &UserArg {
                    p_user_id: session.user.id.to_string(),
                },
            )
            .await;
        let summaries: Vec<ConversationSummary> = self.ctx.surface(result)?;

        self.ctx.cache.lock()?.set(
            QueryKey::entity("conversations").scoped(session.user.id),
            serde_json::to_value(&summaries)?,
            self.ctx.time.now(),
        );
        Ok(summaries)
    }

    /// Open a conversation: subscribe to its topic and load the most
    /// recent page into a timeline.
    pub async fn open(
        &self,
        conversation_id: ConversationId,
    ) -> Result<(ConversationTimeline, Subscription)> {
        let subscription = self
            .ctx
            .registry
            .subscribe(
                &topics::chat(conversation_id),
                ChannelConfig::with_tables(&[tables::MESSAGES]),
            )
            .await?;

        let mut timeline = ConversationTimeline::new(conversation_id);
        let result = self.fetch_page(conversation_id).await;
        let messages = self.ctx.surface(result)?;

        {
            let db = self.ctx.db.lock()?;
            for view in &messages {
                db.insert_message(&view.message)?;
            }
        }
        self.ctx.cache.lock()?.set(
            QueryKey::entity("messages").scoped(conversation_id),
            serde_json::to_value(&messages)?,
            self.ctx.time.now(),
        );
        timeline.load(messages);

        info!(
            conversation = %conversation_id.short(),
            count = timeline.len(),
            "Conversation opened"
        );
        Ok((timeline, subscription))
    }

    /// Send a message. The timeline is appended optimistically; the
    /// caller clears the compose form on `Ok`. A pending attachment is
    /// uploaded first and dropped with the draft on success.
    pub async fn send(
        &self,
        session: &Session,
        timeline: &mut ConversationTimeline,
        draft: &MessageDraft,
        attachment: Option<(Vec<u8>, String)>,
    ) -> Result<MessageId> {
        draft.validate().map_err(ClientError::Validation)?;

        let conversation_id = timeline.conversation_id();
        let attachment_url = match (draft.attachment_path.as_deref(), attachment) {
            (Some(_), Some((bytes, content_type))) => {
                if bytes.len() > MAX_ATTACHMENT_SIZE {
                    return Err(ClientError::Validation(vec![
                        syncterest_shared::validation::FieldError {
                            field: "attachment",
                            message: "Attachment is larger than 25 MB".into(),
                        },
                    ]));
                }
                let path = format!("{conversation_id}/{}", Uuid::new_v4());
                let result = self
                    .ctx
                    .api
                    .upload(BUCKET_CHAT_ATTACHMENTS, &path, bytes, &content_type)
                    .await;
                Some(self.ctx.surface(result)?)
            }
            _ => None,
        };

        let id = MessageId::new();
        let row = NewMessageRow {
            id,
            conversation_id,
            sender_id: session.user.id,
            body: draft.body.trim(),
            attachment_url: attachment_url.as_deref(),
        };
        let result = self
            .ctx
            .api
            .insert::<_, Message>(tables::MESSAGES, &row)
            .await;
        let stored = self.ctx.surface(result)?;

        let view = MessageView {
            message: stored,
            sender_username: session
                .profile
                .as_ref()
                .and_then(|p| p.username.clone()),
            sender_avatar_url: session
                .profile
                .as_ref()
                .and_then(|p| p.avatar_url.clone()),
        };

        self.ctx
            .db
            .lock()?
            .insert_message(&view.message)?;
        timeline.append_local(view);
        self.ctx
            .cache
            .lock()?
            .invalidate_prefix(&QueryKey::entity("conversations"));
        self.ctx.bus.emit(ClientEvent::MessagesAppended {
            conversation_id,
            count: 1,
        });

        info!(message = %id.short(), conversation = %conversation_id.short(), "Message sent");
        Ok(id)
    }

    /// Handle a realtime row-insert for the open conversation. The push
    /// payload lacks the sender join, so the full row is re-fetched and
    /// then merged; a duplicate of an optimistic send is a no-op.
    pub async fn handle_insert(
        &self,
        timeline: &mut ConversationTimeline,
        record: &Value,
    ) -> Result<()> {
        let Some(id) = record
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<MessageId>().ok())
        else {
            warn!("Message insert event without a parseable id");
            return Ok(());
        };

        if timeline.contains(id) {
            debug!(message = %id.short(), "Insert event for known message");
            return Ok(());
        }

        let result = self.fetch_view(id).await;
        let Some(view) = self.ctx.surface(result)? else {
            warn!(message = %id.short(), "Inserted message vanished before refetch");
            return Ok(());
        };

        if view.message.conversation_id != timeline.conversation_id() {
            return Ok(());
        }

        self.ctx
            .db
            .lock()?
            .insert_message(&view.message)?;
        {
            let mut cache = self.ctx.cache.lock()?;
            cache.invalidate_prefix(
                &QueryKey::entity("messages").scoped(timeline.conversation_id()),
            );
            cache.invalidate_prefix(&QueryKey::entity("conversations"));
        }
        if timeline.merge_remote(view) {
            self.ctx.bus.emit(ClientEvent::MessagesAppended {
                conversation_id: timeline.conversation_id(),
                count: 1,
            });
        }
        Ok(())
    }

    /// Toggle an emoji on a message for the signed-in user.
    pub async fn toggle_reaction(
        &self,
        session: &Session,
        timeline: &mut ConversationTimeline,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<()> {
        let toggle =
            timeline.toggle_reaction(message_id, session.user.id, emoji, self.ctx.time.now());

        let result = match &toggle {
            ReactionToggle::Added(reaction) => {
                self.ctx.api.insert_only(tables::REACTIONS, reaction).await
            }
            ReactionToggle::Removed(_) => {
                self.ctx
                    .api
                    .delete(
                        tables::REACTIONS,
                        &[
                            ("message_id", eq(message_id)),
                            ("user_id", eq(session.user.id)),
                            ("emoji", eq(emoji)),
                        ],
                    )
                    .await
            }
        };
        self.ctx.surface(result)?;

        {
            let db = self.ctx.db.lock()?;
            match &toggle {
                ReactionToggle::Added(reaction) => {
                    db.add_reaction(message_id, session.user.id, &reaction.emoji)?;
                }
                ReactionToggle::Removed(reaction) => {
                    db.remove_reaction(message_id, session.user.id, &reaction.emoji)?;
                }
            }
        }

        self.ctx.bus.emit(ClientEvent::MessagesUpdated {
            conversation_id: timeline.conversation_id(),
        });
        Ok(())
    }

    pub async fn mark_read(
        &self,
        session: &Session,
        conversation_id: ConversationId,
    ) -> Result<()> {
        let result = self
            .ctx
            .api
            .rpc::<_, Value>(
                functions::MARK_MESSAGES_READ,
                &MarkReadArgs {
                    p_conversation_id: conversation_id.to_string(),
                    p_user_id: session.user.id.to_string(),
                },
            )
            .await
            .map(|_| ());
        self.ctx.surface(result)
    }

    /// Gate and broadcast an outbound typing indicator for an open
    /// conversation.
    pub async fn notify_composing(
        &self,
        coordinator: &mut TypingCoordinator,
        conversation_id: ConversationId,
        display_name: &str,
    ) -> Result<()> {
        if !coordinator.should_broadcast() {
            return Ok(());
        }
        let payload = serde_json::to_value(coordinator.payload(display_name))?;
        self.ctx
            .cmd_tx
            .send(SocketCommand::Broadcast {
                topic: topics::chat(conversation_id),
                event: EVENT_TYPING.to_string(),
                payload,
            })
            .await
            .map_err(|_| syncterest_realtime::RealtimeError::SocketGone)?;
        Ok(())
    }

    /// Record an inbound typing broadcast and publish the changed set.
    pub fn handle_typing(
        &self,
        coordinator: &mut TypingCoordinator,
        topic: &str,
        payload: TypingPayload,
    ) {
        if coordinator.observe(payload) {
            self.ctx.bus.emit(ClientEvent::ComposingChanged {
                topic: topic.to_string(),
                users: coordinator.typing_users(),
            });
        }
    }

    /// Expire stale typing indicators; call on a short interval.
    pub fn expire_typing(&self, coordinator: &mut TypingCoordinator, topic: &str) {
        if coordinator.purge_expired() {
            self.ctx.bus.emit(ClientEvent::ComposingChanged {
                topic: topic.to_string(),
                users: coordinator.typing_users(),
            });
        }
    }

    async fn fetch_page(&self, conversation_id: ConversationId) -> Result<Vec<MessageView>> {
        let rows: Vec<JoinedMessageRow> = self
            .ctx
            .api
            .select(
                tables::MESSAGES,
                &[
                    ("conversation_id", eq(conversation_id)),
                    ("select", "*,profiles(username,avatar_url)".to_string()),
                    ("order", "created_at.desc".to_string()),
                    ("limit", "50".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(MessageView::from).collect())
    }

    async fn fetch_view(&self, id: MessageId) -> Result<Option<MessageView>> {
        let row: Option<JoinedMessageRow> = self
            .ctx
            .api
            .select_one(
                tables::MESSAGES,
                &[
                    ("id", eq(id)),
                    ("select", "*,profiles(username,avatar_url)".to_string()),
                ],
            )
            .await?;
        Ok(row.map(MessageView::from))
    }
}
