//! Public channels: membership, messages, presence and typing wiring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use syncterest_realtime::{PresenceTracker, SocketCommand, Subscription, TypingCoordinator};
use syncterest_shared::protocol::{ChannelConfig, PresenceMeta, EVENT_TYPING};
use syncterest_shared::topics;
use syncterest_shared::types::{ChannelId, UserId};
use syncterest_store::{Channel, ChannelMember, QueryKey};

use crate::api::rest::{eq, tables};
use crate::api::rpc::functions;
use crate::error::Result;
use crate::events::ClientEvent;
use crate::services::ServiceContext;
use crate::state::Session;

/// One row of the joined-channels list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinedChannel {
    pub channel_id: ChannelId,
    pub name: String,
    pub unread_count: i64,
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct UserArg {
    p_user_id: String,
}

#[derive(Debug, Serialize)]
struct ChannelUserArgs {
    p_channel_id: String,
    p_user_id: String,
}

#[derive(Debug, Serialize)]
struct NewMemberRow {
    channel_id: ChannelId,
    user_id: UserId,
    role: &'static str,
}

/// Live subscriptions backing one open channel screen.
pub struct OpenChannel {
    pub channel_id: ChannelId,
    pub presence: Subscription,
    pub typing: Subscription,
    pub messages: Subscription,
}

pub struct ChannelsService {
    ctx: ServiceContext,
}

impl ChannelsService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self) -> Result<Vec<Channel>> {
        let result = self
            .ctx
            .api
            .select::<Channel>(tables::CHANNELS, &[("order", "name.asc".to_string())])
            .await;
        let channels = self.ctx.surface(result)?;

        let db = self.ctx.db.lock()?;
        for channel in &channels {
            db.upsert_channel(channel)?;
        }
        Ok(channels)
    }

    pub async fn joined_with_unread(&self, session: &Session) -> Result<Vec<JoinedChannel>> {
        let result = self
            .ctx
            .api
            .rpc(
                functions::JOINED_CHANNELS_WITH_UNREAD,
                &UserArg {
                    p_user_id: session.user.id.to_string(),
                },
            )
            .await;
        let joined: Vec<JoinedChannel> = self.ctx.surface(result)?;

        self.ctx.cache.lock()?.set(
            Self::joined_key(session),
            serde_json::to_value(&joined)?,
            self.ctx.time.now(),
        );
        Ok(joined)
    }

    /// Join a channel. A unique-violation from the membership insert
    /// means we are already a member, which counts as success.
    pub async fn join(&self, session: &Session, channel_id: ChannelId) -> Result<()> {
        let row = NewMemberRow {
            channel_id,
            user_id: session.user.id,
            role: "member",
        };
        match self.ctx.api.insert_only(tables::CHANNEL_MEMBERS, &row).await {
            Ok(()) => {}
            Err(e) if e.is_unique_violation() => {
                info!(channel = %channel_id.short(), "Already a member");
            }
            Err(e) => return self.ctx.surface(Err(e)),
        }

        self.ctx
            .db
            .lock()?
            .upsert_channel_member(&ChannelMember {
                channel_id,
                user_id: session.user.id,
                role: "member".to_string(),
                joined_at: self.ctx.time.now(),
            })?;
        self.ctx
            .cache
            .lock()?
            .invalidate_prefix(&QueryKey::entity("channels"));
        info!(channel = %channel_id.short(), "Joined channel");
        Ok(())
    }

    pub async fn leave(&self, session: &Session, channel_id: ChannelId) -> Result<()> {
        let result = self
            .ctx
            .api
            .delete(
                tables::CHANNEL_MEMBERS,
                &[
                    ("channel_id", eq(channel_id)),
                    ("user_id", eq(session.user.id)),
                ],
            )
            .await;
        self.ctx.surface(result)?;

        self.ctx
            .db
            .lock()?
            .remove_channel_member(channel_id, session.user.id)?;
        self.ctx
            .cache
            .lock()?
            .invalidate_prefix(&QueryKey::entity("channels"));
        info!(channel = %channel_id.short(), "Left channel");
        Ok(())
    }

    pub async fn is_admin(&self, session: &Session, channel_id: ChannelId) -> Result<bool> {
        let result = self
            .ctx
            .api
            .rpc(
                functions::IS_CHANNEL_ADMIN,
                &ChannelUserArgs {
                    p_channel_id: channel_id.to_string(),
                    p_user_id: session.user.id.to_string(),
                },
            )
            .await;
        self.ctx.surface(result)
    }

    pub async fn is_member(&self, session: &Session, channel_id: ChannelId) -> Result<bool> {
        let result = self
            .ctx
            .api
            .rpc(
                functions::IS_CHANNEL_MEMBER,
                &ChannelUserArgs {
                    p_channel_id: channel_id.to_string(),
                    p_user_id: session.user.id.to_string(),
                },
            )
            .await;
        self.ctx.surface(result)
    }

    /// Open a channel screen: presence, typing and message-change
    /// subscriptions, plus our own presence announcement.
    pub async fn open(&self, session: &Session, channel_id: ChannelId) -> Result<OpenChannel> {
        let presence_topic = topics::channel_presence(channel_id);
        let presence = self
            .ctx
            .registry
            .subscribe(&presence_topic, ChannelConfig::with_presence())
            .await?;
        let typing = self
            .ctx
            .registry
            .subscribe(&topics::channel_typing(channel_id), ChannelConfig::default())
            .await?;
        let messages = self
            .ctx
            .registry
            .subscribe(
                &topics::channel_changes(channel_id),
                ChannelConfig::with_tables(&[
                    tables::CHANNEL_MESSAGES,
                    tables::CHANNEL_MESSAGE_REACTIONS,
                ]),
            )
            .await?;

        self.ctx
            .cmd_tx
            .send(SocketCommand::TrackPresence {
                topic: presence_topic,
                meta: PresenceTracker::heartbeat(session.user.id, self.ctx.time.now()),
            })
            .await
            .map_err(|_| syncterest_realtime::RealtimeError::SocketGone)?;

        Ok(OpenChannel {
            channel_id,
            presence,
            typing,
            messages,
        })
    }

    /// Gate and broadcast an outbound typing indicator for an open
    /// channel.
    pub async fn notify_composing(
        &self,
        coordinator: &mut TypingCoordinator,
        channel_id: ChannelId,
        display_name: &str,
    ) -> Result<()> {
        if !coordinator.should_broadcast() {
            return Ok(());
        }
        let payload = serde_json::to_value(coordinator.payload(display_name))?;
        self.ctx
            .cmd_tx
            .send(SocketCommand::Broadcast {
                topic: topics::channel_typing(channel_id),
                event: EVENT_TYPING.to_string(),
                payload,
            })
            .await
            .map_err(|_| syncterest_realtime::RealtimeError::SocketGone)?;
        Ok(())
    }

    /// Per-user feed driving the joined-channels list. Each mount gets a
    /// fresh timestamped topic; the registry replaces the previous one.
    pub async fn watch_joined(&self, session: &Session) -> Result<Subscription> {
        let topic = topics::joined_channels(session.user.id, self.ctx.time.now());
        let subscription = self
            .ctx
            .registry
            .subscribe(
                &topic,
                ChannelConfig::with_tables(&[tables::CHANNEL_MEMBERS, tables::CHANNEL_MESSAGES]),
            )
            .await?;
        Ok(subscription)
    }

    /// A change under the joined-channels feed stales the cached list;
    /// the next read refetches it.
    pub fn handle_feed_change(&self, session: &Session) -> Result<()> {
        self.ctx.cache.lock()?.invalidate(&Self::joined_key(session));
        Ok(())
    }

    fn joined_key(session: &Session) -> QueryKey {
        QueryKey::entity("channels")
            .scoped("joined")
            .scoped(session.user.id)
    }

    /// Apply a full presence snapshot and publish the resulting set.
    pub fn handle_presence_sync(
        &self,
        tracker: &mut PresenceTracker,
        topic: &str,
        state: syncterest_shared::protocol::PresenceSnapshot,
    ) {
        tracker.apply_sync(state);
        self.ctx.bus.emit(ClientEvent::PresenceChanged {
            topic: topic.to_string(),
            online: tracker.online_users().into_iter().map(|m| m.user_id).collect(),
        });
    }

    /// Apply an incremental presence change and publish the new set.
    pub fn handle_presence_diff(
        &self,
        tracker: &mut PresenceTracker,
        topic: &str,
        joins: std::collections::HashMap<String, PresenceMeta>,
        leaves: std::collections::HashMap<String, PresenceMeta>,
    ) {
        tracker.apply_diff(joins, leaves);
        self.ctx.bus.emit(ClientEvent::PresenceChanged {
            topic: topic.to_string(),
            online: tracker.online_users().into_iter().map(|m| m.user_id).collect(),
        });
    }

    pub async fn mark_read(&self, session: &Session, channel_id: ChannelId) -> Result<()> {
        let result = self
            .ctx
            .api
            .rpc::<_, Value>(
                functions::MARK_CHANNEL_READ,
                &ChannelUserArgs {
                    p_channel_id: channel_id.to_string(),
                    p_user_id: session.user.id.to_string(),
                },
            )
            .await
            .map(|_| ());
        self.ctx.surface(result)?;

        self.ctx.cache.lock()?.invalidate(&Self::joined_key(session));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Utc};
    use tokio::sync::mpsc;

    use syncterest_realtime::ChannelRegistry;
    use syncterest_shared::time::TimeProvider;
    use syncterest_store::{Database, QueryCache};

    use crate::api::ApiClient;
    use crate::auth::AuthManager;
    use crate::config::ClientConfig;
    use crate::events::EventBus;

    struct FrozenClock(DateTime<Utc>);

    impl TimeProvider for FrozenClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn context(cmd_tx: mpsc::Sender<SocketCommand>, dir: &tempfile::TempDir) -> ServiceContext {
        let config = ClientConfig::new("https://proj.example.com", "anon").unwrap();
        let api = Arc::new(ApiClient::new(&config).unwrap());
        let auth = Arc::new(AuthManager::new(api.clone()));
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        ServiceContext {
            api,
            auth,
            db: Arc::new(Mutex::new(db)),
            cache: Arc::new(Mutex::new(QueryCache::new())),
            registry: ChannelRegistry::new(cmd_tx.clone()),
            cmd_tx,
            bus: EventBus::new(),
            time: Arc::new(FrozenClock(Utc::now())),
        }
    }

    #[tokio::test]
    async fn channel_typing_broadcasts_are_throttled() {
        let dir = tempfile::tempdir().unwrap();
        let (cmd_tx, mut cmd_rx) = mpsc::channel(16);
        let service = ChannelsService::new(context(cmd_tx, &dir));

        let user = UserId::new();
        let time: Arc<dyn TimeProvider> = Arc::new(FrozenClock(Utc::now()));
        let mut coordinator = TypingCoordinator::new(user, time);
        let channel_id = ChannelId::new();

        // Two keystrokes inside the throttle window yield one broadcast,
        // on the channel typing topic.
        service
            .notify_composing(&mut coordinator, channel_id, "ada")
            .await
            .unwrap();
        service
            .notify_composing(&mut coordinator, channel_id, "ada")
            .await
            .unwrap();

        let mut seen = Vec::new();
        while let Ok(cmd) = cmd_rx.try_recv() {
            if let SocketCommand::Broadcast { topic, event, .. } = cmd {
                assert_eq!(event, EVENT_TYPING);
                seen.push(topic);
            }
        }
        assert_eq!(seen, vec![topics::channel_typing(channel_id)]);
    }
}
