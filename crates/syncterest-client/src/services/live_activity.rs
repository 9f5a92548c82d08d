//! Live activities: short-lived "doing this right now" statuses plus
//! the global presence topic for users sharing their location.

use chrono::Duration;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use syncterest_realtime::{PresenceTracker, SocketCommand, Subscription};
use syncterest_shared::protocol::{ChangeKind, ChannelConfig};
use syncterest_shared::topics;
use syncterest_store::LiveActivity;

use crate::api::rest::tables;
use crate::error::Result;
use crate::services::ServiceContext;
use crate::state::Session;

#[derive(Debug, Serialize)]
struct NewActivityRow<'a> {
    id: Uuid,
    user_id: syncterest_shared::types::UserId,
    activity: &'a str,
    started_at: chrono::DateTime<chrono::Utc>,
    expires_at: chrono::DateTime<chrono::Utc>,
}

pub struct LiveActivityService {
    ctx: ServiceContext,
}

impl LiveActivityService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Subscribe to the live-activity change feed.
    pub async fn watch(&self) -> Result<Subscription> {
        let subscription = self
            .ctx
            .registry
            .subscribe(
                topics::LIVE_ACTIVITIES,
                ChannelConfig::with_tables(&[tables::LIVE_ACTIVITIES]),
            )
            .await?;
        Ok(subscription)
    }

    /// Join the global presence topic and announce ourselves on it.
    pub async fn go_live(&self, session: &Session) -> Result<Subscription> {
        let subscription = self
            .ctx
            .registry
            .subscribe(topics::LIVE_USERS, ChannelConfig::with_presence())
            .await?;

        self.ctx
            .cmd_tx
            .send(SocketCommand::TrackPresence {
                topic: topics::LIVE_USERS.to_string(),
                meta: PresenceTracker::heartbeat(session.user.id, self.ctx.time.now()),
            })
            .await
            .map_err(|_| syncterest_realtime::RealtimeError::SocketGone)?;

        Ok(subscription)
    }

    /// Publish a status that expires after `minutes`.
    pub async fn publish(
        &self,
        session: &Session,
        activity: &str,
        minutes: i64,
    ) -> Result<LiveActivity> {
        let now = self.ctx.time.now();
        let row = NewActivityRow {
            id: Uuid::new_v4(),
            user_id: session.user.id,
            activity,
            started_at: now,
            expires_at: now + Duration::minutes(minutes),
        };
        let result = self
            .ctx
            .api
            .insert::<_, LiveActivity>(tables::LIVE_ACTIVITIES, &row)
            .await;
        let stored = self.ctx.surface(result)?;

        self.ctx
            .db
            .lock()?
            .upsert_live_activity(&stored)?;
        info!(activity = %stored.activity, "Live activity published");
        Ok(stored)
    }

    /// Currently active statuses from the local cache, pruning expired
    /// rows first.
    pub fn active(&self) -> Result<Vec<LiveActivity>> {
        let now = self.ctx.time.now();
        let db = self.ctx.db.lock()?;
        db.prune_live_activities(now)?;
        Ok(db.active_live_activities(now)?)
    }

    /// Mirror a change-feed row into the local cache.
    pub fn handle_change(&self, change: ChangeKind, record: &Value) -> Result<()> {
        match change {
            ChangeKind::Insert | ChangeKind::Update => {
                let activity: LiveActivity = match serde_json::from_value(record.clone()) {
                    Ok(a) => a,
                    Err(e) => {
                        warn!(error = %e, "Unparseable live-activity row");
                        return Ok(());
                    }
                };
                self.ctx
                    .db
                    .lock()?
                    .upsert_live_activity(&activity)?;
            }
            ChangeKind::Delete => {
                // Deletes arrive as expirations; pruning covers them.
                self.ctx
                    .db
                    .lock()?
                    .prune_live_activities(self.ctx.time.now())?;
            }
        }
        Ok(())
    }
}
