//! Notifications: list, realtime push handling, read marking.

use serde_json::Value;
use tracing::{debug, warn};

use syncterest_realtime::Subscription;
use syncterest_shared::protocol::ChannelConfig;
use syncterest_shared::topics;
use syncterest_shared::types::NotificationId;
use syncterest_store::{Notification, QueryKey};

use crate::api::rest::{eq, tables};
use crate::error::Result;
use crate::events::ClientEvent;
use crate::services::ServiceContext;
use crate::state::Session;

pub struct NotificationsService {
    ctx: ServiceContext,
}

impl NotificationsService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Subscribe to the notification change feed.
    pub async fn watch(&self) -> Result<Subscription> {
        let subscription = self
            .ctx
            .registry
            .subscribe(
                topics::NOTIFICATIONS,
                ChannelConfig::with_tables(&[tables::NOTIFICATIONS]),
            )
            .await?;
        Ok(subscription)
    }

    pub async fn list(&self, session: &Session) -> Result<Vec<Notification>> {
        let result = self
            .ctx
            .api
            .select::<Notification>(
                tables::NOTIFICATIONS,
                &[
                    ("user_id", eq(session.user.id)),
                    ("order", "created_at.desc".to_string()),
                    ("limit", "50".to_string()),
                ],
            )
            .await;
        let notifications = self.ctx.surface(result)?;

        {
            let db = self.ctx.db.lock()?;
            for notification in &notifications {
                db.insert_notification(notification)?;
            }
        }
        self.ctx.cache.lock()?.set(
            QueryKey::entity("notifications").scoped(session.user.id),
            serde_json::to_value(&notifications)?,
            self.ctx.time.now(),
        );
        Ok(notifications)
    }

    pub fn unread_count(&self, session: &Session) -> Result<u32> {
        Ok(self
            .ctx
            .db
            .lock()?
            .unread_notification_count(session.user.id)?)
    }

    pub async fn mark_read(&self, id: NotificationId) -> Result<()> {
        let result = self
            .ctx
            .api
            .update(
                tables::NOTIFICATIONS,
                &[("id", eq(id))],
                &serde_json::json!({ "is_read": true }),
            )
            .await;
        self.ctx.surface(result)?;

        self.ctx
            .db
            .lock()?
            .mark_notification_read(id)?;
        self.ctx
            .cache
            .lock()?
            .invalidate_prefix(&QueryKey::entity("notifications"));
        Ok(())
    }

    /// Handle a row-insert from the notification feed. Rows for other
    /// users are dropped.
    pub fn handle_insert(&self, session: &Session, record: &Value) -> Result<()> {
        let notification: Notification = match serde_json::from_value(record.clone()) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Unparseable notification row");
                return Ok(());
            }
        };
        if notification.user_id != session.user.id {
            debug!("Notification for another user dropped");
            return Ok(());
        }

        self.ctx
            .db
            .lock()?
            .insert_notification(&notification)?;
        self.ctx
            .cache
            .lock()?
            .invalidate_prefix(&QueryKey::entity("notifications"));
        self.ctx
            .bus
            .emit(ClientEvent::NotificationArrived { notification });
        Ok(())
    }
}
