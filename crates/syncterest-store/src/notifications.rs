use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::{column_timestamp, column_uuid, Database};
use crate::error::Result;
use crate::models::{LiveActivity, Notification};
use syncterest_shared::types::{NotificationId, UserId};

impl Database {
    pub fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO notifications
             (id, user_id, kind, body, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                notification.id.to_string(),
                notification.user_id.to_string(),
                notification.kind,
                notification.body,
                notification.is_read,
                notification.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn notifications_for_user(&self, user_id: UserId, limit: u32) -> Result<Vec<Notification>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, kind, body, is_read, created_at
             FROM notifications
             WHERE user_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id.to_string(), limit], row_to_notification)?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }

    pub fn mark_notification_read(&self, id: NotificationId) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    pub fn unread_notification_count(&self, user_id: UserId) -> Result<u32> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // -- Live activities --------------------------------------------------

    pub fn upsert_live_activity(&self, activity: &LiveActivity) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO live_activities
             (id, user_id, activity, started_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                activity.id.to_string(),
                activity.user_id.to_string(),
                activity.activity,
                activity.started_at.to_rfc3339(),
                activity.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Live activities that have not yet expired.
    pub fn active_live_activities(&self, now: DateTime<Utc>) -> Result<Vec<LiveActivity>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, activity, started_at, expires_at
             FROM live_activities
             WHERE expires_at > ?1
             ORDER BY started_at DESC",
        )?;

        let rows = stmt.query_map(params![now.to_rfc3339()], |row| {
            Ok(LiveActivity {
                id: column_uuid(row, 0)?,
                user_id: UserId(column_uuid(row, 1)?),
                activity: row.get(2)?,
                started_at: column_timestamp(row, 3)?,
                expires_at: column_timestamp(row, 4)?,
            })
        })?;

        let mut activities = Vec::new();
        for row in rows {
            activities.push(row?);
        }
        Ok(activities)
    }

    /// Remove expired live activities. Returns the number deleted.
    pub fn prune_live_activities(&self, now: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM live_activities WHERE expires_at <= ?1",
            params![now.to_rfc3339()],
        )?;
        Ok(affected)
    }
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: NotificationId(column_uuid(row, 0)?),
        user_id: UserId(column_uuid(row, 1)?),
        kind: row.get(2)?,
        body: row.get(3)?,
        is_read: row.get(4)?,
        created_at: column_timestamp(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn unread_count_tracks_mark_read() {
        let (_dir, db) = test_db();
        let user = UserId::new();

        let notification = Notification {
            id: NotificationId::new(),
            user_id: user,
            kind: "follow".into(),
            body: "ada followed you".into(),
            is_read: false,
            created_at: Utc::now(),
        };
        db.insert_notification(&notification).unwrap();
        assert_eq!(db.unread_notification_count(user).unwrap(), 1);

        db.mark_notification_read(notification.id).unwrap();
        assert_eq!(db.unread_notification_count(user).unwrap(), 0);
    }

    #[test]
    fn live_activities_expire() {
        let (_dir, db) = test_db();
        let now = Utc::now();

        db.upsert_live_activity(&LiveActivity {
            id: uuid::Uuid::new_v4(),
            user_id: UserId::new(),
            activity: "at the gym".into(),
            started_at: now - Duration::minutes(10),
            expires_at: now + Duration::minutes(50),
        })
        .unwrap();
        db.upsert_live_activity(&LiveActivity {
            id: uuid::Uuid::new_v4(),
            user_id: UserId::new(),
            activity: "stale".into(),
            started_at: now - Duration::hours(3),
            expires_at: now - Duration::hours(2),
        })
        .unwrap();

        assert_eq!(db.active_live_activities(now).unwrap().len(), 1);
        assert_eq!(db.prune_live_activities(now).unwrap(), 1);
    }
}
