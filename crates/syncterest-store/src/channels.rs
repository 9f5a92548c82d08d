use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::{column_timestamp, column_uuid, not_found, Database};
use crate::error::Result;
use crate::models::{Channel, ChannelMember};
use syncterest_shared::types::{ChannelId, UserId};

impl Database {
    pub fn upsert_channel(&self, channel: &Channel) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO channels (id, name, description, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                channel.id.to_string(),
                channel.name,
                channel.description,
                channel.created_by.to_string(),
                channel.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_channel(&self, id: ChannelId) -> Result<Channel> {
        self.conn()
            .query_row(
                "SELECT id, name, description, created_by, created_at
                 FROM channels WHERE id = ?1",
                params![id.to_string()],
                row_to_channel,
            )
            .map_err(not_found)
    }

    pub fn list_channels(&self) -> Result<Vec<Channel>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, description, created_by, created_at
             FROM channels ORDER BY name ASC",
        )?;

        let rows = stmt.query_map([], row_to_channel)?;

        let mut channels = Vec::new();
        for row in rows {
            channels.push(row?);
        }
        Ok(channels)
    }

    pub fn upsert_channel_member(&self, member: &ChannelMember) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO channel_members (channel_id, user_id, role, joined_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                member.channel_id.to_string(),
                member.user_id.to_string(),
                member.role,
                member.joined_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn remove_channel_member(&self, channel_id: ChannelId, user_id: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM channel_members WHERE channel_id = ?1 AND user_id = ?2",
            params![channel_id.to_string(), user_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    pub fn channel_members(&self, channel_id: ChannelId) -> Result<Vec<ChannelMember>> {
        let mut stmt = self.conn().prepare(
            "SELECT channel_id, user_id, role, joined_at
             FROM channel_members WHERE channel_id = ?1 ORDER BY joined_at ASC",
        )?;

        let rows = stmt.query_map(params![channel_id.to_string()], row_to_member)?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }

    pub fn is_channel_member(&self, channel_id: ChannelId, user_id: UserId) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM channel_members WHERE channel_id = ?1 AND user_id = ?2",
            params![channel_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

fn row_to_channel(row: &rusqlite::Row<'_>) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: ChannelId(column_uuid(row, 0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        created_by: UserId(column_uuid(row, 3)?),
        created_at: column_timestamp(row, 4)?,
    })
}

fn row_to_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelMember> {
    Ok(ChannelMember {
        channel_id: ChannelId(column_uuid(row, 0)?),
        user_id: UserId(column_uuid(row, 1)?),
        role: row.get(2)?,
        joined_at: column_timestamp(row, 3)?,
    })
}

pub(crate) fn member_now(channel_id: ChannelId, user_id: UserId, now: DateTime<Utc>) -> ChannelMember {
    ChannelMember {
        channel_id,
        user_id,
        role: "member".into(),
        joined_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn membership_lifecycle() {
        let (_dir, db) = test_db();

        let channel = Channel {
            id: ChannelId::new(),
            name: "rustaceans".into(),
            description: None,
            created_by: UserId::new(),
            created_at: Utc::now(),
        };
        db.upsert_channel(&channel).unwrap();

        let user = UserId::new();
        assert!(!db.is_channel_member(channel.id, user).unwrap());

        db.upsert_channel_member(&member_now(channel.id, user, Utc::now()))
            .unwrap();
        assert!(db.is_channel_member(channel.id, user).unwrap());

        // Re-joining replaces rather than duplicates.
        db.upsert_channel_member(&member_now(channel.id, user, Utc::now()))
            .unwrap();
        assert_eq!(db.channel_members(channel.id).unwrap().len(), 1);

        assert!(db.remove_channel_member(channel.id, user).unwrap());
        assert!(!db.is_channel_member(channel.id, user).unwrap());
    }
}
