use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::{column_timestamp, column_uuid, not_found, Database};
use crate::error::Result;
use crate::models::Conversation;
use syncterest_shared::types::{ConversationId, UserId};

impl Database {
    pub fn upsert_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO conversations (id, is_group, title, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                conversation.id.to_string(),
                conversation.is_group,
                conversation.title,
                conversation.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        self.conn()
            .query_row(
                "SELECT id, is_group, title, created_at FROM conversations WHERE id = ?1",
                params![id.to_string()],
                row_to_conversation,
            )
            .map_err(not_found)
    }

    pub fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, is_group, title, created_at
             FROM conversations ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map([], row_to_conversation)?;

        let mut conversations = Vec::new();
        for row in rows {
            conversations.push(row?);
        }
        Ok(conversations)
    }

    pub fn add_participant(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        joined_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO conversation_participants
             (conversation_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![
                conversation_id.to_string(),
                user_id.to_string(),
                joined_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn participants(&self, conversation_id: ConversationId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM conversation_participants
             WHERE conversation_id = ?1 ORDER BY joined_at ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id.to_string()], |row| {
            Ok(UserId(column_uuid(row, 0)?))
        })?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: ConversationId(column_uuid(row, 0)?),
        is_group: row.get(1)?,
        title: row.get(2)?,
        created_at: column_timestamp(row, 3)?,
    })
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
    fn conversation_with_participants() {
        let (_dir, db) = test_db();

        let conversation = Conversation {
            id: ConversationId::new(),
            is_group: true,
            title: Some("weekend plans".into()),
            created_at: Utc::now(),
        };
        db.upsert_conversation(&conversation).unwrap();

        let a = UserId::new();
        let b = UserId::new();
        db.add_participant(conversation.id, a, Utc::now()).unwrap();
        db.add_participant(conversation.id, b, Utc::now()).unwrap();
        // Duplicate joins are ignored.
        db.add_participant(conversation.id, a, Utc::now()).unwrap();

        assert_eq!(db.participants(conversation.id).unwrap().len(), 2);
        assert_eq!(db.list_conversations().unwrap().len(), 1);
    }
}
