use rusqlite::params;

use crate::database::{column_timestamp, column_uuid, not_found, Database};
use crate::error::Result;
use crate::models::{Message, MessageView};
use syncterest_shared::types::{ConversationId, MessageId, UserId};

impl Database {
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO messages
             (id, conversation_id, sender_id, body, attachment_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id.to_string(),
                message.conversation_id.to_string(),
                message.sender_id.to_string(),
                message.body,
                message.attachment_url,
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Messages for a conversation, newest first, joined with the sender's
    /// profile display data.
    pub fn get_messages_for_conversation(
        &self,
        conversation_id: ConversationId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MessageView>> {
        let mut stmt = self.conn().prepare(
            "SELECT m.id, m.conversation_id, m.sender_id, m.body, m.attachment_url,
                    m.created_at, p.username, p.avatar_url
             FROM messages m
             LEFT JOIN profiles p ON p.id = m.sender_id
             WHERE m.conversation_id = ?1
             ORDER BY m.created_at DESC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(
            params![conversation_id.to_string(), limit, offset],
            row_to_message_view,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// A single message with its sender join, the shape realtime handlers
    /// re-fetch before merging into the timeline.
    pub fn get_message_view(&self, id: MessageId) -> Result<MessageView> {
        self.conn()
            .query_row(
                "SELECT m.id, m.conversation_id, m.sender_id, m.body, m.attachment_url,
                        m.created_at, p.username, p.avatar_url
                 FROM messages m
                 LEFT JOIN profiles p ON p.id = m.sender_id
                 WHERE m.id = ?1",
                params![id.to_string()],
                row_to_message_view,
            )
            .map_err(not_found)
    }

    pub fn delete_message(&self, id: MessageId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM messages WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

fn row_to_message_view(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageView> {
    Ok(MessageView {
        message: Message {
            id: MessageId(column_uuid(row, 0)?),
            conversation_id: ConversationId(column_uuid(row, 1)?),
            sender_id: UserId(column_uuid(row, 2)?),
            body: row.get(3)?,
            attachment_url: row.get(4)?,
            created_at: column_timestamp(row, 5)?,
        },
        sender_username: row.get(6)?,
        sender_avatar_url: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Conversation, Profile};
    use chrono::Utc;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn seed_conversation(db: &Database) -> (ConversationId, UserId) {
        let conversation = Conversation {
            id: ConversationId::new(),
            is_group: false,
            title: None,
            created_at: Utc::now(),
        };
        db.upsert_conversation(&conversation).unwrap();

        let mut sender = Profile::new(UserId::new(), Utc::now());
        sender.username = Some("ada".into());
        db.upsert_profile(&sender).unwrap();

        (conversation.id, sender.id)
    }

    #[test]
    fn message_carries_sender_join() {
        let (_dir, db) = test_db();
        let (conversation_id, sender_id) = seed_conversation(&db);

        let message = Message {
            id: MessageId::new(),
            conversation_id,
            sender_id,
            body: "hello".into(),
            attachment_url: None,
            created_at: Utc::now(),
        };
        db.insert_message(&message).unwrap();

        let view = db.get_message_view(message.id).unwrap();
        assert_eq!(view.sender_username.as_deref(), Some("ada"));
        assert_eq!(view.message.body, "hello");
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let (_dir, db) = test_db();
        let (conversation_id, sender_id) = seed_conversation(&db);

        let message = Message {
            id: MessageId::new(),
            conversation_id,
            sender_id,
            body: "hello".into(),
            attachment_url: None,
            created_at: Utc::now(),
        };
        db.insert_message(&message).unwrap();
        db.insert_message(&message).unwrap();

        let messages = db
            .get_messages_for_conversation(conversation_id, 50, 0)
            .unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn pagination_orders_newest_first() {
        let (_dir, db) = test_db();
        let (conversation_id, sender_id) = seed_conversation(&db);

        for i in 0..3 {
            db.insert_message(&Message {
                id: MessageId::new(),
                conversation_id,
                sender_id,
                body: format!("message {i}"),
                attachment_url: None,
                created_at: Utc::now() + chrono::Duration::seconds(i),
            })
            .unwrap();
        }

        let page = db
            .get_messages_for_conversation(conversation_id, 2, 0)
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].message.body, "message 2");
    }
}
