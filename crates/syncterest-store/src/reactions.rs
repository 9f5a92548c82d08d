use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::database::{column_timestamp, column_uuid, Database};
use crate::error::Result;
use crate::models::Reaction;
use syncterest_shared::types::{MessageId, UserId};

impl Database {
    pub fn add_reaction(
        &self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> Result<Reaction> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        // The unique index on (message_id, user_id, emoji) makes repeats
        // a no-op.
        self.conn().execute(
            "INSERT OR IGNORE INTO reactions (id, message_id, user_id, emoji, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                message_id.to_string(),
                user_id.to_string(),
                emoji,
                now.to_rfc3339(),
            ],
        )?;

        Ok(Reaction {
            id,
            message_id,
            user_id,
            emoji: emoji.to_string(),
            created_at: now,
        })
    }

    pub fn remove_reaction(
        &self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM reactions WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
            params![message_id.to_string(), user_id.to_string(), emoji],
        )?;
        Ok(affected > 0)
    }

    pub fn get_reactions_for_message(&self, message_id: MessageId) -> Result<Vec<Reaction>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, message_id, user_id, emoji, created_at
             FROM reactions WHERE message_id = ?1 ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![message_id.to_string()], row_to_reaction)?;

        let mut reactions = Vec::new();
        for row in rows {
            reactions.push(row?);
        }
        Ok(reactions)
    }
}

fn row_to_reaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reaction> {
    Ok(Reaction {
        id: column_uuid(row, 0)?,
        message_id: MessageId(column_uuid(row, 1)?),
        user_id: UserId(column_uuid(row, 2)?),
        emoji: row.get(3)?,
        created_at: column_timestamp(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Conversation, Message, Profile};
    use syncterest_shared::types::ConversationId;

    fn test_db_with_message() -> (tempfile::TempDir, Database, MessageId) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let conversation = Conversation {
            id: ConversationId::new(),
            is_group: false,
            title: None,
            created_at: Utc::now(),
        };
        db.upsert_conversation(&conversation).unwrap();
        let sender = Profile::new(UserId::new(), Utc::now());
        db.upsert_profile(&sender).unwrap();

        let message = Message {
            id: MessageId::new(),
            conversation_id: conversation.id,
            sender_id: sender.id,
            body: "hi".into(),
            attachment_url: None,
            created_at: Utc::now(),
        };
        db.insert_message(&message).unwrap();

        (dir, db, message.id)
    }

    #[test]
    fn add_then_remove_reaction() {
        let (_dir, db, message_id) = test_db_with_message();
        let user = UserId::new();

        db.add_reaction(message_id, user, "🔥").unwrap();
        assert_eq!(db.get_reactions_for_message(message_id).unwrap().len(), 1);

        assert!(db.remove_reaction(message_id, user, "🔥").unwrap());
        assert!(db.get_reactions_for_message(message_id).unwrap().is_empty());
    }

    #[test]
    fn duplicate_reaction_is_single_row() {
        let (_dir, db, message_id) = test_db_with_message();
        let user = UserId::new();

        db.add_reaction(message_id, user, "🔥").unwrap();
        db.add_reaction(message_id, user, "🔥").unwrap();
        assert_eq!(db.get_reactions_for_message(message_id).unwrap().len(), 1);

        // A different emoji from the same user is a second row.
        db.add_reaction(message_id, user, "❤️").unwrap();
        assert_eq!(db.get_reactions_for_message(message_id).unwrap().len(), 2);
    }
}
