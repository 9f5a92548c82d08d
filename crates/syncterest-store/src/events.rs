use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::{column_timestamp, column_uuid, not_found, Database};
use crate::error::Result;
use crate::models::EventRecord;
use syncterest_shared::types::{EventId, UserId};

impl Database {
    pub fn upsert_event(&self, event: &EventRecord) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO events
             (id, title, description, starts_at, location_name, image_url,
              created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.id.to_string(),
                event.title,
                event.description,
                event.starts_at.to_rfc3339(),
                event.location_name,
                event.image_url,
                event.created_by.to_string(),
                event.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_event(&self, id: EventId) -> Result<EventRecord> {
        self.conn()
            .query_row(
                "SELECT id, title, description, starts_at, location_name, image_url,
                        created_by, created_at
                 FROM events WHERE id = ?1",
                params![id.to_string()],
                row_to_event,
            )
            .map_err(not_found)
    }

    /// Events starting after `from`, soonest first.
    pub fn upcoming_events(&self, from: DateTime<Utc>, limit: u32) -> Result<Vec<EventRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, title, description, starts_at, location_name, image_url,
                    created_by, created_at
             FROM events
             WHERE starts_at > ?1
             ORDER BY starts_at ASC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![from.to_rfc3339(), limit], row_to_event)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    pub fn delete_event(&self, id: EventId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM events WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRecord> {
    Ok(EventRecord {
        id: EventId(column_uuid(row, 0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        starts_at: column_timestamp(row, 3)?,
        location_name: row.get(4)?,
        image_url: row.get(5)?,
        created_by: UserId(column_uuid(row, 6)?),
        created_at: column_timestamp(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn upcoming_excludes_past_events() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        let now = Utc::now();

        for (title, offset) in [("past", -2), ("soon", 1), ("later", 24)] {
            db.upsert_event(&EventRecord {
                id: EventId::new(),
                title: title.into(),
                description: None,
                starts_at: now + Duration::hours(offset),
                location_name: None,
                image_url: None,
                created_by: UserId::new(),
                created_at: now,
            })
            .unwrap();
        }

        let upcoming = db.upcoming_events(now, 10).unwrap();
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].title, "soon");
    }
}
