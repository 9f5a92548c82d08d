use rusqlite::params;

use crate::database::{column_timestamp, column_uuid, not_found, Database};
use crate::error::Result;
use crate::models::{Group, GroupMember};
use syncterest_shared::types::{GroupId, UserId};

impl Database {
    pub fn upsert_group(&self, group: &Group) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO groups
             (id, name, description, is_private, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                group.id.to_string(),
                group.name,
                group.description,
                group.is_private,
                group.created_by.to_string(),
                group.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_group(&self, id: GroupId) -> Result<Group> {
        self.conn()
            .query_row(
                "SELECT id, name, description, is_private, created_by, created_at
                 FROM groups WHERE id = ?1",
                params![id.to_string()],
                row_to_group,
            )
            .map_err(not_found)
    }

    pub fn upsert_group_member(&self, member: &GroupMember) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO group_members (group_id, user_id, role, joined_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                member.group_id.to_string(),
                member.user_id.to_string(),
                member.role,
                member.joined_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn remove_group_member(&self, group_id: GroupId, user_id: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
            params![group_id.to_string(), user_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    pub fn group_members(&self, group_id: GroupId) -> Result<Vec<GroupMember>> {
        let mut stmt = self.conn().prepare(
            "SELECT group_id, user_id, role, joined_at
             FROM group_members WHERE group_id = ?1 ORDER BY joined_at ASC",
        )?;

        let rows = stmt.query_map(params![group_id.to_string()], |row| {
            Ok(GroupMember {
                group_id: GroupId(column_uuid(row, 0)?),
                user_id: UserId(column_uuid(row, 1)?),
                role: row.get(2)?,
                joined_at: column_timestamp(row, 3)?,
            })
        })?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }
}

fn row_to_group(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: GroupId(column_uuid(row, 0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        is_private: row.get(3)?,
        created_by: UserId(column_uuid(row, 4)?),
        created_at: column_timestamp(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn group_round_trip_with_members() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let group = Group {
            id: GroupId::new(),
            name: "hikers".into(),
            description: Some("weekend hikes".into()),
            is_private: true,
            created_by: UserId::new(),
            created_at: Utc::now(),
        };
        db.upsert_group(&group).unwrap();

        let loaded = db.get_group(group.id).unwrap();
        assert!(loaded.is_private);

        let member = GroupMember {
            group_id: group.id,
            user_id: UserId::new(),
            role: "admin".into(),
            joined_at: Utc::now(),
        };
        db.upsert_group_member(&member).unwrap();
        assert_eq!(db.group_members(group.id).unwrap().len(), 1);

        assert!(db.remove_group_member(group.id, member.user_id).unwrap());
        assert!(db.group_members(group.id).unwrap().is_empty());
    }
}
