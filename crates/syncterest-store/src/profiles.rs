use rusqlite::params;

use crate::database::{column_json, column_timestamp, column_uuid, not_found, Database};
use crate::error::Result;
use crate::models::Profile;
use syncterest_shared::types::UserId;

impl Database {
    /// Insert or replace a profile row synced from the backend.
    pub fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO profiles
             (id, username, full_name, avatar_url, bio, interests, personality_tags,
              last_active_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                profile.id.to_string(),
                profile.username,
                profile.full_name,
                profile.avatar_url,
                profile.bio,
                serde_json::to_string(&profile.interests)?,
                serde_json::to_string(&profile.personality_tags)?,
                profile.last_active_at.map(|t| t.to_rfc3339()),
                profile.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, id: UserId) -> Result<Profile> {
        self.conn()
            .query_row(
                "SELECT id, username, full_name, avatar_url, bio, interests,
                        personality_tags, last_active_at, created_at
                 FROM profiles WHERE id = ?1",
                params![id.to_string()],
                row_to_profile,
            )
            .map_err(not_found)
    }

    pub fn search_profiles_by_username(&self, pattern: &str, limit: u32) -> Result<Vec<Profile>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, username, full_name, avatar_url, bio, interests,
                    personality_tags, last_active_at, created_at
             FROM profiles
             WHERE username LIKE ?1
             ORDER BY username ASC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![format!("%{pattern}%"), limit], row_to_profile)?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?);
        }
        Ok(profiles)
    }

    pub fn touch_profile_activity(
        &self,
        id: UserId,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        self.conn().execute(
            "UPDATE profiles SET last_active_at = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let last_active: Option<String> = row.get(7)?;
    let last_active_at = match last_active {
        Some(_) => Some(column_timestamp(row, 7)?),
        None => None,
    };

    Ok(Profile {
        id: UserId(column_uuid(row, 0)?),
        username: row.get(1)?,
        full_name: row.get(2)?,
        avatar_url: row.get(3)?,
        bio: row.get(4)?,
        interests: column_json(row, 5)?,
        personality_tags: column_json(row, 6)?,
        last_active_at,
        created_at: column_timestamp(row, 8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn profile_round_trip() {
        let (_dir, db) = test_db();

        let mut profile = Profile::new(UserId::new(), Utc::now());
        profile.username = Some("ada".into());
        profile.interests = vec!["math".into(), "poetry".into()];

        db.upsert_profile(&profile).unwrap();
        let loaded = db.get_profile(profile.id).unwrap();
        assert_eq!(loaded.username.as_deref(), Some("ada"));
        assert_eq!(loaded.interests, profile.interests);
    }

    #[test]
    fn missing_profile_is_not_found() {
        let (_dir, db) = test_db();
        assert!(matches!(
            db.get_profile(UserId::new()),
            Err(crate::StoreError::NotFound)
        ));
    }

    #[test]
    fn username_search_matches_substring() {
        let (_dir, db) = test_db();

        for name in ["ada_l", "grace_h", "adamant"] {
            let mut p = Profile::new(UserId::new(), Utc::now());
            p.username = Some(name.into());
            db.upsert_profile(&p).unwrap();
        }

        let hits = db.search_profiles_by_username("ada", 10).unwrap();
        assert_eq!(hits.len(), 2);
    }
}
