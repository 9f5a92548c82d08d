//! Typed table access over PostgREST-style endpoints.
//!
//! Queries are (column, filter) pairs in PostgREST operator syntax,
//! e.g. `("id", "eq.<uuid>")` or `("starts_at", "gte.<timestamp>")`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::ApiClient;
use crate::error::Result;

/// Table names as exposed by the backend schema.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const MESSAGES: &str = "messages";
    pub const CONVERSATIONS: &str = "conversations";
    pub const CONVERSATION_PARTICIPANTS: &str = "conversation_participants";
    pub const CHANNELS: &str = "channels";
    pub const CHANNEL_MESSAGES: &str = "channel_messages";
    pub const CHANNEL_MEMBERS: &str = "channel_members";
    pub const CHANNEL_MESSAGE_REACTIONS: &str = "channel_message_reactions";
    pub const REACTIONS: &str = "reactions";
    pub const EVENTS: &str = "events";
    pub const EVENT_ATTENDEES: &str = "event_attendees";
    pub const GROUPS: &str = "groups";
    pub const GROUP_MEMBERS: &str = "group_members";
    pub const FOLLOWERS: &str = "followers";
    pub const STORIES: &str = "stories";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const BLOCKED_USERS: &str = "blocked_users";
    pub const LIVE_ACTIVITIES: &str = "live_activities";
    pub const LOCATION_SHARING_PERMISSIONS: &str = "location_sharing_permissions";
    pub const LOCATION_ACCESS_AUDIT: &str = "location_access_audit";
    pub const INTENT_OPTIONS: &str = "intent_options";
    pub const PERSONALITY_TAGS_OPTIONS: &str = "personality_tags_options";
}

impl ApiClient {
    /// Read rows matching the query filters.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        debug!(table, filters = query.len(), "select");

        let response = self
            .http()
            .get(url)
            .headers(self.headers())
            .query(query)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// Read at most one row. More than one match returns the first.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let mut rows: Vec<T> = self.select(table, query).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    /// Insert a row and return the representation the backend stored.
    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<R> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        debug!(table, "insert");

        let response = self
            .http()
            .post(url)
            .headers(self.headers())
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let response = Self::check(response).await?;

        // Representation responses are arrays even for single inserts.
        let mut rows: Vec<R> = response.json().await?;
        rows.pop().ok_or_else(|| crate::error::ClientError::Api {
            status: 200,
            code: None,
            message: "Insert returned no representation".into(),
        })
    }

    /// Insert without reading the result back.
    pub async fn insert_only<T: Serialize>(&self, table: &str, row: &T) -> Result<()> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        debug!(table, "insert");

        let response = self
            .http()
            .post(url)
            .headers(self.headers())
            .json(row)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Patch rows matching the query filters.
    pub async fn update<T: Serialize>(
        &self,
        table: &str,
        query: &[(&str, String)],
        patch: &T,
    ) -> Result<()> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        debug!(table, filters = query.len(), "update");

        let response = self
            .http()
            .patch(url)
            .headers(self.headers())
            .query(query)
            .json(patch)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Delete rows matching the query filters.
    pub async fn delete(&self, table: &str, query: &[(&str, String)]) -> Result<()> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        debug!(table, filters = query.len(), "delete");

        let response = self
            .http()
            .delete(url)
            .headers(self.headers())
            .query(query)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Build an `eq.` filter for a displayable value.
pub fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_filter_shape() {
        assert_eq!(eq("abc"), "eq.abc");
        assert_eq!(eq(42), "eq.42");
    }
}
