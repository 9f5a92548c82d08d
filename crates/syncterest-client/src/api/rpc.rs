//! Named remote procedures.
//!
//! Everything the backend exposes as a stored function goes through
//! [`ApiClient::rpc`]; the typed argument structs live with the service
//! that calls them.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::ApiClient;
use crate::error::Result;

/// Remote procedure names.
pub mod functions {
    pub const NEARBY_USERS: &str = "nearby_users";
    pub const ADVANCED_USER_SEARCH: &str = "advanced_user_search";
    pub const TRENDING_PROFILES: &str = "trending_profiles";
    pub const CONVERSATIONS_WITH_LAST_MESSAGE: &str = "get_conversations_with_last_message";
    pub const JOINED_CHANNELS_WITH_UNREAD: &str = "get_joined_channels_with_unread";
    pub const MARK_CHANNEL_READ: &str = "mark_channel_read";
    pub const MARK_MESSAGES_READ: &str = "mark_messages_read";
    pub const GET_MATCHES: &str = "get_matches";
    pub const GLOBAL_SEARCH: &str = "global_search";
    pub const GRANT_LOCATION_ACCESS: &str = "grant_location_access";
    pub const REVOKE_LOCATION_ACCESS: &str = "revoke_location_access";
    pub const IS_CHANNEL_ADMIN: &str = "is_channel_admin";
    pub const IS_CHANNEL_MEMBER: &str = "is_channel_member";
}

impl ApiClient {
    /// Call a named procedure with JSON arguments.
    pub async fn rpc<A: Serialize, T: DeserializeOwned>(
        &self,
        function: &str,
        args: &A,
    ) -> Result<T> {
        let url = self.endpoint(&format!("rest/v1/rpc/{function}"))?;
        debug!(function, "rpc");

        let response = self
            .http()
            .post(url)
            .headers(self.headers())
            .json(args)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}
