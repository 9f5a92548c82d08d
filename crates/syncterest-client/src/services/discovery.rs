//! People discovery: nearby users, advanced search, trending profiles
//! and global search.
//!
//! A geolocation fix is requested fresh for every nearby search with a
//! hard timeout; a stale cached position would produce wrong distances,
//! so none is ever reused.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use syncterest_shared::constants::GEOLOCATION_TIMEOUT_SECS;
use syncterest_shared::types::{GeoPosition, UserId};
use syncterest_store::Profile;

use crate::api::rpc::functions;
use crate::error::{ClientError, Result};
use crate::services::ServiceContext;
use crate::state::Session;

/// Source of the device's current position.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Resolve a fresh position fix. Implementations must not serve a
    /// cached value.
    async fn current_position(&self) -> std::result::Result<GeoPosition, String>;
}

/// A nearby-search hit with its distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyUser {
    #[serde(flatten)]
    pub profile: Profile,
    pub distance_km: f64,
}

/// A hit from the compatibility-scored advanced search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredProfile {
    #[serde(flatten)]
    pub profile: Profile,
    pub compatibility: f64,
}

/// Filters for the advanced search.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchFilters {
    pub interests: Vec<String>,
    pub personality_tags: Vec<String>,
    pub intent: Option<String>,
    pub min_age: Option<u8>,
    pub max_age: Option<u8>,
}

#[derive(Debug, Serialize)]
struct NearbyArgs {
    p_latitude: f64,
    p_longitude: f64,
    p_radius_km: f64,
}

#[derive(Debug, Serialize)]
struct AdvancedSearchArgs<'a> {
    p_user_id: String,
    #[serde(flatten)]
    filters: &'a SearchFilters,
}

#[derive(Debug, Serialize)]
struct QueryArg<'a> {
    p_query: &'a str,
}

/// One row of a global full-text search, tagged by entity.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum GlobalSearchHit {
    Profile { id: UserId, username: String },
    Channel { id: String, name: String },
    Event { id: String, title: String },
    Group { id: String, name: String },
}

pub struct DiscoveryService {
    ctx: ServiceContext,
    geo: Arc<dyn GeoProvider>,
}

impl DiscoveryService {
    pub fn new(ctx: ServiceContext, geo: Arc<dyn GeoProvider>) -> Self {
        Self { ctx, geo }
    }

    /// Users within `radius_km` of the device's current position.
    pub async fn nearby(&self, radius_km: f64) -> Result<Vec<NearbyUser>> {
        let position = self.locate().await;
        let position = self.ctx.surface(position)?;

        info!(radius_km, "Nearby search");
        let result = self
            .ctx
            .api
            .rpc(
                functions::NEARBY_USERS,
                &NearbyArgs {
                    p_latitude: position.latitude,
                    p_longitude: position.longitude,
                    p_radius_km: radius_km,
                },
            )
            .await;
        self.ctx.surface(result)
    }

    pub async fn advanced_search(
        &self,
        session: &Session,
        filters: &SearchFilters,
    ) -> Result<Vec<ScoredProfile>> {
        let result = self
            .ctx
            .api
            .rpc(
                functions::ADVANCED_USER_SEARCH,
                &AdvancedSearchArgs {
                    p_user_id: session.user.id.to_string(),
                    filters,
                },
            )
            .await;
        self.ctx.surface(result)
    }

    pub async fn trending(&self) -> Result<Vec<Profile>> {
        let result = self
            .ctx
            .api
            .rpc(functions::TRENDING_PROFILES, &serde_json::json!({}))
            .await;
        self.ctx.surface(result)
    }

    pub async fn matches(&self, session: &Session) -> Result<Vec<ScoredProfile>> {
        let result = self
            .ctx
            .api
            .rpc(
                functions::GET_MATCHES,
                &serde_json::json!({ "p_user_id": session.user.id }),
            )
            .await;
        self.ctx.surface(result)
    }

    pub async fn global_search(&self, query: &str) -> Result<Vec<GlobalSearchHit>> {
        let result = self
            .ctx
            .api
            .rpc(functions::GLOBAL_SEARCH, &QueryArg { p_query: query })
            .await;
        self.ctx.surface(result)
    }

    async fn locate(&self) -> Result<GeoPosition> {
        let fix = tokio::time::timeout(
            Duration::from_secs(GEOLOCATION_TIMEOUT_SECS),
            self.geo.current_position(),
        )
        .await
        .map_err(|_| ClientError::Timeout("a location fix"))?;

        fix.map_err(|message| ClientError::Api {
            status: 0,
            code: None,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverResolves;

    #[async_trait]
    impl GeoProvider for NeverResolves {
        async fn current_position(&self) -> std::result::Result<GeoPosition, String> {
            std::future::pending().await
        }
    }

    struct Fixed(GeoPosition);

    #[async_trait]
    impl GeoProvider for Fixed {
        async fn current_position(&self) -> std::result::Result<GeoPosition, String> {
            Ok(self.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn location_fix_times_out_hard() {
        let provider = NeverResolves;
        let fix = tokio::time::timeout(
            Duration::from_secs(GEOLOCATION_TIMEOUT_SECS),
            provider.current_position(),
        )
        .await;
        assert!(fix.is_err());
    }

    #[tokio::test]
    async fn fresh_fix_is_used_as_is() {
        let position = GeoPosition {
            latitude: 48.8566,
            longitude: 2.3522,
        };
        let provider = Fixed(position);
        let fix = provider.current_position().await.unwrap();
        assert_eq!(fix, position);
    }
}
