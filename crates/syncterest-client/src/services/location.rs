//! Location sharing: grant/revoke permissions and the access audit
//! trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use syncterest_shared::types::UserId;

use crate::api::rest::{eq, tables};
use crate::api::rpc::functions;
use crate::error::Result;
use crate::services::ServiceContext;
use crate::state::Session;

/// A standing permission to see our live location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingPermission {
    pub owner_id: UserId,
    pub grantee_id: UserId,
    pub granted_at: DateTime<Utc>,
}

/// One audit row: who looked at our location and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessAuditEntry {
    pub owner_id: UserId,
    pub accessor_id: UserId,
    pub accessed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct GrantArgs {
    p_grantee_id: String,
}

pub struct LocationService {
    ctx: ServiceContext,
}

impl LocationService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn grant(&self, grantee: UserId) -> Result<()> {
        let result = self
            .ctx
            .api
            .rpc::<_, Value>(
                functions::GRANT_LOCATION_ACCESS,
                &GrantArgs {
                    p_grantee_id: grantee.to_string(),
                },
            )
            .await
            .map(|_| ());
        self.ctx.surface(result)?;
        info!(grantee = %grantee.short(), "Location access granted");
        Ok(())
    }

    pub async fn revoke(&self, grantee: UserId) -> Result<()> {
        let result = self
            .ctx
            .api
            .rpc::<_, Value>(
                functions::REVOKE_LOCATION_ACCESS,
                &GrantArgs {
                    p_grantee_id: grantee.to_string(),
                },
            )
            .await
            .map(|_| ());
        self.ctx.surface(result)?;
        info!(grantee = %grantee.short(), "Location access revoked");
        Ok(())
    }

    pub async fn permissions(&self, session: &Session) -> Result<Vec<SharingPermission>> {
        let result = self
            .ctx
            .api
            .select(
                tables::LOCATION_SHARING_PERMISSIONS,
                &[("owner_id", eq(session.user.id))],
            )
            .await;
        self.ctx.surface(result)
    }

    pub async fn access_audit(&self, session: &Session) -> Result<Vec<AccessAuditEntry>> {
        let result = self
            .ctx
            .api
            .select(
                tables::LOCATION_ACCESS_AUDIT,
                &[
                    ("owner_id", eq(session.user.id)),
                    ("order", "accessed_at.desc".to_string()),
                    ("limit", "100".to_string()),
                ],
            )
            .await;
        self.ctx.surface(result)
    }
}
