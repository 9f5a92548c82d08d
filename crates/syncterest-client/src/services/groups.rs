//! Interest groups: creation, membership, member lists.

use serde::Serialize;
use tracing::info;

use syncterest_shared::types::{GroupId, UserId};
use syncterest_shared::validation::GroupForm;
use syncterest_store::{Group, GroupMember};

use crate::api::rest::{eq, tables};
use crate::error::{ClientError, Result};
use crate::services::ServiceContext;
use crate::state::Session;

#[derive(Debug, Serialize)]
struct NewGroupRow<'a> {
    id: GroupId,
    name: &'a str,
    description: Option<&'a str>,
    is_private: bool,
    created_by: UserId,
}

#[derive(Debug, Serialize)]
struct NewMemberRow {
    group_id: GroupId,
    user_id: UserId,
    role: &'static str,
}

pub struct GroupsService {
    ctx: ServiceContext,
}

impl GroupsService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a group; the creator joins as owner.
    pub async fn create(&self, session: &Session, form: &GroupForm) -> Result<Group> {
        form.validate().map_err(ClientError::Validation)?;

        let row = NewGroupRow {
            id: GroupId::new(),
            name: form.name.trim(),
            description: form.description.as_deref(),
            is_private: form.is_private,
            created_by: session.user.id,
        };
        let result = self.ctx.api.insert::<_, Group>(tables::GROUPS, &row).await;
        let stored = self.ctx.surface(result)?;

        let member = NewMemberRow {
            group_id: stored.id,
            user_id: session.user.id,
            role: "owner",
        };
        let result = self.ctx.api.insert_only(tables::GROUP_MEMBERS, &member).await;
        self.ctx.surface(result)?;

        self.ctx.db.lock()?.upsert_group(&stored)?;
        info!(group = %stored.id.short(), "Group created");
        Ok(stored)
    }

    pub async fn get(&self, id: GroupId) -> Result<Group> {
        match self
            .ctx
            .api
            .select_one::<Group>(tables::GROUPS, &[("id", eq(id))])
            .await
        {
            Ok(Some(group)) => {
                self.ctx.db.lock()?.upsert_group(&group)?;
                Ok(group)
            }
            Ok(None) => Err(ClientError::Api {
                status: 404,
                code: None,
                message: "Group not found".into(),
            }),
            Err(e) => {
                let cached = self.ctx.db.lock()?.get_group(id);
                cached.map_err(|_| e)
            }
        }
    }

    pub async fn list_public(&self) -> Result<Vec<Group>> {
        let result = self
            .ctx
            .api
            .select::<Group>(
                tables::GROUPS,
                &[
                    ("is_private", eq(false)),
                    ("order", "name.asc".to_string()),
                ],
            )
            .await;
        self.ctx.surface(result)
    }

    /// Join a group; a unique-violation means already a member.
    pub async fn join(&self, session: &Session, group_id: GroupId) -> Result<()> {
        let row = NewMemberRow {
            group_id,
            user_id: session.user.id,
            role: "member",
        };
        match self.ctx.api.insert_only(tables::GROUP_MEMBERS, &row).await {
            Ok(()) => {}
            Err(e) if e.is_unique_violation() => {
                info!(group = %group_id.short(), "Already a member");
            }
            Err(e) => return self.ctx.surface(Err(e)),
        }

        self.ctx
            .db
            .lock()?
            .upsert_group_member(&GroupMember {
                group_id,
                user_id: session.user.id,
                role: "member".to_string(),
                joined_at: self.ctx.time.now(),
            })?;
        Ok(())
    }

    pub async fn leave(&self, session: &Session, group_id: GroupId) -> Result<()> {
        let result = self
            .ctx
            .api
            .delete(
                tables::GROUP_MEMBERS,
                &[
                    ("group_id", eq(group_id)),
                    ("user_id", eq(session.user.id)),
                ],
            )
            .await;
        self.ctx.surface(result)?;

        self.ctx
            .db
            .lock()?
            .remove_group_member(group_id, session.user.id)?;
        Ok(())
    }

    pub async fn members(&self, group_id: GroupId) -> Result<Vec<GroupMember>> {
        let result = self
            .ctx
            .api
            .select::<GroupMember>(tables::GROUP_MEMBERS, &[("group_id", eq(group_id))])
            .await;
        let members = self.ctx.surface(result)?;

        let db = self.ctx.db.lock()?;
        for member in &members {
            db.upsert_group_member(member)?;
        }
        Ok(members)
    }
}
