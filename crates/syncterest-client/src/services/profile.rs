//! Profile reads, edits, onboarding completion and avatar upload.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use syncterest_shared::constants::BUCKET_CHAT_ATTACHMENTS;
use syncterest_shared::types::UserId;
use syncterest_shared::validation::ProfileForm;
use syncterest_store::Profile;

use crate::api::rest::{eq, tables};
use crate::error::{ClientError, Result};
use crate::services::ServiceContext;
use crate::state::Session;

#[derive(Debug, Serialize)]
struct ProfilePatch<'a> {
    full_name: &'a str,
    username: &'a str,
    bio: Option<&'a str>,
    interests: &'a [String],
}

#[derive(Debug, Serialize)]
struct OnboardingPatch<'a> {
    #[serde(flatten)]
    profile: ProfilePatch<'a>,
    personality_tags: &'a [String],
}

#[derive(Debug, Serialize)]
struct AvatarPatch<'a> {
    avatar_url: &'a str,
}

pub struct ProfileService {
    ctx: ServiceContext,
}

impl ProfileService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Fetch a profile, refreshing the local cache. Falls back to the
    /// cached row when the network read fails.
    pub async fn get(&self, id: UserId) -> Result<Profile> {
        match self
            .ctx
            .api
            .select_one::<Profile>(tables::PROFILES, &[("id", eq(id))])
            .await
        {
            Ok(Some(profile)) => {
                self.ctx
                    .db
                    .lock()?
                    .upsert_profile(&profile)?;
                Ok(profile)
            }
            Ok(None) => Err(ClientError::Api {
                status: 404,
                code: None,
                message: "Profile not found".into(),
            }),
            Err(e) => {
                let cached = self.ctx.db.lock()?.get_profile(id);
                cached.map_err(|_| e)
            }
        }
    }

    /// Update the signed-in user's profile from a validated form.
    pub async fn update(&self, session: &Session, form: &ProfileForm) -> Result<Profile> {
        form.validate().map_err(ClientError::Validation)?;

        let patch = ProfilePatch {
            full_name: form.full_name.trim(),
            username: form.username.trim(),
            bio: form.bio.as_deref(),
            interests: &form.interests,
        };
        let result = self
            .ctx
            .api
            .update(tables::PROFILES, &[("id", eq(session.user.id))], &patch)
            .await;
        self.ctx.surface(result)?;

        self.refresh_own(session).await
    }

    /// Finish onboarding: profile fields plus the personality-quiz tags,
    /// all required.
    pub async fn complete_onboarding(
        &self,
        session: &Session,
        form: &ProfileForm,
        personality_tags: &[String],
    ) -> Result<Profile> {
        form.validate().map_err(ClientError::Validation)?;
        if personality_tags.is_empty() {
            return Err(ClientError::Validation(vec![
                syncterest_shared::validation::FieldError {
                    field: "personality_tags",
                    message: "Finish the personality quiz".into(),
                },
            ]));
        }

        let patch = OnboardingPatch {
            profile: ProfilePatch {
                full_name: form.full_name.trim(),
                username: form.username.trim(),
                bio: form.bio.as_deref(),
                interests: &form.interests,
            },
            personality_tags,
        };
        let result = self
            .ctx
            .api
            .update(tables::PROFILES, &[("id", eq(session.user.id))], &patch)
            .await;
        self.ctx.surface(result)?;

        let profile = self.refresh_own(session).await?;
        info!(user = %session.user.id.short(), "Onboarding complete");
        Ok(profile)
    }

    /// Upload a new avatar and point the profile at its public URL.
    /// Avatars share the chat-attachments bucket under an `avatars/`
    /// prefix.
    pub async fn upload_avatar(
        &self,
        session: &Session,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let path = format!("avatars/{}/{}", session.user.id, Uuid::new_v4());
        let result = self
            .ctx
            .api
            .upload(BUCKET_CHAT_ATTACHMENTS, &path, bytes, content_type)
            .await;
        let url = self.ctx.surface(result)?;

        let result = self
            .ctx
            .api
            .update(
                tables::PROFILES,
                &[("id", eq(session.user.id))],
                &AvatarPatch { avatar_url: &url },
            )
            .await;
        self.ctx.surface(result)?;

        self.refresh_own(session).await?;
        Ok(url)
    }

    /// Re-fetch our own row and propagate it into the session state.
    async fn refresh_own(&self, session: &Session) -> Result<Profile> {
        let profile = self.get(session.user.id).await?;
        self.ctx.auth.profile_updated(profile.clone());
        Ok(profile)
    }
}
