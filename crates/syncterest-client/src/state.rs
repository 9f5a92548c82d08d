//! Signed-in session state.
//!
//! [`Session::new`] is the one place the onboarding-complete flag is
//! derived; everything else reads the stored boolean.

use serde::{Deserialize, Serialize};

use syncterest_shared::types::UserId;
use syncterest_store::Profile;

/// The authenticated identity as returned by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
}

/// One signed-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: AuthUser,
    /// `None` until the first profile fetch completes.
    pub profile: Option<Profile>,
    pub onboarding_complete: bool,
}

impl Session {
    pub fn new(user: AuthUser, profile: Option<Profile>) -> Self {
        let onboarding_complete = profile
            .as_ref()
            .map(Profile::is_onboarded)
            .unwrap_or(false);
        Self {
            user,
            profile,
            onboarding_complete,
        }
    }

    /// Replace the profile and re-derive the onboarding flag.
    pub fn with_profile(self, profile: Profile) -> Self {
        Self::new(self.user, Some(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> AuthUser {
        AuthUser {
            id: UserId::new(),
            email: "ada@example.com".into(),
        }
    }

    #[test]
    fn missing_profile_means_not_onboarded() {
        let session = Session::new(user(), None);
        assert!(!session.onboarding_complete);
    }

    #[test]
    fn onboarding_flag_follows_profile_updates() {
        let u = user();
        let mut profile = Profile::new(u.id, Utc::now());
        let session = Session::new(u, Some(profile.clone()));
        assert!(!session.onboarding_complete);

        profile.full_name = Some("Ada Lovelace".into());
        profile.username = Some("ada".into());
        profile.interests = vec!["math".into()];
        profile.personality_tags = vec!["analytical".into()];

        let session = session.with_profile(profile);
        assert!(session.onboarding_complete);
    }
}
