//! Auth session lifecycle.
//!
//! One [`AuthManager`] per process: the auth-state channel is created
//! exactly once, in [`AuthManager::new`], and every consumer gets a
//! receiver from [`AuthManager::subscribe`]. Sign-out explicitly clears
//! the session rather than relying on the channel being dropped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use syncterest_store::Profile;

use crate::api::rest::{eq, tables};
use crate::api::ApiClient;
use crate::error::Result;
use crate::state::{AuthUser, Session};

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: AuthUser,
}

pub struct AuthManager {
    api: Arc<ApiClient>,
    session_tx: watch::Sender<Option<Session>>,
    refresh_token: std::sync::Mutex<Option<String>>,
}

impl AuthManager {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            api,
            session_tx,
            refresh_token: std::sync::Mutex::new(None),
        }
    }

    /// Observe auth-state changes. Receivers see the current value
    /// immediately.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session_tx.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.session_tx.borrow().clone()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let tokens = self
            .token_request("auth/v1/token?grant_type=password", &PasswordGrant {
                email,
                password,
            })
            .await?;
        self.establish(tokens).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let tokens = self
            .token_request("auth/v1/signup", &PasswordGrant { email, password })
            .await?;
        self.establish(tokens).await
    }

    /// Exchange the stored refresh token for a fresh access token.
    pub async fn refresh(&self) -> Result<Session> {
        let refresh_token = self
            .refresh_token
            .lock()?
            .clone()
            .ok_or(crate::error::ClientError::NotSignedIn)?;
        let tokens = self
            .token_request("auth/v1/token?grant_type=refresh_token", &RefreshGrant {
                refresh_token: &refresh_token,
            })
            .await?;
        self.establish(tokens).await
    }

    pub async fn sign_out(&self) -> Result<()> {
        let url = self.api.endpoint("auth/v1/logout")?;
        let response = self
            .api
            .http()
            .post(url)
            .headers(self.api.headers())
            .send()
            .await?;
        if let Err(e) = ApiClient::check(response).await {
            // The local session is cleared regardless.
            warn!(error = %e, "Server-side sign-out failed");
        }

        self.api.set_access_token(None);
        *self.refresh_token.lock()? = None;
        let _ = self.session_tx.send(None);
        info!("Signed out");
        Ok(())
    }

    /// Push a profile update into the current session, re-deriving the
    /// onboarding flag.
    pub fn profile_updated(&self, profile: Profile) {
        self.session_tx.send_modify(|session| {
            if let Some(current) = session.take() {
                *session = Some(current.with_profile(profile.clone()));
            }
        });
    }

    async fn token_request<A: Serialize>(&self, path: &str, body: &A) -> Result<TokenResponse> {
        let url = self.api.endpoint(path)?;
        let response = self
            .api
            .http()
            .post(url)
            .headers(self.api.headers())
            .json(body)
            .send()
            .await?;
        let response = ApiClient::check(response).await?;
        Ok(response.json().await?)
    }

    /// Install tokens, fetch our profile and publish the new session.
    async fn establish(&self, tokens: TokenResponse) -> Result<Session> {
        self.api.set_access_token(Some(tokens.access_token.clone()));
        *self.refresh_token.lock()? = Some(tokens.refresh_token);

        let profile: Option<Profile> = self
            .api
            .select_one(tables::PROFILES, &[("id", eq(tokens.user.id))])
            .await?;

        let session = Session::new(tokens.user, profile);
        info!(
            user = %session.user.id.short(),
            onboarded = session.onboarding_complete,
            "Session established"
        );
        let _ = self.session_tx.send(Some(session.clone()));
        Ok(session)
    }
}
