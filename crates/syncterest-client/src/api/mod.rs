//! HTTP client for the hosted backend: PostgREST tables, named remote
//! procedures, auth endpoints and object storage.

pub mod rest;
pub mod rpc;
pub mod storage;

use std::sync::RwLock;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Error body shape PostgREST and the auth service both use.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, alias = "msg", alias = "error_description")]
    message: Option<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            anon_key: config.anon_key.clone(),
            access_token: RwLock::new(None),
        })
    }

    /// Install or clear the signed-in access token. Subsequent requests
    /// authenticate as that session (or fall back to the anon key).
    pub fn set_access_token(&self, token: Option<String>) {
        *self
            .access_token
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = token;
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    pub(crate) fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", value);
        }
        let bearer = self
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {bearer}")) {
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        headers
    }

    /// Map a non-2xx response to [`ClientError::Api`], keeping the
    /// backend's error code when the body carries one.
    pub(crate) async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed: Option<ApiErrorBody> = serde_json::from_str(&body).ok();
        let (code, message) = match parsed {
            Some(parsed) => (
                parsed.code,
                parsed.message.unwrap_or_else(|| body.clone()),
            ),
            None => (None, body),
        };

        if status != StatusCode::CONFLICT {
            warn!(status = status.as_u16(), code = ?code, "API request failed");
        }
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}
