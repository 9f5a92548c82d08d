//! Object storage: upload then hand back the public URL.

use tracing::info;
use url::Url;

use super::ApiClient;
use crate::error::Result;

impl ApiClient {
    /// Upload an object and return its public URL.
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let url = self.endpoint(&format!("storage/v1/object/{bucket}/{path}"))?;
        let size = bytes.len();

        let response = self
            .http()
            .post(url)
            .headers(self.headers())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        Self::check(response).await?;

        info!(bucket, path, size, "Object uploaded");
        Ok(self.public_url(bucket, path)?.to_string())
    }

    /// Public URL of an object in a public bucket.
    pub fn public_url(&self, bucket: &str, path: &str) -> Result<Url> {
        self.endpoint(&format!("storage/v1/object/public/{bucket}/{path}"))
    }
}
