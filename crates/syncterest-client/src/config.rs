use url::Url;

use crate::error::Result;

/// Connection settings for one backend project.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Project base URL, e.g. `https://abc.supabase.example`.
    pub base_url: Url,
    /// Public anon key sent as `apikey` on every request.
    pub anon_key: String,
}

impl ClientConfig {
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            anon_key: anon_key.into(),
        })
    }

    /// Realtime websocket endpoint derived from the base URL.
    pub fn realtime_url(&self) -> Result<Url> {
        let mut url = self.base_url.join("realtime/v1/websocket")?;
        let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
        // set_scheme only fails for invalid scheme pairs.
        let _ = url.set_scheme(scheme);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realtime_url_switches_to_websocket_scheme() {
        let config = ClientConfig::new("https://proj.example.com", "anon").unwrap();
        let url = config.realtime_url().unwrap();
        assert_eq!(url.scheme(), "wss");
        assert!(url.path().ends_with("realtime/v1/websocket"));
    }
}
