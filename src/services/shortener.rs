use std::time::Duration;

use anyhow::Context;
use reqwest::Client;

use crate::core::config::Settings;

/// TinyURL-style GET API: the shortened link comes back as the plain-text
/// response body.
#[derive(Debug, Clone)]
pub struct ShortenerService {
    client: Client,
    base_url: String,
}

impl ShortenerService {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(settings.shortener().timeout_seconds))
            .build()
            .context("Failed to build shortener HTTP client")?;

        Ok(Self { client, base_url: settings.shortener().base_url.clone() })
    }

    /// Returns the shortened URL, or the input unchanged when the service
    /// fails in any way. Sharing a long link beats failing the publish.
    pub async fn shorten(&self, long_url: &str) -> String {
        match self.try_shorten(long_url).await {
            Ok(short_url) => short_url,
            Err(err) => {
                tracing::warn!(error = %err, "Link shortener unavailable; using the long URL");
                long_url.to_string()
            }
        }
    }

    async fn try_shorten(&self, long_url: &str) -> anyhow::Result<String> {
        let response = self.client.get(&self.base_url).query(&[("url", long_url)]).send().await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("shortener returned status {status}");
        }

        let body = response.text().await?;
        let short_url = body.trim();
        if short_url.is_empty() || !short_url.starts_with("http") {
            anyhow::bail!("shortener returned an unusable body");
        }

        Ok(short_url.to_string())
    }
}
