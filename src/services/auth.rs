use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::core::config::Settings;
use crate::schemas::User;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("auth provider rejected the request (status {0})")]
    Rejected(u16),
}

/// Thin client over the backend's auth endpoint. The exam session never
/// touches this; callers use it to steer signed-in teachers away from the
/// student-facing page.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<WireUserMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireUserMetadata {
    #[serde(default)]
    full_name: Option<String>,
}

impl AuthClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        let Some(base_url) = settings.backend().base_url.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.backend().timeout_seconds))
            .build()
            .context("Failed to build auth HTTP client")?;

        Ok(Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: settings.backend().api_key.clone(),
        }))
    }

    /// `None` means nobody is signed in; only transport and server errors
    /// surface.
    pub async fn current_user(&self, access_token: &str) -> Result<Option<User>, AuthError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AuthError::Rejected(status.as_u16()));
        }

        let wire: WireUser = response.json().await?;
        Ok(Some(map_user(wire)))
    }
}

fn map_user(wire: WireUser) -> User {
    User {
        id: wire.id,
        email: wire.email,
        full_name: wire.user_metadata.and_then(|metadata| metadata.full_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_user_flattens_metadata() {
        let wire: WireUser = serde_json::from_str(
            r#"{"id":"u-1","email":"t@example.org","user_metadata":{"full_name":"Terry Teacher"}}"#,
        )
        .expect("wire user");

        let user = map_user(wire);
        assert_eq!(user.id, "u-1");
        assert_eq!(user.email.as_deref(), Some("t@example.org"));
        assert_eq!(user.full_name.as_deref(), Some("Terry Teacher"));
    }

    #[test]
    fn map_user_tolerates_missing_metadata() {
        let wire: WireUser = serde_json::from_str(r#"{"id":"u-2"}"#).expect("wire user");
        let user = map_user(wire);
        assert_eq!(user.id, "u-2");
        assert!(user.email.is_none());
        assert!(user.full_name.is_none());
    }
}
