//! Google OAuth2 access tokens from a long-lived refresh token.
//!
//! Every `authenticate`/`refresh` exchanges the refresh token at the Google
//! token endpoint. Caching and single-flight refresh live in the delivery
//! session, so this type only talks to Google.

use std::time::Duration;

use async_trait::async_trait;
use docsync_core::{AuthError, AuthProvider, DeliveryCredential};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
}

/// Issues Drive access tokens via the `refresh_token` grant.
pub struct TokenManager {
    http: Client,
    token_url: String,
    google_client_id: String,
    google_client_secret: String,
    refresh_token: Mutex<String>,
}

impl TokenManager {
    /// `timeout` bounds each token request.
    pub fn new(
        google_client_id: String,
        google_client_secret: String,
        refresh_token: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            google_client_id,
            google_client_secret,
            refresh_token: Mutex::new(refresh_token),
        })
    }

    /// Use another token endpoint.
    #[cfg(test)]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Exchange the refresh token for a fresh access token.
    async fn exchange(&self) -> anyhow::Result<DeliveryCredential> {
        let mut refresh_token = self.refresh_token.lock().await;

        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.google_client_id.as_str()),
                ("client_secret", self.google_client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OAuth token refresh failed: {} {}", status, body);
        }

        let token_resp: RefreshResponse = resp.json().await?;

        // Google may rotate the refresh token
        if let Some(rotated) = token_resp.refresh_token {
            debug!("Refresh token rotated by provider");
            *refresh_token = rotated;
        }

        let credential = match token_resp.expires_in {
            Some(secs) => {
                let expires_at = chrono::Utc::now() + chrono::Duration::seconds(secs as i64);
                info!("Obtained OAuth access token, expires at {}", expires_at.to_rfc3339());
                DeliveryCredential::with_expiry(token_resp.access_token, expires_at)
            }
            None => {
                info!("Obtained OAuth access token without expiry information");
                DeliveryCredential::new(token_resp.access_token)
            }
        };

        Ok(credential)
    }
}

#[async_trait]
impl AuthProvider for TokenManager {
    async fn authenticate(&self) -> Result<DeliveryCredential, AuthError> {
        self.exchange().await.map_err(|e| AuthError(e.to_string()))
    }

    async fn refresh(&self, _stale: &DeliveryCredential) -> Result<DeliveryCredential, AuthError> {
        self.exchange().await.map_err(|e| AuthError(e.to_string()))
    }
}
