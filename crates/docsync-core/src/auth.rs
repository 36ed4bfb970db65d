//! Bearer credentials and the capability that issues them.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::AuthError;

/// Refresh this long before a known expiry.
const EXPIRY_SKEW_MINUTES: i64 = 5;

/// An opaque bearer credential. Replaced wholesale on refresh.
#[derive(Clone)]
pub struct DeliveryCredential {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl DeliveryCredential {
    /// A credential that is only known to be expired when the remote says so.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at: Some(expires_at),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// No expiry is known; only a rejected request reveals it.
    pub fn expires_implicitly(&self) -> bool {
        self.expires_at.is_none()
    }

    /// True once a known expiry is within the refresh skew.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => Utc::now() >= exp - Duration::minutes(EXPIRY_SKEW_MINUTES),
            None => false,
        }
    }
}

impl std::fmt::Debug for DeliveryCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryCredential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues and refreshes bearer credentials for the delivery transport.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Obtain a first credential.
    async fn authenticate(&self) -> Result<DeliveryCredential, AuthError>;

    /// Obtain a replacement for a credential the remote rejected.
    async fn refresh(&self, stale: &DeliveryCredential) -> Result<DeliveryCredential, AuthError>;
}
