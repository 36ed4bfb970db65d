//! In-memory auth provider and transport for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::auth::{AuthProvider, DeliveryCredential};
use crate::error::{AuthError, TransportError};
use crate::transport::{DeliveryTransport, PutOutcome};

/// Issues `token-0`, `token-1`, ... and counts calls.
#[derive(Default)]
pub struct FakeAuth {
    issued: AtomicUsize,
    authenticate_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    fail_refresh: bool,
    expiring_first: bool,
}

impl FakeAuth {
    pub fn failing_refresh() -> Self {
        Self {
            fail_refresh: true,
            ..Default::default()
        }
    }

    /// The first credential already sits inside the expiry skew.
    pub fn expiring_first() -> Self {
        Self {
            expiring_first: true,
            ..Default::default()
        }
    }

    pub fn authenticate_calls(&self) -> usize {
        self.authenticate_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn issue(&self) -> DeliveryCredential {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let token = format!("token-{}", n);
        if n == 0 && self.expiring_first {
            DeliveryCredential::with_expiry(token, Utc::now())
        } else {
            DeliveryCredential::new(token)
        }
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn authenticate(&self) -> Result<DeliveryCredential, AuthError> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.issue())
    }

    async fn refresh(&self, _stale: &DeliveryCredential) -> Result<DeliveryCredential, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh {
            return Err(AuthError("refresh token revoked".into()));
        }
        Ok(self.issue())
    }
}

/// Scripted response for the next put.
#[derive(Debug, Clone, Copy)]
pub enum Response {
    Unauthorized,
    Network,
    Rejected,
}

/// In-memory folder store keyed by `(destination_id, file_name)`.
#[derive(Default)]
pub struct FakeTransport {
    script: Mutex<VecDeque<Response>>,
    rejected_token: Option<String>,
    failing_names: Vec<String>,
    store: Mutex<HashMap<(String, String), Vec<u8>>>,
    tokens: Mutex<Vec<String>>,
}

impl FakeTransport {
    /// Play `responses` in order, then accept every put.
    pub fn scripted(responses: impl IntoIterator<Item = Response>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Reject every put that presents `token`.
    pub fn rejecting_token(token: &str) -> Self {
        Self {
            rejected_token: Some(token.to_string()),
            ..Default::default()
        }
    }

    /// Reject (non-auth) every put of a file with one of these names.
    pub fn failing_names(names: &[&str]) -> Self {
        Self {
            failing_names: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn stored(&self, destination_id: &str, file_name: &str) -> Option<Vec<u8>> {
        self.store
            .lock()
            .unwrap()
            .get(&(destination_id.to_string(), file_name.to_string()))
            .cloned()
    }

    pub fn entry_count(&self) -> usize {
        self.store.lock().unwrap().len()
    }
}

#[async_trait]
impl DeliveryTransport for FakeTransport {
    async fn put(
        &self,
        token: &str,
        destination_id: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<PutOutcome, TransportError> {
        self.tokens.lock().unwrap().push(token.to_string());

        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(Response::Unauthorized) => {
                return Err(TransportError::Unauthorized("token expired".into()))
            }
            Some(Response::Network) => return Err(TransportError::Network("connection reset".into())),
            Some(Response::Rejected) => return Err(TransportError::Rejected("403 forbidden".into())),
            None => {}
        }

        if self.rejected_token.as_deref() == Some(token) {
            return Err(TransportError::Unauthorized("token expired".into()));
        }
        if self.failing_names.iter().any(|n| n == file_name) {
            return Err(TransportError::Rejected("quota exceeded".into()));
        }

        let key = (destination_id.to_string(), file_name.to_string());
        let previous = self.store.lock().unwrap().insert(key, data.to_vec());
        Ok(match previous {
            Some(_) => PutOutcome::Replaced,
            None => PutOutcome::Created,
        })
    }
}
