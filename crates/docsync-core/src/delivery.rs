//! Credential-holding delivery session.
//!
//! The session acquires a credential lazily and shares it across concurrent
//! deliveries. When the remote rejects it, the session re-authenticates once
//! and retries the same put once. A second rejection is final.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::auth::{AuthProvider, DeliveryCredential};
use crate::error::{AuthError, DeliveryError, TransportError};
use crate::transport::{DeliveryTransport, PutOutcome};

/// Credential plus the generation it was issued in. The generation tells a
/// delivery whether someone else already refreshed the credential it saw fail.
#[derive(Debug, Clone)]
struct HeldCredential {
    credential: DeliveryCredential,
    generation: u64,
}

/// Where one logical delivery stands with respect to authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthPhase {
    /// Using the credential the session held when the delivery started.
    Authenticated,
    /// Using a credential obtained after the first rejection.
    Reauthenticated,
}

pub struct DeliverySession {
    auth: Arc<dyn AuthProvider>,
    transport: Arc<dyn DeliveryTransport>,
    held: Mutex<Option<HeldCredential>>,
}

impl DeliverySession {
    pub fn new(auth: Arc<dyn AuthProvider>, transport: Arc<dyn DeliveryTransport>) -> Self {
        Self {
            auth,
            transport,
            held: Mutex::new(None),
        }
    }

    /// Read `local_path` and put it at `(destination_id, file_name)`.
    #[instrument(skip(self), level = "debug")]
    pub async fn deliver(
        &self,
        local_path: &Path,
        destination_id: &str,
        file_name: &str,
    ) -> Result<PutOutcome, DeliveryError> {
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|source| DeliveryError::Unreadable {
                path: local_path.to_path_buf(),
                source,
            })?;

        self.deliver_bytes(&data, destination_id, file_name).await
    }

    /// Put `data` at `(destination_id, file_name)` with one re-authentication
    /// on credential rejection.
    pub async fn deliver_bytes(
        &self,
        data: &[u8],
        destination_id: &str,
        file_name: &str,
    ) -> Result<PutOutcome, DeliveryError> {
        let mut held = self.current().await?;
        let mut phase = AuthPhase::Authenticated;

        loop {
            let result = self
                .transport
                .put(held.credential.token(), destination_id, file_name, data)
                .await;

            match (result, phase) {
                (Ok(outcome), _) => {
                    debug!(
                        "Delivered {} ({} bytes) to {}: {}",
                        file_name,
                        data.len(),
                        destination_id,
                        outcome.label()
                    );
                    return Ok(outcome);
                }
                (Err(TransportError::Unauthorized(reason)), AuthPhase::Authenticated) => {
                    warn!("Credential rejected for {} ({}), re-authenticating", file_name, reason);
                    held = self.reauthenticate(held.generation).await?;
                    phase = AuthPhase::Reauthenticated;
                }
                (Err(TransportError::Unauthorized(reason)), AuthPhase::Reauthenticated) => {
                    return Err(DeliveryError::AuthExpired(reason));
                }
                (Err(e), _) => return Err(DeliveryError::Transport(e)),
            }
        }
    }

    /// The held credential, acquiring one on first use. A credential whose
    /// known expiry is near is refreshed before use.
    async fn current(&self) -> Result<HeldCredential, AuthError> {
        let mut slot = self.held.lock().await;

        match slot.as_ref() {
            Some(held) if !held.credential.is_expired() => return Ok(held.clone()),
            Some(held) => {
                debug!("Credential close to expiry, refreshing ahead of use");
                let credential = self.auth.refresh(&held.credential).await?;
                let next = HeldCredential {
                    credential,
                    generation: held.generation + 1,
                };
                *slot = Some(next.clone());
                return Ok(next);
            }
            None => {}
        }

        let credential = self.auth.authenticate().await?;
        info!("Acquired delivery credential");
        let held = HeldCredential {
            credential,
            generation: 0,
        };
        *slot = Some(held.clone());
        Ok(held)
    }

    /// Replace the credential of generation `stale`, unless another delivery
    /// already did. Only one refresh runs at a time.
    async fn reauthenticate(&self, stale: u64) -> Result<HeldCredential, AuthError> {
        let mut slot = self.held.lock().await;

        if let Some(held) = slot.as_ref() {
            if held.generation != stale {
                debug!("Credential already refreshed by a concurrent delivery");
                return Ok(held.clone());
            }
        }

        let credential = match slot.as_ref() {
            Some(held) => self.auth.refresh(&held.credential).await?,
            None => self.auth.authenticate().await?,
        };
        let next = HeldCredential {
            credential,
            generation: stale + 1,
        };
        *slot = Some(next.clone());
        info!("Refreshed delivery credential");
        Ok(next)
    }
}
