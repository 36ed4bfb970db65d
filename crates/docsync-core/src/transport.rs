use async_trait::async_trait;

use crate::error::TransportError;

/// What a successful put did to the remote. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    Replaced,
}

impl PutOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PutOutcome::Created => "created",
            PutOutcome::Replaced => "replaced",
        }
    }
}

/// Remote storage that can place bytes under a folder.
///
/// `put` must be idempotent on `(destination_id, file_name)`: a second put
/// replaces the content of the first instead of adding an entry. A rejected
/// credential must be reported as `TransportError::Unauthorized`.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    async fn put(
        &self,
        token: &str,
        destination_id: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<PutOutcome, TransportError>;
}
