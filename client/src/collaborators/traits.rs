use async_trait::async_trait;

use crate::error::ServiceError;

/// Network clock parameters (offset from the swarm's notion of time).
#[async_trait]
pub trait ClockParams: Send + Sync {
    async fn initialize(&self) -> Result<(), ServiceError>;
}

/// Builds the multi-hop onion paths used to route requests.
///
/// Best-effort and idempotent. Retrying on failure is the builder's concern.
#[async_trait]
pub trait CircuitBuilder: Send + Sync {
    async fn build_new_paths(&self) -> Result<(), ServiceError>;
}

/// Outbound message queue. Persisted sends survive restarts.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Resume sending everything still pending. Safe to call repeatedly.
    async fn process_pending(&self) -> Result<(), ServiceError>;
}

/// Publishes every known conversation into the shared reactive store.
pub trait ConversationRegistry: Send + Sync {
    /// Idempotent; calling it again re-registers the same records.
    fn register_all_to_store(&self) -> Result<(), ServiceError>;
}

/// Long-term Ed25519 signing key pair, hex-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKeyPair {
    pub public_key_hex: String,
    pub private_key_hex: String,
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("public_key_hex", &self.public_key_hex)
            .finish_non_exhaustive()
    }
}

/// Access to the device's identity key material.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// `None` when this device has no signing key pair.
    async fn get_signing_key_pair(&self) -> Result<Option<SigningKeyPair>, ServiceError>;
}

/// Cross-device configuration sync.
#[async_trait]
pub trait SyncClient: Send + Sync {
    /// Send a configuration message only if local state diverged since the
    /// last one. Concurrent calls are deduplicated by the implementation.
    async fn sync_if_needed(&self) -> Result<(), ServiceError>;
}

/// Pre-negotiated session material (sessions, prekeys, signed prekeys).
#[async_trait]
pub trait SessionStateStore: Send + Sync {
    /// Remove all ephemeral session state. Run once per process start.
    async fn purge_ephemeral_sessions(&self) -> Result<(), ServiceError>;
}

/// Persisted boolean flags keyed by string id.
pub trait FlagStore: Send + Sync {
    /// `false` when the flag was never written.
    fn get_flag(&self, id: &str) -> Result<bool, ServiceError>;

    /// Remove the flag. Removing an absent flag succeeds.
    fn remove_flag(&self, id: &str) -> Result<(), ServiceError>;
}
