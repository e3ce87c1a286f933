//! In-memory collaborator implementations.
//!
//! These back the headless host and the test suite. Every implementation
//! counts its calls and can be switched into a failing mode so callers can
//! check isolation.
//!
//! **WARNING**: nothing here survives process exit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use hearth_nav::UserIdentity;
use parking_lot::{Mutex, RwLock};

use super::traits::{
    CircuitBuilder, ClockParams, ConversationRegistry, IdentityStore, MessageQueue,
    SessionStateStore, SigningKeyPair, SyncClient,
};
use crate::error::ServiceError;

/// Call counter with an on/off failure switch.
#[derive(Default)]
struct Probe {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl Probe {
    fn hit(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.failing.load(Ordering::SeqCst)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

/// Clock parameters that are always in sync with the local clock.
#[derive(Default)]
pub struct MemoryClock {
    probe: Probe,
}

impl MemoryClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.probe.calls()
    }

    pub fn set_failing(&self, failing: bool) {
        self.probe.set_failing(failing);
    }
}

#[async_trait]
impl ClockParams for MemoryClock {
    async fn initialize(&self) -> Result<(), ServiceError> {
        if self.probe.hit() {
            return Err(ServiceError::Clock("time server unreachable".into()));
        }
        Ok(())
    }
}

/// Circuit builder that only records requests.
#[derive(Default)]
pub struct MemoryCircuitBuilder {
    probe: Probe,
}

impl MemoryCircuitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.probe.calls()
    }

    pub fn set_failing(&self, failing: bool) {
        self.probe.set_failing(failing);
    }
}

#[async_trait]
impl CircuitBuilder for MemoryCircuitBuilder {
    async fn build_new_paths(&self) -> Result<(), ServiceError> {
        if self.probe.hit() {
            return Err(ServiceError::Circuit("not enough guard nodes".into()));
        }
        tracing::debug!("onion paths rebuilt");
        Ok(())
    }
}

/// Outbound queue holding pending message ids.
///
/// `process_pending` drains the queue, so a repeated call sends nothing new.
#[derive(Default)]
pub struct MemoryMessageQueue {
    probe: Probe,
    pending: Mutex<Vec<String>>,
    sent: Mutex<Vec<String>>,
}

impl MemoryMessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, message_id: impl Into<String>) {
        self.pending.lock().push(message_id.into());
    }

    pub fn calls(&self) -> usize {
        self.probe.calls()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.probe.set_failing(failing);
    }
}

#[async_trait]
impl MessageQueue for MemoryMessageQueue {
    async fn process_pending(&self) -> Result<(), ServiceError> {
        if self.probe.hit() {
            return Err(ServiceError::Dispatch("swarm unreachable".into()));
        }
        let drained: Vec<String> = self.pending.lock().drain(..).collect();
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "resumed pending sends");
        }
        self.sent.lock().extend(drained);
        Ok(())
    }
}

/// Registry of known conversations, published into a shared store.
pub struct MemoryConversationRegistry {
    probe: Probe,
    conversations: RwLock<Vec<UserIdentity>>,
    /// Reactive store the records are published into, keyed by account number.
    store: RwLock<HashMap<String, UserIdentity>>,
}

impl MemoryConversationRegistry {
    pub fn new(conversations: Vec<UserIdentity>) -> Self {
        Self {
            probe: Probe::default(),
            conversations: RwLock::new(conversations),
            store: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a registered record.
    pub fn get(&self, number: &str) -> Option<UserIdentity> {
        self.store.read().get(number).cloned()
    }

    pub fn calls(&self) -> usize {
        self.probe.calls()
    }

    pub fn set_failing(&self, failing: bool) {
        self.probe.set_failing(failing);
    }
}

impl ConversationRegistry for MemoryConversationRegistry {
    fn register_all_to_store(&self) -> Result<(), ServiceError> {
        if self.probe.hit() {
            return Err(ServiceError::Storage("conversation store not ready".into()));
        }
        let conversations = self.conversations.read();
        let mut store = self.store.write();
        for convo in conversations.iter() {
            store.insert(convo.number.clone(), convo.clone());
        }
        tracing::debug!(count = conversations.len(), "conversations registered to store");
        Ok(())
    }
}

/// Identity key storage holding at most one key pair.
#[derive(Default)]
pub struct MemoryIdentityStore {
    probe: Probe,
    key_pair: RwLock<Option<SigningKeyPair>>,
}

impl MemoryIdentityStore {
    pub fn new(key_pair: Option<SigningKeyPair>) -> Self {
        Self {
            probe: Probe::default(),
            key_pair: RwLock::new(key_pair),
        }
    }

    pub fn calls(&self) -> usize {
        self.probe.calls()
    }

    pub fn set_failing(&self, failing: bool) {
        self.probe.set_failing(failing);
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get_signing_key_pair(&self) -> Result<Option<SigningKeyPair>, ServiceError> {
        if self.probe.hit() {
            return Err(ServiceError::Identity("keystore locked".into()));
        }
        Ok(self.key_pair.read().clone())
    }
}

/// Ephemeral session material keyed by peer address.
#[derive(Default)]
pub struct MemorySessionStore {
    probe: Probe,
    sessions: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_session(&self, address: &str, session_data: &[u8]) {
        self.sessions
            .lock()
            .insert(address.to_string(), session_data.to_vec());
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Number of purge calls.
    pub fn calls(&self) -> usize {
        self.probe.calls()
    }

    pub fn set_failing(&self, failing: bool) {
        self.probe.set_failing(failing);
    }
}

#[async_trait]
impl SessionStateStore for MemorySessionStore {
    async fn purge_ephemeral_sessions(&self) -> Result<(), ServiceError> {
        if self.probe.hit() {
            return Err(ServiceError::Session("session table locked".into()));
        }
        let removed = {
            let mut sessions = self.sessions.lock();
            let n = sessions.len();
            sessions.clear();
            n
        };
        tracing::debug!(removed, "ephemeral sessions purged");
        Ok(())
    }
}

/// Configuration sync client.
///
/// A message is "sent" only when local state was marked dirty since the last
/// send. A call that overlaps an in-flight attempt returns without sending.
#[derive(Default)]
pub struct MemorySyncClient {
    probe: Probe,
    dirty: AtomicBool,
    in_flight: AtomicBool,
    messages_sent: AtomicUsize,
}

impl MemorySyncClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a local configuration change that other devices have not seen.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Number of `sync_if_needed` calls.
    pub fn calls(&self) -> usize {
        self.probe.calls()
    }

    pub fn messages_sent(&self) -> usize {
        self.messages_sent.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.probe.set_failing(failing);
    }
}

#[async_trait]
impl SyncClient for MemorySyncClient {
    async fn sync_if_needed(&self) -> Result<(), ServiceError> {
        if self.probe.hit() {
            return Err(ServiceError::Sync("no route to own swarm".into()));
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("config sync already in flight");
            return Ok(());
        }
        if self.dirty.swap(false, Ordering::SeqCst) {
            self.messages_sent.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("configuration message sent");
        }
        self.in_flight.store(false, Ordering::SeqCst);
        Ok(())
    }
}
