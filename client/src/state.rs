use std::sync::Arc;

use hearth_nav::ThemePreferenceController;

use crate::channels::{HostEvent, HostEventSender};
use crate::collaborators::{
    CircuitBuilder, ClockParams, ConversationRegistry, FlagStore, IdentityStore, MessageQueue,
    SessionStateStore, SyncClient,
};
use crate::config::ClientConfig;

/// Everything the orchestrator reaches for, passed in explicitly.
///
/// Built once by the host at startup. No collaborator is looked up through
/// process-wide globals.
pub struct AppContext {
    pub config: ClientConfig,
    pub clock: Arc<dyn ClockParams>,
    pub circuits: Arc<dyn CircuitBuilder>,
    pub conversations: Arc<dyn ConversationRegistry>,
    pub message_queue: Arc<dyn MessageQueue>,
    pub identity_keys: Arc<dyn IdentityStore>,
    pub sessions: Arc<dyn SessionStateStore>,
    pub sync: Arc<dyn SyncClient>,
    pub flags: Arc<dyn FlagStore>,
    pub theme: Arc<ThemePreferenceController>,
    pub events: HostEventSender,
}

impl AppContext {
    /// Push an event to the host. A closed channel means the host is gone.
    pub fn emit(&self, event: HostEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("host event channel closed, event dropped");
        }
    }
}

/// Shared reference to `AppContext`, held by the orchestrator and its tasks.
pub type SharedContext = Arc<AppContext>;
