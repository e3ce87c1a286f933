pub mod memory;
pub mod traits;
#[cfg(feature = "veilid")]
pub mod veilid;

pub use memory::{
    MemoryCircuitBuilder, MemoryClock, MemoryConversationRegistry, MemoryIdentityStore,
    MemoryMessageQueue, MemorySessionStore, MemorySyncClient,
};
pub use traits::{
    CircuitBuilder, ClockParams, ConversationRegistry, FlagStore, IdentityStore, MessageQueue,
    SessionStateStore, SigningKeyPair, SyncClient,
};
#[cfg(feature = "veilid")]
pub use veilid::VeilidCircuitBuilder;
