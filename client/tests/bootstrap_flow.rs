//! Integration tests for the startup sequence and background config resync.
//!
//! Drives the real `Orchestrator` against the in-memory collaborators and a
//! real `JsonStore`, checking call counts at each collaborator boundary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hearth_lib::channels::{host_channel, HostEvent, HostEventReceiver};
use hearth_lib::collaborators::{
    CircuitBuilder, ClockParams, ConversationRegistry, FlagStore, IdentityStore,
    MemoryCircuitBuilder, MemoryClock, MemoryConversationRegistry, MemoryIdentityStore,
    MemoryMessageQueue, MemorySessionStore, MemorySyncClient, MessageQueue, SessionStateStore,
    SigningKeyPair, SyncClient,
};
use hearth_lib::preferences::JsonStore;
use hearth_lib::services::{LEGACY_LIGHT_MODE_DIALOG_FLAG, SYNCED_INITIAL_CONFIGURATION_FLAG};
use hearth_lib::{AppContext, ClientConfig, Orchestrator, ServiceError, SharedContext};
use hearth_nav::{
    AppSection, PreferenceError, Theme, ThemePreferenceController, ThemeStore, UserIdentity,
};
use parking_lot::Mutex;
use serde_json::json;

const OUR_NUMBER: &str = "05d871fc80ca007eed9b2f4df72853e2a2d5465a92fcb1889fb5c84aa2833b3b40";
const TWO_DAYS: Duration = Duration::from_secs(2 * 24 * 60 * 60);

fn key_pair() -> SigningKeyPair {
    SigningKeyPair {
        public_key_hex: "d871fc80ca007eed9b2f4df72853e2a2".into(),
        private_key_hex: "00112233445566778899aabbccddeeff".into(),
    }
}

fn our_identity() -> UserIdentity {
    UserIdentity {
        number: OUR_NUMBER.into(),
        display_name: Some("Alice".into()),
        avatar_path: None,
        has_signing_key_pair: true,
    }
}

/// All in-memory collaborators, kept around so tests can inspect them.
struct Fixture {
    clock: Arc<MemoryClock>,
    circuits: Arc<MemoryCircuitBuilder>,
    registry: Arc<MemoryConversationRegistry>,
    queue: Arc<MemoryMessageQueue>,
    identity_keys: Arc<MemoryIdentityStore>,
    sessions: Arc<MemorySessionStore>,
    sync: Arc<MemorySyncClient>,
    store: Arc<JsonStore>,
}

impl Fixture {
    fn new(key: Option<SigningKeyPair>) -> Self {
        Self {
            clock: Arc::new(MemoryClock::new()),
            circuits: Arc::new(MemoryCircuitBuilder::new()),
            registry: Arc::new(MemoryConversationRegistry::new(vec![our_identity()])),
            queue: Arc::new(MemoryMessageQueue::new()),
            identity_keys: Arc::new(MemoryIdentityStore::new(key)),
            sessions: Arc::new(MemorySessionStore::new()),
            sync: Arc::new(MemorySyncClient::new()),
            store: Arc::new(JsonStore::in_memory()),
        }
    }

    fn context(
        &self,
        config: ClientConfig,
        flags: Arc<dyn FlagStore>,
        identity_keys: Arc<dyn IdentityStore>,
    ) -> (SharedContext, HostEventReceiver) {
        let (tx, rx) = host_channel();
        let ctx = Arc::new(AppContext {
            config,
            clock: self.clock.clone(),
            circuits: self.circuits.clone(),
            conversations: self.registry.clone(),
            message_queue: self.queue.clone(),
            identity_keys,
            sessions: self.sessions.clone(),
            sync: self.sync.clone(),
            flags,
            theme: Arc::new(ThemePreferenceController::new(self.store.clone())),
            events: tx,
        });
        (ctx, rx)
    }

    fn orchestrator(&self, config: ClientConfig) -> (Orchestrator, HostEventReceiver) {
        let (ctx, rx) = self.context(config, self.store.clone(), self.identity_keys.clone());
        (Orchestrator::new(ctx), rx)
    }
}

fn drain(rx: &mut HostEventReceiver) -> Vec<HostEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

// ── Identity reset prompt ────────────────────────────────────────────

#[tokio::test]
async fn present_key_pair_emits_no_reset_signal() {
    let fx = Fixture::new(Some(key_pair()));
    let (orchestrator, mut rx) = fx.orchestrator(ClientConfig::default());

    orchestrator.bootstrap().await;
    orchestrator.wait_for_launched().await;

    assert_eq!(fx.identity_keys.calls(), 1);
    assert!(!drain(&mut rx).contains(&HostEvent::ResetIdentityRequested));
    orchestrator.shutdown();
}

#[tokio::test]
async fn missing_key_pair_emits_reset_signal_once() {
    let fx = Fixture::new(None);
    let (orchestrator, mut rx) = fx.orchestrator(ClientConfig::default());

    orchestrator.bootstrap().await;
    // The lookup is awaited, so the signal is already out.
    let events = drain(&mut rx);
    assert_eq!(events, vec![HostEvent::ResetIdentityRequested]);

    orchestrator.bootstrap().await;
    orchestrator.wait_for_launched().await;
    assert!(drain(&mut rx).is_empty());
    orchestrator.shutdown();
}

#[tokio::test]
async fn failed_key_lookup_emits_no_signal() {
    let fx = Fixture::new(None);
    fx.identity_keys.set_failing(true);
    let (orchestrator, mut rx) = fx.orchestrator(ClientConfig::default());

    orchestrator.bootstrap().await;
    orchestrator.wait_for_launched().await;

    assert!(drain(&mut rx).is_empty());
    assert!(orchestrator.is_resync_active());
    orchestrator.shutdown();
}

struct PanickingIdentityStore;

#[async_trait]
impl IdentityStore for PanickingIdentityStore {
    async fn get_signing_key_pair(&self) -> Result<Option<SigningKeyPair>, ServiceError> {
        panic!("keystore poisoned");
    }
}

#[tokio::test]
async fn panicking_key_lookup_does_not_abort_bootstrap() {
    let fx = Fixture::new(None);
    let (ctx, mut rx) = fx.context(
        ClientConfig::default(),
        fx.store.clone(),
        Arc::new(PanickingIdentityStore),
    );
    let orchestrator = Orchestrator::new(ctx);

    orchestrator.bootstrap().await;
    orchestrator.wait_for_launched().await;

    assert!(drain(&mut rx).is_empty());
    assert_eq!(fx.sessions.calls(), 1);
    assert!(orchestrator.is_resync_active());
    orchestrator.shutdown();
}

// ── Step order ───────────────────────────────────────────────────────

/// Every collaborator at once, appending to a single call log.
#[derive(Default)]
struct Recorder {
    log: Mutex<Vec<&'static str>>,
}

impl Recorder {
    fn record(&self, step: &'static str) {
        self.log.lock().push(step);
    }

    fn log(&self) -> Vec<&'static str> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl ClockParams for Recorder {
    async fn initialize(&self) -> Result<(), ServiceError> {
        self.record("clock");
        Ok(())
    }
}

#[async_trait]
impl CircuitBuilder for Recorder {
    async fn build_new_paths(&self) -> Result<(), ServiceError> {
        self.record("circuits");
        Ok(())
    }
}

impl ConversationRegistry for Recorder {
    fn register_all_to_store(&self) -> Result<(), ServiceError> {
        self.record("register");
        Ok(())
    }
}

#[async_trait]
impl MessageQueue for Recorder {
    async fn process_pending(&self) -> Result<(), ServiceError> {
        self.record("queue");
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for Recorder {
    async fn get_signing_key_pair(&self) -> Result<Option<SigningKeyPair>, ServiceError> {
        self.record("key-lookup");
        Ok(Some(key_pair()))
    }
}

#[async_trait]
impl SessionStateStore for Recorder {
    async fn purge_ephemeral_sessions(&self) -> Result<(), ServiceError> {
        self.record("purge");
        Ok(())
    }
}

#[async_trait]
impl SyncClient for Recorder {
    async fn sync_if_needed(&self) -> Result<(), ServiceError> {
        self.record("sync");
        Ok(())
    }
}

impl FlagStore for Recorder {
    fn get_flag(&self, _id: &str) -> Result<bool, ServiceError> {
        self.record("sync-flag");
        Ok(false)
    }

    fn remove_flag(&self, _id: &str) -> Result<(), ServiceError> {
        Ok(())
    }
}

impl ThemeStore for Recorder {
    fn load_theme(&self) -> Result<Option<Theme>, PreferenceError> {
        Ok(None)
    }

    fn save_theme(&self, _theme: Theme) -> Result<(), PreferenceError> {
        self.record("theme");
        Ok(())
    }
}

// Runs on the current-thread runtime: the synchronous steps finish before
// bootstrap first yields, and launched steps then start in launch order.
#[tokio::test]
async fn bootstrap_steps_run_in_fixed_order() {
    let recorder = Arc::new(Recorder::default());
    let (tx, mut rx) = host_channel();
    let ctx = Arc::new(AppContext {
        config: ClientConfig::default(),
        clock: recorder.clone(),
        circuits: recorder.clone(),
        conversations: recorder.clone(),
        message_queue: recorder.clone(),
        identity_keys: recorder.clone(),
        sessions: recorder.clone(),
        sync: recorder.clone(),
        flags: recorder.clone(),
        theme: Arc::new(ThemePreferenceController::new(recorder.clone())),
        events: tx,
    });
    let orchestrator = Orchestrator::new(ctx);
    assert!(recorder.log().is_empty());

    orchestrator.bootstrap().await;
    assert!(orchestrator.is_resync_active());
    assert_eq!(
        recorder.log(),
        vec!["register", "theme", "clock", "circuits", "queue", "key-lookup"]
    );

    orchestrator.wait_for_launched().await;
    assert_eq!(
        recorder.log(),
        vec![
            "register",
            "theme",
            "clock",
            "circuits",
            "queue",
            "key-lookup",
            "purge",
            "sync-flag",
        ]
    );
    assert!(drain(&mut rx).is_empty());
    orchestrator.shutdown();
}

// ── One-shot and idempotent steps ────────────────────────────────────

#[tokio::test]
async fn bootstrap_runs_each_step_once() {
    let fx = Fixture::new(Some(key_pair()));
    fx.queue.enqueue("msg-1");
    fx.queue.enqueue("msg-2");
    fx.sessions.store_session("05aa", b"ratchet");
    let (orchestrator, _rx) = fx.orchestrator(ClientConfig::default());

    orchestrator.bootstrap().await;
    orchestrator.bootstrap().await;
    orchestrator.wait_for_launched().await;

    assert_eq!(fx.clock.calls(), 1);
    assert_eq!(fx.circuits.calls(), 1);
    assert_eq!(fx.registry.calls(), 1);
    assert_eq!(fx.queue.calls(), 1);
    assert_eq!(fx.queue.sent(), vec!["msg-1".to_string(), "msg-2".to_string()]);
    assert_eq!(fx.identity_keys.calls(), 1);
    assert_eq!(fx.sessions.calls(), 1);
    assert_eq!(fx.sessions.session_count(), 0);
    orchestrator.shutdown();
}

#[tokio::test]
async fn own_conversation_is_registered_for_the_panel() {
    let fx = Fixture::new(Some(key_pair()));
    let (orchestrator, _rx) = fx.orchestrator(ClientConfig::default());
    assert!(fx.registry.get(OUR_NUMBER).is_none());

    orchestrator.bootstrap().await;

    let me = fx.registry.get(OUR_NUMBER).expect("own record registered");
    assert_eq!(me.label(), "Alice");
    orchestrator.shutdown();
}

#[tokio::test]
async fn onion_paths_follow_feature_flags() {
    for (requests, files, expected) in [
        (false, false, 0),
        (true, false, 1),
        (false, true, 1),
        (true, true, 1),
    ] {
        let fx = Fixture::new(Some(key_pair()));
        let config = ClientConfig {
            enable_onion_requests: requests,
            enable_onion_file_requests: files,
            ..ClientConfig::default()
        };
        let (orchestrator, _rx) = fx.orchestrator(config);

        orchestrator.bootstrap().await;
        orchestrator.wait_for_launched().await;

        assert_eq!(
            fx.circuits.calls(),
            expected,
            "requests={requests} files={files}"
        );
        orchestrator.shutdown();
    }
}

#[tokio::test]
async fn failing_collaborators_do_not_stop_later_steps() {
    let fx = Fixture::new(None);
    fx.clock.set_failing(true);
    fx.circuits.set_failing(true);
    fx.registry.set_failing(true);
    fx.queue.set_failing(true);
    fx.sync.set_failing(true);
    fx.store
        .set(SYNCED_INITIAL_CONFIGURATION_FLAG, json!(true))
        .unwrap();
    let (orchestrator, mut rx) = fx.orchestrator(ClientConfig::default());
    fx.store.save_theme(Theme::Dark).unwrap();

    orchestrator.bootstrap().await;
    orchestrator.wait_for_launched().await;

    assert_eq!(orchestrator.context().theme.active(), Theme::Dark);
    assert_eq!(drain(&mut rx), vec![HostEvent::ResetIdentityRequested]);
    assert_eq!(fx.sessions.calls(), 1);
    assert_eq!(fx.sync.calls(), 1);
    assert!(orchestrator.is_resync_active());
    orchestrator.shutdown();
}

// ── Theme ────────────────────────────────────────────────────────────

#[tokio::test]
async fn saved_theme_is_applied() {
    let fx = Fixture::new(Some(key_pair()));
    let (orchestrator, _rx) = fx.orchestrator(ClientConfig::default());
    let mut theme_rx = orchestrator.context().theme.subscribe();
    fx.store.save_theme(Theme::Dark).unwrap();
    assert_eq!(orchestrator.context().theme.active(), Theme::Light);

    orchestrator.bootstrap().await;

    assert!(theme_rx.has_changed().unwrap());
    assert_eq!(*theme_rx.borrow_and_update(), Theme::Dark);
    orchestrator.shutdown();
}

// ── Initial config sync ──────────────────────────────────────────────

#[tokio::test]
async fn initial_sync_skipped_until_first_config_exchange() {
    let fx = Fixture::new(Some(key_pair()));
    let (orchestrator, _rx) = fx.orchestrator(ClientConfig::default());

    orchestrator.bootstrap().await;
    orchestrator.wait_for_launched().await;

    assert_eq!(fx.sync.calls(), 0);
    orchestrator.shutdown();
}

#[tokio::test]
async fn initial_sync_requested_when_flag_set() {
    let fx = Fixture::new(Some(key_pair()));
    fx.store
        .set(SYNCED_INITIAL_CONFIGURATION_FLAG, json!(true))
        .unwrap();
    fx.sync.mark_dirty();
    let (orchestrator, _rx) = fx.orchestrator(ClientConfig::default());

    orchestrator.bootstrap().await;
    orchestrator.wait_for_launched().await;

    assert_eq!(fx.sync.calls(), 1);
    assert_eq!(fx.sync.messages_sent(), 1);
    // Reading the flag never clears it.
    assert!(fx.store.get_flag(SYNCED_INITIAL_CONFIGURATION_FLAG).unwrap());
    orchestrator.shutdown();
}

// ── Periodic resync ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn resync_fires_every_two_days_until_shutdown() {
    let fx = Fixture::new(Some(key_pair()));
    let (orchestrator, _rx) = fx.orchestrator(ClientConfig::default());

    orchestrator.bootstrap().await;
    orchestrator.wait_for_launched().await;
    settle().await;
    assert_eq!(fx.sync.calls(), 0, "first resync waits a full interval");

    for expected in 1..=3 {
        tokio::time::advance(TWO_DAYS).await;
        settle().await;
        assert_eq!(fx.sync.calls(), expected);
    }

    orchestrator.shutdown();
    orchestrator.shutdown();
    assert!(!orchestrator.is_resync_active());

    for _ in 0..5 {
        tokio::time::advance(TWO_DAYS).await;
        settle().await;
    }
    assert_eq!(fx.sync.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn failing_resync_keeps_its_schedule() {
    let fx = Fixture::new(Some(key_pair()));
    fx.sync.set_failing(true);
    let (orchestrator, _rx) = fx.orchestrator(ClientConfig::default());

    orchestrator.bootstrap().await;
    settle().await;

    for _ in 0..3 {
        tokio::time::advance(TWO_DAYS).await;
        settle().await;
    }
    assert_eq!(fx.sync.calls(), 3);
    orchestrator.shutdown();
}

#[tokio::test]
async fn shutdown_before_bootstrap_is_harmless() {
    let fx = Fixture::new(Some(key_pair()));
    let (orchestrator, _rx) = fx.orchestrator(ClientConfig::default());
    orchestrator.shutdown();
    assert!(!orchestrator.is_resync_active());
}

// ── Legacy flag migration ────────────────────────────────────────────

/// Flag store that counts removals before delegating.
struct CountingFlags {
    inner: JsonStore,
    removals: AtomicUsize,
}

impl FlagStore for CountingFlags {
    fn get_flag(&self, id: &str) -> Result<bool, ServiceError> {
        self.inner.get_flag(id)
    }

    fn remove_flag(&self, id: &str) -> Result<(), ServiceError> {
        if id == LEGACY_LIGHT_MODE_DIALOG_FLAG {
            self.removals.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.remove_flag(id)
    }
}

#[test]
fn construction_removes_legacy_flag_whether_set_or_not() {
    let fx = Fixture::new(Some(key_pair()));
    let flags = Arc::new(CountingFlags {
        inner: JsonStore::in_memory(),
        removals: AtomicUsize::new(0),
    });
    flags
        .inner
        .set(LEGACY_LIGHT_MODE_DIALOG_FLAG, json!(true))
        .unwrap();

    let (ctx, _rx) = fx.context(ClientConfig::default(), flags.clone(), fx.identity_keys.clone());
    let _first = Orchestrator::new(ctx);
    assert_eq!(flags.removals.load(Ordering::SeqCst), 1);
    assert!(!flags.get_flag(LEGACY_LIGHT_MODE_DIALOG_FLAG).unwrap());

    // Already gone: removal is still attempted and still fine.
    let (ctx, _rx) = fx.context(ClientConfig::default(), flags.clone(), fx.identity_keys.clone());
    let _second = Orchestrator::new(ctx);
    assert_eq!(flags.removals.load(Ordering::SeqCst), 2);
}

#[test]
fn legacy_flag_removal_persists_to_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("preferences.json");
    {
        let store = JsonStore::open(&path).unwrap();
        store.set(LEGACY_LIGHT_MODE_DIALOG_FLAG, json!(true)).unwrap();
        store.set(SYNCED_INITIAL_CONFIGURATION_FLAG, json!(true)).unwrap();
    }

    let fx = Fixture::new(Some(key_pair()));
    let store = Arc::new(JsonStore::open(&path).unwrap());
    let (ctx, _rx) = fx.context(ClientConfig::default(), store, fx.identity_keys.clone());
    let _orchestrator = Orchestrator::new(ctx);

    let reopened = JsonStore::open(&path).unwrap();
    assert!(reopened.get(LEGACY_LIGHT_MODE_DIALOG_FLAG).is_none());
    assert!(reopened.get_flag(SYNCED_INITIAL_CONFIGURATION_FLAG).unwrap());
}

// ── Panel ────────────────────────────────────────────────────────────

#[tokio::test]
async fn panel_renders_once_own_record_is_registered() {
    let fx = Fixture::new(Some(key_pair()));
    let (orchestrator, _rx) = fx.orchestrator(ClientConfig::default());
    let selector = hearth_nav::SectionSelector::new(orchestrator.context().theme.clone());

    let before = fx.registry.get(OUR_NUMBER);
    assert!(selector
        .render(AppSection::Message, before.as_ref(), 2)
        .is_empty());

    orchestrator.bootstrap().await;

    let after = fx.registry.get(OUR_NUMBER);
    let panel = selector.render(AppSection::Message, after.as_ref(), 2);
    assert_eq!(panel.len(), AppSection::PANEL.len());
    assert!(panel
        .iter()
        .all(|e| e.is_selected == (e.section == AppSection::Message)));
    orchestrator.shutdown();
}
