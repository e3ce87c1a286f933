use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use hearth_lib::channels::host_channel;
use hearth_lib::collaborators::{
    MemoryCircuitBuilder, MemoryClock, MemoryConversationRegistry, MemoryIdentityStore,
    MemoryMessageQueue, MemorySessionStore, MemorySyncClient,
};
use hearth_lib::config::ConfigSource;
use hearth_lib::preferences::JsonStore;
use hearth_lib::{logging, AppContext, ClientConfig, Orchestrator};
use hearth_nav::ThemePreferenceController;

/// Headless host: wires in-memory collaborators around the orchestrator and
/// prints host events until Ctrl-C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("hearth.json"), PathBuf::from);
    let (config, source) = ClientConfig::load(&config_path).context("failed to load config")?;
    logging::init(&config.log_filter);
    match source {
        ConfigSource::File => {
            tracing::info!(path = %config_path.display(), "configuration loaded");
        }
        ConfigSource::Defaults => {
            tracing::info!(path = %config_path.display(), "no config file, using defaults");
        }
    }

    let prefs_path = config_path
        .parent()
        .unwrap_or(Path::new("."))
        .join(&config.preferences_file);
    let store = Arc::new(
        JsonStore::open(&prefs_path)
            .with_context(|| format!("failed to open {}", prefs_path.display()))?,
    );

    let (events_tx, mut events_rx) = host_channel();
    let ctx = Arc::new(AppContext {
        config,
        clock: Arc::new(MemoryClock::new()),
        circuits: Arc::new(MemoryCircuitBuilder::new()),
        conversations: Arc::new(MemoryConversationRegistry::new(Vec::new())),
        message_queue: Arc::new(MemoryMessageQueue::new()),
        identity_keys: Arc::new(MemoryIdentityStore::new(None)),
        sessions: Arc::new(MemorySessionStore::new()),
        sync: Arc::new(MemorySyncClient::new()),
        flags: store.clone(),
        theme: Arc::new(ThemePreferenceController::new(store)),
        events: events_tx,
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => tracing::info!(event = %json, "host event"),
                Err(e) => tracing::warn!(error = %e, "failed to serialize host event"),
            }
        }
    });

    let orchestrator = Orchestrator::new(ctx);
    orchestrator.bootstrap().await;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("shutting down");

    orchestrator.shutdown();
    orchestrator.wait_for_launched().await;
    drop(orchestrator);
    printer.abort();

    Ok(())
}
