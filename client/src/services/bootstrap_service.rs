use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use super::scheduler::{PeriodicSyncScheduler, TimerHandle};
use crate::channels::HostEvent;
use crate::error::ServiceError;
use crate::state::SharedContext;

/// Set once the first configuration message from another device was handled.
pub const SYNCED_INITIAL_CONFIGURATION_FLAG: &str = "hasSyncedInitialConfigurationItem";

/// Left behind by clients that showed a dialog when light mode became the
/// default. Nothing reads it anymore.
pub const LEGACY_LIGHT_MODE_DIALOG_FLAG: &str = "hasSeenLightModeDialog";

/// Drives client startup and owns the background config resync job.
///
/// Launched steps are independent: each one's failure is logged where it is
/// launched and never stops the others.
pub struct Orchestrator {
    ctx: SharedContext,
    scheduler: PeriodicSyncScheduler,
    /// Periodic resync job, set by `bootstrap` and taken by `shutdown`.
    resync_timer: Mutex<Option<TimerHandle>>,
    /// Fire-and-forget bootstrap tasks. Never aborted; only drained.
    background_handles: Mutex<Vec<JoinHandle<()>>>,
    bootstrapped: AtomicBool,
}

impl Orchestrator {
    /// Create the orchestrator and run the legacy flag migration.
    pub fn new(ctx: SharedContext) -> Self {
        if let Err(e) = ctx.flags.remove_flag(LEGACY_LIGHT_MODE_DIALOG_FLAG) {
            tracing::warn!(
                flag = LEGACY_LIGHT_MODE_DIALOG_FLAG,
                error = %e,
                "failed to remove legacy flag"
            );
        }

        Self {
            ctx,
            scheduler: PeriodicSyncScheduler::new(),
            resync_timer: Mutex::new(None),
            background_handles: Mutex::new(Vec::new()),
            bootstrapped: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> &SharedContext {
        &self.ctx
    }

    /// Run the startup sequence. Only the first call does anything.
    ///
    /// Returns once the identity key check has completed; everything else
    /// keeps running in the background.
    pub async fn bootstrap(&self) {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            tracing::debug!("bootstrap already ran, ignoring");
            return;
        }
        tracing::info!("bootstrap starting");

        // 1. Network clock parameters
        let clock = Arc::clone(&self.ctx.clock);
        self.launch("clock-params", async move { clock.initialize().await });

        // 2. Fresh onion paths
        if self.ctx.config.wants_onion_paths() {
            let circuits = Arc::clone(&self.ctx.circuits);
            self.launch("onion-paths", async move { circuits.build_new_paths().await });
        } else {
            tracing::debug!("onion requests disabled, not building paths");
        }

        // 3. Our own conversation may predate the store (restore from seed)
        if let Err(e) = self.ctx.conversations.register_all_to_store() {
            tracing::warn!(error = %e, "failed to register conversations to store");
        }

        // 4. Resume persisted outbound messages
        let queue = Arc::clone(&self.ctx.message_queue);
        self.launch("message-queue", async move { queue.process_pending().await });

        // 5. Saved theme
        let theme = self.ctx.theme.get_current();
        self.ctx.theme.apply(theme);

        // 6. The only awaited step: its result gates a user-visible prompt
        self.prompt_identity_reset_if_needed().await;

        // 7. Forward-secrecy hygiene, once per process start.
        // Runs after the queue resumed; in-flight sends are not invalidated.
        let sessions = Arc::clone(&self.ctx.sessions);
        self.launch("purge-sessions", async move {
            sessions.purge_ephemeral_sessions().await
        });

        // 8. Only sync if this device already took part in a config exchange
        let flags = Arc::clone(&self.ctx.flags);
        let sync = Arc::clone(&self.ctx.sync);
        self.launch("initial-config-sync", async move {
            if flags.get_flag(SYNCED_INITIAL_CONFIGURATION_FLAG)? {
                sync.sync_if_needed().await
            } else {
                tracing::debug!("initial configuration not synced yet, skipping config sync");
                Ok(())
            }
        });

        // 9. Periodic resync
        self.start_resync_job();

        tracing::info!("bootstrap complete");
    }

    /// Stop the periodic resync job. Safe to call any number of times.
    pub fn shutdown(&self) {
        let timer = self.resync_timer.lock().take();
        match timer {
            Some(handle) => {
                self.scheduler.cancel(&handle);
                tracing::info!(job = handle.id(), "config resync stopped");
            }
            None => tracing::debug!("shutdown: no resync job running"),
        }
    }

    /// Wait for every task launched by `bootstrap` so far.
    pub async fn wait_for_launched(&self) {
        let handles: Vec<JoinHandle<()>> = self.background_handles.lock().drain(..).collect();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "bootstrap task did not complete");
            }
        }
    }

    /// Whether the periodic resync job is registered.
    pub fn is_resync_active(&self) -> bool {
        self.resync_timer.lock().is_some()
    }

    fn launch<Fut>(&self, step: &'static str, fut: Fut)
    where
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            match fut.await {
                Ok(()) => tracing::debug!(step, "bootstrap step finished"),
                Err(e) => tracing::warn!(step, error = %e, "bootstrap step failed"),
            }
        });
        self.background_handles.lock().push(handle);
    }

    async fn prompt_identity_reset_if_needed(&self) {
        // Spawned so a panicking key store cannot take bootstrap down with it.
        let identity_keys = Arc::clone(&self.ctx.identity_keys);
        let lookup = tokio::spawn(async move { identity_keys.get_signing_key_pair().await }).await;

        match lookup {
            Ok(Ok(Some(_))) => tracing::debug!("signing key pair present"),
            Ok(Ok(None)) => {
                tracing::warn!("no signing key pair on this device, requesting identity reset");
                self.ctx.emit(HostEvent::ResetIdentityRequested);
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "signing key pair lookup failed"),
            Err(e) => tracing::warn!(error = %e, "signing key pair lookup panicked"),
        }
    }

    fn start_resync_job(&self) {
        let mut timer = self.resync_timer.lock();
        if timer.is_some() {
            return;
        }
        let sync = Arc::clone(&self.ctx.sync);
        let handle = self
            .scheduler
            .start(self.ctx.config.resync_interval(), move || {
                let sync = Arc::clone(&sync);
                async move { sync.sync_if_needed().await }
            });
        tracing::debug!(job = handle.id(), "config resync registered");
        *timer = Some(handle);
    }
}
