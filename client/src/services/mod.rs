pub mod bootstrap_service;
pub mod scheduler;

pub use bootstrap_service::{
    Orchestrator, LEGACY_LIGHT_MODE_DIALOG_FLAG, SYNCED_INITIAL_CONFIGURATION_FLAG,
};
pub use scheduler::{PeriodicSyncScheduler, TimerHandle};
