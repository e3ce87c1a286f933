pub mod channels;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod logging;
pub mod panel;
pub mod preferences;
pub mod services;
pub mod state;

pub use config::ClientConfig;
pub use error::ServiceError;
pub use services::{Orchestrator, PeriodicSyncScheduler, TimerHandle};
pub use state::{AppContext, SharedContext};
