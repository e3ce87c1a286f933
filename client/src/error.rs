use hearth_nav::PreferenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("clock parameter sync failed: {0}")]
    Clock(String),

    #[error("onion path build failed: {0}")]
    Circuit(String),

    #[error("message dispatch failed: {0}")]
    Dispatch(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("identity key lookup failed: {0}")]
    Identity(String),

    #[error("session store error: {0}")]
    Session(String),

    #[error("configuration sync failed: {0}")]
    Sync(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PreferenceError> for ServiceError {
    fn from(e: PreferenceError) -> Self {
        Self::Storage(e.to_string())
    }
}
