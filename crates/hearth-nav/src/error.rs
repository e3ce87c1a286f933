use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to read preference: {0}")]
    Read(String),

    #[error("failed to write preference: {0}")]
    Write(String),
}
