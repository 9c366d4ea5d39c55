use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    #[error("playback failed: {0}")]
    PlaybackFailure(String),

    #[error("settings store unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("background worker unavailable: {0}")]
    BackgroundUnavailable(String),

    #[error("invalid setting '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

impl WatchError {
    pub fn invalid_setting(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field,
            reason: reason.into(),
        }
    }
}

pub type WatchResult<T> = Result<T, WatchError>;
