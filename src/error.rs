pub type SlidecastResult<T> = Result<T, SlidecastError>;

#[derive(thiserror::Error, Debug)]
pub enum SlidecastError {
    #[error("insufficient images: found {found}, need at least 2")]
    InsufficientImages { found: usize },

    #[error("unreadable image '{path}': {reason}")]
    UnreadableImage { path: String, reason: String },

    #[error("invalid timing configuration: {0}")]
    InvalidTiming(String),

    #[error("frame sink error: {0}")]
    Sink(String),

    #[error("audio error: {0}")]
    Audio(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlidecastError {
    pub fn invalid_timing(msg: impl Into<String>) -> Self {
        Self::InvalidTiming(msg.into())
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unreadable_image(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnreadableImage {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
