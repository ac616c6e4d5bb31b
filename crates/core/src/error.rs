use std::path::PathBuf;

/// Result alias that carries the custom [`LyricError`] type.
pub type Result<T> = std::result::Result<T, LyricError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum LyricError {
    /// Free-form failure that does not warrant its own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The catalog or configuration file is not valid JSON for its shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("song catalog `{}` not found", .0.display())]
    CatalogNotFound(PathBuf),
    #[error("no songs in catalog")]
    EmptyCatalog,
    #[error("song '{0}' not found")]
    SongNotFound(String),
    #[error("audio file '{}' not found", .0.display())]
    AudioNotFound(PathBuf),
    /// The audio device could not be opened or the file could not be decoded.
    #[error("audio playback failed: {0}")]
    Audio(String),
    #[error("unknown theme `{0}`")]
    UnknownTheme(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LyricError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Creates an [`LyricError::Audio`] from any displayable backend error.
    pub fn audio(err: impl std::fmt::Display) -> Self {
        Self::Audio(err.to_string())
    }
}
