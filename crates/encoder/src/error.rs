use std::path::PathBuf;
use thiserror::Error;

/// Result type for encode operations.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Errors that can end a run. Unrecognized diagnostic lines from the
/// child are deliberately not represented here; they are logged and
/// skipped.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("ffprobe failed: {0}")]
    Probe(String),

    #[error("failed to spawn ffmpeg at {bin}: {source}")]
    Spawn {
        bin: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ffmpeg exited with status {code:?}")]
    FfmpegExit { code: Option<i32> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
