use std::path::PathBuf;

/// Result alias that carries the custom [`MocapError`] type.
pub type Result<T> = std::result::Result<T, MocapError>;

/// Common error type for the core crate.
///
/// Every failure leaves the component that raised it in its last
/// well-defined state; none of them are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum MocapError {
    /// `start` was called while a capture is already running.
    #[error("a capture is already in progress")]
    AlreadyCapturing,
    /// `finalize` was called on an empty capture buffer.
    #[error("capture buffer holds no frames")]
    EmptyCapture,
    /// A playback command needs a loaded session.
    #[error("no session is loaded")]
    NoSessionLoaded,
    /// The persisted document is missing fields or has the wrong shape.
    #[error("malformed session document: {reason}")]
    MalformedDocument { reason: String },
    /// The declared `frameCount` disagrees with the decoded frames.
    #[error("session declares {declared} frames but contains {actual}")]
    InconsistentFrameCount { declared: i64, actual: usize },
    /// The rig sink refused a field while a frame was being dispatched.
    #[error("rig sink rejected `{field}`: {reason}")]
    SinkRejected { field: String, reason: String },
    /// Playback speed must be a finite, strictly positive factor.
    #[error("invalid playback speed {0}")]
    InvalidSpeed(f32),
    /// Configuration values that cannot drive the engine.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// File system failure, with the path that was attempted.
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MocapError {
    /// Wraps an I/O error together with the path that was being accessed.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a [`MocapError::MalformedDocument`] from any message.
    pub fn malformed<T: Into<String>>(reason: T) -> Self {
        Self::MalformedDocument {
            reason: reason.into(),
        }
    }
}
