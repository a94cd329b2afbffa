//! Error taxonomy for NavGrade.

/// Failures while decoding an opaque domain payload (e.g. a flight search blob).
///
/// A decoding failure discards the single observation it came from; the
/// episode continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("url is not a search results page")]
    NotSearchPage,

    #[error("missing query parameter: {0}")]
    MissingParam(String),

    #[error("base64 decoding failed: {0}")]
    Base64(String),

    #[error("truncated varint at byte {offset}")]
    TruncatedVarint { offset: usize },

    #[error("field {field} overruns payload ({needed} bytes needed, {remaining} remaining)")]
    TruncatedField {
        field: u32,
        needed: usize,
        remaining: usize,
    },

    #[error("unsupported wire type {wire_type} for field {field}")]
    UnsupportedWireType { field: u32, wire_type: u8 },

    #[error("field {field} is not valid utf-8")]
    InvalidUtf8 { field: u32 },
}

/// Failures reported by the live-page capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    #[error("no recorded output for script: {0}")]
    NoRecording(String),

    #[error("page closed")]
    Closed,
}

/// NavGrade domain errors.
#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    /// Malformed goal specification. Fatal at construction time.
    #[error("invalid goal specification: {0}")]
    Configuration(String),

    /// Page read or script evaluation failed during an update.
    #[error("transient observation failure: {0}")]
    TransientObservation(#[from] PageError),

    /// A domain payload could not be decoded.
    #[error("decoding error: {0}")]
    Decoding(#[from] DecodeError),

    #[error("update timed out after {0} ms")]
    Timeout(u64),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GradeError {
    /// Shorthand for a [`GradeError::Configuration`] error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Result type for NavGrade operations.
pub type Result<T> = std::result::Result<T, GradeError>;
