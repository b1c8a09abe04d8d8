use std::time::Duration;
use thiserror::Error;

/// Errors that terminate a scan
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to decode capture: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image preprocessing failed: {0}")]
    Preprocess(String),

    #[error("Text recognition failed: {0}")]
    Recognition(#[from] RecognitionError),

    #[error("Scan was superseded by a newer scan")]
    Cancelled,
}

/// Text recognizer errors
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("OCR request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OCR server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid OCR response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode image: {0}")]
    Encode(image::ImageError),
}

/// Character source errors. Never fatal: the resolver treats them as "not found".
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Character source request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Character source returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid character source response: {0}")]
    InvalidResponse(String),
}

/// Errors from applying a manual server selection
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No pending selection for slot {slot_index}")]
    NoPendingSelection { slot_index: usize },

    #[error("Server '{server}' is not a candidate for slot {slot_index}")]
    UnknownCandidate { slot_index: usize, server: String },

    #[error("Candidate {index} out of range for slot {slot_index}")]
    CandidateIndexOutOfRange { slot_index: usize, index: usize },
}

/// Configuration and preference storage errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("Config I/O failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors building the default HTTP-backed scanner
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error(transparent)]
    Source(#[from] SourceError),
}
