use thiserror::Error;

/// Failures raised by the multi-scale scan engine.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Invalid scan parameters, detected before any window is classified.
    #[error("invalid scan configuration: {0}")]
    Configuration(String),
    /// The classifier failed (or returned malformed output) for one window.
    /// Processing of the current image stops at the first such failure.
    #[error("classifier failed on window ({x}, {y}) at scale index {scale_index}")]
    Classification {
        scale_index: u32,
        x: u32,
        y: u32,
        #[source]
        source: anyhow::Error,
    },
}
