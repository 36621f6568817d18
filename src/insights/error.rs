use thiserror::Error;

/// Failures of a generation, with the message shown to the user.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("No journal entries found. Start journaling to receive insights!")]
    NoEntries,

    /// The detail is logged, not shown.
    #[error("AI model is not ready. Please wait for download to complete.")]
    ModelNotReady(String),

    #[error("Failed to parse AI response as JSON. Please try again.")]
    MalformedSuggestions(#[source] serde_json::Error),

    #[error("Failed to generate insight. Please try again.: {0}")]
    GenerationFailed(String),

    #[error("Failed to cache generated result: {0}")]
    CacheWriteFailed(String),
}
