//! Insight and suggestion generation.
//!
//! [`InsightGenerator`] answers from the cache when it can. Otherwise it
//! reads the most recent journal entries, makes sure the model is ready,
//! streams a completion to the caller and caches the cleaned result.

pub mod error;
pub mod generator;
pub mod kind;
pub mod prompts;
pub mod records;

pub use error::InsightError;
pub use generator::{InsightGenerator, TokenEvent, TokenSink};
pub use kind::{GenerationType, InsightKind};
pub use records::{GeneratedOutput, InsightRecord, SuggestionsRecord};
