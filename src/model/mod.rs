//! On-device language model capability.
//!
//! [`LanguageModel`] is the seam between the insight pipeline and whatever
//! runs the model. [`manager::ModelManager`] wraps one backend for the whole
//! process: it memoizes an in-flight download and initializes the backend
//! once. [`local::LocalServerModel`] is the shipped backend.

pub mod download;
pub mod local;
pub mod manager;

#[cfg(test)]
mod test_server;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

pub use manager::ModelManager;

/// Download progress sink, called with values in `0.0..=1.0`.
pub type ProgressCallback = Arc<dyn Fn(f32) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Rough token count of `messages`: about four characters per token plus a
/// few tokens of chat framing per message.
pub fn approx_tokens(messages: &[ChatMessage]) -> u32 {
    messages
        .iter()
        .map(|m| m.content.chars().count().div_ceil(4) as u32 + 4)
        .sum()
}

/// One chat completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Final result of a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// The raw model response, reasoning blocks included.
    pub text: String,
}

/// A language model that has to be fetched and loaded before it can complete.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Whether the weights are present locally.
    async fn is_downloaded(&self) -> Result<bool>;

    /// Fetch the weights, reporting progress. A no-op when already present.
    async fn download(&self, on_progress: ProgressCallback) -> Result<()>;

    /// Load the model so that [`complete`](Self::complete) can run.
    async fn init(&self) -> Result<()>;

    /// Run a completion, handing every generated token to `on_token` in order.
    async fn complete(
        &self,
        request: CompletionRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<Completion>;
}
