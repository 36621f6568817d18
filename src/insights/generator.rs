//! Cache-first generation of insights and suggestions.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use super::error::InsightError;
use super::kind::{GenerationType, InsightKind};
use super::prompts;
use super::records::{GeneratedOutput, InsightRecord, SuggestionsRecord};
use crate::cache::InsightCache;
use crate::config::TulipConfig;
use crate::filter::{strip_think_blocks, THINK_CLOSE, THINK_OPEN};
use crate::journal::{EntryStore, JournalEntry};
use crate::model::{approx_tokens, ChatMessage, CompletionRequest, ModelManager};

/// Text handed to the caller while a generation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    /// The complete visible content of a cached result, delivered once.
    Cached(String),
    /// One raw model token, reasoning markers included.
    Stream(String),
}

pub type TokenSink<'a> = &'a mut (dyn FnMut(TokenEvent) + Send);

/// Smallest answer worth asking for once the prompt is in the context.
const MIN_COMPLETION_TOKENS: u32 = 256;

/// Shape the model is asked to answer suggestions in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionsPayload {
    repeated_friction_points: Vec<String>,
    highlight_momentum: Vec<String>,
    emerging_opportunities: Vec<String>,
}

pub struct InsightGenerator {
    entries: Arc<dyn EntryStore>,
    cache: InsightCache,
    models: Arc<ModelManager>,
    insight_entries: usize,
    suggestion_entries: usize,
    temperature: f32,
    max_tokens: u32,
    context_size: u32,
}

impl InsightGenerator {
    pub fn new(
        entries: Arc<dyn EntryStore>,
        cache: InsightCache,
        models: Arc<ModelManager>,
        config: &TulipConfig,
    ) -> Self {
        Self {
            entries,
            cache,
            models,
            insight_entries: config.generation.insight_entries,
            suggestion_entries: config.generation.suggestion_entries,
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
            context_size: config.model.context_size,
        }
    }

    pub fn models(&self) -> &Arc<ModelManager> {
        &self.models
    }

    /// Run whichever generator `target` names.
    pub async fn generate(
        &self,
        target: GenerationType,
        on_token: TokenSink<'_>,
    ) -> Result<GeneratedOutput, InsightError> {
        match target {
            GenerationType::Insight(kind) => self
                .generate_insight(kind, on_token)
                .await
                .map(GeneratedOutput::Insight),
            GenerationType::Suggestions => self
                .generate_suggestions(on_token)
                .await
                .map(GeneratedOutput::Suggestions),
        }
    }

    /// Produce the insight for `kind`, from cache when one is stored.
    pub async fn generate_insight(
        &self,
        kind: InsightKind,
        on_token: TokenSink<'_>,
    ) -> Result<InsightRecord, InsightError> {
        if let Some(cached) = self.cache.get_insight(kind) {
            tracing::info!(kind = %kind, "serving cached insight");
            on_token(TokenEvent::Cached(cached.content.clone()));
            return Ok(cached);
        }

        let entries = self.recent_entries(self.insight_entries).await?;
        let generation_id = uuid::Uuid::now_v7();
        tracing::info!(%generation_id, kind = %kind, entries = entries.len(), "generating insight");

        self.ensure_model().await?;
        let raw = self
            .complete(prompts::insight_messages(kind, &entries), on_token)
            .await?;

        let record = InsightRecord {
            generated_at: Utc::now(),
            kind,
            entry_count: entries.len(),
            content: strip_think_blocks(&raw),
            last_entry_date: newest_date(&entries),
        };

        if let Err(e) = self.cache.set_insight(&record) {
            let err = InsightError::CacheWriteFailed(e.to_string());
            tracing::warn!(%generation_id, error = %err, "insight not cached");
        }
        tracing::info!(%generation_id, chars = record.content.len(), "insight generated");
        Ok(record)
    }

    /// Produce categorized suggestions, from cache when stored.
    pub async fn generate_suggestions(
        &self,
        on_token: TokenSink<'_>,
    ) -> Result<SuggestionsRecord, InsightError> {
        if let Some(cached) = self.cache.get_suggestions() {
            tracing::info!("serving cached suggestions");
            on_token(TokenEvent::Cached(cached.to_display_text()));
            return Ok(cached);
        }

        let entries = self.recent_entries(self.suggestion_entries).await?;
        let generation_id = uuid::Uuid::now_v7();
        tracing::info!(%generation_id, entries = entries.len(), "generating suggestions");

        self.ensure_model().await?;
        let raw = self
            .complete(prompts::suggestions_messages(&entries), on_token)
            .await?;

        let payload = parse_suggestions(&raw).map_err(|e| {
            tracing::warn!(%generation_id, error = %e, response = %raw, "unparseable suggestions");
            InsightError::MalformedSuggestions(e)
        })?;

        let record = SuggestionsRecord {
            friction_points: payload.repeated_friction_points,
            momentum: payload.highlight_momentum,
            opportunities: payload.emerging_opportunities,
            generated_at: Utc::now(),
            entry_count: entries.len(),
            last_entry_date: newest_date(&entries),
        };

        if let Err(e) = self.cache.set_suggestions(&record) {
            let err = InsightError::CacheWriteFailed(e.to_string());
            tracing::warn!(%generation_id, error = %err, "suggestions not cached");
        }
        tracing::info!(%generation_id, "suggestions generated");
        Ok(record)
    }

    async fn recent_entries(&self, limit: usize) -> Result<Vec<JournalEntry>, InsightError> {
        let store = Arc::clone(&self.entries);
        let entries = tokio::task::spawn_blocking(move || store.most_recent_entries(limit))
            .await
            .map_err(|e| InsightError::GenerationFailed(format!("entry lookup panicked: {e}")))?
            .map_err(|e| InsightError::GenerationFailed(format!("{e:#}")))?;

        if entries.is_empty() {
            return Err(InsightError::NoEntries);
        }
        Ok(entries)
    }

    async fn ensure_model(&self) -> Result<(), InsightError> {
        self.models.ensure_ready().await.map_err(|e| {
            let detail = format!("{e:#}");
            tracing::warn!(error = %detail, "model unavailable");
            InsightError::ModelNotReady(detail)
        })
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        on_token: TokenSink<'_>,
    ) -> Result<String, InsightError> {
        let prompt_tokens = approx_tokens(&messages);
        let max_tokens = completion_budget(prompt_tokens, self.context_size, self.max_tokens)
            .ok_or_else(|| {
                InsightError::GenerationFailed(format!(
                    "prompt of about {prompt_tokens} tokens does not fit the {}-token context",
                    self.context_size
                ))
            })?;
        tracing::debug!(prompt_tokens, max_tokens, "completion budget");

        let request = CompletionRequest {
            messages,
            temperature: self.temperature,
            max_tokens,
        };
        let mut forward = |token: &str| on_token(TokenEvent::Stream(token.to_string()));
        let completion = self
            .models
            .complete(request, &mut forward)
            .await
            .map_err(|e| InsightError::GenerationFailed(format!("{e:#}")))?;
        Ok(completion.text)
    }
}

/// Answer length left once a prompt of `prompt_tokens` is in the context,
/// capped at `max_tokens`. `None` when too little room remains.
fn completion_budget(prompt_tokens: u32, context_size: u32, max_tokens: u32) -> Option<u32> {
    let available = context_size.saturating_sub(prompt_tokens);
    (available >= MIN_COMPLETION_TOKENS).then(|| available.min(max_tokens))
}

/// Date of the newest entry. Callers never pass an empty slice.
fn newest_date(entries: &[JournalEntry]) -> chrono::NaiveDate {
    entries
        .iter()
        .map(|e| e.date)
        .max()
        .unwrap_or_else(|| Utc::now().date_naive())
}

/// Strip reasoning blocks, stray markers and one code fence, then parse.
fn parse_suggestions(raw: &str) -> Result<SuggestionsPayload, serde_json::Error> {
    let cleaned = strip_think_blocks(raw)
        .replace(THINK_OPEN, "")
        .replace(THINK_CLOSE, "");
    let cleaned = strip_code_fence(cleaned.trim());
    serde_json::from_str(cleaned.trim())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let raw = r#"{"repeatedFrictionPoints":["a"],"highlightMomentum":["b"],"emergingOpportunities":[]}"#;
        let payload = parse_suggestions(raw).unwrap();
        assert_eq!(payload.repeated_friction_points, vec!["a"]);
        assert!(payload.emerging_opportunities.is_empty());
    }

    #[test]
    fn parses_fenced_json_after_reasoning() {
        let raw = "<think>they want json</think>\n```json\n{\"repeatedFrictionPoints\":[\"a\"],\
                   \"highlightMomentum\":[\"b\"],\"emergingOpportunities\":[\"c\"]}\n```\n";
        let payload = parse_suggestions(raw).unwrap();
        assert_eq!(payload.highlight_momentum, vec!["b"]);
        assert_eq!(payload.emerging_opportunities, vec!["c"]);
    }

    #[test]
    fn stray_markers_are_removed() {
        let raw = "</think>{\"repeatedFrictionPoints\":[],\"highlightMomentum\":[],\
                   \"emergingOpportunities\":[]}";
        assert!(parse_suggestions(raw).is_ok());
    }

    #[test]
    fn refusal_and_missing_field_fail() {
        assert!(parse_suggestions("I cannot comply with that request.").is_err());
        assert!(parse_suggestions(r#"{"repeatedFrictionPoints":[],"highlightMomentum":[]}"#).is_err());
    }

    #[test]
    fn budget_shares_the_context_with_the_prompt() {
        assert_eq!(completion_budget(300, 2048, 2000), Some(1748));
        assert_eq!(completion_budget(20, 2048, 2000), Some(2000));
        assert_eq!(completion_budget(1900, 2048, 2000), None);
        assert_eq!(completion_budget(4000, 2048, 2000), None);
    }

    #[test]
    fn code_fence_without_language() {
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("{}"), "{}");
    }
}
