//! Generation type definitions.
//!
//! [`InsightKind`] names the analytical lens of a single insight and
//! [`GenerationType`] adds the suggestions generator. Each generation type
//! owns exactly one cache key, resolved by `match` so a new variant cannot
//! compile without one.

use serde::{Deserialize, Serialize};

/// The analytical lenses an insight can be generated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsightKind {
    /// Themes marked as important.
    Themes,
    /// Meaningful moments and emotional patterns.
    Moments,
    /// Core problems and unsolved threads.
    Problems,
    /// Progress, competence and growth.
    Progress,
    /// Things deprioritized or let go of.
    Deprioritized,
    /// Recurring priorities across the month.
    RememberPatterns,
    /// Emotional through-lines across the month.
    EmotionalThemes,
    /// Long-running unresolved questions.
    UnresolvedProblems,
    /// Progress trends across the month.
    ProgressTrends,
    /// Patterns in what was let go.
    LettingGo,
}

impl InsightKind {
    pub const ALL: [InsightKind; 10] = [
        Self::Themes,
        Self::Moments,
        Self::Problems,
        Self::Progress,
        Self::Deprioritized,
        Self::RememberPatterns,
        Self::EmotionalThemes,
        Self::UnresolvedProblems,
        Self::ProgressTrends,
        Self::LettingGo,
    ];

    /// Wire name, as stored in cached records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Themes => "themes",
            Self::Moments => "moments",
            Self::Problems => "problems",
            Self::Progress => "progress",
            Self::Deprioritized => "deprioritized",
            Self::RememberPatterns => "rememberPatterns",
            Self::EmotionalThemes => "emotionalThemes",
            Self::UnresolvedProblems => "unresolvedProblems",
            Self::ProgressTrends => "progressTrends",
            Self::LettingGo => "lettingGo",
        }
    }

    /// Command-line spelling.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Themes => "themes",
            Self::Moments => "moments",
            Self::Problems => "problems",
            Self::Progress => "progress",
            Self::Deprioritized => "deprioritized",
            Self::RememberPatterns => "remember-patterns",
            Self::EmotionalThemes => "emotional-themes",
            Self::UnresolvedProblems => "unresolved-problems",
            Self::ProgressTrends => "progress-trends",
            Self::LettingGo => "letting-go",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Themes => "Themes You Marked as Important",
            Self::Moments => "Meaningful Moments & Emotional Patterns",
            Self::Problems => "Core Problems & Unsolved Threads",
            Self::Progress => "Progress, Competence & Growth",
            Self::Deprioritized => "Things You Deprioritized or Let Go Of",
            Self::RememberPatterns => "What You Keep Coming Back To",
            Self::EmotionalThemes => "Your Emotional Through-Lines",
            Self::UnresolvedProblems => "Questions Still Open",
            Self::ProgressTrends => "How You've Been Growing",
            Self::LettingGo => "What You're Letting Go Of",
        }
    }

    /// Monthly lenses frame their prompt with the date range of the entries.
    pub fn is_monthly(&self) -> bool {
        matches!(
            self,
            Self::RememberPatterns
                | Self::EmotionalThemes
                | Self::UnresolvedProblems
                | Self::ProgressTrends
                | Self::LettingGo
        )
    }
}

impl std::fmt::Display for InsightKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InsightKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.slug() == s)
            .ok_or_else(|| format!("unknown insight kind: {s}"))
    }
}

/// Everything the pipeline can generate and cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationType {
    Insight(InsightKind),
    Suggestions,
}

impl GenerationType {
    /// Every generation type, in cache-key order.
    pub fn all() -> impl Iterator<Item = GenerationType> {
        InsightKind::ALL
            .into_iter()
            .map(GenerationType::Insight)
            .chain(std::iter::once(GenerationType::Suggestions))
    }

    /// Storage key of the cached artifact for this type.
    pub fn cache_key(&self) -> &'static str {
        match self {
            Self::Insight(InsightKind::Themes) => "insight_themes_cache",
            Self::Insight(InsightKind::Moments) => "insight_moments_cache",
            Self::Insight(InsightKind::Problems) => "insight_problems_cache",
            Self::Insight(InsightKind::Progress) => "insight_progress_cache",
            Self::Insight(InsightKind::Deprioritized) => "insight_deprioritized_cache",
            Self::Insight(InsightKind::RememberPatterns) => "insight_remember_patterns_cache",
            Self::Insight(InsightKind::EmotionalThemes) => "insight_emotional_themes_cache",
            Self::Insight(InsightKind::UnresolvedProblems) => "insight_unresolved_problems_cache",
            Self::Insight(InsightKind::ProgressTrends) => "insight_progress_trends_cache",
            Self::Insight(InsightKind::LettingGo) => "insight_letting_go_cache",
            Self::Suggestions => "suggestions_cache",
        }
    }
}

impl std::fmt::Display for GenerationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insight(kind) => write!(f, "insight:{kind}"),
            Self::Suggestions => f.write_str("suggestions"),
        }
    }
}
