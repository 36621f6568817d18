//! Generated artifacts as they are cached and returned to callers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::kind::InsightKind;

/// One generated insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRecord {
    #[serde(rename = "timestamp")]
    pub generated_at: DateTime<Utc>,
    #[serde(rename = "insightType")]
    pub kind: InsightKind,
    pub entry_count: usize,
    /// Model output with every reasoning block removed.
    pub content: String,
    /// Date of the newest entry the insight was generated from.
    pub last_entry_date: NaiveDate,
}

/// Suggestions grouped into their three categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsRecord {
    #[serde(rename = "repeatedFrictionPoints")]
    pub friction_points: Vec<String>,
    #[serde(rename = "highlightMomentum")]
    pub momentum: Vec<String>,
    #[serde(rename = "emergingOpportunities")]
    pub opportunities: Vec<String>,
    #[serde(rename = "timestamp")]
    pub generated_at: DateTime<Utc>,
    pub entry_count: usize,
    pub last_entry_date: NaiveDate,
}

impl SuggestionsRecord {
    /// Human-readable rendering, used when a cached record is replayed.
    pub fn to_display_text(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn categories(&self) -> [(&'static str, &[String]); 3] {
        [
            ("Repeated friction points", &self.friction_points),
            ("Momentum to keep", &self.momentum),
            ("Emerging opportunities", &self.opportunities),
        ]
    }
}

/// Result of one generation, whichever generator produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedOutput {
    Insight(InsightRecord),
    Suggestions(SuggestionsRecord),
}

impl GeneratedOutput {
    pub fn entry_count(&self) -> usize {
        match self {
            Self::Insight(record) => record.entry_count,
            Self::Suggestions(record) => record.entry_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insight_record_uses_wire_names() {
        let record = InsightRecord {
            generated_at: "2025-11-28T08:00:00Z".parse().unwrap(),
            kind: InsightKind::EmotionalThemes,
            entry_count: 4,
            content: "You felt proud twice.".into(),
            last_entry_date: NaiveDate::from_ymd_opt(2025, 11, 27).unwrap(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["insightType"], "emotionalThemes");
        assert_eq!(value["entryCount"], 4);
        assert_eq!(value["lastEntryDate"], "2025-11-27");
        assert!(value["timestamp"].as_str().unwrap().starts_with("2025-11-28T08:00:00"));
    }

    #[test]
    fn suggestions_record_uses_category_names() {
        let record = SuggestionsRecord {
            friction_points: vec!["Block time for taxes".into()],
            momentum: vec![],
            opportunities: vec!["Try sketching".into()],
            generated_at: Utc::now(),
            entry_count: 3,
            last_entry_date: NaiveDate::from_ymd_opt(2025, 11, 27).unwrap(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["repeatedFrictionPoints"][0], "Block time for taxes");
        assert!(value["highlightMomentum"].as_array().unwrap().is_empty());
        assert!(record.to_display_text().contains("emergingOpportunities"));
    }
}
