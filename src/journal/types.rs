//! Journal entry type definitions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Optional colour-coded mood attached to a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Red,
    Yellow,
    Green,
}

impl Mood {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "red" => Ok(Self::Red),
            "yellow" => Ok(Self::Yellow),
            "green" => Ok(Self::Green),
            _ => Err(format!("unknown mood: {s}")),
        }
    }
}

/// One journaled day, matching the `journal_entries` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: i64,
    /// Calendar day the entry belongs to; unique.
    pub date: NaiveDate,
    pub mood: Option<Mood>,
    pub content: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-modification timestamp.
    pub updated_at: String,
}

/// Partial update of an entry. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct EntryUpdate {
    /// `Some(None)` clears the mood.
    pub mood: Option<Option<Mood>>,
    pub content: Option<String>,
}
