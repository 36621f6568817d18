//! Journal entries: the source data insights are generated from.
//!
//! [`EntryStore`] is the read contract the generator depends on.
//! [`store::SqliteJournal`] implements it and owns the write path, where every
//! create, update and delete invalidates the insight cache before returning.

pub mod store;
pub mod types;

use anyhow::Result;

pub use types::{EntryUpdate, JournalEntry, Mood};

/// Read access to journal entries.
///
/// Implementations are synchronous; async callers use
/// `tokio::task::spawn_blocking`.
pub trait EntryStore: Send + Sync {
    /// Up to `limit` entries, newest date first.
    fn most_recent_entries(&self, limit: usize) -> Result<Vec<JournalEntry>>;
}
