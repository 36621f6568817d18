//! SQLite-backed journal with cache invalidation on every write.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::types::{EntryUpdate, JournalEntry, Mood};
use super::EntryStore;
use crate::cache::InsightCache;

const ENTRY_COLUMNS: &str = "id, date, mood, content, created_at, updated_at";

/// Journal entries in the `journal_entries` table.
///
/// Shares its connection with the cache's key-value store, so the lock is
/// always released before the cache is invalidated.
#[derive(Clone)]
pub struct SqliteJournal {
    db: Arc<Mutex<Connection>>,
    cache: InsightCache,
}

impl SqliteJournal {
    pub fn new(db: Arc<Mutex<Connection>>, cache: InsightCache) -> Self {
        Self { db, cache }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))
    }

    /// Create the entry for `date`. Fails if that day already has one.
    pub fn create_entry(
        &self,
        date: NaiveDate,
        mood: Option<Mood>,
        content: &str,
    ) -> Result<JournalEntry> {
        let entry = {
            let conn = self.lock()?;
            if find_entry(&conn, date)?.is_some() {
                bail!("an entry for {date} already exists");
            }

            let now = chrono::Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO journal_entries (date, mood, content, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![date_key(date), mood.map(|m| m.as_str()), content, now],
            )
            .with_context(|| format!("failed to create entry for {date}"))?;

            JournalEntry {
                id: conn.last_insert_rowid(),
                date,
                mood,
                content: content.to_string(),
                created_at: now.clone(),
                updated_at: now,
            }
        };

        self.cache.invalidate_all();
        tracing::info!(date = %date, id = entry.id, "journal entry created");
        Ok(entry)
    }

    /// Apply `update` to the entry for `date`.
    pub fn update_entry(&self, date: NaiveDate, update: EntryUpdate) -> Result<JournalEntry> {
        let entry = {
            let conn = self.lock()?;
            let Some(mut entry) = find_entry(&conn, date)? else {
                bail!("no entry for {date}");
            };

            if let Some(mood) = update.mood {
                entry.mood = mood;
            }
            if let Some(content) = update.content {
                entry.content = content;
            }
            entry.updated_at = chrono::Utc::now().to_rfc3339();

            conn.execute(
                "UPDATE journal_entries SET mood = ?1, content = ?2, updated_at = ?3 WHERE date = ?4",
                params![
                    entry.mood.map(|m| m.as_str()),
                    entry.content,
                    entry.updated_at,
                    date_key(date),
                ],
            )
            .with_context(|| format!("failed to update entry for {date}"))?;
            entry
        };

        self.cache.invalidate_all();
        tracing::info!(date = %date, "journal entry updated");
        Ok(entry)
    }

    /// Delete the entry for `date`.
    pub fn delete_entry(&self, date: NaiveDate) -> Result<()> {
        {
            let conn = self.lock()?;
            let rows = conn
                .execute(
                    "DELETE FROM journal_entries WHERE date = ?1",
                    params![date_key(date)],
                )
                .with_context(|| format!("failed to delete entry for {date}"))?;
            if rows == 0 {
                bail!("no entry for {date}");
            }
        }

        self.cache.invalidate_all();
        tracing::info!(date = %date, "journal entry deleted");
        Ok(())
    }

    pub fn get_entry(&self, date: NaiveDate) -> Result<Option<JournalEntry>> {
        let conn = self.lock()?;
        find_entry(&conn, date)
    }

    pub fn entry_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM journal_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl EntryStore for SqliteJournal {
    fn most_recent_entries(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries ORDER BY date DESC LIMIT ?1"
        ))?;
        let entries = stmt
            .query_map(params![limit as i64], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn find_entry(conn: &Connection, date: NaiveDate) -> Result<Option<JournalEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE date = ?1"),
            params![date_key(date)],
            entry_from_row,
        )
        .optional()?;
    Ok(entry)
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<JournalEntry> {
    let date_str: String = row.get(1)?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let mood = row
        .get::<_, Option<String>>(2)?
        .map(|s| s.parse::<Mood>())
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;

    Ok(JournalEntry {
        id: row.get(0)?,
        date,
        mood,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
