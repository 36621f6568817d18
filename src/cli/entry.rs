//! CLI `entry` commands: write and read journal entries.

use std::io::Read;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use tulip::journal::{EntryStore, EntryUpdate, Mood};

use super::App;

/// Use `content` or, when absent, everything on stdin.
fn content_or_stdin(content: Option<String>) -> Result<String> {
    if let Some(content) = content {
        return Ok(content);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read entry from stdin")?;
    if buf.trim().is_empty() {
        bail!("entry content is empty");
    }
    Ok(buf)
}

pub fn add(
    app: &App,
    date: Option<NaiveDate>,
    mood: Option<Mood>,
    content: Option<String>,
) -> Result<()> {
    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let content = content_or_stdin(content)?;
    let entry = app.journal.create_entry(date, mood, &content)?;
    println!("Saved entry for {} (id {}).", entry.date, entry.id);
    Ok(())
}

pub fn edit(
    app: &App,
    date: NaiveDate,
    mood: Option<Mood>,
    clear_mood: bool,
    content: Option<String>,
) -> Result<()> {
    let update = EntryUpdate {
        mood: if clear_mood { Some(None) } else { mood.map(Some) },
        content,
    };
    if update.mood.is_none() && update.content.is_none() {
        bail!("nothing to change: pass --mood, --clear-mood or --content");
    }
    app.journal.update_entry(date, update)?;
    println!("Updated entry for {date}.");
    Ok(())
}

pub fn delete(app: &App, date: NaiveDate) -> Result<()> {
    app.journal.delete_entry(date)?;
    println!("Deleted entry for {date}.");
    Ok(())
}

pub fn show(app: &App, date: NaiveDate) -> Result<()> {
    let Some(entry) = app.journal.get_entry(date)? else {
        bail!("no entry for {date}");
    };

    println!("Entry: {}", entry.date);
    println!("{}", "=".repeat(40));
    if let Some(mood) = entry.mood {
        println!("  Mood:      {mood}");
    }
    println!("  Created:   {}", entry.created_at);
    println!("  Updated:   {}", entry.updated_at);
    println!();
    println!("{}", entry.content);
    Ok(())
}

pub fn list(app: &App, limit: usize) -> Result<()> {
    let entries = app.journal.most_recent_entries(limit)?;
    if entries.is_empty() {
        println!("No entries yet.");
        return Ok(());
    }

    for entry in &entries {
        let mood = entry.mood.map(|m| m.as_str()).unwrap_or("-");
        let first_line = entry.content.lines().next().unwrap_or("");
        let preview: String = first_line.chars().take(60).collect();
        println!("{}  {:<6}  {}", entry.date, mood, preview);
    }
    println!();
    println!("{} of {} entries", entries.len(), app.journal.entry_count()?);
    Ok(())
}
