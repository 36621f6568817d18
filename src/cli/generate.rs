//! CLI `insight` and `suggestions` commands.
//!
//! Drives a [`GenerationSession`] and renders its snapshots: a progress bar
//! while the model downloads, a spinner until the first visible text, then
//! the text itself on stdout as it streams.

use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Result};
use indicatif::ProgressBar;

use tulip::insights::{GeneratedOutput, GenerationType, InsightKind};
use tulip::session::{GenerationSession, Phase, SessionSnapshot};

use super::model::{progress_bar, set_progress};
use super::App;

pub async fn insight(app: &App, kind: InsightKind) -> Result<()> {
    println!("{}", kind.title());
    println!("{}", "=".repeat(kind.title().chars().count()));
    run(app, GenerationType::Insight(kind), true).await
}

pub async fn suggestions(app: &App) -> Result<()> {
    run(app, GenerationType::Suggestions, false).await
}

async fn run(app: &App, target: GenerationType, stream_text: bool) -> Result<()> {
    let session = GenerationSession::new(target, app.generator.clone());
    let mut updates = session.subscribe();
    let mut view = Terminal::new(stream_text);

    let generation = session.generate();
    tokio::pin!(generation);
    loop {
        tokio::select! {
            _ = &mut generation => break,
            Ok(()) = updates.changed() => {
                let snapshot = updates.borrow_and_update().clone();
                view.render(&snapshot);
            }
        }
    }

    let snapshot = session.snapshot();
    view.render(&snapshot);
    view.close();

    if let Some(error) = snapshot.error {
        bail!(error);
    }
    match snapshot.output {
        Some(GeneratedOutput::Suggestions(record)) => {
            for (title, items) in record.categories() {
                println!("{title}");
                for item in items {
                    println!("  - {item}");
                }
                println!();
            }
            println!("Based on {} entries up to {}.", record.entry_count, record.last_entry_date);
        }
        Some(GeneratedOutput::Insight(record)) => {
            println!();
            println!("Based on {} entries up to {}.", record.entry_count, record.last_entry_date);
        }
        None => {}
    }
    Ok(())
}

/// Incremental renderer for session snapshots.
struct Terminal {
    stream_text: bool,
    printed: usize,
    download: Option<ProgressBar>,
    spinner: Option<ProgressBar>,
}

impl Terminal {
    fn new(stream_text: bool) -> Self {
        Self {
            stream_text,
            printed: 0,
            download: None,
            spinner: None,
        }
    }

    fn render(&mut self, snapshot: &SessionSnapshot) {
        match snapshot.phase() {
            Phase::DownloadingModel => {
                let pb = self.download.get_or_insert_with(|| {
                    eprintln!("Downloading model...");
                    progress_bar()
                });
                set_progress(pb, snapshot.download_progress);
                return;
            }
            Phase::Analyzing | Phase::Generating if self.spinner.is_none() => {
                self.finish_download();
                if snapshot.streaming_text.is_empty() {
                    let spinner = ProgressBar::new_spinner();
                    spinner.set_message("Analyzing your entries...");
                    spinner.enable_steady_tick(Duration::from_millis(100));
                    self.spinner = Some(spinner);
                }
            }
            _ => self.finish_download(),
        }

        if !self.stream_text {
            return;
        }
        let text = &snapshot.streaming_text;
        if text.len() > self.printed && text.is_char_boundary(self.printed) {
            if let Some(spinner) = self.spinner.take() {
                spinner.finish_and_clear();
            }
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(text[self.printed..].as_bytes());
            let _ = stdout.flush();
            self.printed = text.len();
        }
    }

    fn finish_download(&mut self) {
        if let Some(pb) = self.download.take() {
            pb.finish_and_clear();
        }
    }

    fn close(&mut self) {
        self.finish_download();
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        if self.printed > 0 {
            println!();
        }
    }
}
