mod cli;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tulip::config::TulipConfig;
use tulip::insights::InsightKind;
use tulip::journal::Mood;

#[derive(Parser)]
#[command(name = "tulip", version, about = "Private journal with on-device AI insights")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write and read journal entries
    Entry {
        #[command(subcommand)]
        action: EntryAction,
    },
    /// Generate (or replay) an insight over recent entries
    Insight {
        /// themes, moments, problems, progress, deprioritized, remember-patterns,
        /// emotional-themes, unresolved-problems, progress-trends, letting-go
        kind: InsightKind,
    },
    /// Generate (or replay) categorized suggestions
    Suggestions,
    /// Inspect or clear cached results
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage the language model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum EntryAction {
    /// Add the entry for a day (content from the argument or stdin)
    Add {
        /// Day of the entry, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// red, yellow or green
        #[arg(long)]
        mood: Option<Mood>,
        content: Option<String>,
    },
    /// Change the mood or content of an entry
    Edit {
        date: NaiveDate,
        #[arg(long, conflicts_with = "clear_mood")]
        mood: Option<Mood>,
        #[arg(long)]
        clear_mood: bool,
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete the entry for a day
    Delete { date: NaiveDate },
    /// Show the entry for a day
    Show { date: NaiveDate },
    /// List the most recent entries
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show which results are cached
    Status,
    /// Drop every cached insight and suggestion
    Clear,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the model weights to ~/.tulip/models/
    Download,
    /// Show whether the model is downloaded and reachable
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = TulipConfig::load()?;

    // Log to stderr so stdout carries only journal output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app = cli::App::open(config)?;

    match cli.command {
        Command::Entry { action } => match action {
            EntryAction::Add {
                date,
                mood,
                content,
            } => cli::entry::add(&app, date, mood, content)?,
            EntryAction::Edit {
                date,
                mood,
                clear_mood,
                content,
            } => cli::entry::edit(&app, date, mood, clear_mood, content)?,
            EntryAction::Delete { date } => cli::entry::delete(&app, date)?,
            EntryAction::Show { date } => cli::entry::show(&app, date)?,
            EntryAction::List { limit } => cli::entry::list(&app, limit)?,
        },
        Command::Insight { kind } => cli::generate::insight(&app, kind).await?,
        Command::Suggestions => cli::generate::suggestions(&app).await?,
        Command::Cache { action } => match action {
            CacheAction::Status => cli::cache::status(&app)?,
            CacheAction::Clear => cli::cache::clear(&app)?,
        },
        Command::Model { action } => match action {
            ModelAction::Download => cli::model::download(&app).await?,
            ModelAction::Status => cli::model::status(&app).await?,
        },
    }

    Ok(())
}
