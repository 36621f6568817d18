#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Notify;

use tulip::cache::kv::{KeyValueStore, SqliteKvStore};
use tulip::cache::InsightCache;
use tulip::config::TulipConfig;
use tulip::db;
use tulip::insights::InsightGenerator;
use tulip::journal::store::SqliteJournal;
use tulip::model::{
    Completion, CompletionRequest, LanguageModel, ModelManager, ProgressCallback,
};

/// Open a fresh in-memory database shared the way the application shares it.
pub fn test_db() -> Arc<Mutex<rusqlite::Connection>> {
    Arc::new(Mutex::new(db::open_memory_database().unwrap()))
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
}

/// Language model that replays a fixed token script.
#[derive(Default)]
pub struct FakeModel {
    pub tokens: Vec<String>,
    pub downloaded: AtomicBool,
    pub fail_download: bool,
    /// Number of download attempts that fail before one succeeds.
    pub flaky_downloads: AtomicUsize,
    pub fail_init: bool,
    /// Emit the script, then drop the stream with an error.
    pub fail_complete: bool,
    /// When set, `complete` waits for a permit before emitting anything.
    pub gate: Option<Arc<Notify>>,
    pub downloads: AtomicUsize,
    pub inits: AtomicUsize,
    pub completions: AtomicUsize,
    pub last_request: Mutex<Option<CompletionRequest>>,
}

impl FakeModel {
    /// A downloaded model that will answer with `tokens`.
    pub fn scripted(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            downloaded: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn not_downloaded(mut self) -> Self {
        self.downloaded = AtomicBool::new(false);
        self
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn last_user_prompt(&self) -> String {
        self.last_request
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|r| r.messages.last().map(|m| m.content.clone()))
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn is_downloaded(&self) -> Result<bool> {
        Ok(self.downloaded.load(Ordering::SeqCst))
    }

    async fn download(&self, on_progress: ProgressCallback) -> Result<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        for step in 1..=2 {
            tokio::task::yield_now().await;
            on_progress(step as f32 / 2.0);
        }
        let flaky = self
            .flaky_downloads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if self.fail_download || flaky {
            anyhow::bail!("connection reset");
        }
        self.downloaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn init(&self) -> Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            anyhow::bail!("server not running");
        }
        Ok(())
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<Completion> {
        self.completions.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        for token in &self.tokens {
            on_token(token);
        }
        if self.fail_complete {
            anyhow::bail!("model server closed the stream");
        }
        Ok(Completion {
            text: self.tokens.concat(),
        })
    }
}

/// Key-value store that never has anything and refuses writes.
pub struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }
    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        anyhow::bail!("database is locked")
    }
    fn multi_remove(&self, _keys: &[&str]) -> Result<()> {
        Ok(())
    }
}

/// Fully wired pipeline over an in-memory database and a fake model.
pub struct Harness {
    pub journal: SqliteJournal,
    pub cache: InsightCache,
    pub model: Arc<FakeModel>,
    pub generator: Arc<InsightGenerator>,
}

impl Harness {
    pub fn new(model: FakeModel) -> Self {
        let db = test_db();
        let store = Arc::new(SqliteKvStore::new(db.clone()));
        Self::build(db, store, model)
    }

    /// Journal on a real database, cache on `store`.
    pub fn with_store(store: Arc<dyn KeyValueStore>, model: FakeModel) -> Self {
        Self::build(test_db(), store, model)
    }

    fn build(
        db: Arc<Mutex<rusqlite::Connection>>,
        store: Arc<dyn KeyValueStore>,
        model: FakeModel,
    ) -> Self {
        let cache = InsightCache::new(store);
        let journal = SqliteJournal::new(db, cache.clone());
        let model = Arc::new(model);
        let models = Arc::new(ModelManager::new(model.clone()));
        let generator = Arc::new(InsightGenerator::new(
            Arc::new(journal.clone()),
            cache.clone(),
            models,
            &TulipConfig::default(),
        ));
        Self {
            journal,
            cache,
            model,
            generator,
        }
    }

    /// Write entries for November `days`, one per day.
    pub fn seed(&self, days: &[u32]) {
        for &d in days {
            self.journal
                .create_entry(day(d), None, &format!("Entry for day {d}"))
                .unwrap();
        }
    }
}
