pub mod cache;
pub mod entry;
pub mod generate;
pub mod model;

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use tulip::cache::kv::SqliteKvStore;
use tulip::cache::InsightCache;
use tulip::config::TulipConfig;
use tulip::db::migrations;
use tulip::insights::InsightGenerator;
use tulip::journal::store::SqliteJournal;
use tulip::model::local::LocalServerModel;
use tulip::model::ModelManager;

/// Everything a command needs, wired once per invocation.
pub struct App {
    pub config: TulipConfig,
    pub journal: SqliteJournal,
    pub cache: InsightCache,
    pub generator: Arc<InsightGenerator>,
}

impl App {
    pub fn open(config: TulipConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = tulip::db::open_database(&db_path)?;
        let db = Arc::new(Mutex::new(conn));

        let cache = InsightCache::new(Arc::new(SqliteKvStore::new(db.clone())));
        let journal = SqliteJournal::new(db.clone(), cache.clone());

        check_model_change(&db, &cache, &config.model.name)?;

        let backend = LocalServerModel::new(&config.model)?;
        let models = Arc::new(ModelManager::new(Arc::new(backend)));
        let generator = Arc::new(InsightGenerator::new(
            Arc::new(journal.clone()),
            cache.clone(),
            models,
            &config,
        ));

        Ok(Self {
            config,
            journal,
            cache,
            generator,
        })
    }
}

/// Cached results from a different model are dropped.
fn check_model_change(
    db: &Arc<Mutex<rusqlite::Connection>>,
    cache: &InsightCache,
    configured: &str,
) -> Result<()> {
    let stored = {
        let conn = db.lock().map_err(|e| anyhow!("db lock poisoned: {e}"))?;
        migrations::get_model_name(&conn)?
    };
    if stored.as_deref() == Some(configured) {
        return Ok(());
    }

    tracing::warn!(
        stored = ?stored,
        configured,
        "model changed, dropping cached insights"
    );
    cache.invalidate_all();

    let conn = db.lock().map_err(|e| anyhow!("db lock poisoned: {e}"))?;
    migrations::set_model_name(&conn, configured)?;
    Ok(())
}
