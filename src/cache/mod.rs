//! Cache of generated insights and suggestions.
//!
//! Each [`GenerationType`] owns one key in the underlying [`KeyValueStore`].
//! Values are JSON `{"timestamp": …, "data": …}` envelopes. There is no
//! expiry: entries live until [`InsightCache::invalidate_all`] runs, which
//! every journal mutation does before it completes.

pub mod kv;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::insights::kind::{GenerationType, InsightKind};
use crate::insights::records::{InsightRecord, SuggestionsRecord};
use kv::KeyValueStore;

/// Stored envelope around a cached artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
    pub data: T,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write cache entry: {0}")]
    Store(String),
}

/// Typed view over the key-value store.
#[derive(Clone)]
pub struct InsightCache {
    store: Arc<dyn KeyValueStore>,
}

impl InsightCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Look up the entry for `generation`.
    ///
    /// Read and decode failures are logged and reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, generation: GenerationType) -> Option<CacheEntry<T>> {
        let key = generation.cache_key();
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(key, "cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => {
                tracing::debug!(key, "cache hit");
                Some(entry)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Write `data` under the key of `generation`, stamped with the current time.
    pub fn set<T: Serialize>(&self, generation: GenerationType, data: &T) -> Result<(), CacheError> {
        let key = generation.cache_key();
        let entry = CacheEntry {
            timestamp: Utc::now(),
            data,
        };
        let raw = serde_json::to_string(&entry)?;
        self.store
            .set(key, &raw)
            .map_err(|e| CacheError::Store(format!("{e:#}")))?;
        tracing::debug!(key, bytes = raw.len(), "cache entry written");
        Ok(())
    }

    pub fn get_insight(&self, kind: InsightKind) -> Option<InsightRecord> {
        self.get(GenerationType::Insight(kind)).map(|entry| entry.data)
    }

    pub fn set_insight(&self, record: &InsightRecord) -> Result<(), CacheError> {
        self.set(GenerationType::Insight(record.kind), record)
    }

    pub fn get_suggestions(&self) -> Option<SuggestionsRecord> {
        self.get(GenerationType::Suggestions).map(|entry| entry.data)
    }

    pub fn set_suggestions(&self, record: &SuggestionsRecord) -> Result<(), CacheError> {
        self.set(GenerationType::Suggestions, record)
    }

    /// Drop every cached artifact in one store operation.
    ///
    /// Failures are logged and swallowed so that the journal write that
    /// triggered the invalidation still succeeds.
    pub fn invalidate_all(&self) {
        if let Err(e) = self.try_invalidate_all() {
            tracing::warn!(error = %e, "failed to invalidate generation caches");
        }
    }

    /// [`invalidate_all`](Self::invalidate_all), reporting the failure.
    pub fn try_invalidate_all(&self) -> Result<(), CacheError> {
        let keys: Vec<&str> = GenerationType::all().map(|t| t.cache_key()).collect();
        self.store
            .multi_remove(&keys)
            .map_err(|e| CacheError::Store(format!("{e:#}")))?;
        tracing::info!(keys = keys.len(), "generation caches invalidated");
        Ok(())
    }
}
