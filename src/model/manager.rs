//! Process-wide owner of the language model backend.
//!
//! The application root builds one [`ModelManager`] and hands it out by
//! `Arc`. A download in progress lives in a single pending slot as a shared
//! future, so every caller that asks for the model while it is downloading
//! awaits the same transfer. Initialization runs at most once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{watch, OnceCell};

use super::{Completion, CompletionRequest, LanguageModel, ProgressCallback};

type SharedDownload = Shared<BoxFuture<'static, Result<(), String>>>;

/// The download in flight, tagged so that only the callers of this attempt
/// can clear it from the slot.
struct PendingDownload {
    attempt: u64,
    future: SharedDownload,
}

pub struct ModelManager {
    backend: Arc<dyn LanguageModel>,
    pending_download: Mutex<Option<PendingDownload>>,
    attempts: AtomicU64,
    progress: Arc<watch::Sender<f32>>,
    initialized: OnceCell<()>,
}

impl ModelManager {
    pub fn new(backend: Arc<dyn LanguageModel>) -> Self {
        let (progress, _) = watch::channel(0.0);
        Self {
            backend,
            pending_download: Mutex::new(None),
            attempts: AtomicU64::new(0),
            progress: Arc::new(progress),
            initialized: OnceCell::new(),
        }
    }

    pub async fn is_downloaded(&self) -> Result<bool> {
        self.backend.is_downloaded().await
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    /// Download the model, or join the download already in flight.
    ///
    /// `on_progress` sees every progress update published while this caller
    /// waits, ending with `1.0` on success.
    pub async fn download(&self, on_progress: impl Fn(f32)) -> Result<()> {
        let mut progress = self.progress.subscribe();
        let (attempt, mut download) = self.pending_or_start()?;

        let result = loop {
            tokio::select! {
                result = &mut download => break result,
                Ok(()) = progress.changed() => {
                    let value = *progress.borrow_and_update();
                    on_progress(value);
                }
            }
        };

        self.clear_pending(attempt);

        match result {
            Ok(()) => {
                on_progress(1.0);
                Ok(())
            }
            Err(message) => Err(anyhow!(message)),
        }
    }

    /// Make sure the model is downloaded and initialized.
    pub async fn ensure_ready(&self) -> Result<()> {
        if !self.backend.is_downloaded().await? {
            self.download(|_| {}).await?;
        }

        self.initialized
            .get_or_try_init(|| async {
                self.backend.init().await?;
                tracing::info!("language model initialized");
                Ok::<(), anyhow::Error>(())
            })
            .await?;
        Ok(())
    }

    pub async fn complete(
        &self,
        request: CompletionRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<Completion> {
        self.backend.complete(request, on_token).await
    }

    fn pending_or_start(&self) -> Result<(u64, SharedDownload)> {
        let mut slot = self
            .pending_download
            .lock()
            .map_err(|e| anyhow!("download slot poisoned: {e}"))?;

        if let Some(pending) = slot.as_ref() {
            tracing::debug!(attempt = pending.attempt, "joining in-flight model download");
            return Ok((pending.attempt, pending.future.clone()));
        }

        let backend = Arc::clone(&self.backend);
        let sender = Arc::clone(&self.progress);
        sender.send_replace(0.0);
        let publish: ProgressCallback = Arc::new(move |value: f32| {
            sender.send_replace(value.clamp(0.0, 1.0));
        });

        let download = async move {
            backend
                .download(publish)
                .await
                .map_err(|e| format!("{e:#}"))
        }
        .boxed()
        .shared();

        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(attempt, "starting model download");
        *slot = Some(PendingDownload {
            attempt,
            future: download.clone(),
        });
        Ok((attempt, download))
    }

    /// Empty the slot if it still holds `attempt`. A resolved `Shared` can't
    /// be compared by pointer any more, so the attempt number is the identity.
    fn clear_pending(&self, attempt: u64) {
        if let Ok(mut slot) = self.pending_download.lock() {
            if slot.as_ref().is_some_and(|pending| pending.attempt == attempt) {
                *slot = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct SlowBackend {
        downloaded: AtomicBool,
        downloads: AtomicUsize,
        inits: AtomicUsize,
        fail_download: bool,
        /// Attempts that fail before downloads start succeeding.
        flaky_attempts: usize,
    }

    #[async_trait]
    impl LanguageModel for SlowBackend {
        async fn is_downloaded(&self) -> Result<bool> {
            Ok(self.downloaded.load(Ordering::SeqCst))
        }

        async fn download(&self, on_progress: ProgressCallback) -> Result<()> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            for step in 1..=4 {
                tokio::time::sleep(Duration::from_millis(10)).await;
                on_progress(step as f32 / 4.0);
            }
            let attempt = self.downloads.load(Ordering::SeqCst);
            if self.fail_download || attempt <= self.flaky_attempts {
                anyhow::bail!("mirror unreachable");
            }
            self.downloaded.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn init(&self) -> Result<()> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
            on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
        ) -> Result<Completion> {
            on_token("ok");
            Ok(Completion { text: "ok".into() })
        }
    }

    #[tokio::test]
    async fn concurrent_downloads_share_one_transfer() {
        let backend = Arc::new(SlowBackend::default());
        let manager = ModelManager::new(backend.clone());

        let (a, b) = tokio::join!(manager.download(|_| {}), manager.download(|_| {}));
        a.unwrap();
        b.unwrap();

        assert_eq!(backend.downloads.load(Ordering::SeqCst), 1);
        assert!(manager.is_downloaded().await.unwrap());
    }

    #[tokio::test]
    async fn progress_reaches_caller_and_ends_at_one() {
        let manager = ModelManager::new(Arc::new(SlowBackend::default()));
        let seen = Mutex::new(Vec::new());

        manager
            .download(|p| seen.lock().unwrap().push(p))
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.last().copied(), Some(1.0));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn failed_download_clears_slot_for_retry() {
        let backend = Arc::new(SlowBackend {
            fail_download: true,
            ..Default::default()
        });
        let manager = ModelManager::new(backend.clone());

        let err = manager.download(|_| {}).await.unwrap_err();
        assert!(err.to_string().contains("mirror unreachable"));
        assert!(manager.pending_download.lock().unwrap().is_none());

        let _ = manager.download(|_| {}).await;
        assert_eq!(backend.downloads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_on_next_call() {
        let backend = Arc::new(SlowBackend {
            flaky_attempts: 1,
            ..Default::default()
        });
        let manager = ModelManager::new(backend.clone());

        assert!(manager.download(|_| {}).await.is_err());
        manager.download(|_| {}).await.unwrap();
        manager.ensure_ready().await.unwrap();

        assert_eq!(backend.downloads.load(Ordering::SeqCst), 2);
        assert!(manager.is_downloaded().await.unwrap());
    }

    #[tokio::test]
    async fn ensure_ready_initializes_once() {
        let backend = Arc::new(SlowBackend::default());
        let manager = ModelManager::new(backend.clone());

        manager.ensure_ready().await.unwrap();
        manager.ensure_ready().await.unwrap();

        assert_eq!(backend.downloads.load(Ordering::SeqCst), 1);
        assert_eq!(backend.inits.load(Ordering::SeqCst), 1);
        assert!(manager.is_initialized());
    }
}
