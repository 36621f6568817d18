//! Observable lifecycle of one generation target.
//!
//! A [`GenerationSession`] runs generations for a single insight kind (or
//! for suggestions) and publishes a [`SessionSnapshot`] after every change
//! through a `tokio::sync::watch` channel. Streamed tokens go through the
//! session's [`ThinkTagFilter`], so observers only ever see visible text.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::filter::ThinkTagFilter;
use crate::insights::{GeneratedOutput, GenerationType, InsightError, InsightGenerator, TokenEvent};

/// Everything an observer needs to render a generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    /// Result of the last successful generation.
    pub output: Option<GeneratedOutput>,
    /// Visible text so far, reasoning removed.
    pub streaming_text: String,
    pub is_generating: bool,
    /// Set from the start of a generation until the first visible text.
    pub is_analyzing: bool,
    pub is_downloading_model: bool,
    /// Download progress in `0.0..=1.0`.
    pub download_progress: f32,
    /// User-facing message of the last failure.
    pub error: Option<String>,
    pub entry_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    DownloadingModel,
    Analyzing,
    Generating,
    Done,
    Error,
}

impl SessionSnapshot {
    pub fn phase(&self) -> Phase {
        if self.is_downloading_model {
            Phase::DownloadingModel
        } else if self.is_analyzing {
            Phase::Analyzing
        } else if self.is_generating {
            Phase::Generating
        } else if self.error.is_some() {
            Phase::Error
        } else if self.output.is_some() {
            Phase::Done
        } else {
            Phase::Idle
        }
    }
}

pub struct GenerationSession {
    target: GenerationType,
    generator: Arc<InsightGenerator>,
    in_flight: AtomicBool,
    filter: Mutex<ThinkTagFilter>,
    state: watch::Sender<SessionSnapshot>,
}

/// Releases the in-flight flag and clears the activity flags, even when
/// the generation future is dropped part-way.
struct InFlight<'a>(&'a GenerationSession);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.state.send_if_modified(|s| {
            let busy = s.is_generating || s.is_analyzing || s.is_downloading_model;
            s.is_generating = false;
            s.is_analyzing = false;
            s.is_downloading_model = false;
            busy
        });
        self.0.in_flight.store(false, Ordering::Release);
    }
}

impl GenerationSession {
    pub fn new(target: GenerationType, generator: Arc<InsightGenerator>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            target,
            generator,
            in_flight: AtomicBool::new(false),
            filter: Mutex::new(ThinkTagFilter::new()),
            state,
        }
    }

    pub fn target(&self) -> GenerationType {
        self.target
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Run one generation.
    ///
    /// Returns `false` without doing anything when a generation is already
    /// in flight on this session. The outcome lands in the snapshot.
    pub async fn generate(&self) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(generation = %self.target, "generation already in flight");
            return false;
        }
        let _in_flight = InFlight(self);

        self.lock_filter().reset();
        self.state.send_modify(|s| {
            s.error = None;
            s.output = None;
            s.streaming_text.clear();
            s.is_analyzing = true;
        });

        let result = self.run().await;
        let tail = self.lock_filter().finish();

        self.state.send_modify(|s| {
            s.streaming_text.push_str(&tail);
            match result {
                Ok(output) => {
                    s.entry_count = output.entry_count();
                    s.output = Some(output);
                }
                Err(message) => s.error = Some(message),
            }
            s.is_generating = false;
            s.is_analyzing = false;
        });
        true
    }

    async fn run(&self) -> Result<GeneratedOutput, String> {
        let models = self.generator.models();

        let downloaded = models.is_downloaded().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not check model weights");
            false
        });
        if !downloaded {
            self.state.send_modify(|s| {
                s.is_downloading_model = true;
                s.download_progress = 0.0;
            });
            let result = models
                .download(|progress| {
                    self.state.send_modify(|s| s.download_progress = progress);
                })
                .await;
            self.state.send_modify(|s| s.is_downloading_model = false);

            if let Err(e) = result {
                let detail = format!("{e:#}");
                tracing::warn!(error = %detail, "model download failed");
                return Err(InsightError::ModelNotReady(detail).to_string());
            }
        }

        self.state.send_modify(|s| s.is_generating = true);
        let mut on_token = |event: TokenEvent| self.apply(event);
        self.generator
            .generate(self.target, &mut on_token)
            .await
            .map_err(|e| {
                tracing::warn!(generation = %self.target, error = %e, "generation failed");
                e.to_string()
            })
    }

    fn apply(&self, event: TokenEvent) {
        let mut filter = self.lock_filter();
        let (visible, replace) = match event {
            TokenEvent::Cached(text) => (filter.process_full_text(&text), true),
            TokenEvent::Stream(token) => (filter.process_token(&token), false),
        };
        drop(filter);

        self.state.send_if_modified(|s| {
            if replace {
                s.streaming_text = visible;
            } else if visible.is_empty() {
                return false;
            } else {
                s.streaming_text.push_str(&visible);
            }
            if !s.streaming_text.is_empty() {
                s.is_analyzing = false;
            }
            true
        });
    }

    fn lock_filter(&self) -> MutexGuard<'_, ThinkTagFilter> {
        self.filter.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
