//! Embedding generation for notes
//!
//! Indexing is best effort: a failed embedding is logged and reported to the
//! [`Notifier`], never propagated, and never touches the note itself. Search
//! freshness is eventually consistent.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;

use crate::core::config::IndexerConfig;
use crate::core::note::{content_hash, Note};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::ratelimit::RateLimiter;
use super::store::NoteStore;

/// A user-facing message about a failed embedding
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub note_id: String,
    pub message: String,
}

/// Non-blocking sink for indexing failures
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Drops notices; failures still reach the log
pub struct LogOnly;

impl Notifier for LogOnly {
    fn notify(&self, _notice: Notice) {}
}

/// Forwards notices to a channel, e.g. a UI toast queue
pub struct ChannelNotifier(pub UnboundedSender<Notice>);

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        // receiver gone means nobody is listening any more
        let _ = self.0.send(notice);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EmbedOutcome {
    Stored,
    /// Blank text, or the stored embedding is already current
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub note_id: String,
    pub message: String,
}

/// Batch indexing statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<BatchFailure>,
    pub duration_ms: u128,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed.len()
    }
}

pub struct Indexer {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<NoteStore>,
    limiter: RateLimiter,
    notifier: Arc<dyn Notifier>,
}

impl Indexer {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<NoteStore>, cfg: &IndexerConfig) -> Self {
        Self {
            provider,
            store,
            limiter: RateLimiter::from(cfg),
            notifier: Arc::new(LogOnly),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Embed `text` and store it as the embedding of `note_id`.
    ///
    /// Returns true only when an embedding was stored. Blank text is a no-op.
    pub async fn embed_note(&self, note_id: &str, text: &str) -> bool {
        self.embed_text(note_id, text).await == EmbedOutcome::Stored
    }

    /// Regenerate the embedding of `note` unless it is already current
    pub async fn refresh_note(&self, note: &Note) -> EmbedOutcome {
        match self.store.embedding_info(&note.id) {
            Ok(Some(info)) if info.is_current(note, self.provider.model()) => {
                return EmbedOutcome::Skipped;
            }
            Ok(_) => {}
            Err(e) => return self.report_failure(&note.id, e),
        }
        self.embed_text(&note.id, &note.embedding_text()).await
    }

    /// Embed notes one at a time in the given order.
    ///
    /// Every provider call waits on the rate limiter. A failed note is
    /// recorded and the batch moves on.
    pub async fn embed_batch(&self, notes: &[Note]) -> BatchReport {
        let start = Instant::now();
        let mut report = BatchReport::default();

        for note in notes {
            match self.embed_text(&note.id, &note.embedding_text()).await {
                EmbedOutcome::Stored => report.succeeded += 1,
                EmbedOutcome::Skipped => report.skipped += 1,
                EmbedOutcome::Failed(message) => report.failed.push(BatchFailure {
                    note_id: note.id.clone(),
                    message,
                }),
            }
        }

        report.duration_ms = start.elapsed().as_millis();
        tracing::info!(
            succeeded = report.succeeded,
            skipped = report.skipped,
            failed = report.failed.len(),
            duration_ms = report.duration_ms as u64,
            "Embedding batch finished"
        );
        report
    }

    /// Re-embed every note whose embedding is missing, out of date or built
    /// by another model
    pub async fn reindex_stale(&self, project_id: Option<&str>) -> Result<BatchReport> {
        let stale = self.store.stale_notes(self.provider.model(), project_id)?;
        let report = self.embed_batch(&stale).await;
        self.record_index()?;
        Ok(report)
    }

    /// Re-embed every note in scope, current or not (e.g. after a model change)
    pub async fn rebuild(&self, project_id: Option<&str>) -> Result<BatchReport> {
        let notes = self.store.list_notes(project_id, usize::MAX)?;
        let report = self.embed_batch(&notes).await;
        self.record_index()?;
        Ok(report)
    }

    fn record_index(&self) -> Result<()> {
        self.store.set_meta("embedding_model", self.provider.model())?;
        self.store
            .set_meta("last_full_index", &chrono::Utc::now().timestamp().to_string())
    }

    async fn embed_text(&self, note_id: &str, text: &str) -> EmbedOutcome {
        if note_id.trim().is_empty() {
            return self.report_failure(note_id, Error::validation("Note id must not be empty"));
        }
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!(note_id, "Skipping embedding for blank note");
            return EmbedOutcome::Skipped;
        }

        match self.try_embed(note_id, text).await {
            Ok(()) => EmbedOutcome::Stored,
            Err(e) => self.report_failure(note_id, e),
        }
    }

    async fn try_embed(&self, note_id: &str, text: &str) -> Result<()> {
        self.limiter.acquire().await;
        let vector = self.provider.embed_one(text).await?;
        self.store
            .upsert_embedding(note_id, self.provider.model(), &vector, &content_hash(text))?;
        tracing::debug!(note_id, dimensions = vector.len(), "Stored embedding");
        Ok(())
    }

    fn report_failure(&self, note_id: &str, error: Error) -> EmbedOutcome {
        tracing::warn!(note_id, error = %error, "Embedding generation failed");
        let message = error.user_message();
        self.notifier.notify(Notice {
            note_id: note_id.to_string(),
            message: message.clone(),
        });
        EmbedOutcome::Failed(message)
    }
}
