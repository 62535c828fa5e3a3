//! CLI subcommands

pub mod import;
pub mod index;
pub mod note;
pub mod search;
pub mod similar;

use std::sync::{Arc, OnceLock};

use anyhow::{Context as _, Result};

use bra3n::core::config::Config;
use bra3n::search::{build_provider, model_id, EmbeddingProvider, Indexer, NoteStore, SearchService};

/// Store for one command, plus the embedding provider once a command needs it
pub struct Context {
    pub config: Config,
    pub store: Arc<NoteStore>,
    provider: OnceLock<Arc<dyn EmbeddingProvider>>,
}

impl Context {
    pub fn open(config: Config) -> Result<Self> {
        let store = NoteStore::open(&config.storage.path).with_context(|| {
            format!("Failed to open note store at {}", config.storage.path.display())
        })?;

        Ok(Self {
            config,
            store: Arc::new(store),
            provider: OnceLock::new(),
        })
    }

    /// Built on first use, so commands that never embed need no API key
    fn provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        if let Some(provider) = self.provider.get() {
            return Ok(provider.clone());
        }
        let provider =
            build_provider(&self.config.embedding).context("Failed to set up embedding provider")?;
        Ok(self.provider.get_or_init(|| provider).clone())
    }

    pub fn search_service(&self) -> Result<SearchService> {
        Ok(SearchService::new(self.provider()?, self.store.clone(), &self.config.search))
    }

    pub fn indexer(&self) -> Result<Indexer> {
        Ok(Indexer::new(self.provider()?, self.store.clone(), &self.config.indexer))
    }

    /// Model the configured provider records with its vectors
    pub fn model(&self) -> String {
        model_id(&self.config.embedding)
    }
}

/// Char-aware truncation for terminal output
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
