//! Engine configuration
//!
//! Loaded once from TOML and passed explicitly into the provider, store and
//! search service constructors. Every section has defaults so an empty file
//! (or no file at all) is a valid starting point.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default location of the config file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = ".bra3n/config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub indexer: IndexerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".bra3n/notes.db"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible HTTP embeddings endpoint
    OpenAi,
    /// Offline harmonic token projection
    Local,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub api_base: String,
    pub path: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout_ms: u64,
    /// Inline key. Takes precedence over `api_key_env`.
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub default_headers: BTreeMap<String, String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            api_base: "https://api.openai.com/v1".to_string(),
            path: "/embeddings".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_ms: 30_000,
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            default_headers: BTreeMap::new(),
        }
    }
}

impl EmbeddingConfig {
    /// Config for the offline provider, mostly useful in tests
    pub fn local(dimensions: usize) -> Self {
        Self {
            provider: ProviderKind::Local,
            model: "harmonic-token-projection".to_string(),
            dimensions,
            ..Self::default()
        }
    }

    /// API key, failing fast when the provider needs one and none is set
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::config(format!(
                "embedding.api_key is not set (checked inline value and ${})",
                self.api_key_env
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionStrategy {
    /// Reciprocal rank fusion
    Rrf,
    /// Linear blend of normalized scores
    Weighted,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    /// Each signal contributes `limit * candidate_multiplier` candidates to fusion
    pub candidate_multiplier: usize,
    pub min_similarity: f32,
    pub exclude_source_note: bool,
    pub fusion: FusionStrategy,
    pub rrf_k: f32,
    pub semantic_weight: f32,
    pub lexical_weight: f32,
    pub snippet_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            candidate_multiplier: 4,
            min_similarity: 0.0,
            exclude_source_note: true,
            fusion: FusionStrategy::Rrf,
            rrf_k: 60.0,
            semantic_weight: 1.0,
            lexical_weight: 1.0,
            snippet_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub requests_per_second: f64,
    pub burst: u32,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5.0,
            burst: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Read, resolve credentials and validate
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file at {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Like [`Config::load`] but a missing file means all defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Self::from_toml("")
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let mut cfg: Config = toml::from_str(raw)
            .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
        cfg.resolve_api_key(|name| std::env::var(name).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fill `embedding.api_key` from the environment when not set inline
    pub fn resolve_api_key(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let inline = self
            .embedding
            .api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false);
        if !inline && !self.embedding.api_key_env.is_empty() {
            self.embedding.api_key = lookup(&self.embedding.api_key_env);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let embedding = &self.embedding;
        if embedding.dimensions == 0 {
            return Err(Error::config("embedding.dimensions must be greater than zero"));
        }
        match embedding.provider {
            ProviderKind::OpenAi => {
                if embedding.api_base.trim().is_empty() {
                    return Err(Error::config("embedding.api_base must be non-empty"));
                }
                if embedding.model.trim().is_empty() {
                    return Err(Error::config("embedding.model must be non-empty"));
                }
            }
            ProviderKind::Local => {
                if embedding.dimensions % 2 != 0 {
                    return Err(Error::config(
                        "embedding.dimensions must be even for the local provider",
                    ));
                }
            }
        }

        let search = &self.search;
        if search.default_limit == 0 {
            return Err(Error::config("search.default_limit must be greater than zero"));
        }
        if search.max_limit < search.default_limit {
            return Err(Error::config("search.max_limit must be at least search.default_limit"));
        }
        if search.candidate_multiplier == 0 {
            return Err(Error::config("search.candidate_multiplier must be greater than zero"));
        }
        if !search.min_similarity.is_finite() || !(-1.0..=1.0).contains(&search.min_similarity) {
            return Err(Error::config("search.min_similarity must be within [-1, 1]"));
        }
        for (name, weight) in [
            ("search.semantic_weight", search.semantic_weight),
            ("search.lexical_weight", search.lexical_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::config(format!("{} must be a finite non-negative number", name)));
            }
        }
        if search.semantic_weight + search.lexical_weight <= 0.0 {
            return Err(Error::config("At least one search weight must be positive"));
        }
        if !search.rrf_k.is_finite() || search.rrf_k <= 0.0 {
            return Err(Error::config("search.rrf_k must be greater than zero"));
        }

        if !self.indexer.requests_per_second.is_finite() || self.indexer.requests_per_second <= 0.0
        {
            return Err(Error::config("indexer.requests_per_second must be greater than zero"));
        }
        if self.indexer.burst == 0 {
            return Err(Error::config("indexer.burst must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str, key: Option<&str>) -> Result<Config> {
        let mut cfg: Config = toml::from_str(raw).map_err(|e| Error::config(e.to_string()))?;
        cfg.resolve_api_key(|_| key.map(String::from));
        cfg.validate()?;
        Ok(cfg)
    }

    #[test]
    fn test_defaults_with_env_key() -> Result<()> {
        let cfg = parse("", Some("sk-test"))?;
        assert_eq!(cfg.embedding.dimensions, 1536);
        assert_eq!(cfg.embedding.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.search.default_limit, 10);
        assert_eq!(cfg.search.fusion, FusionStrategy::Rrf);
        assert!(cfg.search.exclude_source_note);
        Ok(())
    }

    #[test]
    fn test_missing_api_key_fails_when_required() -> Result<()> {
        let cfg = parse("", None)?;
        let err = cfg.embedding.require_api_key().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        Ok(())
    }

    #[test]
    fn test_inline_key_wins_over_env() -> Result<()> {
        let cfg = parse("[embedding]\napi_key = \"sk-inline\"\n", Some("sk-env"))?;
        assert_eq!(cfg.embedding.api_key.as_deref(), Some("sk-inline"));
        Ok(())
    }

    #[test]
    fn test_local_provider_needs_no_key() -> Result<()> {
        let cfg = parse("[embedding]\nprovider = \"local\"\ndimensions = 384\n", None)?;
        assert_eq!(cfg.embedding.provider, ProviderKind::Local);
        Ok(())
    }

    #[test]
    fn test_rejects_odd_local_dimensions() {
        let err = parse("[embedding]\nprovider = \"local\"\ndimensions = 383\n", None).unwrap_err();
        assert!(err.to_string().contains("even"));
    }

    #[test]
    fn test_rejects_bad_search_settings() {
        let base = "[embedding]\nprovider = \"local\"\ndimensions = 8\n";
        for section in [
            "[search]\nmax_limit = 5\n",
            "[search]\nsemantic_weight = 0.0\nlexical_weight = 0.0\n",
            "[search]\nmin_similarity = 2.0\n",
            "[indexer]\nrequests_per_second = 0.0\n",
            "[indexer]\nburst = 0\n",
        ] {
            let raw = format!("{}{}", base, section);
            assert!(parse(&raw, None).is_err(), "accepted: {}", section);
        }
    }

    #[test]
    fn test_load_or_default_reads_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[embedding]\nprovider = \"local\"\ndimensions = 16\n")?;
        let cfg = Config::load_or_default(&path)?;
        assert_eq!(cfg.embedding.dimensions, 16);
        Ok(())
    }
}
