//! Search façade: query text in, ranked notes out
//!
//! [`SearchService::try_search`] propagates errors for callers that want to
//! handle them; [`SearchService::search`] is the soft boundary used by the CLI
//! and MCP server, which logs the failure and returns an empty list with a
//! generic notice.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::config::SearchConfig;
use crate::core::note::Note;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::lexical::{fts_query, snippet};
use super::ranking::{fuse, FusionConfig};
use super::store::NoteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Semantic,
    Hybrid,
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semantic" => Ok(Self::Semantic),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(Error::validation(format!(
                "Unknown search mode '{}' (expected semantic or hybrid)",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semantic => write!(f, "semantic"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub project_id: Option<String>,
    pub mode: SearchMode,
    /// Text for the full-text side of a hybrid search; defaults to `query`
    pub lexical_query: Option<String>,
    /// `None` uses `search.default_limit`
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn semantic(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn hybrid(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: SearchMode::Hybrid,
            ..Self::default()
        }
    }

    pub fn in_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn lexical(mut self, text: impl Into<String>) -> Self {
        self.lexical_query = Some(text.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Ranked note. `score` is the ordering key: the cosine similarity in
/// semantic mode, the fused score in hybrid mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub note_id: String,
    pub project_id: String,
    pub title: String,
    pub snippet: String,
    pub similarity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_rank: Option<f32>,
    pub score: f32,
}

/// Result of a soft search: an error becomes an empty list plus a notice
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

pub struct SearchService {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<NoteStore>,
    cfg: SearchConfig,
    fusion: FusionConfig,
}

impl SearchService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<NoteStore>, cfg: &SearchConfig) -> Self {
        Self {
            provider,
            store,
            fusion: FusionConfig::from(cfg),
            cfg: cfg.clone(),
        }
    }

    /// Search, logging any failure and returning it as a notice
    pub async fn search(&self, request: &SearchRequest) -> SearchOutcome {
        let result = self.try_search(request).await;
        self.soften(result, "Search failed")
    }

    pub async fn try_search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let query = request.query.trim();
        let limit = self.effective_limit(request.limit);
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let project_id = scope(request.project_id.as_deref())?;

        tracing::debug!(mode = %request.mode, project_id, limit, "Running search");
        let vector = self.provider.embed_one(query).await?;

        match request.mode {
            SearchMode::Semantic => self.semantic(&vector, project_id, limit),
            SearchMode::Hybrid => {
                let text = request.lexical_query.as_deref().unwrap_or(query);
                match fts_query(text) {
                    Some(expression) => self.hybrid(&vector, &expression, project_id, limit),
                    None => {
                        tracing::debug!("Blank lexical query, using semantic ranking");
                        self.semantic(&vector, project_id, limit)
                    }
                }
            }
        }
    }

    /// Soft variant of [`SearchService::find_similar`]
    pub async fn similar_notes(&self, note_id: &str, limit: Option<usize>) -> SearchOutcome {
        let result = self.find_similar(note_id, limit).await;
        self.soften(result, "Similar-notes lookup failed")
    }

    /// Notes similar to an existing note, within the note's project.
    ///
    /// The query is the note's embedding text, run through the semantic path.
    /// The note itself is left out when `search.exclude_source_note` is set.
    pub async fn find_similar(&self, note_id: &str, limit: Option<usize>) -> Result<Vec<SearchResult>> {
        if note_id.trim().is_empty() {
            return Err(Error::validation("Note id must not be empty"));
        }
        let note = self.store.get_note(note_id)?.ok_or_else(|| Error::NoteNotFound {
            id: note_id.to_string(),
        })?;

        let query = note.embedding_text();
        let limit = self.effective_limit(limit);
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let exclude = self.cfg.exclude_source_note;
        let vector = self.provider.embed_one(&query).await?;
        let fetch = if exclude { limit + 1 } else { limit };
        let mut results = self.semantic(&vector, Some(&note.project_id), fetch)?;
        if exclude {
            results.retain(|r| r.note_id != note.id);
        }
        results.truncate(limit);
        Ok(results)
    }

    fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.cfg.default_limit)
            .min(self.cfg.max_limit)
    }

    fn semantic(&self, vector: &[f32], project_id: Option<&str>, limit: usize) -> Result<Vec<SearchResult>> {
        let ranked = self.store.similar(self.provider.model(), vector, project_id, limit)?;
        Ok(ranked
            .into_iter()
            .map(|(note, similarity)| self.result(note, similarity, None, similarity))
            .collect())
    }

    fn hybrid(
        &self,
        vector: &[f32],
        expression: &str,
        project_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let pool = limit.saturating_mul(self.cfg.candidate_multiplier.max(1));
        let lexical = self.store.lexical(expression, project_id, pool)?;
        if lexical.is_empty() {
            tracing::debug!("No full-text matches, using semantic ranking");
            return self.semantic(vector, project_id, limit);
        }
        let model = self.provider.model();
        let semantic = self.store.similar(model, vector, project_id, pool)?;

        let semantic_ids: Vec<(String, f32)> =
            semantic.iter().map(|(n, s)| (n.id.clone(), *s)).collect();
        let lexical_ids: Vec<(String, f32)> =
            lexical.iter().map(|(n, r)| (n.id.clone(), *r)).collect();

        let mut notes: HashMap<String, Note> = HashMap::new();
        for (note, _) in semantic.into_iter().chain(lexical) {
            notes.entry(note.id.clone()).or_insert(note);
        }

        let mut fused = fuse(&semantic_ids, &lexical_ids, &self.fusion);
        fused.truncate(limit);

        // lexical-only hits were outside the semantic pool
        let missing: Vec<&str> = fused
            .iter()
            .filter(|f| f.similarity.is_none())
            .map(|f| f.note_id.as_str())
            .collect();
        let backfill = self.store.similarities(model, vector, &missing)?;

        let mut results = Vec::with_capacity(fused.len());
        for f in fused {
            let similarity = f
                .similarity
                .or_else(|| backfill.get(&f.note_id).copied())
                .unwrap_or(0.0);
            if let Some(note) = notes.remove(&f.note_id) {
                results.push(self.result(note, similarity, f.lexical_rank, f.score));
            }
        }
        Ok(results)
    }

    fn result(&self, note: Note, similarity: f32, lexical_rank: Option<f32>, score: f32) -> SearchResult {
        SearchResult {
            snippet: snippet(&note.body, self.cfg.snippet_chars),
            note_id: note.id,
            project_id: note.project_id,
            title: note.title,
            similarity,
            lexical_rank,
            score,
        }
    }

    fn soften(&self, result: Result<Vec<SearchResult>>, context: &str) -> SearchOutcome {
        match result {
            Ok(results) => SearchOutcome {
                results,
                notice: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "{}", context);
                SearchOutcome {
                    results: Vec::new(),
                    notice: Some(e.user_message()),
                }
            }
        }
    }
}

/// A present but blank project filter is a caller bug, not "all projects"
fn scope(project_id: Option<&str>) -> Result<Option<&str>> {
    match project_id {
        Some(p) if p.trim().is_empty() => Err(Error::validation("Project id must not be empty")),
        other => Ok(other),
    }
}
