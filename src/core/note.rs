use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A text unit belonging to a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source_document_id: Option<String>,
}

impl Note {
    pub fn new(id: impl Into<String>, project_id: impl Into<String>, title: &str, body: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            project_id: project_id.into(),
            title: title.to_string(),
            body: body.to_string(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            source_document_id: None,
        }
    }

    /// New note with a random identifier
    pub fn create(project_id: impl Into<String>, title: &str, body: &str) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), project_id, title, body)
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::validation("Note id must not be empty"));
        }
        if self.project_id.trim().is_empty() {
            return Err(Error::validation("Project id must not be empty"));
        }
        Ok(())
    }

    /// Text that gets embedded: title and body, trimmed and joined
    pub fn embedding_text(&self) -> String {
        embedding_text(&self.title, &self.body)
    }

    /// Hash of [`Note::embedding_text`], used to detect stale embeddings
    pub fn content_hash(&self) -> String {
        content_hash(&self.embedding_text())
    }

    /// Apply an edit. Returns true when the embedded text changed.
    pub fn edit(&mut self, title: Option<&str>, body: Option<&str>) -> bool {
        let before = self.content_hash();
        if let Some(title) = title {
            self.title = title.to_string();
        }
        if let Some(body) = body {
            self.body = body.to_string();
        }
        self.updated_at = Utc::now();
        before != self.content_hash()
    }
}

pub fn embedding_text(title: &str, body: &str) -> String {
    let title = title.trim();
    let body = body.trim();
    match (title.is_empty(), body.is_empty()) {
        (true, _) => body.to_string(),
        (false, true) => title.to_string(),
        (false, false) => format!("{}\n{}", title, body),
    }
}

pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Trim, drop empties and deduplicate while keeping first-seen order
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = BTreeSet::new();
    tags.into_iter()
        .map(|t| t.into().trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_joins_trimmed_parts() {
        assert_eq!(embedding_text("  Q3 budget review ", " numbers\n"), "Q3 budget review\nnumbers");
        assert_eq!(embedding_text("Title", "   "), "Title");
        assert_eq!(embedding_text("", "body only"), "body only");
        assert_eq!(embedding_text(" ", "\t"), "");
    }

    #[test]
    fn test_edit_reports_text_changes() {
        let mut note = Note::new("n1", "p1", "Title", "Body");
        assert!(!note.edit(Some("Title"), None));
        assert!(note.edit(None, Some("New body")));
        assert_eq!(note.body, "New body");
    }

    #[test]
    fn test_content_hash_ignores_surrounding_whitespace() {
        let a = Note::new("a", "p", "Title", "Body");
        let b = Note::new("b", "p", " Title ", "Body\n");
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_normalize_tags() {
        let note = Note::create("p", "t", "b").with_tags(["ai", " ai", "", "rust"]);
        assert_eq!(note.tags, vec!["ai".to_string(), "rust".to_string()]);
    }

    #[test]
    fn test_validate_rejects_blank_ids() {
        assert!(Note::new(" ", "p", "t", "b").validate().is_err());
        assert!(Note::new("n", "", "t", "b").validate().is_err());
        assert!(Note::new("n", "p", "", "").validate().is_ok());
    }
}
