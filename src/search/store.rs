//! Note and embedding store on SQLite
//!
//! Notes, their embeddings and an FTS5 index over title and body live in one
//! database. Embeddings are stored as little-endian f32 BLOBs and compared in
//! Rust with a brute-force cosine scan over the requested project, which is
//! fine for the tens of thousands of notes a brain holds.
//!
//! Every read takes an optional project filter into the SQL itself, so rows
//! of other tenants never leave the database.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::core::note::Note;
use crate::error::{Error, Result};

use super::embedding::cosine_similarity;

const NOTE_COLUMNS: &str =
    "n.id, n.project_id, n.title, n.body, n.tags, n.source_document_id, n.created_at, n.updated_at";

pub struct NoteStore {
    conn: Mutex<Connection>,
}

/// Embedding row metadata (the vector itself is only read during search)
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingInfo {
    pub note_id: String,
    pub model: String,
    pub dimensions: usize,
    pub content_hash: String,
    pub generated_at: DateTime<Utc>,
}

impl EmbeddingInfo {
    /// Built by `model` from the current text of `note`
    pub fn is_current(&self, note: &Note, model: &str) -> bool {
        self.model == model && self.content_hash == note.content_hash()
    }
}

/// Index statistics
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub note_count: usize,
    pub embedding_count: usize,
    pub stale_count: usize,
    pub last_indexed: Option<DateTime<Utc>>,
}

impl NoteStore {
    /// Open or create database at path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(db_path)?)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                tags TEXT NOT NULL,  -- JSON array
                source_document_id TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS embeddings (
                note_id TEXT PRIMARY KEY,
                model TEXT NOT NULL,
                dimensions INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                content_hash TEXT NOT NULL,
                generated_at INTEGER NOT NULL,
                FOREIGN KEY (note_id) REFERENCES notes(id) ON DELETE CASCADE
            );

            CREATE VIRTUAL TABLE IF NOT EXISTS notes_fts USING fts5(
                title, body, content='notes', content_rowid='rowid'
            );

            CREATE TRIGGER IF NOT EXISTS notes_fts_insert AFTER INSERT ON notes BEGIN
                INSERT INTO notes_fts(rowid, title, body) VALUES (new.rowid, new.title, new.body);
            END;
            CREATE TRIGGER IF NOT EXISTS notes_fts_delete AFTER DELETE ON notes BEGIN
                INSERT INTO notes_fts(notes_fts, rowid, title, body)
                VALUES ('delete', old.rowid, old.title, old.body);
            END;
            CREATE TRIGGER IF NOT EXISTS notes_fts_update AFTER UPDATE OF title, body ON notes BEGIN
                INSERT INTO notes_fts(notes_fts, rowid, title, body)
                VALUES ('delete', old.rowid, old.title, old.body);
                INSERT INTO notes_fts(rowid, title, body) VALUES (new.rowid, new.title, new.body);
            END;

            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_notes_project ON notes(project_id);
            CREATE INDEX IF NOT EXISTS idx_notes_updated ON notes(updated_at);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave SQLite half-written.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or update a note. The embedding, if any, is left untouched.
    pub fn upsert_note(&self, note: &Note) -> Result<()> {
        note.validate()?;
        let tags_json = serde_json::to_string(&note.tags)?;

        self.conn().execute(
            r#"
            INSERT INTO notes (id, project_id, title, body, tags, source_document_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                project_id = excluded.project_id,
                title = excluded.title,
                body = excluded.body,
                tags = excluded.tags,
                source_document_id = excluded.source_document_id,
                updated_at = excluded.updated_at
            "#,
            params![
                note.id,
                note.project_id,
                note.title,
                note.body,
                tags_json,
                note.source_document_id,
                note.created_at.timestamp_millis(),
                note.updated_at.timestamp_millis(),
            ],
        )?;

        Ok(())
    }

    /// Delete a note and, through the foreign key, its embedding.
    ///
    /// Returns false when no such note exists.
    pub fn delete_note(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn get_note(&self, id: &str) -> Result<Option<Note>> {
        let sql = format!("SELECT {} FROM notes n WHERE n.id = ?1", NOTE_COLUMNS);
        let note = self
            .conn()
            .query_row(&sql, params![id], |row| note_from_row(row))
            .optional()?;
        Ok(note)
    }

    /// Notes ordered by most recently updated first
    pub fn list_notes(&self, project_id: Option<&str>, limit: usize) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes n WHERE (?1 IS NULL OR n.project_id = ?1) \
             ORDER BY n.updated_at DESC, n.id ASC LIMIT ?2",
            NOTE_COLUMNS
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![project_id, sql_limit(limit)], |row| note_from_row(row))?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?);
        }
        Ok(notes)
    }

    /// Insert or replace the embedding of an existing note
    pub fn upsert_embedding(
        &self,
        note_id: &str,
        model: &str,
        embedding: &[f32],
        content_hash: &str,
    ) -> Result<()> {
        let conn = self.conn();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1)",
            params![note_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::NoteNotFound {
                id: note_id.to_string(),
            });
        }

        conn.execute(
            r#"
            INSERT INTO embeddings (note_id, model, dimensions, embedding, content_hash, generated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(note_id) DO UPDATE SET
                model = excluded.model,
                dimensions = excluded.dimensions,
                embedding = excluded.embedding,
                content_hash = excluded.content_hash,
                generated_at = excluded.generated_at
            "#,
            params![
                note_id,
                model,
                embedding.len() as i64,
                embedding_to_blob(embedding),
                content_hash,
                Utc::now().timestamp_millis(),
            ],
        )?;

        Ok(())
    }

    pub fn embedding_info(&self, note_id: &str) -> Result<Option<EmbeddingInfo>> {
        let info = self
            .conn()
            .query_row(
                "SELECT note_id, model, dimensions, content_hash, generated_at FROM embeddings WHERE note_id = ?1",
                params![note_id],
                |row| {
                    let dimensions: i64 = row.get(2)?;
                    Ok(EmbeddingInfo {
                        note_id: row.get(0)?,
                        model: row.get(1)?,
                        dimensions: dimensions as usize,
                        content_hash: row.get(3)?,
                        generated_at: from_millis(row.get(4)?),
                    })
                },
            )
            .optional()?;
        Ok(info)
    }

    /// Rank the embeddings `model` produced by cosine similarity to `query`.
    ///
    /// Sorted by descending similarity, ties by ascending note id. Vectors of
    /// another model, or of a different length, never take part.
    pub fn similar(
        &self,
        model: &str,
        query: &[f32],
        project_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(Note, f32)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {}, e.embedding FROM notes n JOIN embeddings e ON n.id = e.note_id \
             WHERE e.model = ?1 AND (?2 IS NULL OR n.project_id = ?2)",
            NOTE_COLUMNS
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![model, project_id], |row| {
            let blob: Vec<u8> = row.get(8)?;
            Ok((note_from_row(row)?, blob))
        })?;

        let mut results: Vec<(Note, f32)> = Vec::new();
        let mut skipped = 0usize;

        for row in rows {
            let (note, blob) = row?;
            let embedding = blob_to_embedding(&blob);
            if embedding.len() != query.len() {
                skipped += 1;
                continue;
            }
            let similarity = cosine_similarity(query, &embedding);
            results.push((note, similarity));
        }

        if skipped > 0 {
            tracing::warn!(
                skipped,
                expected = query.len(),
                "Skipped embeddings with mismatched dimensions; rebuild the index"
            );
        }

        sort_ranked(&mut results);
        results.truncate(limit);

        Ok(results)
    }

    /// Full-text matches for an FTS5 expression, best first.
    ///
    /// The returned rank is `-bm25`, so higher is better.
    pub fn lexical(
        &self,
        fts_query: &str,
        project_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(Note, f32)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {}, -bm25(notes_fts) AS rank FROM notes_fts \
             JOIN notes n ON n.rowid = notes_fts.rowid \
             WHERE notes_fts MATCH ?1 AND (?2 IS NULL OR n.project_id = ?2) \
             ORDER BY rank DESC, n.id ASC LIMIT ?3",
            NOTE_COLUMNS
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![fts_query, project_id, sql_limit(limit)], |row| {
            let rank: f64 = row.get(8)?;
            Ok((note_from_row(row)?, rank as f32))
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Cosine similarity of `query` to the `model` embeddings of `note_ids`.
    ///
    /// Notes without such an embedding are absent from the map.
    pub fn similarities(
        &self,
        model: &str,
        query: &[f32],
        note_ids: &[&str],
    ) -> Result<HashMap<String, f32>> {
        let mut scores = HashMap::new();
        if note_ids.is_empty() {
            return Ok(scores);
        }

        let placeholders = vec!["?"; note_ids.len()].join(", ");
        let sql = format!(
            "SELECT note_id, embedding FROM embeddings WHERE model = ? AND note_id IN ({})",
            placeholders
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let values = std::iter::once(model).chain(note_ids.iter().copied());
        let rows = stmt.query_map(params_from_iter(values), |row| {
            let id: String = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            Ok((id, blob))
        })?;

        for row in rows {
            let (id, blob) = row?;
            let embedding = blob_to_embedding(&blob);
            if embedding.len() == query.len() {
                scores.insert(id, cosine_similarity(query, &embedding));
            }
        }
        Ok(scores)
    }

    /// Notes with no embedding, or one built from older text or by a model
    /// other than `model`
    pub fn stale_notes(&self, model: &str, project_id: Option<&str>) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT {}, e.content_hash, e.model FROM notes n LEFT JOIN embeddings e ON n.id = e.note_id \
             WHERE (?1 IS NULL OR n.project_id = ?1) ORDER BY n.created_at ASC, n.id ASC",
            NOTE_COLUMNS
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![project_id], |row| {
            let hash: Option<String> = row.get(8)?;
            let built_by: Option<String> = row.get(9)?;
            Ok((note_from_row(row)?, hash, built_by))
        })?;

        let mut stale = Vec::new();
        for row in rows {
            let (note, hash, built_by) = row?;
            let current = built_by.as_deref() == Some(model)
                && hash.as_deref() == Some(note.content_hash().as_str());
            if !current {
                stale.push(note);
            }
        }
        Ok(stale)
    }

    /// Remove embeddings whose note is gone.
    ///
    /// Only databases written without foreign keys enabled can contain them.
    pub fn prune_orphans(&self) -> Result<usize> {
        let removed = self.conn().execute(
            "DELETE FROM embeddings WHERE note_id NOT IN (SELECT id FROM notes)",
            [],
        )?;
        Ok(removed)
    }

    /// Counts for `project_id`; only embeddings of `model` count as indexed
    pub fn stats(&self, model: &str, project_id: Option<&str>) -> Result<IndexStats> {
        let stale_count = self.stale_notes(model, project_id)?.len();
        let conn = self.conn();

        let note_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE (?1 IS NULL OR project_id = ?1)",
            params![project_id],
            |row| row.get(0),
        )?;

        let (embedding_count, last_indexed): (i64, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), MAX(e.generated_at) FROM embeddings e JOIN notes n ON n.id = e.note_id \
             WHERE e.model = ?1 AND (?2 IS NULL OR n.project_id = ?2)",
            params![model, project_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(IndexStats {
            note_count: note_count as usize,
            embedding_count: embedding_count as usize,
            stale_count,
            last_indexed: last_indexed.map(from_millis),
        })
    }

    /// Set index metadata
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Get index metadata
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

/// Descending score, ascending note id
pub(crate) fn sort_ranked(results: &mut [(Note, f32)]) {
    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let tags_json: String = row.get(4)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Note {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        tags,
        source_document_id: row.get(5)?,
        created_at: from_millis(row.get(6)?),
        updated_at: from_millis(row.get(7)?),
    })
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Convert f32 embedding to BLOB
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        blob.extend_from_slice(&val.to_le_bytes());
    }
    blob
}

/// Convert BLOB to f32 embedding
fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, project: &str, title: &str, body: &str) -> Note {
        Note::new(id, project, title, body)
    }

    #[test]
    fn test_blob_conversion() {
        let embedding = vec![1.0, 2.0, 3.0, -0.5];
        let blob = embedding_to_blob(&embedding);
        assert_eq!(blob.len(), 16);
        assert_eq!(blob_to_embedding(&blob), embedding);
    }

    #[test]
    fn test_note_roundtrip_and_update() -> Result<()> {
        let store = NoteStore::open_in_memory()?;
        let mut n = note("n1", "p1", "Title", "Body").with_tags(["a", "b"]);
        n.source_document_id = Some("doc-1".to_string());
        store.upsert_note(&n)?;

        let loaded = store.get_note("n1")?.expect("note stored");
        assert_eq!(loaded.title, "Title");
        assert_eq!(loaded.tags, vec!["a", "b"]);
        assert_eq!(loaded.source_document_id.as_deref(), Some("doc-1"));

        n.edit(Some("Renamed"), None);
        store.upsert_note(&n)?;
        assert_eq!(store.get_note("n1")?.map(|n| n.title), Some("Renamed".to_string()));
        assert_eq!(store.list_notes(None, 10)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_upsert_keeps_embedding() -> Result<()> {
        let store = NoteStore::open_in_memory()?;
        let mut n = note("n1", "p1", "Title", "Body");
        store.upsert_note(&n)?;
        store.upsert_embedding("n1", "m", &[1.0, 0.0], &n.content_hash())?;

        n.edit(None, Some("Changed"));
        store.upsert_note(&n)?;
        assert!(store.embedding_info("n1")?.is_some());
        assert_eq!(store.stale_notes("m", None)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_delete_cascades_to_embedding() -> Result<()> {
        let store = NoteStore::open_in_memory()?;
        let n = note("n1", "p1", "Title", "Body");
        store.upsert_note(&n)?;
        store.upsert_embedding("n1", "m", &[1.0, 0.0], &n.content_hash())?;

        assert!(store.delete_note("n1")?);
        assert!(!store.delete_note("n1")?);
        assert!(store.embedding_info("n1")?.is_none());
        assert_eq!(store.stats("m", None)?.embedding_count, 0);
        assert_eq!(store.prune_orphans()?, 0);
        Ok(())
    }

    #[test]
    fn test_embedding_requires_note() -> Result<()> {
        let store = NoteStore::open_in_memory()?;
        let err = store.upsert_embedding("ghost", "m", &[1.0], "h").unwrap_err();
        assert!(matches!(err, Error::NoteNotFound { .. }));
        Ok(())
    }

    #[test]
    fn test_similar_scoped_sorted_and_limited() -> Result<()> {
        let store = NoteStore::open_in_memory()?;
        let rows = [
            ("a", "p1", [1.0, 0.0]),
            ("b", "p1", [0.6, 0.8]),
            ("c", "p1", [0.0, 1.0]),
            ("d", "p2", [1.0, 0.0]),
        ];
        for (id, project, vector) in rows {
            let n = note(id, project, id, "text");
            store.upsert_note(&n)?;
            store.upsert_embedding(id, "m", &vector, &n.content_hash())?;
        }

        let results = store.similar("m", &[1.0, 0.0], Some("p1"), 2)?;
        let ids: Vec<_> = results.iter().map(|(n, _)| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(results.iter().all(|(n, _)| n.project_id == "p1"));
        assert!((results[0].1 - 1.0).abs() < 1e-6);
        assert!((results[1].1 - 0.6).abs() < 1e-6);

        let all = store.similar("m", &[1.0, 0.0], None, 10)?;
        let ids: Vec<_> = all.iter().map(|(n, _)| n.id.as_str()).collect();
        // "a" and "d" tie; ascending id breaks it
        assert_eq!(ids, vec!["a", "d", "b", "c"]);
        Ok(())
    }

    #[test]
    fn test_similar_skips_mismatched_dimensions() -> Result<()> {
        let store = NoteStore::open_in_memory()?;
        for (id, vector) in [("a", vec![1.0, 0.0]), ("b", vec![1.0, 0.0, 0.0])] {
            let n = note(id, "p", id, "");
            store.upsert_note(&n)?;
            store.upsert_embedding(id, "m", &vector, &n.content_hash())?;
        }
        let results = store.similar("m", &[1.0, 0.0], None, 10)?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, "a");
        Ok(())
    }

    #[test]
    fn test_other_model_embeddings_are_ignored_and_stale() -> Result<()> {
        let store = NoteStore::open_in_memory()?;
        let a = note("a", "p", "Alpha", "current model");
        let b = note("b", "p", "Beta", "previous model");
        store.upsert_note(&a)?;
        store.upsert_note(&b)?;
        store.upsert_embedding("a", "m", &[1.0, 0.0], &a.content_hash())?;
        store.upsert_embedding("b", "other-model", &[1.0, 0.0], &b.content_hash())?;

        let ids: Vec<_> = store
            .similar("m", &[1.0, 0.0], None, 10)?
            .into_iter()
            .map(|(n, _)| n.id)
            .collect();
        assert_eq!(ids, vec!["a"]);
        let scores = store.similarities("m", &[1.0, 0.0], &["a", "b"])?;
        assert!(scores.contains_key("a"));
        assert!(!scores.contains_key("b"));

        let stale: Vec<_> = store.stale_notes("m", None)?.into_iter().map(|n| n.id).collect();
        assert_eq!(stale, vec!["b"]);
        let stats = store.stats("m", None)?;
        assert_eq!(stats.embedding_count, 1);
        assert_eq!(stats.stale_count, 1);

        let info = store.embedding_info("b")?.expect("stored");
        assert!(!info.is_current(&b, "m"));
        assert!(info.is_current(&b, "other-model"));
        Ok(())
    }

    #[test]
    fn test_malformed_tags_are_an_error() -> Result<()> {
        let store = NoteStore::open_in_memory()?;
        store.upsert_note(&note("a", "p", "Alpha", "body").with_tags(["x"]))?;
        store
            .conn()
            .execute("UPDATE notes SET tags = 'not json' WHERE id = 'a'", [])?;

        assert!(matches!(store.get_note("a"), Err(Error::Storage(_))));
        Ok(())
    }

    #[test]
    fn test_similarities_by_id() -> Result<()> {
        let store = NoteStore::open_in_memory()?;
        for (id, vector) in [("a", [1.0, 0.0]), ("b", [0.0, 1.0])] {
            let n = note(id, "p", id, "");
            store.upsert_note(&n)?;
            store.upsert_embedding(id, "m", &vector, &n.content_hash())?;
        }
        store.upsert_note(&note("c", "p", "no vector", ""))?;

        let scores = store.similarities("m", &[1.0, 0.0], &["a", "b", "c"])?;
        assert_eq!(scores.len(), 2);
        assert!((scores["a"] - 1.0).abs() < 1e-6);
        assert!(scores["b"].abs() < 1e-6);
        assert!(store.similarities("m", &[1.0, 0.0], &[])?.is_empty());
        Ok(())
    }

    #[test]
    fn test_lexical_ranks_and_scopes() -> Result<()> {
        let store = NoteStore::open_in_memory()?;
        store.upsert_note(&note("a", "p1", "Budget review", "Q3 budget numbers and budget risks"))?;
        store.upsert_note(&note("b", "p1", "Standup", "Nothing about money"))?;
        store.upsert_note(&note("c", "p1", "Travel", "Budget for flights"))?;
        store.upsert_note(&note("d", "p2", "Budget", "Other tenant budget"))?;
        for id in ["e", "f", "g", "h"] {
            store.upsert_note(&note(id, "p1", "Filler", "Unrelated planning text"))?;
        }

        let results = store.lexical("\"budget\"", Some("p1"), 10)?;
        let ids: Vec<_> = results.iter().map(|(n, _)| n.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], "a");
        assert!(ids.contains(&"c"));
        assert!(results.iter().all(|(_, rank)| *rank > 0.0));
        assert!(results[0].1 >= results[1].1);
        Ok(())
    }

    #[test]
    fn test_lexical_follows_edits_and_deletes() -> Result<()> {
        let store = NoteStore::open_in_memory()?;
        let mut n = note("a", "p", "Alpha", "first draft");
        store.upsert_note(&n)?;
        assert_eq!(store.lexical("\"draft\"", None, 10)?.len(), 1);

        n.edit(None, Some("final version"));
        store.upsert_note(&n)?;
        assert!(store.lexical("\"draft\"", None, 10)?.is_empty());
        assert_eq!(store.lexical("\"final\"", None, 10)?.len(), 1);

        store.delete_note("a")?;
        assert!(store.lexical("\"final\"", None, 10)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_stats_and_meta() -> Result<()> {
        let store = NoteStore::open_in_memory()?;
        let a = note("a", "p1", "A", "a");
        let b = note("b", "p2", "B", "b");
        store.upsert_note(&a)?;
        store.upsert_note(&b)?;
        store.upsert_embedding("a", "m", &[1.0], &a.content_hash())?;

        let stats = store.stats("m", None)?;
        assert_eq!(stats.note_count, 2);
        assert_eq!(stats.embedding_count, 1);
        assert_eq!(stats.stale_count, 1);
        assert!(stats.last_indexed.is_some());

        let scoped = store.stats("m", Some("p2"))?;
        assert_eq!(scoped.note_count, 1);
        assert_eq!(scoped.embedding_count, 0);

        store.set_meta("model", "m")?;
        assert_eq!(store.get_meta("model")?.as_deref(), Some("m"));
        assert_eq!(store.get_meta("missing")?, None);
        Ok(())
    }

    #[test]
    fn test_open_on_disk_persists() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested/notes.db");
        {
            let store = NoteStore::open(&path)?;
            store.upsert_note(&note("a", "p", "Persisted", "body"))?;
        }
        let store = NoteStore::open(&path)?;
        assert!(store.get_note("a")?.is_some());
        Ok(())
    }
}
