//! Import command - load a directory of markdown files as notes

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context as _, Result};
use colored::Colorize;
use uuid::Uuid;
use walkdir::WalkDir;

use bra3n::{Frontmatter, Note};

use super::Context;

/// Stable id for a file, so re-importing updates instead of duplicating
pub fn note_id(project: &str, relative_path: &str) -> String {
    let name = format!("bra3n:{}:{}", project, relative_path.replace('\\', "/"));
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}

/// Parse one markdown file into a note of `project`
pub fn note_from_markdown(project: &str, relative_path: &str, content: &str) -> Note {
    let parsed = Frontmatter::parse(content);
    let fallback = Path::new(relative_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| relative_path.to_string());

    let (title, body) = parsed.title_and_body(&fallback);
    let mut note = Note::new(note_id(project, relative_path), project, &title, &body)
        .with_tags(parsed.tags());
    note.source_document_id = parsed.source();
    note
}

/// Only files whose text changed since the last import need new vectors
fn needs_embedding(stale: Vec<Note>, imported: &HashSet<String>) -> Vec<Note> {
    stale.into_iter().filter(|n| imported.contains(&n.id)).collect()
}

pub async fn run(ctx: &Context, dir: &Path, project: &str, json: bool) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }
    let indexer = ctx.indexer()?;

    let mut imported = HashSet::new();
    let mut unreadable = 0usize;

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == "md").unwrap_or(false))
    {
        let path = entry.path();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                unreadable += 1;
                continue;
            }
        };
        let relative = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();

        let mut note = note_from_markdown(project, &relative, &content);
        if let Some(existing) = ctx.store.get_note(&note.id)? {
            note.created_at = existing.created_at;
        }
        ctx.store
            .upsert_note(&note)
            .with_context(|| format!("Failed to save {}", relative))?;
        imported.insert(note.id);
    }

    if !json {
        println!(
            "{} Imported {} notes into {}",
            "→".dimmed(),
            imported.len().to_string().cyan(),
            project.cyan()
        );
    }

    let stale = ctx.store.stale_notes(&ctx.model(), Some(project))?;
    let report = indexer.embed_batch(&needs_embedding(stale, &imported)).await;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "project_id": project,
                "imported": imported.len(),
                "unreadable": unreadable,
                "embedded": report.succeeded,
                "skipped": report.skipped,
                "failed": report.failed.len(),
                "duration_ms": report.duration_ms,
            })
        );
    } else {
        println!(
            "{} Embedded {} notes in {:.2}s",
            "✓".green().bold(),
            report.succeeded.to_string().cyan(),
            report.duration_ms as f64 / 1000.0
        );
        if unreadable > 0 {
            println!("  {} {} files could not be read", "!".yellow(), unreadable);
        }
        if !report.failed.is_empty() {
            println!("  {} {} notes failed to embed", "✗".red(), report.failed.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_is_stable_per_project_and_path() {
        assert_eq!(note_id("p1", "a/b.md"), note_id("p1", "a/b.md"));
        assert_eq!(note_id("p1", "a\\b.md"), note_id("p1", "a/b.md"));
        assert_ne!(note_id("p1", "a/b.md"), note_id("p2", "a/b.md"));
    }

    #[test]
    fn test_needs_embedding_keeps_only_imported_notes() {
        let stale: Vec<Note> = ["a", "b", "c"]
            .iter()
            .map(|id| Note::new(*id, "p1", id, "text"))
            .collect();
        let imported: HashSet<String> = ["c", "a", "z"].iter().map(|id| id.to_string()).collect();

        let ids: Vec<String> = needs_embedding(stale, &imported)
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_note_from_markdown() {
        let note = note_from_markdown(
            "p1",
            "finance/q3.md",
            "---\ntags: [finance]\nsource: doc-7\n---\n# Q3 budget review\nSpend is up.",
        );
        assert_eq!(note.project_id, "p1");
        assert_eq!(note.title, "Q3 budget review");
        assert_eq!(note.body, "Spend is up.");
        assert_eq!(note.embedding_text(), "Q3 budget review\nSpend is up.");
        assert_eq!(note.tags, vec!["finance"]);
        assert_eq!(note.source_document_id.as_deref(), Some("doc-7"));

        let plain = note_from_markdown("p1", "ideas.md", "just text");
        assert_eq!(plain.title, "ideas");
        assert_eq!(plain.body, "just text");
    }
}
