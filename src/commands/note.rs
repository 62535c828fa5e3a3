//! Note commands - add, edit, remove, list and show notes

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use unicode_width::UnicodeWidthStr;

use bra3n::search::indexer::EmbedOutcome;
use bra3n::Note;

use super::{truncate, Context};

const TITLE_COLUMN: usize = 40;

/// Read the body from `--body` or `--file`
pub fn read_body(body: Option<String>, file: Option<&Path>) -> Result<Option<String>> {
    match (body, file) {
        (Some(_), Some(_)) => bail!("Use either --body or --file, not both"),
        (Some(body), None) => Ok(Some(body)),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(Some(text))
        }
        (None, None) => Ok(None),
    }
}

pub async fn add(
    ctx: &Context,
    project: &str,
    title: &str,
    body: &str,
    tags: Vec<String>,
    json: bool,
) -> Result<()> {
    let indexer = ctx.indexer()?;
    let note = Note::create(project, title, body).with_tags(tags);
    ctx.store.upsert_note(&note)?;

    // Note is saved whatever happens to its embedding
    let outcome = indexer.refresh_note(&note).await;
    report(&note, "Added", &outcome, json)
}

pub async fn edit(
    ctx: &Context,
    id: &str,
    title: Option<&str>,
    body: Option<&str>,
    tags: Option<Vec<String>>,
    json: bool,
) -> Result<()> {
    let Some(mut note) = ctx.store.get_note(id)? else {
        bail!("Note not found: {}", id);
    };

    let text_changed = note.edit(title, body);
    let indexer = if text_changed { Some(ctx.indexer()?) } else { None };
    if let Some(tags) = tags {
        note = note.with_tags(tags);
    }
    ctx.store.upsert_note(&note)?;

    let outcome = match indexer {
        Some(indexer) => indexer.refresh_note(&note).await,
        None => EmbedOutcome::Skipped,
    };
    report(&note, "Updated", &outcome, json)
}

pub fn remove(ctx: &Context, id: &str, json: bool) -> Result<()> {
    let removed = ctx.store.delete_note(id)?;

    if json {
        println!("{}", serde_json::json!({ "id": id, "removed": removed }));
    } else if removed {
        println!("{} Removed note {}", "✓".green().bold(), id.cyan());
    } else {
        println!("{} No note with id {}", "!".yellow().bold(), id.cyan());
    }
    Ok(())
}

pub fn list(ctx: &Context, project: Option<&str>, limit: usize, json: bool) -> Result<()> {
    let notes = ctx.store.list_notes(project, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(());
    }

    if notes.is_empty() {
        println!("{} No notes", "→".dimmed());
        return Ok(());
    }

    for note in &notes {
        let title = truncate(&note.title, TITLE_COLUMN);
        let pad = TITLE_COLUMN.saturating_add(3).saturating_sub(title.width());
        println!(
            "{}  {}{}{}  {}",
            note.id.dimmed(),
            title.cyan(),
            " ".repeat(pad),
            note.project_id,
            note.updated_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
    println!();
    println!("{} {} notes", "→".dimmed(), notes.len());
    Ok(())
}

pub fn show(ctx: &Context, id: &str, json: bool) -> Result<()> {
    let Some(note) = ctx.store.get_note(id)? else {
        bail!("Note not found: {}", id);
    };
    let embedding = ctx.store.embedding_info(id)?;
    let model = ctx.model();
    let current = embedding
        .as_ref()
        .map(|e| e.is_current(&note, &model))
        .unwrap_or(false);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "note": note,
                "embedding": embedding.map(|e| serde_json::json!({
                    "model": e.model,
                    "dimensions": e.dimensions,
                    "generated_at": e.generated_at.to_rfc3339(),
                    "current": current,
                })),
            }))?
        );
        return Ok(());
    }

    println!("{}", note.title.bold());
    println!(
        "{} {} | {}",
        "→".dimmed(),
        note.id.dimmed(),
        note.project_id
    );
    if !note.tags.is_empty() {
        println!("{} #{}", "→".dimmed(), note.tags.join(" #"));
    }
    match embedding {
        Some(e) if current => println!(
            "{} Embedded with {} ({} dims)",
            "✓".green(),
            e.model,
            e.dimensions
        ),
        Some(_) => println!("{} Embedding is stale", "!".yellow()),
        None => println!("{} Not embedded", "!".yellow()),
    }
    println!();
    println!("{}", note.body);
    Ok(())
}

fn report(note: &Note, verb: &str, outcome: &EmbedOutcome, json: bool) -> Result<()> {
    if json {
        let (embedding, message) = match outcome {
            EmbedOutcome::Stored => ("stored", None),
            EmbedOutcome::Skipped => ("skipped", None),
            EmbedOutcome::Failed(message) => ("failed", Some(message.as_str())),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "id": note.id,
                "project_id": note.project_id,
                "title": note.title,
                "embedding": embedding,
                "message": message,
            }))?
        );
        return Ok(());
    }

    println!(
        "{} {} note {} ({})",
        "✓".green().bold(),
        verb,
        note.title.cyan(),
        note.id.dimmed()
    );
    if let EmbedOutcome::Failed(message) = outcome {
        println!("  {} {}", "✗".red(), message);
        println!(
            "  {} Note saved; run {} to retry",
            "→".dimmed(),
            "bra3n index".cyan()
        );
    }
    Ok(())
}
