//! Index command - generate embeddings and report index health

use anyhow::Result;
use colored::Colorize;

use bra3n::BatchReport;

use super::{truncate, Context};

pub struct IndexArgs<'a> {
    pub project: Option<&'a str>,
    pub status: bool,
    pub stale: bool,
    pub rebuild: bool,
    pub prune: bool,
    pub json: bool,
}

pub async fn run(ctx: &Context, args: IndexArgs<'_>) -> Result<()> {
    if args.status {
        return show_status(ctx, args.project, args.json);
    }
    if args.stale {
        return show_stale(ctx, args.project, args.json);
    }

    let indexer = ctx.indexer()?;
    let pruned = if args.prune { ctx.store.prune_orphans()? } else { 0 };
    if pruned > 0 && !args.json {
        println!("{} Pruned {} orphaned embeddings", "→".dimmed(), pruned);
    }

    if !args.json {
        println!("{} Building search index...", "→".dimmed());
    }

    let report = if args.rebuild {
        indexer.rebuild(args.project).await?
    } else {
        indexer.reindex_stale(args.project).await?
    };

    print_report(ctx, &report, pruned, args.json)
}

fn print_report(ctx: &Context, report: &BatchReport, pruned: usize, json: bool) -> Result<()> {
    if json {
        let failures: Vec<_> = report
            .failed
            .iter()
            .map(|f| serde_json::json!({ "note_id": f.note_id, "message": f.message }))
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "indexed": report.succeeded,
                "skipped": report.skipped,
                "failed": failures,
                "pruned": pruned,
                "model": ctx.model(),
                "duration_ms": report.duration_ms,
            })
        );
        return Ok(());
    }

    println!();
    println!(
        "{} Indexed {} notes in {:.2}s",
        "✓".green().bold(),
        report.succeeded.to_string().cyan(),
        report.duration_ms as f64 / 1000.0
    );
    if report.skipped > 0 {
        println!("  {} {} notes skipped (empty)", "→".dimmed(), report.skipped);
    }
    if !report.failed.is_empty() {
        println!("  {} {} notes failed", "✗".red(), report.failed.len());
        for failure in &report.failed {
            println!("    {} {}", failure.note_id.dimmed(), failure.message);
        }
    }
    println!(
        "  {} Index saved to: {}",
        "→".dimmed(),
        ctx.config.storage.path.display()
    );
    Ok(())
}

fn show_status(ctx: &Context, project: Option<&str>, json: bool) -> Result<()> {
    let model = ctx.model();
    let stats = ctx.store.stats(&model, project)?;
    let indexed_model = ctx.store.get_meta("embedding_model")?;
    let file_size = std::fs::metadata(&ctx.config.storage.path)
        .map(|m| m.len())
        .unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "project_id": project,
                "note_count": stats.note_count,
                "embedding_count": stats.embedding_count,
                "stale_count": stats.stale_count,
                "last_indexed": stats.last_indexed.map(|t| t.to_rfc3339()),
                "indexed_model": indexed_model,
                "configured_model": model,
                "file_size_bytes": file_size,
            })
        );
        return Ok(());
    }

    println!("{}", "Index Status".bold());
    println!();
    println!("  {} {} notes", "→".dimmed(), stats.note_count.to_string().cyan());
    println!(
        "  {} {} embeddings",
        "→".dimmed(),
        stats.embedding_count.to_string().cyan()
    );
    if stats.stale_count > 0 {
        println!(
            "  {} {} notes need embedding. Run {}",
            "!".yellow(),
            stats.stale_count,
            "bra3n index".cyan()
        );
    }
    println!("  {} Size: {:.2} KB", "→".dimmed(), file_size as f64 / 1024.0);
    if let Some(ts) = stats.last_indexed {
        println!(
            "  {} Last indexed: {}",
            "→".dimmed(),
            ts.format("%Y-%m-%d %H:%M:%S")
        );
    }
    match indexed_model {
        Some(indexed) if indexed != model => println!(
            "  {} Index built with {} but config uses {}. Run {}",
            "!".yellow(),
            indexed,
            model,
            "bra3n index".cyan()
        ),
        Some(indexed) => println!("  {} Model: {}", "→".dimmed(), indexed),
        None => {}
    }
    Ok(())
}

fn show_stale(ctx: &Context, project: Option<&str>, json: bool) -> Result<()> {
    let stale = ctx.store.stale_notes(&ctx.model(), project)?;

    if json {
        let items: Vec<_> = stale
            .iter()
            .map(|n| serde_json::json!({ "id": n.id, "project_id": n.project_id, "title": n.title }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if stale.is_empty() {
        println!("{} All embeddings are current", "✓".green().bold());
        return Ok(());
    }
    for note in &stale {
        println!("  {} {}", note.id.dimmed(), truncate(&note.title, 60));
    }
    println!();
    println!("{} {} stale notes", "→".dimmed(), stale.len());
    Ok(())
}
