//! Search command - semantic or hybrid note search

use anyhow::Result;
use colored::Colorize;

use bra3n::{SearchMode, SearchOutcome, SearchRequest};

use super::{truncate, Context};

pub struct SearchArgs {
    pub query: String,
    pub project: Option<String>,
    pub mode: SearchMode,
    pub lexical: Option<String>,
    pub limit: Option<usize>,
    pub json: bool,
}

pub async fn run(ctx: &Context, args: SearchArgs) -> Result<()> {
    let request = SearchRequest {
        query: args.query.clone(),
        project_id: args.project,
        mode: args.mode,
        lexical_query: args.lexical,
        limit: args.limit,
    };
    let outcome = ctx.search_service()?.search(&request).await;
    print_outcome(&outcome, &args.query, args.json)
}

/// Shared by `search` and `similar`
pub(crate) fn print_outcome(outcome: &SearchOutcome, label: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    if let Some(notice) = &outcome.notice {
        eprintln!("{} {}", "Error:".red().bold(), notice);
        return Ok(());
    }

    let results = &outcome.results;
    if results.is_empty() {
        println!("{} No results found for: {}", "→".dimmed(), label.cyan());
        return Ok(());
    }

    println!(
        "{} {} results for: {}",
        "→".dimmed(),
        results.len(),
        label.cyan()
    );
    println!();

    for (i, result) in results.iter().enumerate() {
        let score_str = format!("{:.2}", result.score);
        let score_colored = if result.similarity > 0.8 {
            score_str.green()
        } else if result.similarity > 0.6 {
            score_str.yellow()
        } else {
            score_str.dimmed()
        };

        println!(
            "{}. [{}] {}",
            (i + 1).to_string().bold(),
            score_colored,
            result.title.cyan()
        );
        if !result.snippet.is_empty() {
            println!("   {}", truncate(&result.snippet, 100).dimmed());
        }
        match result.lexical_rank {
            Some(rank) => println!(
                "   {} | similarity {:.2} | text rank {:.2}",
                result.project_id, result.similarity, rank
            ),
            None => println!("   {}", result.project_id),
        }
        println!();
    }

    Ok(())
}
