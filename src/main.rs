mod commands;
#[cfg(feature = "mcp")]
mod mcp;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bra3n::core::config::{Config, DEFAULT_CONFIG_PATH};
use bra3n::SearchMode;

use commands::index::IndexArgs;
use commands::search::SearchArgs;
use commands::Context;

#[derive(Parser)]
#[command(name = "bra3n")]
#[command(about = "Semantic and hybrid search over Bra3n project notes", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Config file (default: .bra3n/config.toml)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, edit and inspect notes
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },
    /// Import a directory of markdown files into a project
    Import {
        dir: PathBuf,
        #[arg(long, short, help = "Target project")]
        project: String,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Generate missing or outdated embeddings
    Index {
        #[arg(long, short, help = "Only notes of this project")]
        project: Option<String>,
        #[arg(long, help = "Show index status only")]
        status: bool,
        #[arg(long, help = "List notes whose embedding is missing or outdated")]
        stale: bool,
        #[arg(long, help = "Re-embed every note")]
        rebuild: bool,
        #[arg(long, help = "Remove embeddings of deleted notes")]
        prune: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Search notes by meaning, optionally fused with full-text rank
    #[command(alias = "s")]
    Search {
        query: String,
        #[arg(long, short, help = "Only notes of this project")]
        project: Option<String>,
        #[arg(long, short, default_value = "semantic", help = "semantic or hybrid")]
        mode: SearchMode,
        #[arg(long, help = "Full-text query for hybrid mode (default: the query)")]
        lexical: Option<String>,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Notes similar to an existing note
    Similar {
        id: String,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    // ===== MCP Server =====
    /// Start MCP server over stdio
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show MCP client configuration instructions")]
        install: bool,
    },
}

#[derive(Subcommand)]
enum NoteAction {
    Add {
        title: String,
        #[arg(long, short, help = "Project the note belongs to")]
        project: String,
        #[arg(long, short, help = "Note body")]
        body: Option<String>,
        #[arg(long, short, help = "Read the body from a text file")]
        file: Option<PathBuf>,
        #[arg(long = "tag", short, help = "Tag (repeatable)")]
        tags: Vec<String>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    Edit {
        id: String,
        #[arg(long, help = "New title")]
        title: Option<String>,
        #[arg(long, short, help = "New body")]
        body: Option<String>,
        #[arg(long, short, help = "Read the new body from a text file")]
        file: Option<PathBuf>,
        #[arg(long = "tag", short, help = "Replace tags (repeatable)")]
        tags: Vec<String>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    #[command(alias = "remove")]
    Rm {
        id: String,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    #[command(alias = "ls")]
    List {
        #[arg(long, short, help = "Only notes of this project")]
        project: Option<String>,
        #[arg(long, short, default_value_t = 50, help = "Limit results")]
        limit: usize,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    Show {
        id: String,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "mcp")]
        Commands::Mcp { install: true } => {
            print_mcp_install_instructions(cli.config.as_deref());
            Ok(())
        }
        command => {
            let config = load_config(cli.config.as_deref())?;
            init_tracing(&config.log.level);

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(dispatch(command, config))
        }
    }
}

async fn dispatch(command: Commands, config: Config) -> anyhow::Result<()> {
    let ctx = Context::open(config)?;

    match command {
        Commands::Note { action } => match action {
            NoteAction::Add {
                title,
                project,
                body,
                file,
                tags,
                json,
            } => {
                let body = commands::note::read_body(body, file.as_deref())?.unwrap_or_default();
                commands::note::add(&ctx, &project, &title, &body, tags, json).await
            }
            NoteAction::Edit {
                id,
                title,
                body,
                file,
                tags,
                json,
            } => {
                let body = commands::note::read_body(body, file.as_deref())?;
                let tags = (!tags.is_empty()).then_some(tags);
                commands::note::edit(&ctx, &id, title.as_deref(), body.as_deref(), tags, json).await
            }
            NoteAction::Rm { id, json } => commands::note::remove(&ctx, &id, json),
            NoteAction::List {
                project,
                limit,
                json,
            } => commands::note::list(&ctx, project.as_deref(), limit, json),
            NoteAction::Show { id, json } => commands::note::show(&ctx, &id, json),
        },
        Commands::Import { dir, project, json } => {
            commands::import::run(&ctx, &dir, &project, json).await
        }
        Commands::Index {
            project,
            status,
            stale,
            rebuild,
            prune,
            json,
        } => {
            let args = IndexArgs {
                project: project.as_deref(),
                status,
                stale,
                rebuild,
                prune,
                json,
            };
            commands::index::run(&ctx, args).await
        }
        Commands::Search {
            query,
            project,
            mode,
            lexical,
            limit,
            json,
        } => {
            let args = SearchArgs {
                query,
                project,
                mode,
                lexical,
                limit,
                json,
            };
            commands::search::run(&ctx, args).await
        }
        Commands::Similar { id, limit, json } => {
            commands::similar::run(&ctx, &id, limit, json).await
        }

        // MCP Server
        #[cfg(feature = "mcp")]
        Commands::Mcp { .. } => mcp::run_mcp_server(ctx).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load_or_default(Path::new(DEFAULT_CONFIG_PATH))
            .context("Failed to load configuration"),
    }
}

/// Logs go to stderr so the MCP stdio transport stays clean
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(feature = "mcp")]
fn print_mcp_install_instructions(config: Option<&Path>) {
    use colored::Colorize;

    let workdir = std::env::current_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "/path/to/your/brain".to_string());

    let binary_path = std::env::current_exe()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "bra3n".to_string());

    let args = match config {
        Some(path) => format!(r#"["--config", "{}", "mcp"]"#, path.display()),
        None => r#"["mcp"]"#.to_string(),
    };

    println!("{}", "MCP Server Installation Guide".bold().cyan());
    println!();
    println!("Add the following to your MCP client configuration:");
    println!();
    println!(r#"{{
  "mcpServers": {{
    "bra3n": {{
      "command": "{}",
      "args": {},
      "cwd": "{}"
    }}
  }}
}}"#, binary_path, args, workdir);
    println!();
    println!("{}", "Available tools:".bold());
    println!("  • {} - Semantic or hybrid note search", "notes_search".green());
    println!("  • {} - Notes similar to a given note", "notes_similar".green());
    println!("  • {} - Get a note with embedding status", "notes_get".green());
    println!("  • {} - List notes of a project", "notes_list".green());
    println!("  • {} - Embedding coverage of the index", "index_status".green());
}
