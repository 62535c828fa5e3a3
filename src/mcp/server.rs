//! Bra3n MCP Server implementation

use std::sync::Arc;

use anyhow::Result;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use bra3n::search::store::NoteStore;
use bra3n::{Note, SearchMode, SearchOutcome, SearchRequest, SearchService};

use crate::commands::Context;

/// Parameters for notes_search tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "Natural language search query")]
    pub query: String,
    #[schemars(description = "Only search notes of this project")]
    #[serde(default)]
    pub project_id: Option<String>,
    #[schemars(description = "semantic (default) or hybrid")]
    #[serde(default)]
    pub mode: Option<String>,
    #[schemars(description = "Full-text query for hybrid mode (default: the query)")]
    #[serde(default)]
    pub lexical_query: Option<String>,
    #[schemars(description = "Maximum number of results (default from config)")]
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Parameters for notes_similar tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SimilarParams {
    #[schemars(description = "Id of the note to find similar notes for")]
    pub note_id: String,
    #[schemars(description = "Maximum number of results (default from config)")]
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Parameters for notes_get tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetNoteParams {
    #[schemars(description = "Note id to retrieve")]
    pub note_id: String,
}

/// Parameters for notes_list tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListNotesParams {
    #[schemars(description = "Only list notes of this project")]
    #[serde(default)]
    pub project_id: Option<String>,
    #[schemars(description = "Maximum results (default: 50)")]
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_list_limit() -> usize {
    50
}

/// Parameters for index_status tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct IndexStatusParams {
    #[schemars(description = "Only count notes of this project")]
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Note summary for JSON output
#[derive(Debug, Serialize)]
struct NoteInfoJson {
    id: String,
    project_id: String,
    title: String,
    tags: Vec<String>,
    updated_at: String,
}

impl From<Note> for NoteInfoJson {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            project_id: note.project_id,
            title: note.title,
            tags: note.tags,
            updated_at: note.updated_at.to_rfc3339(),
        }
    }
}

/// Bra3n MCP Service
#[derive(Clone)]
pub struct NotesService {
    search: Arc<SearchService>,
    store: Arc<NoteStore>,
    model: String,
    tool_router: ToolRouter<Self>,
}

impl NotesService {
    pub fn new(ctx: &Context) -> Result<Self> {
        Ok(Self {
            search: Arc::new(ctx.search_service()?),
            store: ctx.store.clone(),
            model: ctx.model(),
            tool_router: Self::tool_router(),
        })
    }
}

#[tool_router]
impl NotesService {
    #[tool(description = "Search notes by meaning. Mode 'hybrid' also ranks by full-text match; notes matching both rank first.")]
    async fn notes_search(&self, params: Parameters<SearchParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let mode = match params.mode.as_deref() {
            Some(mode) => mode
                .parse::<SearchMode>()
                .map_err(|e| McpError::invalid_params(e.to_string(), None))?,
            None => SearchMode::Semantic,
        };

        let request = SearchRequest {
            query: params.query,
            project_id: params.project_id,
            mode,
            lexical_query: params.lexical_query,
            limit: params.limit,
        };
        let outcome = self.search.search(&request).await;
        outcome_result(outcome)
    }

    #[tool(description = "Find notes similar to an existing note, within the same project.")]
    async fn notes_similar(&self, params: Parameters<SimilarParams>) -> Result<CallToolResult, McpError> {
        let outcome = self.search.similar_notes(&params.0.note_id, params.0.limit).await;
        outcome_result(outcome)
    }

    #[tool(description = "Get the full content and metadata of a note.")]
    async fn notes_get(&self, params: Parameters<GetNoteParams>) -> Result<CallToolResult, McpError> {
        let note_id = &params.0.note_id;
        let note = self.store.get_note(note_id).map_err(internal)?;

        match note {
            Some(note) => {
                let embedding = self.store.embedding_info(note_id).map_err(internal)?;
                let current = embedding
                    .as_ref()
                    .map(|e| e.is_current(&note, &self.model))
                    .unwrap_or(false);
                let body = note.body.clone();
                let info = serde_json::json!({
                    "note": NoteInfoJson::from(note),
                    "embedded": embedding.is_some(),
                    "embedding_current": current,
                });

                let output = format!(
                    "## Metadata\n```json\n{}\n```\n\n## Content\n{}",
                    serde_json::to_string_pretty(&info).unwrap_or_default(),
                    body
                );
                Ok(CallToolResult::success(vec![Content::text(output)]))
            }
            None => Ok(CallToolResult::success(vec![Content::text(format!(
                "Note not found: {}",
                note_id
            ))])),
        }
    }

    #[tool(description = "List notes, most recently updated first, optionally within one project.")]
    async fn notes_list(&self, params: Parameters<ListNotesParams>) -> Result<CallToolResult, McpError> {
        // Clamp limit: default 50, max 500
        let limit = params.0.limit.clamp(1, 500);
        let notes = self
            .store
            .list_notes(params.0.project_id.as_deref(), limit)
            .map_err(internal)?;

        let listed: Vec<NoteInfoJson> = notes.into_iter().map(NoteInfoJson::from).collect();
        json_result(&listed)
    }

    #[tool(description = "Embedding coverage of the note index: note, embedding and stale counts.")]
    async fn index_status(&self, params: Parameters<IndexStatusParams>) -> Result<CallToolResult, McpError> {
        let project_id = params.0.project_id.as_deref();
        let stats = self.store.stats(&self.model, project_id).map_err(internal)?;

        json_result(&serde_json::json!({
            "project_id": project_id,
            "note_count": stats.note_count,
            "embedding_count": stats.embedding_count,
            "stale_count": stats.stale_count,
            "last_indexed": stats.last_indexed.map(|t| t.to_rfc3339()),
            "model": self.model,
        }))
    }
}

#[tool_handler]
impl ServerHandler for NotesService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Bra3n MCP Server. Provides semantic and hybrid search over project notes.".to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn outcome_result(outcome: SearchOutcome) -> Result<CallToolResult, McpError> {
    match outcome.notice {
        Some(notice) => Ok(CallToolResult::error(vec![Content::text(notice)])),
        None => json_result(&outcome.results),
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let output = serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("JSON serialization failed: {}", e), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

/// Storage details stay in the log
fn internal(error: bra3n::Error) -> McpError {
    tracing::warn!(error = %error, "MCP tool failed");
    McpError::internal_error(error.user_message(), None)
}

/// Run the MCP server
pub async fn run_mcp_server(ctx: Context) -> Result<()> {
    use tokio::io::{stdin, stdout};

    let service = NotesService::new(&ctx)?;
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
