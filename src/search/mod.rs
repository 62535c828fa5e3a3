//! Note search engine
//!
//! Semantic search ranks notes by cosine similarity of embeddings; hybrid
//! search fuses that with FTS5 full-text rank.

pub mod embedding;
pub mod engine;
pub mod indexer;
pub mod lexical;
pub mod openai;
pub mod ranking;
pub mod ratelimit;
pub mod store;

pub use embedding::{build_provider, model_id, EmbeddingProvider, HarmonicEmbeddings};
pub use engine::{SearchMode, SearchOutcome, SearchRequest, SearchResult, SearchService};
pub use indexer::{BatchReport, EmbedOutcome, Indexer, Notifier};
pub use openai::OpenAiEmbeddings;
pub use store::{IndexStats, NoteStore};
