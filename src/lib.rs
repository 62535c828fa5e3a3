//! bra3n library
//!
//! Semantic and hybrid search over project notes.
//!
//! # Modules
//!
//! - `core`: Notes, Markdown front matter and configuration
//! - `search`: Embedding providers, the SQLite note store, ranking and the search façade
//! - `error`: Error taxonomy shared by every layer

pub mod core;
pub mod error;
pub mod search;

// Re-exports for convenience
pub use core::config::Config;
pub use core::frontmatter::Frontmatter;
pub use core::note::Note;
pub use error::{Error, Result};
pub use search::engine::{SearchMode, SearchOutcome, SearchRequest, SearchResult, SearchService};
pub use search::indexer::{BatchReport, Indexer};
pub use search::store::NoteStore;
