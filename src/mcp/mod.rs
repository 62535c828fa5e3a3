//! MCP Server for Bra3n notes
//!
//! Exposes search and note lookup as tools over stdio.

mod server;

pub use server::run_mcp_server;
