//! # docent-mcp
//!
//! A Model Context Protocol (MCP) server that lets an answering model search a
//! docent knowledge base. Documents are ingested with `docent-retriever`; this
//! crate only reads from the store.
//!
//! ## MCP Tools
//!
//! ### `search_knowledge_base`
//! Takes `{ "query": "..." }` and returns the three most relevant passages
//! scoring at least 0.5, formatted as `[1] ...\n\n[2] ...`. An empty result
//! reads `No relevant information found`; a failed search reads
//! `Error while searching` and is logged rather than surfaced.
//!
//! ### `status`
//! Record count, embedding dimension, provider and retrieval policy.
//!
//! ## Tool registry
//!
//! The same tools are available without MCP through [`tools::ToolRegistry`],
//! for a chat-completion loop that dispatches model tool calls by name:
//!
//! ```no_run
//! use docent_mcp::tools::{ToolRegistry, search_knowledge_base::SearchKnowledgeBase};
//! use docent_retriever::{config::DocentConfig, knowledge_base::KnowledgeBase};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let kb = KnowledgeBase::open(DocentConfig::default()).await?;
//! let registry = ToolRegistry::new()
//!     .with_tool(Arc::new(SearchKnowledgeBase::new(kb.retriever().clone())));
//!
//! let answer = registry
//!     .invoke("searchKnowledgeBase", serde_json::json!({ "query": "what is a mammal" }))
//!     .await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Integration with Claude Desktop
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "docent": {
//!       "command": "docent-mcp",
//!       "args": ["--config", "/path/to/docent.toml"]
//!     }
//!   }
//! }
//! ```

mod server;
pub mod tools;

pub use server::DocentMcpServer;

use anyhow::{Context, Result};
use docent_retriever::{config::DocentConfig, knowledge_base::KnowledgeBase};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// TOML configuration file; defaults apply when absent
    pub config_path: Option<PathBuf>,
    /// Database file, overriding the configuration
    pub database: Option<PathBuf>,
}

impl ServerConfig {
    pub fn load(&self) -> Result<DocentConfig> {
        let mut config = DocentConfig::load_or_default(self.config_path.as_deref())?;
        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        Ok(config)
    }
}

/// Open the knowledge base and serve MCP over stdio until the client disconnects.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let config = config.load()?;
    info!(
        "Starting docent MCP server with database {}",
        config.database_path.display()
    );

    let kb = KnowledgeBase::open(config)
        .await
        .context("Failed to open knowledge base")?;
    DocentMcpServer::new(kb).serve_stdio().await
}
