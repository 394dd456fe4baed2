use crate::tools::{
    ToolRegistry,
    search_knowledge_base::{
        SEARCH_KNOWLEDGE_BASE, SearchKnowledgeBase, SearchKnowledgeBaseInput, TOOL_MIN_SCORE,
        TOOL_TOP_K,
    },
};
use anyhow::Result;
use docent_embed::EmbeddingProvider;
use docent_retriever::knowledge_base::KnowledgeBase;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use tokio::io::{stdin, stdout};
use tracing::info;

/// MCP server answering knowledge base queries over stdio
#[derive(Clone)]
pub struct DocentMcpServer {
    kb: KnowledgeBase,
    registry: Arc<ToolRegistry>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl DocentMcpServer {
    pub fn new(kb: KnowledgeBase) -> Self {
        let search = SearchKnowledgeBase::new(kb.retriever().clone());
        let registry = ToolRegistry::new().with_tool(Arc::new(search));
        info!("Registered tools: {:?}", registry.names());

        Self {
            kb,
            registry: Arc::new(registry),
            tool_router: Self::tool_router(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    #[tool(description = "Search the knowledge base for passages relevant to a natural-language query")]
    async fn search_knowledge_base(
        &self,
        Parameters(request): Parameters<SearchKnowledgeBaseInput>,
    ) -> String {
        let args = serde_json::json!({ "query": request.query });
        match self.registry.invoke(SEARCH_KNOWLEDGE_BASE, args).await {
            Ok(text) => text,
            Err(e) => format!("Error: {e}"),
        }
    }

    #[tool(description = "Show knowledge base status: record count, embedding dimension, provider and retrieval policy")]
    async fn status(&self) -> String {
        self.status_report().await
    }

    pub async fn status_report(&self) -> String {
        let mut status = format!(
            "Docent MCP Server Status\n\
            ========================\n\
            Server Version: {}\n\
            Database: {}\n",
            env!("CARGO_PKG_VERSION"),
            self.kb.config().database_path.display(),
        );

        match self.kb.stats().await {
            Ok(stats) => {
                status.push_str(&format!("Records: {}\n", stats.record_count));
                match stats.dimension {
                    Some(dimension) => {
                        status.push_str(&format!("Embedding Dimension: {dimension}\n"))
                    }
                    None => status.push_str("Embedding Dimension: not set (empty store)\n"),
                }
                if let Some(last) = stats.last_insert_at {
                    status.push_str(&format!("Last Insert: {last}\n"));
                }
            }
            Err(e) => status.push_str(&format!("Records: unavailable ({e})\n")),
        }

        let provider = self.kb.provider();
        status.push_str(&format!(
            "Embedding Provider: {} (dimension {})\n\
            Retrieval Policy: top {} above {:.2}\n",
            provider.provider_name(),
            provider.embedding_dimension(),
            TOOL_TOP_K,
            TOOL_MIN_SCORE,
        ));
        status
    }

    pub async fn serve_stdio(self) -> Result<()> {
        info!("Starting MCP server on stdio");
        let service = self.serve((stdin(), stdout())).await?;
        let reason = service.waiting().await?;
        info!("MCP server stopped: {:?}", reason);
        Ok(())
    }
}

#[tool_handler]
impl ServerHandler for DocentMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Docent answers questions from an ingested document knowledge base. \
                Call search_knowledge_base with a natural-language query to get the most \
                relevant passages, numbered [1], [2], ... Use status to inspect the store."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
