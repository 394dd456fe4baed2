//! Knowledge base search exposed as a model-callable tool.

use super::{Tool, ToolError, parse_input, schema_for};
use async_trait::async_trait;
use docent_retriever::retrieval::Retriever;
use rmcp::schemars;
use serde::{Deserialize, Serialize};

pub const SEARCH_KNOWLEDGE_BASE: &str = "searchKnowledgeBase";

/// Results per query at the tool boundary.
pub const TOOL_TOP_K: usize = 3;
/// Minimum cosine similarity at the tool boundary.
pub const TOOL_MIN_SCORE: f32 = 0.5;

pub const NO_RESULTS: &str = "No relevant information found";
pub const SEARCH_FAILED: &str = "Error while searching";

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchKnowledgeBaseInput {
    /// The search query to find relevant documents
    pub query: String,
}

/// Finds the chunks most relevant to a query and renders them as numbered
/// passages for the answering model.
#[derive(Clone)]
pub struct SearchKnowledgeBase {
    retriever: Retriever,
}

impl SearchKnowledgeBase {
    pub fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }

    /// Always yields text: results, the empty sentinel, or the failure sentinel.
    pub async fn search(&self, query: &str) -> String {
        match self.retriever.retrieve(query, TOOL_TOP_K, TOOL_MIN_SCORE).await {
            Ok(contents) => format_results(&contents),
            Err(e) => {
                tracing::error!("Knowledge base search failed: {}", e);
                SEARCH_FAILED.to_string()
            }
        }
    }
}

/// `[1] first\n\n[2] second`, or the empty sentinel.
pub fn format_results(contents: &[String]) -> String {
    if contents.is_empty() {
        return NO_RESULTS.to_string();
    }
    contents
        .iter()
        .enumerate()
        .map(|(i, content)| format!("[{}] {}", i + 1, content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for SearchKnowledgeBase {
    fn name(&self) -> &str {
        SEARCH_KNOWLEDGE_BASE
    }

    fn description(&self) -> &str {
        "Search the knowledge base for relevant information"
    }

    fn input_schema(&self) -> serde_json::Value {
        schema_for::<SearchKnowledgeBaseInput>()
    }

    async fn call(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let input: SearchKnowledgeBaseInput = parse_input(self.name(), args)?;
        Ok(self.search(&input.query).await)
    }
}
