//! docent-retriever: document knowledge base with semantic retrieval
//!
//! This crate stores document chunks with their embeddings and answers
//! natural-language queries with the most similar chunks, for grounding
//! generated answers.
//!
//! ## Key Modules
//!
//! - **[`storage`]**: Vector store trait with a SQLite implementation
//! - **[`retrieval`]**: Ingestion pipeline, retriever and similarity math
//! - **[`config`]**: TOML deployment configuration
//! - **[`knowledge_base`]**: Wiring of the above around one shared store
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docent_retriever::{config::DocentConfig, knowledge_base::KnowledgeBase};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let kb = KnowledgeBase::open(DocentConfig::default()).await?;
//!
//! let outcome = kb.ingestion().ingest_document("Cats are small domesticated mammals.").await;
//! println!("{outcome:?}");
//!
//! let policy = kb.config().retrieval;
//! for content in kb.retriever().retrieve_with("what is a mammal", policy).await? {
//!     println!("{content}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! raw text → Chunker → Embeddings → SqliteStore
//!                                       ↓
//!          query → Embedding → top-k cosine search → min-score filter
//! ```

pub mod config;
pub mod knowledge_base;
pub mod retrieval;
pub mod storage;
