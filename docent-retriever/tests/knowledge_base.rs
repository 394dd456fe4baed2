mod common;

use anyhow::Result;
use common::{FailingProvider, KeywordProvider, SlowProvider, WideProvider, ten_chunk_document};
use docent_context::ChunkerConfig;
use docent_embed::EmbeddingProvider;
use docent_retriever::{
    config::DocentConfig,
    knowledge_base::KnowledgeBase,
    retrieval::{IngestError, RetrieveError},
    storage::{
        StoreError, VectorStore,
        sqlite_store::{SqliteStore, StoreOptions},
    },
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::TempDir;

fn small_chunks(max: usize, overlap: usize) -> DocentConfig {
    DocentConfig {
        chunking: ChunkerConfig::new(max, overlap),
        ..DocentConfig::default()
    }
}

async fn memory_kb(config: DocentConfig, provider: Arc<dyn EmbeddingProvider>) -> KnowledgeBase {
    let store = Arc::new(
        SqliteStore::open_memory(config.store_options())
            .await
            .expect("in-memory store"),
    );
    KnowledgeBase::assemble(config, store, provider).expect("knowledge base")
}

async fn file_kb(
    temp_dir: &TempDir,
    config: DocentConfig,
    provider: Arc<dyn EmbeddingProvider>,
) -> Result<KnowledgeBase> {
    let config = DocentConfig {
        database_path: temp_dir.path().join("kb.db"),
        ..config
    };
    KnowledgeBase::with_provider(config, provider).await
}

#[tokio::test]
async fn test_ingest_stores_overlapping_chunks() -> Result<()> {
    let kb = memory_kb(small_chunks(9, 2), Arc::new(KeywordProvider)).await;

    let count = kb.ingestion().ingest("AAAA BBBB CCCC DDDD").await?;
    assert_eq!(count, 3);

    // Identical vectors tie, so results come back in insertion order
    let stored = kb.retriever().retrieve("anything", 10, -1.0).await?;
    assert_eq!(stored, vec!["AAAA BBBB", "BB CCCC", "CC DDDD"]);
    Ok(())
}

#[tokio::test]
async fn test_retrieval_applies_min_score() -> Result<()> {
    let kb = memory_kb(DocentConfig::default(), Arc::new(KeywordProvider)).await;
    kb.ingestion().ingest("cats are mammals").await?;
    kb.ingestion().ingest("stocks rose today").await?;

    let results = kb.retriever().retrieve("what is a mammal", 2, 0.5).await?;
    assert_eq!(results, vec!["cats are mammals"]);

    let scored = kb.retriever().retrieve_scored("what is a mammal", 2, -1.0).await?;
    assert_eq!(scored.len(), 2);
    assert!(scored[0].score > 0.99);
    assert!(scored[1].score < 0.5);
    Ok(())
}

#[tokio::test]
async fn test_min_score_above_one_returns_nothing() -> Result<()> {
    let kb = memory_kb(DocentConfig::default(), Arc::new(KeywordProvider)).await;
    kb.ingestion().ingest("cats are mammals").await?;

    assert!(kb.retriever().retrieve("cats are mammals", 3, 1.1).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_top_k_limits_and_orders() -> Result<()> {
    let kb = memory_kb(DocentConfig::default(), Arc::new(KeywordProvider)).await;
    for text in [
        "dogs are loyal pets",
        "stocks rose today",
        "cats are mammals",
        "market revenue fell",
    ] {
        kb.ingestion().ingest(text).await?;
    }

    let results = kb.retriever().retrieve_scored("pet cat", 2, -1.0).await?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].content, "dogs are loyal pets");
    assert_eq!(results[1].content, "cats are mammals");
    assert!(results[0].id < results[1].id);
    Ok(())
}

#[tokio::test]
async fn test_empty_document_writes_nothing() -> Result<()> {
    let kb = memory_kb(DocentConfig::default(), Arc::new(KeywordProvider)).await;

    let err = kb.ingestion().ingest("").await.unwrap_err();
    assert!(matches!(err, IngestError::EmptyInput));
    let err = kb.ingestion().ingest("  \n\t").await.unwrap_err();
    assert!(matches!(err, IngestError::EmptyInput));

    assert_eq!(kb.store().count().await?, 0);
    assert_eq!(kb.store().dimension().await?, None);
    Ok(())
}

#[tokio::test]
async fn test_embedding_failure_mid_batch_writes_nothing() -> Result<()> {
    let provider = Arc::new(FailingProvider::new(5));
    let kb = memory_kb(small_chunks(9, 0), provider.clone()).await;

    let document = ten_chunk_document();
    let err = kb.ingestion().ingest(&document).await.unwrap_err();
    assert!(matches!(err, IngestError::Embedding(_)));
    assert!(provider.embedded.load(Ordering::SeqCst) >= 5);
    assert_eq!(kb.store().count().await?, 0);

    let outcome = kb.ingestion().ingest_document(&document).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Failed to process document"));
    assert_eq!(kb.store().count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_storage_failure_mid_batch_rolls_back() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let kb = file_kb(&temp_dir, small_chunks(9, 0), Arc::new(KeywordProvider)).await?;
    kb.ingestion().ingest("seed").await?;

    // Reject one chunk in the middle of the batch from outside the store
    let pool = sqlx::SqlitePool::connect(&format!(
        "sqlite://{}",
        temp_dir.path().join("kb.db").display()
    ))
    .await?;
    sqlx::query(
        "CREATE TRIGGER reject_t010 BEFORE INSERT ON documents
         WHEN NEW.content LIKE '%t010%'
         BEGIN SELECT RAISE(ABORT, 'rejected'); END",
    )
    .execute(&pool)
    .await?;
    pool.close().await;

    let err = kb.ingestion().ingest(&ten_chunk_document()).await.unwrap_err();
    assert!(matches!(err, IngestError::Storage(StoreError::Write { .. })));
    assert_eq!(kb.store().count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_dimension_mismatch_is_reported() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let kb = file_kb(&temp_dir, DocentConfig::default(), Arc::new(KeywordProvider)).await?;
    kb.ingestion().ingest("cats are mammals").await?;

    // Same database, different embedding model
    let wide = file_kb(&temp_dir, DocentConfig::default(), Arc::new(WideProvider)).await?;
    let err = wide.ingestion().ingest("stocks rose today").await.unwrap_err();
    assert!(matches!(
        err,
        IngestError::Storage(StoreError::DimensionMismatch {
            expected: 3,
            actual: 5
        })
    ));

    let err = wide.retriever().retrieve("stocks", 3, 0.5).await.unwrap_err();
    assert!(matches!(
        err,
        RetrieveError::Store(StoreError::DimensionMismatch { .. })
    ));
    assert_eq!(kb.store().count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_ingestion_timeout_writes_nothing() -> Result<()> {
    let config = DocentConfig {
        ingest_timeout_secs: 1,
        ..DocentConfig::default()
    };
    let provider = Arc::new(SlowProvider {
        delay: Duration::from_secs(5),
    });
    let kb = memory_kb(config, provider).await;
    assert_eq!(kb.ingestion().timeout(), Duration::from_secs(1));

    let err = kb.ingestion().ingest("cats are mammals").await.unwrap_err();
    assert!(matches!(err, IngestError::TimedOut(_)));
    assert_eq!(kb.store().count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_reingestion_duplicates_by_default() -> Result<()> {
    let kb = memory_kb(DocentConfig::default(), Arc::new(KeywordProvider)).await;
    kb.ingestion().ingest("cats are mammals").await?;
    kb.ingestion().ingest("cats are mammals").await?;
    assert_eq!(kb.store().count().await?, 2);

    let results = kb.retriever().retrieve("mammal", 3, 0.5).await?;
    assert_eq!(results, vec!["cats are mammals", "cats are mammals"]);
    Ok(())
}

#[tokio::test]
async fn test_dedup_skips_known_content() -> Result<()> {
    let config = DocentConfig {
        dedup_by_content: true,
        ..small_chunks(9, 2)
    };
    let kb = memory_kb(config, Arc::new(KeywordProvider)).await;
    assert!(kb.store().options().dedup_by_content);

    assert_eq!(kb.ingestion().ingest("AAAA BBBB CCCC DDDD").await?, 3);
    assert_eq!(kb.ingestion().ingest("AAAA BBBB CCCC DDDD").await?, 0);

    let outcome = kb.ingestion().ingest_document("AAAA BBBB CCCC DDDD").await;
    assert!(outcome.success);
    assert_eq!(outcome.chunk_count, Some(0));
    assert_eq!(kb.store().count().await?, 3);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_ingestion_and_search() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let kb = file_kb(&temp_dir, small_chunks(9, 0), Arc::new(KeywordProvider)).await?;

    let ingests = (0..8).map(|_| {
        let kb = kb.clone();
        tokio::spawn(async move { kb.ingestion().ingest(&ten_chunk_document()).await })
    });
    let searches = (0..4).map(|_| {
        let kb = kb.clone();
        tokio::spawn(async move { kb.retriever().retrieve("t001", 3, -1.0).await })
    });
    let (ingested, searched) = futures::future::join(
        futures::future::join_all(ingests),
        futures::future::join_all(searches),
    )
    .await;

    for result in ingested {
        assert_eq!(result??, 10);
    }
    for result in searched {
        let hits = result??;
        assert!(hits.len() <= 3);
    }
    assert_eq!(kb.store().count().await?, 80);
    Ok(())
}

#[tokio::test]
async fn test_store_survives_reopen() -> Result<()> {
    let temp_dir = TempDir::new()?;
    {
        let kb = file_kb(&temp_dir, DocentConfig::default(), Arc::new(KeywordProvider)).await?;
        kb.ingestion().ingest("cats are mammals").await?;
    }

    let store = SqliteStore::open(&temp_dir.path().join("kb.db"), StoreOptions::default()).await?;
    assert_eq!(store.count().await?, 1);
    let stats = store.stats().await?;
    assert_eq!(stats.dimension, Some(3));
    Ok(())
}
