pub mod ingestion;
pub mod retriever;
pub mod similarity;

pub use ingestion::{IngestError, IngestionOutcome, IngestionPipeline};
pub use retriever::{RetrievalPolicy, RetrieveError, Retriever};
