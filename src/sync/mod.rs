//! Content sync: pulls documents from connected providers and hands them to
//! an ingestion sink as plain-text chunks.

mod notion;

pub use notion::NotionAdapter;

use crate::connector::Connector;
use anyhow::Result;
use async_trait::async_trait;

/// One unit of ingestible content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub title: String,
    pub source_url: String,
    pub body: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    Completed,
    Failed,
}

/// Result of one sync run. A failed run is still a recorded attempt,
/// never a silently lost job.
#[derive(Clone, Debug)]
pub struct SyncOutcome {
    pub chunks_created: usize,
    pub status: SyncStatus,
    pub error_message: Option<String>,
}

impl SyncOutcome {
    pub fn completed(chunks_created: usize) -> Self {
        Self {
            chunks_created,
            status: SyncStatus::Completed,
            error_message: None,
        }
    }

    pub fn failed(chunks_created: usize, message: impl Into<String>) -> Self {
        Self {
            chunks_created,
            status: SyncStatus::Failed,
            error_message: Some(message.into()),
        }
    }
}

/// Destination for synced chunks. Implemented by the ingestion pipeline;
/// tests substitute an in-memory sink.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Stores chunks for a site, returning how many were accepted.
    async fn ingest(&self, site_id: &str, chunks: Vec<Chunk>) -> Result<usize>;
}

/// Provider-specific content fetcher.
#[async_trait]
pub trait SyncAdapter: Send + Sync {
    /// Catalog provider id this adapter serves.
    fn app_name(&self) -> &str;

    /// Runs a full sync for one connector. Never panics across items; a
    /// single bad document is skipped, not fatal.
    async fn sync(&self, connector: &Connector, site_id: &str, sink: &dyn ChunkSink)
        -> SyncOutcome;
}
