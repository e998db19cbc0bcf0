//! Chunk consumers
//!
//! The downstream processing stage that receives classified data chunks.

use crate::classifier::DataChunk;
use async_trait::async_trait;

/// Receives every classified data chunk
#[async_trait]
pub trait ChunkConsumer: Send + Sync {
    async fn consume(&self, chunk: DataChunk);
}

/// Consumer that only logs chunk arrival
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingChunkConsumer;

#[async_trait]
impl ChunkConsumer for LoggingChunkConsumer {
    async fn consume(&self, chunk: DataChunk) {
        tracing::debug!(
            session_id = %chunk.session_id,
            bytes = chunk.len(),
            format = ?chunk.format,
            "Received data chunk"
        );
    }
}
