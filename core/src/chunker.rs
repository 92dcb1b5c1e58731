use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE_KB: usize = 1024;
pub const DEFAULT_MAX_SIZE_KB: u64 = 10240;

/// Receives the chunks read by a [`StreamChunker`].
#[async_trait]
pub trait ChunkSink: Send {
    /// `index` starts at 1 and increases by one per chunk.
    async fn on_chunk(&mut self, chunk: Bytes, index: u64, source: &str) -> Result<()>;
}

/// Slices a byte stream into fixed-size chunks, with a hard cap on the total
/// amount of data as a sanity check for runaway inputs.
pub struct StreamChunker {
    source: String,
    chunk_size_kb: usize,
    max_size_kb: u64,
}

impl StreamChunker {
    pub fn new(source: impl Into<String>, chunk_size_kb: usize, max_size_kb: u64) -> Self {
        Self {
            source: source.into(),
            chunk_size_kb: chunk_size_kb.max(1),
            max_size_kb,
        }
    }

    pub fn with_defaults(source: impl Into<String>) -> Self {
        Self::new(source, DEFAULT_CHUNK_SIZE_KB, DEFAULT_MAX_SIZE_KB)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Reads `source` as a file path, or standard input for `-`.
    pub async fn run_source<S>(&self, sink: &mut S) -> Result<u64>
    where
        S: ChunkSink + ?Sized,
    {
        if self.source == "-" {
            self.run(tokio::io::stdin(), sink).await
        } else {
            let file = tokio::fs::File::open(&self.source).await?;
            self.run(file, sink).await
        }
    }

    /// Delivers every chunk of `reader` to `sink` and returns the number of
    /// bytes delivered. Fails with [`Error::TooMuchData`] once the total
    /// reaches the configured maximum. A maximum too large to express in
    /// bytes saturates to `u64::MAX`.
    pub async fn run<R, S>(&self, mut reader: R, sink: &mut S) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        S: ChunkSink + ?Sized,
    {
        let chunk_size = self
            .chunk_size_kb
            .checked_mul(1024)
            .ok_or_else(|| Error::Config(format!("Chunk size of {} KB is too large", self.chunk_size_kb)))?;
        let max_size = self.max_size_kb.saturating_mul(1024);
        let mut total = 0u64;
        let mut index = 0u64;

        while total < max_size {
            let mut buffer = Vec::with_capacity(chunk_size);
            (&mut reader).take(chunk_size as u64).read_to_end(&mut buffer).await?;
            if buffer.is_empty() {
                break;
            }
            index += 1;
            total += buffer.len() as u64;
            debug!(source = %self.source, index, size = buffer.len(), "Read chunk");
            sink.on_chunk(Bytes::from(buffer), index, &self.source).await?;
        }

        if total >= max_size {
            return Err(Error::TooMuchData {
                limit: max_size,
                reached: total,
            });
        }

        debug!(source = %self.source, chunks = index, total, "Finished reading");
        Ok(total)
    }
}
