use async_trait::async_trait;
use backup_rotator_core::chunker::DEFAULT_CHUNK_SIZE_KB;
use backup_rotator_core::{ChunkSink, Result, StreamChunker};
use bytes::Bytes;
use tokio::io::AsyncRead;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    File,
    S3,
}

/// What `copy_with_modifier` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Created,
    Overwritten,
    Skipped,
}

/// Destination for one backup stream, plus the dated copies kept next to it.
///
/// The write path (`on_chunk`, then `on_end` exactly once) produces the
/// canonical object. The copy methods manage tagged copies of that object
/// and assume it already exists.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn on_chunk(&mut self, chunk: Bytes, index: u64) -> Result<()>;

    async fn on_end(&mut self) -> Result<()>;

    /// Modifiers of every tagged copy currently stored.
    async fn existing_copy_modifiers(&self) -> Result<Vec<String>>;

    async fn copy_with_modifier(&self, modifier: &str, allow_overwrite: bool) -> Result<CopyOutcome>;

    /// Removing a copy that does not exist is not an error.
    async fn delete_with_modifier(&self, modifier: &str) -> Result<()>;

    fn chunk_size_kb(&self) -> usize {
        DEFAULT_CHUNK_SIZE_KB
    }

    fn storage_key(&self) -> String;

    fn backend_type(&self) -> BackendType;
}

/// Adapts a backend to the chunk source's sink interface.
pub struct BackendSink<'a, B: ?Sized>(pub &'a mut B);

#[async_trait]
impl<B> ChunkSink for BackendSink<'_, B>
where
    B: Backend + ?Sized,
{
    async fn on_chunk(&mut self, chunk: Bytes, index: u64, _source: &str) -> Result<()> {
        self.0.on_chunk(chunk, index).await
    }
}

/// Streams `reader` into `backend` and finalizes it. On error the backend is
/// left unfinalized.
pub async fn stream_to_backend<R, B>(
    chunker: &StreamChunker,
    reader: R,
    backend: &mut B,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    B: Backend + ?Sized,
{
    let total = chunker.run(reader, &mut BackendSink(&mut *backend)).await?;
    backend.on_end().await?;
    info!(
        source = chunker.source(),
        destination = %backend.storage_key(),
        bytes = total,
        "Backup written"
    );
    Ok(total)
}

/// Like [`stream_to_backend`], reading from the chunker's own source.
pub async fn backup_source<B>(chunker: &StreamChunker, backend: &mut B) -> Result<u64>
where
    B: Backend + ?Sized,
{
    let total = chunker.run_source(&mut BackendSink(&mut *backend)).await?;
    backend.on_end().await?;
    info!(
        source = chunker.source(),
        destination = %backend.storage_key(),
        bytes = total,
        "Backup written"
    );
    Ok(total)
}
