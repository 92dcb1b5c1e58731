use crate::backend::{Backend, BackendType, CopyOutcome};
use async_trait::async_trait;
use backup_rotator_core::naming::{extract_modifier, modified_file_name, validate_modifier};
use backup_rotator_core::{EngineConfig, Error, Result};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Larger than the other engines so it never limits a shared chunk size.
pub const LOCAL_CHUNK_SIZE_KB: usize = 10240;

enum WriteState {
    Pending,
    Open(File),
    Closed,
}

/// Writes the backup to a single file and keeps tagged copies in the same
/// directory.
pub struct LocalBackend {
    path: PathBuf,
    state: WriteState,
}

impl LocalBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: WriteState::Pending,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(config.require_str("path")?))
    }

    fn file_name(&self) -> Result<&str> {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::Config(format!("Invalid backup path {}", self.path.display())))
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    pub fn modified_path(&self, modifier: &str) -> Result<PathBuf> {
        Ok(self
            .directory()
            .join(modified_file_name(self.file_name()?, modifier)))
    }

    async fn open(&self) -> Result<File> {
        debug!("Opening {} for writing", self.path.display());
        File::create(&self.path).await.map_err(|source| Error::FileOpen {
            path: self.path.display().to_string(),
            source,
        })
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn on_chunk(&mut self, chunk: Bytes, index: u64) -> Result<()> {
        if let WriteState::Pending = self.state {
            self.state = WriteState::Open(self.open().await?);
        }
        match &mut self.state {
            WriteState::Open(file) => {
                debug!(index, size = chunk.len(), "Writing chunk");
                file.write_all(&chunk).await?;
                Ok(())
            }
            _ => Err(Error::Protocol(format!(
                "chunk {} received after {} was closed",
                index,
                self.path.display()
            ))),
        }
    }

    async fn on_end(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, WriteState::Closed) {
            WriteState::Open(mut file) => {
                debug!("Closing {}", self.path.display());
                file.flush().await?;
                file.sync_all().await?;
                Ok(())
            }
            WriteState::Pending => {
                debug!("No data received, creating empty {}", self.path.display());
                self.open().await?;
                Ok(())
            }
            WriteState::Closed => Err(Error::Protocol(format!(
                "on_end called twice for {}",
                self.path.display()
            ))),
        }
    }

    async fn existing_copy_modifiers(&self) -> Result<Vec<String>> {
        let file_name = self.file_name()?;
        let mut modifiers = Vec::new();
        let mut entries = fs::read_dir(self.directory()).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if let Some(modifier) = extract_modifier(file_name, name) {
                    modifiers.push(modifier.to_string());
                }
            }
        }
        Ok(modifiers)
    }

    async fn copy_with_modifier(&self, modifier: &str, allow_overwrite: bool) -> Result<CopyOutcome> {
        validate_modifier(modifier)?;
        let target = self.modified_path(modifier)?;
        let exists = fs::try_exists(&target).await?;
        if exists && !allow_overwrite {
            info!("Skipped overwriting existing copy at {}", target.display());
            return Ok(CopyOutcome::Skipped);
        }
        fs::copy(&self.path, &target).await?;
        if exists {
            info!("Overwrote existing copy at {}", target.display());
            Ok(CopyOutcome::Overwritten)
        } else {
            info!("Created new copy at {}", target.display());
            Ok(CopyOutcome::Created)
        }
    }

    async fn delete_with_modifier(&self, modifier: &str) -> Result<()> {
        validate_modifier(modifier)?;
        let target = self.modified_path(modifier)?;
        if fs::try_exists(&target).await? {
            info!("Removing existing file at {}", target.display());
            fs::remove_file(&target).await?;
        } else {
            info!("Cannot remove non-existent file at {}", target.display());
        }
        Ok(())
    }

    fn chunk_size_kb(&self) -> usize {
        LOCAL_CHUNK_SIZE_KB
    }

    fn storage_key(&self) -> String {
        self.path.display().to_string()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::File
    }
}
