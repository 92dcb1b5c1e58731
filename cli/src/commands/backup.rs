use crate::config::AppConfig;
use anyhow::{Context, Result};
use backup_rotator_backends::{backup_source, build_backend, default_registry};
use backup_rotator_core::StreamChunker;
use clap::Args;
use tracing::info;

#[derive(Args)]
pub struct BackupCommand {
    #[arg(default_value = "-", help = "File to back up, or - for stdin")]
    source: String,

    #[arg(long, help = "Chunk size in KB (defaults to the backend's preference)")]
    chunk_size_kb: Option<usize>,

    #[arg(long, help = "Abort if the source grows beyond this many KB")]
    max_size_kb: Option<u64>,

    #[arg(long, help = "Skip rotation after the backup is written")]
    no_rotate: bool,
}

impl BackupCommand {
    pub async fn run(&self, cli: &crate::Cli) -> Result<()> {
        let (config_path, config) = AppConfig::discover(cli.config.as_deref())?;
        info!("Using configuration {}", config_path.display());

        let mut backend = build_backend(&default_registry(), &config.storage).await?;

        let chunk_size_kb = self
            .chunk_size_kb
            .or(config.chunk_size_kb)
            .unwrap_or_else(|| backend.chunk_size_kb());
        let max_size_kb = self.max_size_kb.unwrap_or(config.max_size_kb);
        let chunker = StreamChunker::new(&self.source, chunk_size_kb, max_size_kb);

        info!(
            "Backing up {} to {} in {} KB chunks",
            self.source,
            backend.storage_key(),
            chunk_size_kb
        );
        let total = backup_source(&chunker, backend.as_mut())
            .await
            .with_context(|| format!("Backup of {} failed", self.source))?;
        println!("Wrote {} bytes to {}", total, backend.storage_key());

        match (&config.rotator, self.no_rotate) {
            (Some(rotator_config), false) => {
                super::rotate::rotate_backend(rotator_config, backend.as_ref(), None).await
            }
            _ => {
                info!("Rotation skipped");
                Ok(())
            }
        }
    }
}
