use crate::backend::Backend;
use crate::local::LocalBackend;
use crate::s3::S3Backend;
use backup_rotator_core::{EngineConfig, Registry, Result};
use futures::future::{BoxFuture, FutureExt};
use tracing::info;

/// Configuration key naming the storage engine.
pub const ENGINE_KEY: &str = "engine";

pub type BackendFactory =
    Box<dyn Fn(EngineConfig) -> BoxFuture<'static, Result<Box<dyn Backend>>> + Send + Sync>;

pub type BackendRegistry = Registry<BackendFactory>;

/// Registry with the built-in `file` and `s3` engines.
pub fn default_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new("storage", ENGINE_KEY);
    registry.register("file", Box::new(|config: EngineConfig| open_file(config).boxed()));
    registry.register("s3", Box::new(|config: EngineConfig| connect_s3(config).boxed()));
    registry
}

async fn open_file(config: EngineConfig) -> Result<Box<dyn Backend>> {
    let backend: Box<dyn Backend> = Box::new(LocalBackend::from_config(&config)?);
    Ok(backend)
}

async fn connect_s3(config: EngineConfig) -> Result<Box<dyn Backend>> {
    let backend: Box<dyn Backend> = Box::new(S3Backend::from_config(&config).await?);
    Ok(backend)
}

/// Builds the backend selected by the `engine` key of `config`.
pub async fn build_backend(registry: &BackendRegistry, config: &EngineConfig) -> Result<Box<dyn Backend>> {
    let factory = registry.resolve(config)?;
    let backend = factory(config.clone()).await?;
    info!(
        backend_type = ?backend.backend_type(),
        destination = %backend.storage_key(),
        "Storage backend ready"
    );
    Ok(backend)
}
