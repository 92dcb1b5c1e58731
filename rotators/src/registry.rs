use crate::dmy::DmyRotator;
use crate::rotator::Rotator;
use backup_rotator_core::{EngineConfig, Registry, Result};

/// Configuration key naming the rotation strategy.
pub const ROTATOR_KEY: &str = "rotator";

pub type RotatorFactory = Box<dyn Fn(&EngineConfig) -> Result<Box<dyn Rotator>> + Send + Sync>;

pub type RotatorRegistry = Registry<RotatorFactory>;

/// Registry with the built-in `dmy` (day/month/year) rotator.
pub fn default_registry() -> RotatorRegistry {
    let mut registry = RotatorRegistry::new("rotator", ROTATOR_KEY);
    registry.register("dmy", Box::new(build_dmy));
    registry
}

fn build_dmy(config: &EngineConfig) -> Result<Box<dyn Rotator>> {
    let rotator: Box<dyn Rotator> = Box::new(DmyRotator::from_config(config)?);
    Ok(rotator)
}

/// Builds the rotator selected by the `rotator` key of `config`.
pub fn build_rotator(registry: &RotatorRegistry, config: &EngineConfig) -> Result<Box<dyn Rotator>> {
    let factory = registry.resolve(config)?;
    factory(config)
}
