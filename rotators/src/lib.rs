pub mod dmy;
pub mod registry;
pub mod rotator;

#[cfg(test)]
mod testutil;

pub use dmy::{DmyRotator, RetentionPolicy};
pub use registry::{RotatorFactory, RotatorRegistry, build_rotator, default_registry};
pub use rotator::{RotationSummary, Rotator};
