use async_trait::async_trait;
use backup_rotator_backends::{Backend, CopyOutcome};
use backup_rotator_core::Result;

/// Result of one rotation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationSummary {
    /// Modifier of the copy made for the date of record.
    pub today: String,
    pub copy: CopyOutcome,
    /// Modifiers removed, in the order the backend listed them.
    pub deleted: Vec<String>,
}

/// A retention strategy over the tagged copies of a backend.
#[async_trait]
pub trait Rotator: Send + Sync {
    /// Modifiers that survive a rotation, without duplicates.
    fn keep_set(&self) -> Vec<String>;

    /// Copies the canonical object for today, then deletes every copy the
    /// strategy does not keep.
    async fn rotate(&self, backend: &dyn Backend) -> Result<RotationSummary>;
}
