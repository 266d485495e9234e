use crate::snapshot::SnapshotHandle;
use async_trait::async_trait;

/// How a failed compensation affects the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compensation {
    /// Failure leaves the run in `RollbackFailed`
    #[default]
    Required,
    /// Failure is logged and recorded, rollback continues
    BestEffort,
}

/// One external system receiving a snapshot
///
/// Both operations must be idempotent: a crash can leave a delivery half
/// done, and the same compensation may run again during recovery.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Stable name used as the Upload Log key
    fn name(&self) -> &str;

    fn compensation(&self) -> Compensation {
        Compensation::Required
    }

    async fn deliver(&self, snapshot: &SnapshotHandle) -> anyhow::Result<()>;

    /// Undo `deliver` for this snapshot's version
    async fn compensate(&self, snapshot: &SnapshotHandle) -> anyhow::Result<()>;
}
