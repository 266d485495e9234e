//! Ordered multi-destination delivery with compensating rollback

use super::destination::{Compensation, Destination};
use super::log::UploadLog;
use super::state::{EntryStatus, RunState};
use crate::error::{PipelineError, Result};
use crate::snapshot::{SnapshotHandle, SnapshotManager};
use ascend_common::SnapshotVersion;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Result of a run that did not fail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReport {
    pub run_id: Uuid,
    pub version: SnapshotVersion,
    pub state: RunState,
    /// Destinations written by this run
    pub delivered: Vec<String>,
    /// Destinations already holding this version from an earlier run
    pub skipped: Vec<String>,
    /// The version was already live; nothing was run
    pub already_delivered: bool,
}

pub struct UploadOrchestrator {
    snapshots: Arc<SnapshotManager>,
    log: Arc<dyn UploadLog>,
}

impl UploadOrchestrator {
    pub fn new(snapshots: Arc<SnapshotManager>, log: Arc<dyn UploadLog>) -> Self {
        Self { snapshots, log }
    }

    pub fn log(&self) -> &Arc<dyn UploadLog> {
        &self.log
    }

    /// Deliver `version` to `destinations` in order
    ///
    /// Destination N+1 is only attempted once N is recorded as `success`.
    /// The first failure cleans up the failing destination, then rolls back
    /// every earlier success of the run in reverse order, and is returned as
    /// [`PipelineError::DestinationFailure`]. Destinations that already held
    /// the version from a delivered run are skipped and left live.
    #[instrument(skip(self, destinations), fields(%version))]
    pub async fn upload(
        &self,
        version: SnapshotVersion,
        destinations: &[Arc<dyn Destination>],
    ) -> Result<UploadReport> {
        check_names(destinations)?;
        let names: Vec<&str> = destinations.iter().map(|d| d.name()).collect();

        if let Some(last) = self.log.latest_run(version).await? {
            if last.state.needs_recovery() {
                return Err(PipelineError::RecoveryRequired {
                    version,
                    state: last.state,
                });
            }
            if self.log.is_delivered(version, &names).await? {
                info!(run_id = %last.run_id, "Version already delivered, nothing to do");
                return Ok(UploadReport {
                    run_id: last.run_id,
                    version,
                    state: RunState::Delivered,
                    delivered: Vec::new(),
                    skipped: names.iter().map(|n| n.to_string()).collect(),
                    already_delivered: true,
                });
            }
        }
        let live = self.live_destinations(version).await?;

        let run = self.log.start_run(version).await?;
        info!(run_id = %run.run_id, destinations = destinations.len(), "Starting upload run");

        self.log.set_run_state(run.run_id, &RunState::Verifying).await?;
        if let Err(e) = self.snapshots.verify(version) {
            error!(error = %e, "Snapshot failed verification, refusing to upload");
            self.log
                .set_run_state(run.run_id, &RunState::VerificationFailed)
                .await?;
            return Err(e);
        }
        let snapshot = self.snapshots.open(version)?;

        let mut written: Vec<(&Arc<dyn Destination>, EntryStatus)> = Vec::new();
        let mut delivered = Vec::new();
        let mut skipped = Vec::new();

        for destination in destinations {
            let name = destination.name();

            let already = self.log.entry(version, name).await?;
            if matches!(already, Some(ref e) if e.status == EntryStatus::Success) {
                info!(destination = name, "Destination already holds this version, skipping");
                if !live.contains(name) {
                    written.push((destination, EntryStatus::Success));
                }
                skipped.push(name.to_string());
                continue;
            }

            self.log
                .set_run_state(run.run_id, &RunState::Uploading(name.to_string()))
                .await?;
            self.log.set_entry(version, name, EntryStatus::Pending, None).await?;

            match destination.deliver(&snapshot).await {
                Ok(()) => {
                    self.log.set_entry(version, name, EntryStatus::Success, None).await?;
                    info!(destination = name, "Delivered");
                    written.push((destination, EntryStatus::Success));
                    delivered.push(name.to_string());
                },
                Err(source) => {
                    let detail = format!("{source:#}");
                    error!(destination = name, error = %detail, "Delivery failed, rolling back");
                    self.log
                        .set_entry(version, name, EntryStatus::Failed, Some(&detail))
                        .await?;

                    self.log.set_run_state(run.run_id, &RunState::RollingBack).await?;
                    written.push((destination, EntryStatus::Failed));
                    written.reverse();
                    self.compensate_all(run.run_id, &snapshot, &written).await?;
                    self.log.set_run_state(run.run_id, &RunState::RolledBack).await?;

                    return Err(PipelineError::DestinationFailure {
                        version,
                        destination: name.to_string(),
                        source,
                    });
                },
            }
        }

        self.log.set_run_state(run.run_id, &RunState::Delivered).await?;
        info!(run_id = %run.run_id, "Snapshot delivered to every destination");

        Ok(UploadReport {
            run_id: run.run_id,
            version,
            state: RunState::Delivered,
            delivered,
            skipped,
            already_delivered: false,
        })
    }

    /// Finish compensation left behind by an interrupted or failed rollback
    ///
    /// Every entry still `success`, `pending` or `failed` is compensated in
    /// reverse order of first delivery, except destinations that went live
    /// in an earlier delivered run. Versions that were delivered are
    /// refused; versions with nothing outstanding return without starting a
    /// run.
    #[instrument(skip(self, destinations), fields(%version))]
    pub async fn recover(
        &self,
        version: SnapshotVersion,
        destinations: &[Arc<dyn Destination>],
    ) -> Result<Option<UploadReport>> {
        check_names(destinations)?;

        let last = match self.log.latest_run(version).await? {
            None => {
                info!("No upload run recorded, nothing to recover");
                return Ok(None);
            },
            Some(run) => run,
        };

        match last.state {
            RunState::Delivered => {
                return Err(PipelineError::config(format!(
                    "{version} is delivered; recovery only undoes incomplete uploads"
                )));
            },
            RunState::RolledBack | RunState::VerificationFailed => {
                info!(state = %last.state, "Last run finished cleanly, nothing to recover");
                return Ok(None);
            },
            _ => {},
        }

        let live = self.live_destinations(version).await?;
        let mut targets = self
            .log
            .entries(version)
            .await?
            .into_iter()
            .filter(|e| e.status != EntryStatus::RolledBack && !live.contains(&e.destination))
            .map(|e| {
                destinations
                    .iter()
                    .find(|d| d.name() == e.destination)
                    .map(|d| (d, e.status))
                    .ok_or_else(|| {
                        PipelineError::config(format!(
                            "Upload log lists destination '{}' for {version} but it is not configured",
                            e.destination
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        targets.reverse();

        let snapshot = self.snapshots.open(version)?;
        let run = self.log.start_run(version).await?;
        warn!(
            run_id = %run.run_id,
            previous_state = %last.state,
            outstanding = targets.len(),
            "Recovering incomplete upload"
        );

        self.log.set_run_state(run.run_id, &RunState::RollingBack).await?;
        self.compensate_all(run.run_id, &snapshot, &targets).await?;
        self.log.set_run_state(run.run_id, &RunState::RolledBack).await?;

        Ok(Some(UploadReport {
            run_id: run.run_id,
            version,
            state: RunState::RolledBack,
            delivered: Vec::new(),
            skipped: Vec::new(),
            already_delivered: false,
        }))
    }

    /// Destinations that hold `version` from a delivered run
    ///
    /// An entry is live when it was last written as `success` no later than
    /// the most recent delivered run finished.
    async fn live_destinations(&self, version: SnapshotVersion) -> Result<HashSet<String>> {
        let delivered_at = self
            .log
            .runs(version)
            .await?
            .into_iter()
            .filter(|run| run.state == RunState::Delivered)
            .filter_map(|run| run.finished_at)
            .max();
        let Some(delivered_at) = delivered_at else {
            return Ok(HashSet::new());
        };

        Ok(self
            .log
            .entries(version)
            .await?
            .into_iter()
            .filter(|e| e.status == EntryStatus::Success && e.updated_at <= delivered_at)
            .map(|e| e.destination)
            .collect())
    }

    /// Compensate `targets` in the given order
    ///
    /// Each target carries the entry status it had before the rollback. A
    /// `failed` target may hold a partial write, so it is cleaned up too but
    /// keeps its `failed` entry. A failing best-effort destination is
    /// recorded and skipped. A failing required destination stops the
    /// rollback in `RollbackFailed`; its entry keeps the prior status so
    /// recovery picks it up again.
    async fn compensate_all(
        &self,
        run_id: Uuid,
        snapshot: &SnapshotHandle,
        targets: &[(&Arc<dyn Destination>, EntryStatus)],
    ) -> Result<()> {
        let version = snapshot.version();

        for (destination, prior) in targets {
            let name = destination.name();
            let partial = *prior == EntryStatus::Failed;

            match destination.compensate(snapshot).await {
                Ok(()) if partial => {
                    info!(destination = name, "Cleaned up failed delivery");
                },
                Ok(()) => {
                    self.log
                        .set_entry(version, name, EntryStatus::RolledBack, None)
                        .await?;
                    info!(destination = name, "Compensated");
                },
                Err(e) if destination.compensation() == Compensation::BestEffort => {
                    let detail = format!("best-effort compensation failed: {e:#}");
                    warn!(destination = name, error = %detail, "Ignoring compensation failure");
                    if !partial {
                        self.log
                            .set_entry(version, name, EntryStatus::RolledBack, Some(&detail))
                            .await?;
                    }
                },
                Err(e) => {
                    let detail = format!("{e:#}");
                    error!(
                        destination = name,
                        error = %detail,
                        "Compensation failed, manual reconciliation required"
                    );
                    let earlier = self
                        .log
                        .entry(version, name)
                        .await?
                        .and_then(|entry| entry.detail);
                    let recorded = match earlier {
                        Some(earlier) if partial => {
                            format!("{earlier}; compensation failed: {detail}")
                        },
                        _ => format!("compensation failed: {detail}"),
                    };
                    self.log
                        .set_entry(version, name, *prior, Some(&recorded))
                        .await?;
                    self.log.set_run_state(run_id, &RunState::RollbackFailed).await?;
                    return Err(PipelineError::RollbackFailure {
                        version,
                        destination: name.to_string(),
                        detail,
                    });
                },
            }
        }
        Ok(())
    }
}

fn check_names(destinations: &[Arc<dyn Destination>]) -> Result<()> {
    if destinations.is_empty() {
        return Err(PipelineError::config("At least one destination is required"));
    }
    let mut seen = HashSet::new();
    for destination in destinations {
        if !seen.insert(destination.name()) {
            return Err(PipelineError::config(format!(
                "Destination '{}' is listed more than once",
                destination.name()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::snapshot::CreateOptions;
    use crate::upload::SqliteUploadLog;
    use ascend_common::{Problem, RecordBatch, Source, Topic, TopicCategory};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct Scripted {
        name: String,
        fail_deliver: bool,
        fail_compensate: AtomicBool,
        compensation: Compensation,
        delivers: AtomicUsize,
        compensates: AtomicUsize,
        /// Set by every delivery attempt, failed or not, and cleared by a
        /// successful compensation
        holds: AtomicBool,
    }

    impl Scripted {
        fn ok(name: &str) -> Arc<Self> {
            Arc::new(Self::build(name, false, false, Compensation::Required))
        }

        fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self::build(name, true, false, Compensation::Required))
        }

        fn build(name: &str, fail_deliver: bool, fail_compensate: bool, compensation: Compensation) -> Self {
            Self {
                name: name.to_string(),
                fail_deliver,
                fail_compensate: AtomicBool::new(fail_compensate),
                compensation,
                delivers: AtomicUsize::new(0),
                compensates: AtomicUsize::new(0),
                holds: AtomicBool::new(false),
            }
        }

        fn delivers(&self) -> usize {
            self.delivers.load(Ordering::SeqCst)
        }

        fn compensates(&self) -> usize {
            self.compensates.load(Ordering::SeqCst)
        }

        fn holds(&self) -> bool {
            self.holds.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Destination for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        fn compensation(&self) -> Compensation {
            self.compensation
        }

        async fn deliver(&self, _snapshot: &SnapshotHandle) -> anyhow::Result<()> {
            self.delivers.fetch_add(1, Ordering::SeqCst);
            self.holds.store(true, Ordering::SeqCst);
            if self.fail_deliver {
                anyhow::bail!("{} is unreachable", self.name);
            }
            Ok(())
        }

        async fn compensate(&self, _snapshot: &SnapshotHandle) -> anyhow::Result<()> {
            self.compensates.fetch_add(1, Ordering::SeqCst);
            if self.fail_compensate.load(Ordering::SeqCst) {
                anyhow::bail!("{} refused delete", self.name);
            }
            self.holds.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        _dir: TempDir,
        snapshots: Arc<SnapshotManager>,
        log: Arc<SqliteUploadLog>,
        orchestrator: UploadOrchestrator,
    }

    const V1: SnapshotVersion = SnapshotVersion::new(1, 0, 0);

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = Arc::new(SnapshotManager::new(dir.path().join("snapshots")));
        let records = RecordBatch::new(
            vec![Problem::new(Source::Leetcode, "1", "two-sum", "Two Sum").with_topics(["array"])],
            vec![],
            vec![Topic::new("array", TopicCategory::Dsa)],
        );
        snapshots
            .create(V1, &records, &CreateOptions::new("v1.0.0"))
            .unwrap();

        let log = Arc::new(SqliteUploadLog::in_memory().unwrap());
        let orchestrator = UploadOrchestrator::new(snapshots.clone(), log.clone());
        Fixture {
            _dir: dir,
            snapshots,
            log,
            orchestrator,
        }
    }

    fn dests(list: &[&Arc<Scripted>]) -> Vec<Arc<dyn Destination>> {
        list.iter().map(|d| Arc::clone(*d) as Arc<dyn Destination>).collect()
    }

    async fn statuses(log: &SqliteUploadLog) -> Vec<(String, EntryStatus)> {
        log.entries(V1)
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.destination, e.status))
            .collect()
    }

    #[tokio::test]
    async fn test_all_destinations_deliver() {
        let fx = fixture();
        let (store, index) = (Scripted::ok("store"), Scripted::ok("index"));

        let report = fx.orchestrator.upload(V1, &dests(&[&store, &index])).await.unwrap();

        assert_eq!(report.state, RunState::Delivered);
        assert_eq!(report.delivered, vec!["store", "index"]);
        assert!(fx.log.is_delivered(V1, &["store", "index"]).await.unwrap());
        assert_eq!(
            statuses(&fx.log).await,
            vec![
                ("store".to_string(), EntryStatus::Success),
                ("index".to_string(), EntryStatus::Success)
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_rolls_back_earlier_successes_once() {
        let fx = fixture();
        let (store, index) = (Scripted::ok("store"), Scripted::failing("index"));

        let err = fx
            .orchestrator
            .upload(V1, &dests(&[&store, &index]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::DestinationFailure { ref destination, .. } if destination == "index"
        ));
        assert_eq!(store.compensates(), 1);
        assert_eq!(index.compensates(), 1);
        assert!(!store.holds() && !index.holds());
        assert_eq!(
            fx.log.latest_run(V1).await.unwrap().unwrap().state,
            RunState::RolledBack
        );
        assert_eq!(
            statuses(&fx.log).await,
            vec![
                ("store".to_string(), EntryStatus::RolledBack),
                ("index".to_string(), EntryStatus::Failed)
            ]
        );
        assert!(!fx.log.is_delivered(V1, &["store"]).await.unwrap());
        let index_entry = fx.log.entry(V1, "index").await.unwrap().unwrap();
        assert!(index_entry.detail.unwrap().contains("index is unreachable"));
    }

    #[tokio::test]
    async fn test_never_passes_a_failed_destination() {
        let fx = fixture();
        let (a, b, c) = (Scripted::ok("a"), Scripted::failing("b"), Scripted::ok("c"));

        fx.orchestrator.upload(V1, &dests(&[&a, &b, &c])).await.unwrap_err();

        assert_eq!(c.delivers(), 0);
        assert!(fx.log.entry(V1, "c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_never_uploaded() {
        let fx = fixture();
        let path = fx.snapshots.root().join(V1.to_string()).join("problems.json");
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] ^= 0x01;
        std::fs::write(&path, bytes).unwrap();

        let store = Scripted::ok("store");
        let err = fx.orchestrator.upload(V1, &dests(&[&store])).await.unwrap_err();

        assert!(matches!(err, PipelineError::SnapshotCorruption { .. }));
        assert_eq!(store.delivers(), 0);
        assert_eq!(
            fx.log.latest_run(V1).await.unwrap().unwrap().state,
            RunState::VerificationFailed
        );
    }

    #[tokio::test]
    async fn test_required_compensation_failure_blocks_until_recovered() {
        let fx = fixture();
        let store = Arc::new(Scripted::build("store", false, true, Compensation::Required));
        let index = Scripted::failing("index");

        let err = fx
            .orchestrator
            .upload(V1, &dests(&[&store, &index]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::RollbackFailure { .. }));
        assert_eq!(
            fx.log.latest_run(V1).await.unwrap().unwrap().state,
            RunState::RollbackFailed
        );
        let entry = fx.log.entry(V1, "store").await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Success);
        assert!(entry.detail.unwrap().contains("compensation failed"));

        let err = fx
            .orchestrator
            .upload(V1, &dests(&[&store, &index]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::RecoveryRequired { .. }));
        assert_eq!(store.delivers(), 1);

        store.fail_compensate.store(false, Ordering::SeqCst);
        let report = fx
            .orchestrator
            .recover(V1, &dests(&[&store, &index]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.state, RunState::RolledBack);
        assert_eq!(store.compensates(), 2);
        assert_eq!(index.compensates(), 2);
        assert!(!store.holds());
        assert_eq!(
            fx.log.entry(V1, "store").await.unwrap().unwrap().status,
            EntryStatus::RolledBack
        );
    }

    #[tokio::test]
    async fn test_best_effort_compensation_failure_still_rolls_back() {
        let fx = fixture();
        let store = Scripted::ok("store");
        let cache = Arc::new(Scripted::build("cache", false, true, Compensation::BestEffort));
        let mirror = Scripted::failing("mirror");

        fx.orchestrator
            .upload(V1, &dests(&[&store, &cache, &mirror]))
            .await
            .unwrap_err();

        assert_eq!(
            fx.log.latest_run(V1).await.unwrap().unwrap().state,
            RunState::RolledBack
        );
        assert_eq!(store.compensates(), 1);
        let cache_entry = fx.log.entry(V1, "cache").await.unwrap().unwrap();
        assert_eq!(cache_entry.status, EntryStatus::RolledBack);
        assert!(cache_entry.detail.unwrap().contains("best-effort"));
    }

    #[tokio::test]
    async fn test_delivered_version_is_not_uploaded_again() {
        let fx = fixture();
        let store = Scripted::ok("store");

        fx.orchestrator.upload(V1, &dests(&[&store])).await.unwrap();
        let report = fx.orchestrator.upload(V1, &dests(&[&store])).await.unwrap();

        assert!(report.already_delivered);
        assert_eq!(store.delivers(), 1);
        assert!(fx.orchestrator.recover(V1, &dests(&[&store])).await.is_err());
    }

    #[tokio::test]
    async fn test_added_destination_is_delivered_without_touching_live_ones() {
        let fx = fixture();
        let (store, index) = (Scripted::ok("store"), Scripted::ok("index"));

        fx.orchestrator.upload(V1, &dests(&[&store])).await.unwrap();
        assert!(!fx.log.is_delivered(V1, &["store", "index"]).await.unwrap());

        let report = fx.orchestrator.upload(V1, &dests(&[&store, &index])).await.unwrap();

        assert!(!report.already_delivered);
        assert_eq!(report.skipped, vec!["store"]);
        assert_eq!(report.delivered, vec!["index"]);
        assert_eq!((store.delivers(), index.delivers()), (1, 1));
        assert!(fx.log.is_delivered(V1, &["store", "index"]).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_extension_keeps_live_destinations() {
        let fx = fixture();
        let (store, index) = (Scripted::ok("store"), Scripted::failing("index"));

        fx.orchestrator.upload(V1, &dests(&[&store])).await.unwrap();
        fx.orchestrator
            .upload(V1, &dests(&[&store, &index]))
            .await
            .unwrap_err();

        assert_eq!(store.compensates(), 0);
        assert!(store.holds());
        assert!(!index.holds());
        assert!(fx.log.is_delivered(V1, &["store"]).await.unwrap());
        assert!(!fx.log.is_delivered(V1, &["store", "index"]).await.unwrap());
        assert!(fx.orchestrator.recover(V1, &dests(&[&store, &index])).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_write_is_recovered_after_cleanup_fails() {
        let fx = fixture();
        let store = Scripted::ok("store");
        let index = Arc::new(Scripted::build("index", true, true, Compensation::Required));

        let err = fx
            .orchestrator
            .upload(V1, &dests(&[&store, &index]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::RollbackFailure { ref destination, .. } if destination == "index"
        ));
        assert!(index.holds());
        assert_eq!(store.compensates(), 0);
        let entry = fx.log.entry(V1, "index").await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Failed);
        let detail = entry.detail.unwrap();
        assert!(detail.contains("index is unreachable"));
        assert!(detail.contains("compensation failed: index refused delete"));

        index.fail_compensate.store(false, Ordering::SeqCst);
        fx.orchestrator
            .recover(V1, &dests(&[&store, &index]))
            .await
            .unwrap()
            .unwrap();

        assert!(!index.holds());
        assert!(!store.holds());
        assert_eq!(
            statuses(&fx.log).await,
            vec![
                ("store".to_string(), EntryStatus::RolledBack),
                ("index".to_string(), EntryStatus::Failed)
            ]
        );
    }

    #[tokio::test]
    async fn test_interrupted_run_resumes_without_redelivering() {
        let fx = fixture();
        let run = fx.log.start_run(V1).await.unwrap();
        fx.log
            .set_run_state(run.run_id, &RunState::Uploading("index".to_string()))
            .await
            .unwrap();
        fx.log.set_entry(V1, "store", EntryStatus::Success, None).await.unwrap();
        fx.log.set_entry(V1, "index", EntryStatus::Pending, None).await.unwrap();

        let (store, index) = (Scripted::ok("store"), Scripted::ok("index"));
        let report = fx.orchestrator.upload(V1, &dests(&[&store, &index])).await.unwrap();

        assert_eq!(report.skipped, vec!["store"]);
        assert_eq!(report.delivered, vec!["index"]);
        assert_eq!(store.delivers(), 0);
        assert_eq!(index.delivers(), 1);
    }

    #[tokio::test]
    async fn test_recover_without_runs_is_a_no_op() {
        let fx = fixture();
        let store = Scripted::ok("store");
        assert!(fx.orchestrator.recover(V1, &dests(&[&store])).await.unwrap().is_none());
        assert_eq!(store.compensates(), 0);
    }

    #[tokio::test]
    async fn test_rejects_duplicate_or_empty_destinations() {
        let fx = fixture();
        let store = Scripted::ok("store");

        assert!(matches!(
            fx.orchestrator.upload(V1, &dests(&[&store, &store])).await,
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            fx.orchestrator.upload(V1, &[]).await,
            Err(PipelineError::Config(_))
        ));
        assert!(fx.log.latest_run(V1).await.unwrap().is_none());
    }
}
