//! Job registry: id allocation and shared job storage
//!
//! The registry is an owned object, not ambient module state: an atomic id
//! generator plus a map behind one coarse lock. The lock guards only the
//! insert/lookup/remove critical sections — after insertion a job's state is
//! mutated exclusively by its own execution task through its [`JobHandle`],
//! and status-polling readers always take full-copy snapshots.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use crate::config::JobOptions;
use crate::error::{Error, Result};
use crate::executor::ProgressSink;
use crate::types::{DownloadJob, JobId, JobSnapshot, JobStatus, LogLevel};

/// Shared handle to one job's mutable state
///
/// All access goes through short closures; the inner lock is never held
/// across an await point.
#[derive(Clone)]
pub struct JobHandle {
    inner: Arc<RwLock<DownloadJob>>,
    id: JobId,
}

impl JobHandle {
    fn new(job: DownloadJob) -> Self {
        let id = job.id;
        Self {
            inner: Arc::new(RwLock::new(job)),
            id,
        }
    }

    /// The job's id
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Run a closure against the job's mutable state
    pub fn update<R>(&self, f: impl FnOnce(&mut DownloadJob) -> R) -> R {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    /// Current job status
    pub fn status(&self) -> JobStatus {
        self.read(|job| job.status)
    }

    /// Full-copy snapshot for status-polling callers
    pub fn snapshot(&self) -> JobSnapshot {
        self.read(DownloadJob::snapshot)
    }

    fn read<R>(&self, f: impl FnOnce(&DownloadJob) -> R) -> R {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&guard)
    }
}

// Executor log lines land directly in the job's bounded log
impl ProgressSink for JobHandle {
    fn log(&self, level: LogLevel, message: String) {
        self.update(|job| job.add_log(level, message));
    }
}

/// Registry of all known jobs
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobHandle>>,
    next_id: AtomicI64,
}

impl JobRegistry {
    /// Create an empty registry; ids start at 1
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Allocate an id and insert a new job in the `Initializing` state
    pub fn create(&self, source_url: &str, options: JobOptions) -> JobHandle {
        let id = JobId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let handle = JobHandle::new(DownloadJob::new(id, source_url, options));
        self.lock_map_mut().insert(id, handle.clone());
        handle
    }

    /// Look up a job by id
    pub fn get(&self, id: JobId) -> Option<JobHandle> {
        self.lock_map().get(&id).cloned()
    }

    /// Snapshot one job
    pub fn snapshot(&self, id: JobId) -> Option<JobSnapshot> {
        self.get(id).map(|handle| handle.snapshot())
    }

    /// Snapshot every job, newest-first by start time
    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<JobSnapshot> = self
            .lock_map()
            .values()
            .map(JobHandle::snapshot)
            .collect();
        snapshots.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then(b.job_id.cmp(&a.job_id))
        });
        snapshots
    }

    /// Remove a terminal job from the registry
    ///
    /// Fails with [`Error::Conflict`] while the job is still running and
    /// [`Error::NotFound`] when the id is unknown.
    pub fn clear(&self, id: JobId) -> Result<()> {
        let mut jobs = self.lock_map_mut();
        let status = jobs
            .get(&id)
            .map(JobHandle::status)
            .ok_or_else(|| Error::NotFound(format!("job {id}")))?;
        if !status.is_terminal() {
            return Err(Error::Conflict(format!("job {id} is still running")));
        }
        jobs.remove(&id);
        Ok(())
    }

    /// Number of registered jobs
    pub fn len(&self) -> usize {
        self.lock_map().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.lock_map().is_empty()
    }

    fn lock_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<JobId, JobHandle>> {
        self.jobs
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_map_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<JobId, JobHandle>> {
        self.jobs
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_jobs(count: usize) -> (JobRegistry, Vec<JobHandle>) {
        let registry = JobRegistry::new();
        let handles = (0..count)
            .map(|i| {
                registry.create(
                    &format!("https://example.invalid/watch/show-{i}"),
                    JobOptions::default(),
                )
            })
            .collect();
        (registry, handles)
    }

    #[test]
    fn ids_are_allocated_monotonically_from_one() {
        let (_registry, handles) = registry_with_jobs(3);
        let ids: Vec<i64> = handles.iter().map(|h| h.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn get_returns_the_inserted_job() {
        let (registry, handles) = registry_with_jobs(1);
        let handle = registry.get(handles[0].id()).unwrap();
        assert_eq!(
            handle.snapshot().source_url,
            "https://example.invalid/watch/show-0"
        );
        assert!(registry.get(JobId::new(99)).is_none());
    }

    #[test]
    fn snapshots_are_newest_first() {
        let (registry, handles) = registry_with_jobs(3);
        // Same start instant is possible; the id tie-break keeps order stable
        let snapshots = registry.snapshots();
        assert_eq!(snapshots.len(), 3);
        assert!(
            snapshots[0].job_id >= snapshots[1].job_id
                && snapshots[1].job_id >= snapshots[2].job_id,
            "listing must be newest-first"
        );
        assert_eq!(snapshots[0].job_id, handles[2].id());
    }

    #[test]
    fn clear_refuses_running_jobs() {
        let (registry, handles) = registry_with_jobs(1);
        let err = registry.clear(handles[0].id()).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "got {err:?}");
        assert_eq!(registry.len(), 1, "the job must remain registered");
    }

    #[test]
    fn clear_removes_terminal_jobs() {
        let (registry, handles) = registry_with_jobs(1);
        handles[0].update(|job| job.transition(JobStatus::Failed));
        registry.clear(handles[0].id()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_unknown_id_is_not_found() {
        let (registry, _handles) = registry_with_jobs(1);
        let err = registry.clear(JobId::new(42)).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
    }

    #[test]
    fn handle_updates_are_visible_through_snapshots() {
        let (registry, handles) = registry_with_jobs(1);
        handles[0].update(|job| {
            job.anime_title = Some("Show".into());
            job.total_episodes = 12;
        });
        let snap = registry.snapshot(handles[0].id()).unwrap();
        assert_eq!(snap.anime_title.as_deref(), Some("Show"));
        assert_eq!(snap.total_episodes, 12);
    }

    #[test]
    fn progress_sink_routes_into_the_job_log() {
        let (_registry, handles) = registry_with_jobs(1);
        ProgressSink::log(&handles[0], LogLevel::Warn, "tool warning".to_string());
        let snap = handles[0].snapshot();
        assert!(snap.logs.iter().any(|l| l.message == "tool warning"));
    }
}
