use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, SubtransError};

/// Progress milestones reported while a video is processed
pub mod progress {
    pub const EXTRACTED: u8 = 10;
    pub const TRANSCRIBED: u8 = 30;
    pub const TRANSLATED: u8 = 60;
    pub const RETIMED: u8 = 75;
    pub const SUBTITLES_WRITTEN: u8 = 80;
    pub const ATTACHED: u8 = 90;
    pub const DONE: u8 = 100;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub source: PathBuf,
    pub status: JobStatus,
    /// 0 to 100
    pub progress: u8,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub outputs: Vec<PathBuf>,
}

/// In-memory job registry shared between the workflow and its callers
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
    /// Finished jobs older than this are dropped whenever a job is created
    retention: Option<Duration>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            retention: Some(retention),
            ..Self::default()
        }
    }

    /// Register a new queued job for `source`
    pub fn create<P: Into<PathBuf>>(&self, source: P) -> Result<Uuid> {
        if let Some(retention) = self.retention {
            self.collect_garbage(retention)?;
        }

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            source: source.into(),
            status: JobStatus::Queued,
            progress: 0,
            message: "Queued".to_string(),
            created_at: now,
            updated_at: now,
            outputs: Vec::new(),
        };
        let id = job.id;
        debug!("Job {} created for {}", id, job.source.display());
        self.write()?.insert(id, job);
        Ok(id)
    }

    /// Record progress; the job moves to `Processing`.
    ///
    /// Rejected once the job is completed or failed. Progress never goes backwards.
    pub fn update(&self, id: Uuid, progress: u8, message: &str) -> Result<()> {
        self.modify(id, |job| {
            job.status = JobStatus::Processing;
            job.progress = job.progress.max(progress.min(progress::DONE));
            job.message = message.to_string();
        })?;
        debug!("Job {}: {}% {}", id, progress, message);
        Ok(())
    }

    pub fn complete(&self, id: Uuid, outputs: Vec<PathBuf>) -> Result<()> {
        self.modify(id, |job| {
            job.status = JobStatus::Completed;
            job.progress = progress::DONE;
            job.message = "Completed".to_string();
            job.outputs = outputs;
        })?;
        info!("Job {} completed", id);
        Ok(())
    }

    pub fn fail(&self, id: Uuid, message: &str) -> Result<()> {
        self.modify(id, |job| {
            job.status = JobStatus::Failed;
            job.message = message.to_string();
        })?;
        info!("Job {} failed: {}", id, message);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.read()?.get(&id).cloned())
    }

    /// All jobs, oldest first
    pub fn list(&self) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self.read()?.values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }

    /// Remove finished jobs not updated within `retention`; returns how many were removed
    pub fn collect_garbage(&self, retention: Duration) -> Result<usize> {
        let cutoff = Utc::now() - retention;
        let mut jobs = self.write()?;
        let before = jobs.len();
        jobs.retain(|_, job| !(job.status.is_terminal() && job.updated_at < cutoff));
        let removed = before - jobs.len();
        if removed > 0 {
            info!("Removed {} expired jobs", removed);
        }
        Ok(removed)
    }

    fn modify<F: FnOnce(&mut Job)>(&self, id: Uuid, change: F) -> Result<()> {
        let mut jobs = self.write()?;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| SubtransError::Job(format!("Unknown job {}", id)))?;
        if job.status.is_terminal() {
            return Err(SubtransError::Job(format!(
                "Job {} is already {:?}",
                id, job.status
            )));
        }
        change(job);
        job.updated_at = Utc::now();
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<Uuid, Job>>> {
        self.jobs
            .read()
            .map_err(|_| SubtransError::Job("Job store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Job>>> {
        self.jobs
            .write()
            .map_err(|_| SubtransError::Job("Job store lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle() {
        let store = JobStore::new();
        let id = store.create("video.mp4").unwrap();

        let job = store.get(id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);

        store.update(id, progress::EXTRACTED, "Extracting audio...").unwrap();
        store.update(id, progress::TRANSCRIBED, "Transcribing...").unwrap();
        let job = store.get(id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 30);

        store.complete(id, vec![PathBuf::from("out.mp4")]).unwrap();
        let job = store.get(id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.outputs, vec![PathBuf::from("out.mp4")]);
    }

    #[test]
    fn test_terminal_jobs_reject_updates() {
        let store = JobStore::new();
        let id = store.create("video.mp4").unwrap();
        store.fail(id, "ffmpeg missing").unwrap();

        assert!(store.update(id, 50, "late").is_err());
        assert!(store.complete(id, vec![]).is_err());

        let job = store.get(id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.message, "ffmpeg missing");
    }

    #[test]
    fn test_progress_is_monotonic() {
        let store = JobStore::new();
        let id = store.create("video.mp4").unwrap();
        store.update(id, 60, "translating").unwrap();
        store.update(id, 10, "stale").unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().progress, 60);
    }

    #[test]
    fn test_unknown_job() {
        let store = JobStore::new();
        assert!(store.get(Uuid::new_v4()).unwrap().is_none());
        assert!(store.update(Uuid::new_v4(), 10, "x").is_err());
    }

    #[test]
    fn test_collect_garbage_keeps_active_jobs() {
        let store = JobStore::new();
        let active = store.create("a.mp4").unwrap();
        let finished = store.create("b.mp4").unwrap();
        store.update(active, 10, "working").unwrap();
        store.complete(finished, vec![]).unwrap();

        assert_eq!(store.collect_garbage(Duration::hours(1)).unwrap(), 0);
        assert_eq!(store.collect_garbage(Duration::seconds(-1)).unwrap(), 1);

        let remaining = store.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, active);
    }

    #[test]
    fn test_create_expires_old_finished_jobs() {
        let store = JobStore::with_retention(Duration::zero());
        let finished = store.create("a.mp4").unwrap();
        let active = store.create("b.mp4").unwrap();
        store.complete(finished, vec![]).unwrap();
        store.update(active, 10, "working").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        let fresh = store.create("c.mp4").unwrap();

        let ids: Vec<Uuid> = store.list().unwrap().iter().map(|job| job.id).collect();
        assert!(!ids.contains(&finished));
        assert!(ids.contains(&active));
        assert!(ids.contains(&fresh));
    }

    #[test]
    fn test_create_keeps_recent_finished_jobs() {
        let store = JobStore::with_retention(Duration::hours(24));
        let finished = store.create("a.mp4").unwrap();
        store.complete(finished, vec![]).unwrap();
        store.create("b.mp4").unwrap();

        assert!(store.get(finished).unwrap().is_some());
    }
}
