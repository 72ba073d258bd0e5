//! Background thread for exports.
//!
//! `ExportWorker` owns a thread that runs export jobs one after another so
//! the editing thread never blocks on serialization or disk writes. Each job
//! works on its own [`ProjectSnapshot`], so edits made while a job runs do
//! not affect its output.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::ExportSettings;
use crate::format::error::FormatError;
use crate::format::output::CancelToken;
use crate::format::registry::FormatRegistry;
use crate::format::snapshot::ProjectSnapshot;
use crate::format::traits::{ExportOptions, ExportResult};

/// Identifier of a submitted export job.
pub type JobId = u64;

/// An export request.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Format id, e.g. "yolo"
    pub format_id: String,
    /// Annotations to write
    pub snapshot: ProjectSnapshot,
    /// Output directory
    pub output_dir: PathBuf,
    /// Naming options
    pub options: ExportOptions,
}

impl ExportJob {
    /// Job in the configured default format with the configured naming.
    pub fn with_settings(
        snapshot: ProjectSnapshot,
        output_dir: impl Into<PathBuf>,
        settings: &ExportSettings,
    ) -> Self {
        Self {
            format_id: settings.default_format.clone(),
            snapshot,
            output_dir: output_dir.into(),
            options: ExportOptions::from(settings),
        }
    }
}

/// Outcome of a job, delivered through [`ExportWorker::try_recv`].
#[derive(Debug)]
pub enum ExportEvent {
    /// Every artifact was committed
    Finished { job: JobId, result: ExportResult },
    /// Nothing was committed
    Failed { job: JobId, error: FormatError },
    /// Cancelled before commit, nothing was written
    Cancelled { job: JobId },
}

impl ExportEvent {
    pub fn job(&self) -> JobId {
        match self {
            ExportEvent::Finished { job, .. }
            | ExportEvent::Failed { job, .. }
            | ExportEvent::Cancelled { job } => *job,
        }
    }
}

/// Message sent to the worker thread.
enum ThreadMessage {
    /// Run an export
    Export {
        id: JobId,
        job: Box<ExportJob>,
        cancel: CancelToken,
    },
    /// Shutdown the thread
    Shutdown,
}

/// Manages a background thread that runs exports.
pub struct ExportWorker {
    /// Sender for requests to the background thread
    request_tx: Sender<ThreadMessage>,
    /// Receiver for outcomes from the background thread
    event_rx: Receiver<ExportEvent>,
    /// Handle to the background thread (for joining on drop)
    thread_handle: Option<JoinHandle<()>>,
    /// Counter for generating job IDs
    next_id: JobId,
    /// Cancel tokens of jobs without a delivered outcome
    pending: HashMap<JobId, CancelToken>,
}

impl ExportWorker {
    /// Spawn a new export thread.
    ///
    /// Returns `Err` if the thread fails to spawn.
    pub fn spawn() -> Result<Self, FormatError> {
        let (request_tx, request_rx) = mpsc::channel::<ThreadMessage>();
        let (event_tx, event_rx) = mpsc::channel::<ExportEvent>();

        let thread_handle = thread::Builder::new()
            .name("annotation-export".to_string())
            .spawn(move || {
                log::info!("Export thread started");
                Self::thread_loop(request_rx, event_tx);
                log::info!("Export thread exiting");
            })?;

        Ok(Self {
            request_tx,
            event_rx,
            thread_handle: Some(thread_handle),
            next_id: 1,
            pending: HashMap::new(),
        })
    }

    /// Background thread main loop.
    fn thread_loop(request_rx: Receiver<ThreadMessage>, event_tx: Sender<ExportEvent>) {
        let registry = FormatRegistry::new();
        loop {
            match request_rx.recv() {
                Ok(ThreadMessage::Export { id, job, cancel }) => {
                    let event = Self::run(&registry, id, &job, &cancel);
                    if event_tx.send(event).is_err() {
                        log::warn!("Event channel closed, export thread exiting");
                        break;
                    }
                }
                Ok(ThreadMessage::Shutdown) => {
                    log::debug!("Received shutdown signal");
                    break;
                }
                Err(_) => {
                    log::debug!("Request channel closed, export thread exiting");
                    break;
                }
            }
        }
    }

    fn run(registry: &FormatRegistry, id: JobId, job: &ExportJob, cancel: &CancelToken) -> ExportEvent {
        log::debug!("Running export job {} ({})", id, job.format_id);
        match registry.export(
            &job.format_id,
            &job.snapshot,
            &job.output_dir,
            &job.options,
            cancel,
        ) {
            Ok(result) => ExportEvent::Finished { job: id, result },
            Err(FormatError::Cancelled) => {
                log::info!("Export job {} cancelled", id);
                ExportEvent::Cancelled { job: id }
            }
            Err(error) => {
                log::error!("Export job {} failed: {}", id, error);
                ExportEvent::Failed { job: id, error }
            }
        }
    }

    /// Queue an export. Jobs run in submission order.
    pub fn submit(&mut self, job: ExportJob) -> Result<JobId, FormatError> {
        let id = self.next_id;
        self.next_id += 1;

        let cancel = CancelToken::new();
        let message = ThreadMessage::Export {
            id,
            job: Box::new(job),
            cancel: cancel.clone(),
        };
        self.request_tx.send(message).map_err(|_| {
            FormatError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "export thread is not running",
            ))
        })?;

        self.pending.insert(id, cancel);
        log::debug!("Submitted export job {}", id);
        Ok(id)
    }

    /// Request cancellation of a job. Returns false if the job already
    /// delivered its outcome or never existed.
    pub fn cancel(&self, job: JobId) -> bool {
        match self.pending.get(&job) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Take one outcome without blocking.
    pub fn try_recv(&mut self) -> Option<ExportEvent> {
        match self.event_rx.try_recv() {
            Ok(event) => {
                self.pending.remove(&event.job());
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Export thread disconnected");
                None
            }
        }
    }

    /// Wait up to `timeout` for the next outcome.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<ExportEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.pending.remove(&event.job());
                Some(event)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("Export thread disconnected");
                None
            }
        }
    }

    /// Get the number of jobs without a delivered outcome.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for ExportWorker {
    fn drop(&mut self) {
        log::debug!("Shutting down export thread");

        for token in self.pending.values() {
            token.cancel();
        }
        let _ = self.request_tx.send(ThreadMessage::Shutdown);

        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Export thread panicked: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, BoxGeometry, ClassRegistry, VideoInfo};
    use std::collections::BTreeMap;

    const WAIT: Duration = Duration::from_secs(10);

    fn job(format_id: &str, output_dir: PathBuf) -> ExportJob {
        let mut frames = BTreeMap::new();
        frames.insert(
            1,
            vec![BoundingBox::new(1, 0, BoxGeometry::new(0.5, 0.5, 0.25, 0.25))],
        );
        ExportJob {
            format_id: format_id.to_string(),
            snapshot: ProjectSnapshot::new(
                VideoInfo::new("clip.mp4", 640, 480, 10, 30.0),
                ClassRegistry::new(),
                frames,
            ),
            output_dir,
            options: ExportOptions::new(),
        }
    }

    #[test]
    fn test_export_runs_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let mut worker = ExportWorker::spawn().unwrap();

        let id = worker.submit(job("yolo", dir.path().to_path_buf())).unwrap();
        assert_eq!(worker.pending_count(), 1);

        match worker.recv_timeout(WAIT) {
            Some(ExportEvent::Finished { job, result }) => {
                assert_eq!(job, id);
                assert_eq!(result.boxes_exported, 1);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(worker.pending_count(), 0);
        assert!(dir.path().join("labels").join("frame_000001.txt").exists());
    }

    #[test]
    fn test_job_from_settings_uses_default_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut worker = ExportWorker::spawn().unwrap();
        let settings = ExportSettings {
            default_format: "coco".to_string(),
            ..ExportSettings::default()
        };
        let snapshot = job("yolo", PathBuf::new()).snapshot;

        worker
            .submit(ExportJob::with_settings(snapshot, dir.path(), &settings))
            .unwrap();

        assert!(matches!(
            worker.recv_timeout(WAIT),
            Some(ExportEvent::Finished { .. })
        ));
        assert!(dir.path().join("annotations.json").exists());
    }

    #[test]
    fn test_unknown_format_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut worker = ExportWorker::spawn().unwrap();

        worker.submit(job("labelme", dir.path().to_path_buf())).unwrap();

        assert!(matches!(
            worker.recv_timeout(WAIT),
            Some(ExportEvent::Failed {
                error: FormatError::UnknownFormat { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_jobs_complete_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut worker = ExportWorker::spawn().unwrap();

        let first = worker.submit(job("voc", dir.path().join("voc"))).unwrap();
        let second = worker.submit(job("coco", dir.path().join("coco"))).unwrap();

        assert_eq!(worker.recv_timeout(WAIT).map(|e| e.job()), Some(first));
        assert_eq!(worker.recv_timeout(WAIT).map(|e| e.job()), Some(second));
        assert!(dir.path().join("coco").join("annotations.json").exists());
    }

    #[test]
    fn test_cancel_unknown_job() {
        let worker = ExportWorker::spawn().unwrap();
        assert!(!worker.cancel(42));
    }
}
