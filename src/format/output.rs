//! Atomic writing of export artifacts.
//!
//! Artifacts are rendered in memory, written into a hidden staging directory
//! next to their destination and only then renamed into place. Files being
//! replaced are parked in the staging directory until every rename has
//! succeeded. A failed or cancelled export puts them back and leaves the
//! destination as it was.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::format::error::FormatError;

const STAGING_PREFIX: &str = ".export-staging-";

/// Shared flag used to abandon a running export.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Exports check the flag between frames.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`FormatError::Cancelled`] once cancellation was requested.
    pub fn check(&self) -> Result<(), FormatError> {
        if self.is_cancelled() {
            Err(FormatError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One output file, named relative to the export directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub contents: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Replace `path` with `bytes` in one rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write `artifacts` into `output_dir`, all or nothing.
///
/// Cancellation is honored until every artifact is staged. If a rename into
/// place fails, the artifacts already moved are taken back out and the files
/// they replaced are restored.
pub(crate) fn commit_artifacts(
    output_dir: &Path,
    artifacts: &[Artifact],
    cancel: &CancelToken,
) -> Result<Vec<PathBuf>, FormatError> {
    let created_dir = !output_dir.exists();
    let result = stage_and_commit(output_dir, artifacts, cancel);

    if result.is_err() && created_dir {
        // Only succeeds if nothing was committed.
        let _ = fs::remove_dir(output_dir);
    }
    result
}

/// Renames done so far, undone in reverse on failure.
#[derive(Debug, Default)]
struct CommitJournal {
    /// Committed target and where the file it replaced was moved.
    committed: Vec<(PathBuf, Option<PathBuf>)>,
    created_dirs: Vec<PathBuf>,
}

impl CommitJournal {
    fn create_parent(&mut self, target: &Path) -> io::Result<()> {
        let Some(parent) = target.parent() else {
            return Ok(());
        };
        let missing: Vec<PathBuf> = parent
            .ancestors()
            .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
            .map(Path::to_path_buf)
            .collect();
        fs::create_dir_all(parent)?;
        self.created_dirs.extend(missing);
        Ok(())
    }

    fn rollback(mut self) {
        while let Some((target, backup)) = self.committed.pop() {
            if let Err(e) = fs::remove_file(&target) {
                log::warn!("Rollback could not remove {:?}: {}", target, e);
            }
            if let Some(Err(e)) = backup.map(|backup| fs::rename(backup, &target)) {
                log::warn!("Rollback could not restore {:?}: {}", target, e);
            }
        }
        self.created_dirs
            .sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));
        for dir in &self.created_dirs {
            let _ = fs::remove_dir(dir);
        }
    }
}

fn stage_and_commit(
    output_dir: &Path,
    artifacts: &[Artifact],
    cancel: &CancelToken,
) -> Result<Vec<PathBuf>, FormatError> {
    fs::create_dir_all(output_dir)?;
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(output_dir)?;
    let new_dir = staging.path().join("new");
    let previous_dir = staging.path().join("previous");

    for artifact in artifacts {
        cancel.check()?;
        let staged = new_dir.join(&artifact.name);
        if let Some(parent) = staged.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&staged, &artifact.contents)?;
    }
    cancel.check()?;

    let mut journal = CommitJournal::default();
    for artifact in artifacts {
        let target = output_dir.join(&artifact.name);
        let backup = previous_dir.join(&artifact.name);
        if let Err(e) = commit_one(&mut journal, &new_dir.join(&artifact.name), &target, &backup)
        {
            log::warn!(
                "Commit of {:?} failed, rolling back {} artifacts: {}",
                target,
                journal.committed.len(),
                e
            );
            journal.rollback();
            return Err(e.into());
        }
    }

    let files_created: Vec<PathBuf> = journal
        .committed
        .into_iter()
        .map(|(target, _)| target)
        .collect();
    log::debug!(
        "Committed {} artifacts to {:?}",
        files_created.len(),
        output_dir
    );
    Ok(files_created)
}

/// Move one staged file into place, keeping whatever file it replaces.
///
/// Directories in the way are left alone so the rename fails.
fn commit_one(
    journal: &mut CommitJournal,
    staged: &Path,
    target: &Path,
    backup: &Path,
) -> io::Result<()> {
    journal.create_parent(target)?;

    let replaces_file = fs::symlink_metadata(target).is_ok_and(|meta| !meta.is_dir());
    let backup = if replaces_file {
        if let Some(parent) = backup.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(target, backup)?;
        Some(backup.to_path_buf())
    } else {
        None
    };

    if let Err(e) = fs::rename(staged, target) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, target);
        }
        return Err(e);
    }
    journal.committed.push((target.to_path_buf(), backup));
    Ok(())
}
