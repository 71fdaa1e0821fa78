use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::source::SourceId;
use crate::utils::generate_unique_filename;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedKind {
    Raw,
    Audio,
}

/// A temporary file created while a job runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub kind: StagedKind,
}

/// Private staging directory owned by one job.
///
/// Every file the job creates is registered here and removed by
/// [`StagingArea::cleanup`]. If the area is dropped without cleanup the
/// directory is still removed by `TempDir`.
pub struct StagingArea {
    dir: TempDir,
    files: Vec<StagedFile>,
}

impl StagingArea {
    /// Create a uniquely named directory under `root`
    pub fn create(root: &Path) -> std::io::Result<Self> {
        fs_err::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix("vidscribe-job-")
            .tempdir_in(root)?;

        Ok(Self {
            dir,
            files: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Destination for the downloaded source file.
    ///
    /// Always named `.mp4` since ffmpeg probes the real container. A download
    /// therefore never takes the transcoder's audio-extension fallback.
    pub fn raw_path(&self, source_id: &SourceId) -> PathBuf {
        self.dir
            .path()
            .join(generate_unique_filename(source_id.as_str(), "mp4"))
    }

    pub fn register(&mut self, path: PathBuf, kind: StagedKind) {
        if !self.files.iter().any(|file| file.path == path) {
            self.files.push(StagedFile { path, kind });
        }
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    /// Remove every staged file and the directory itself, ignoring failures
    pub fn cleanup(self) {
        for file in &self.files {
            match std::fs::remove_file(&file.path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!(error = %e, path = %file.path.display(), kind = ?file.kind, "Could not remove staged file");
                }
            }
        }

        let dir = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::debug!(error = %e, path = %dir.display(), "Could not remove staging directory");
        }
    }
}
