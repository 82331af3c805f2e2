//! Progress model: per-file byte counts aggregated into a percentage.
//!
//! A `ProgressDisplay` owns the files of one send batch. The file set is
//! locked by `init()`; adding files afterwards or initializing twice is a
//! caller bug and fails with a typed error rather than corrupting totals.

use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

/// One file whose upload progress is being tracked.
#[derive(Debug, Clone)]
pub struct ProgressFile {
    /// Process-wide monotonic identifier.
    pub id: u64,
    /// Base file name as reported by the selector.
    pub name: String,
    /// Total size in bytes.
    pub size: u64,
    /// Bytes transferred so far (0..=size).
    pub progress: u64,
}

impl ProgressFile {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            id: NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            size,
            progress: 0,
        }
    }
}

/// Misuse of the progress display API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    #[error("cannot add files to an initialized progress display")]
    AddAfterInit,
    #[error("progress display already initialized")]
    AlreadyInitialized,
    #[error("progress display not initialized")]
    NotInitialized,
    #[error("unknown progress file {0}")]
    UnknownFile(u64),
}

/// Pluggable sink that paints the aggregated percentage.
pub trait ProgressRenderer: Send {
    /// Renders the current percentage (0..=100).
    fn render(&mut self, percent: u8);
    /// Notifies that all uploads of the batch finished; renders 100.
    fn complete(&mut self);
}

/// Renderer that discards all output. Useful for tests and headless callers.
pub struct NullRenderer;

impl ProgressRenderer for NullRenderer {
    fn render(&mut self, _percent: u8) {}
    fn complete(&mut self) {}
}

/// Aggregates progress across the files belonging to one widget.
pub struct ProgressDisplay {
    files: Vec<ProgressFile>,
    total_size: u64,
    initialized: bool,
    renderer: Box<dyn ProgressRenderer>,
}

impl ProgressDisplay {
    pub fn new(renderer: Box<dyn ProgressRenderer>) -> Self {
        Self {
            files: Vec::new(),
            total_size: 0,
            initialized: false,
            renderer,
        }
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Files in insertion order (= display order).
    pub fn files(&self) -> &[ProgressFile] {
        &self.files
    }

    /// Adds a file to the batch. Fails once the display is initialized.
    pub fn add(&mut self, file: ProgressFile) -> Result<(), ProgressError> {
        if self.initialized {
            return Err(ProgressError::AddAfterInit);
        }
        self.files.push(file);
        Ok(())
    }

    /// Locks the file set and fixes `total_size`. Fails if called twice.
    pub fn init(&mut self) -> Result<(), ProgressError> {
        if self.initialized {
            return Err(ProgressError::AlreadyInitialized);
        }
        self.initialized = true;
        self.total_size = self.files.iter().map(|f| f.size).sum();
        Ok(())
    }

    /// Total bytes transferred across all tracked files.
    pub fn total_progress(&self) -> u64 {
        self.files.iter().map(|f| f.progress).sum()
    }

    /// Combined size of the batch, fixed at init time.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Records progress for the file with the given id.
    pub fn set_progress(&mut self, file_id: u64, bytes: u64) -> Result<(), ProgressError> {
        let file = self
            .files
            .iter_mut()
            .find(|f| f.id == file_id)
            .ok_or(ProgressError::UnknownFile(file_id))?;
        file.progress = bytes.min(file.size);
        Ok(())
    }

    /// Records progress for the file at the given batch index.
    pub fn set_progress_at(&mut self, index: usize, bytes: u64) -> Result<(), ProgressError> {
        let file = self
            .files
            .get_mut(index)
            .ok_or(ProgressError::UnknownFile(index as u64))?;
        file.progress = bytes.min(file.size);
        Ok(())
    }

    /// Recomputes the percentage and re-renders. Requires `init()` first.
    pub fn update(&mut self) -> Result<u8, ProgressError> {
        if !self.initialized {
            return Err(ProgressError::NotInitialized);
        }
        let percent = if self.total_size == 0 {
            100
        } else {
            (100.0 * self.total_progress() as f64 / self.total_size as f64).round() as u8
        };
        self.renderer.render(percent);
        Ok(percent)
    }

    /// Notifies the renderer that all uploads of the batch finished.
    pub fn complete(&mut self) {
        self.renderer.complete();
    }

    /// Clears the file set for the next send batch, keeping the renderer.
    pub fn reset(&mut self) {
        self.files.clear();
        self.total_size = 0;
        self.initialized = false;
    }
}
