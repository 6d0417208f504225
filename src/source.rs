//! Snapshot sources for the binary.
//!
//! The registry lives in another process; it writes snapshots as JSON and
//! this binary picks them up and reports them.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{bail, Context, Result};

use cwreport_types::{SchemaVersion, Snapshot};

/// Trait for receiving registry snapshots.
pub trait SnapshotSource: Send + Debug {
    /// Poll for the latest snapshot.
    ///
    /// Returns `Some(snapshot)` if new data is available, `None` otherwise.
    fn poll(&mut self) -> Option<Snapshot>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;

    /// Returns the error message if the last poll failed.
    fn error(&self) -> Option<&str>;
}

/// Reads snapshots from a JSON file.
///
/// The source tracks the file's modification time and only returns
/// new data when the file has been updated.
#[derive(Debug)]
pub struct SnapshotFileSource {
    path: PathBuf,
    description: String,
    last_error: Option<String>,
    last_modified: Option<SystemTime>,
}

impl SnapshotFileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            last_error: None,
            last_modified: None,
        }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file once, regardless of its modification time.
    pub fn load(&self) -> Result<Snapshot> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        parse_snapshot(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }
}

impl SnapshotSource for SnapshotFileSource {
    fn poll(&mut self) -> Option<Snapshot> {
        let current_modified = self.modified_time();

        let file_changed = match (&self.last_modified, &current_modified) {
            (None, _) => true,        // First poll, always read
            (Some(_), None) => false, // File disappeared, don't update
            (Some(last), Some(current)) => current > last,
        };
        if !file_changed {
            return None;
        }

        match self.load() {
            Ok(snapshot) => {
                self.last_error = None;
                self.last_modified = current_modified;
                Some(snapshot)
            }
            Err(e) => {
                self.last_error = Some(format!("{:#}", e));
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Parse a snapshot, rejecting an incompatible schema version.
pub fn parse_snapshot(content: &str) -> Result<Snapshot> {
    let snapshot: Snapshot = serde_json::from_str(content).context("Parse error")?;
    if !snapshot.version.is_compatible() {
        bail!(
            "Incompatible snapshot schema version {} (expected {})",
            snapshot.version,
            SchemaVersion::current()
        );
    }
    Ok(snapshot)
}
