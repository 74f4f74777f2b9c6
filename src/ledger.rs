// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::VecDeque;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::Error;
use crate::ErrorKind;

/// Where the bytes of a flush ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The path was already tracked; the bytes were appended to it.
    Appended,
    /// A new file was created and tracked.
    Created,
    /// The ledger was full. The oldest tracked file was renamed to the new path and overwritten.
    ///
    /// `renamed` is false when the rename failed; the new path was then created fresh and the
    /// old file stays on disk untracked.
    Rotated {
        /// The path that was evicted from the ledger.
        evicted: PathBuf,
        /// Whether the rename succeeded.
        renamed: bool,
    },
    /// The ledger has no capacity, nothing was written.
    Skipped,
}

/// A bounded, ordered set of log files that have been materialized on disk.
///
/// When full, the oldest file is reused under the new name via rename, so the number of files
/// stays bounded while the most recent identities keep a file each. Renaming requires the old and
/// new paths to live on the same filesystem.
#[derive(Debug)]
pub struct FileLedger {
    capacity: AtomicUsize,
    paths: Mutex<VecDeque<PathBuf>>,
}

impl FileLedger {
    /// Create an empty ledger tracking at most `capacity` files.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: AtomicUsize::new(capacity),
            paths: Mutex::new(VecDeque::new()),
        }
    }

    /// The maximum number of tracked files.
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Change the maximum number of tracked files.
    ///
    /// When shrinking, files beyond the new capacity are removed on the next rotation.
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.tracked().len()
    }

    /// Whether no file is tracked.
    pub fn is_empty(&self) -> bool {
        self.tracked().is_empty()
    }

    /// Whether the path is tracked.
    pub fn contains(&self, path: &Path) -> bool {
        self.tracked().iter().any(|p| p == path)
    }

    /// Tracked paths, oldest first.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.tracked().iter().cloned().collect()
    }

    /// Write `bytes` to `path`, creating, appending or rotating as the ledger state requires.
    ///
    /// Each file operation is attempted once. The ledger is updated as soon as a file exists
    /// under the new path, so it reflects the disk even when the write itself fails. Non-fatal
    /// problems, such as a failed rename, are logged as warnings once the ledger is unlocked.
    pub fn place(&self, path: &Path, bytes: &[u8]) -> Result<Placement, Error> {
        let mut warnings = vec![];
        let placed = self.place_deferred(path, bytes, &mut warnings);
        log_placement(path, &placed, warnings);
        placed
    }

    /// Same as [`place`](Self::place), but non-fatal problems are collected into `warnings`
    /// for the caller to log after releasing its own locks.
    pub(crate) fn place_deferred(
        &self,
        path: &Path,
        bytes: &[u8],
        warnings: &mut Vec<Error>,
    ) -> Result<Placement, Error> {
        let mut paths = self.tracked();

        if paths.iter().any(|p| p == path) {
            let mut file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .map_err(|err| io_error("failed to open log file", path, err))?;
            write_to(&mut file, path, bytes)?;
            return Ok(Placement::Appended);
        }

        let capacity = self.capacity();
        if capacity == 0 {
            return Ok(Placement::Skipped);
        }

        if paths.len() < capacity {
            create_parent_dir(path)?;
            let mut file = create(path)?;
            paths.push_back(path.to_path_buf());
            write_to(&mut file, path, bytes)?;
            return Ok(Placement::Created);
        }

        create_parent_dir(path)?;
        let Some(evicted) = paths.pop_front() else {
            unreachable!("a full ledger with non-zero capacity is never empty");
        };
        let renamed = match fs::rename(&evicted, path) {
            Ok(()) => true,
            Err(err) => {
                warnings.push(
                    Error::new(ErrorKind::Rename, "failed to rename oldest log file")
                        .with_context("from", evicted.display())
                        .with_context("to", path.display())
                        .with_source(err),
                );
                false
            }
        };
        paths.push_back(path.to_path_buf());

        while paths.len() > capacity {
            if let Some(excess) = paths.pop_front() {
                if let Err(err) = fs::remove_file(&excess) {
                    warnings.push(io_error(
                        "failed to remove log file beyond capacity",
                        &excess,
                        err,
                    ));
                }
            }
        }

        let mut file = create(path)?;
        write_to(&mut file, path, bytes)?;
        Ok(Placement::Rotated { evicted, renamed })
    }

    /// Stop tracking every file. Files on disk are left alone.
    pub fn clear(&self) {
        self.tracked().clear();
    }

    fn tracked(&self) -> MutexGuard<'_, VecDeque<PathBuf>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn io_error(message: &'static str, path: &Path, err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io, message)
        .with_context("path", path.display())
        .with_source(err)
}

fn create_parent_dir(path: &Path) -> Result<(), Error> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .map_err(|err| io_error("failed to create log directory", dir, err)),
        _ => Ok(()),
    }
}

fn create(path: &Path) -> Result<File, Error> {
    File::create(path).map_err(|err| io_error("failed to create log file", path, err))
}

fn write_to(file: &mut File, path: &Path, bytes: &[u8]) -> Result<(), Error> {
    file.write_all(bytes)
        .map_err(|err| io_error("failed to write log file", path, err))
}

pub(crate) fn log_placement(
    path: &Path,
    placed: &Result<Placement, Error>,
    warnings: Vec<Error>,
) {
    for warning in warnings {
        log::warn!(target: "logforth_buffer", "{warning}");
    }
    if let Ok(Placement::Skipped) = placed {
        let path = path.to_string_lossy().into_owned();
        log::warn!(
            target: "logforth_buffer",
            path = path.as_str();
            "file ledger has no capacity, skip writing log file"
        );
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_create_then_append_same_path() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let ledger = FileLedger::new(2);
        let path = dir.path().join("a.log");

        assert_eq!(ledger.place(&path, b"one\n").unwrap(), Placement::Created);
        assert_eq!(ledger.place(&path, b"two\n").unwrap(), Placement::Appended);

        assert_eq!(read(&path), "one\ntwo\n");
        assert_eq!(ledger.paths(), vec![path]);
    }

    #[test]
    fn test_full_ledger_renames_oldest() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let ledger = FileLedger::new(1);
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");

        ledger.place(&a, b"from a\n").unwrap();
        let placement = ledger.place(&b, b"from b\n").unwrap();

        assert_eq!(
            placement,
            Placement::Rotated {
                evicted: a.clone(),
                renamed: true
            }
        );
        assert!(!a.exists());
        assert_eq!(read(&b), "from b\n");
        assert_eq!(ledger.paths(), vec![b]);
    }

    #[test]
    fn test_failed_rename_still_writes_new_path() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let ledger = FileLedger::new(1);
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");

        ledger.place(&a, b"from a\n").unwrap();
        fs::remove_file(&a).unwrap();
        let placement = ledger.place(&b, b"from b\n").unwrap();

        assert_eq!(
            placement,
            Placement::Rotated {
                evicted: a,
                renamed: false
            }
        );
        assert_eq!(read(&b), "from b\n");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_failed_rename_is_collected_not_logged_under_lock() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let ledger = FileLedger::new(1);
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");

        ledger.place(&a, b"from a\n").unwrap();
        fs::remove_file(&a).unwrap();
        let mut warnings = vec![];
        let placement = ledger.place_deferred(&b, b"from b\n", &mut warnings).unwrap();

        assert!(matches!(placement, Placement::Rotated { renamed: false, .. }));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind(), ErrorKind::Rename);
        assert!(warnings[0].context("from").is_some());
    }

    #[test]
    fn test_zero_capacity_skips() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let ledger = FileLedger::new(0);
        let path = dir.path().join("a.log");

        assert_eq!(ledger.place(&path, b"x").unwrap(), Placement::Skipped);
        assert!(!path.exists());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_shrinking_removes_excess_files_on_rotation() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let ledger = FileLedger::new(3);
        let names = ["a", "b", "c"].map(|n| dir.path().join(format!("{n}.log")));
        for path in &names {
            ledger.place(path, b"x\n").unwrap();
        }

        ledger.set_capacity(1);
        let d = dir.path().join("d.log");
        ledger.place(&d, b"d\n").unwrap();

        assert_eq!(ledger.paths(), vec![d.clone()]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(read(&d), "d\n");
    }

    #[test]
    fn test_creates_missing_prefix_directory() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let ledger = FileLedger::new(1);
        let path = dir.path().join("nested").join("svc.log");

        ledger.place(&path, b"x\n").unwrap();
        assert_eq!(read(&path), "x\n");
    }

    #[test]
    fn test_unwritable_path_is_an_io_error() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let ledger = FileLedger::new(1);
        // a directory cannot be opened as a file
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();

        let err = ledger.place(&path, b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.context("path").is_some());
        assert!(ledger.is_empty());
    }
}
