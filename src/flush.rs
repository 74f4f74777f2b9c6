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

use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use crate::BufferEntry;
use crate::Error;
use crate::ledger;
use crate::ledger::FileLedger;
use crate::ledger::Placement;

/// Whether a flush resets the dirty mark of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirtyPolicy {
    /// Once an entry has recorded an error, every later flush writes to disk, even when the
    /// buffer is empty at that time.
    #[default]
    Sticky,
    /// A successful write resets the entry to clean; later flushes discard until the next error.
    ClearOnFlush,
}

/// What a flush did with the buffered bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The entry was clean; the bytes were dropped without touching disk.
    Discarded,
    /// The entry was dirty; the bytes were handed to the file ledger.
    Written {
        /// The logical path of the entry.
        path: PathBuf,
        /// How the ledger placed the bytes.
        placement: Placement,
    },
}

/// Telemetry of a single flush.
#[derive(Debug, Clone)]
pub struct FlushReport {
    /// What happened to the bytes.
    pub outcome: FlushOutcome,
    /// Number of bytes taken out of the buffer.
    pub bytes: usize,
    /// Wall time spent in the flush.
    pub elapsed: Duration,
}

/// Decides whether a buffer entry is written to disk and drives the [`FileLedger`].
#[derive(Debug)]
pub struct FlushController {
    ledger: FileLedger,
    policy: DirtyPolicy,
}

impl FlushController {
    /// Create a controller whose ledger tracks at most `max_files` files.
    pub fn new(max_files: usize, policy: DirtyPolicy) -> Self {
        Self {
            ledger: FileLedger::new(max_files),
            policy,
        }
    }

    /// The ledger of materialized files.
    pub fn ledger(&self) -> &FileLedger {
        &self.ledger
    }

    /// The dirty policy in effect.
    pub fn policy(&self) -> DirtyPolicy {
        self.policy
    }

    /// Flush an entry.
    ///
    /// A clean entry has its buffer cleared without any file operation. A dirty entry has its
    /// buffer written to `{prefix}{service_name}{extra_info}.log` through the ledger, then
    /// cleared.
    ///
    /// The entry stays locked while its bytes are placed, so appends to this entry wait while
    /// appends to other entries do not. Warnings and telemetry are logged after the entry is
    /// unlocked.
    ///
    /// # Errors
    ///
    /// Return an [`ErrorKind::Io`](crate::ErrorKind::Io) error if the log file cannot be created,
    /// opened or written. The buffer is kept in that case.
    pub fn flush(&self, entry: &BufferEntry) -> Result<FlushReport, Error> {
        let start = Instant::now();
        let mut state = entry.state();

        if !state.dirty {
            let bytes = state.buffer.len();
            state.buffer.clear();
            drop(state);

            log::info!(
                target: "logforth_buffer",
                service_name = entry.service_name(),
                extra_info = entry.extra_info();
                "buffer cleared without flushing to file"
            );
            return Ok(FlushReport {
                outcome: FlushOutcome::Discarded,
                bytes,
                elapsed: start.elapsed(),
            });
        }

        let path = entry.path();
        let mut warnings = vec![];
        let placed = self
            .ledger
            .place_deferred(&path, &state.buffer, &mut warnings);
        let bytes = state.buffer.len();
        if placed.is_ok() {
            state.buffer.clear();
            if self.policy == DirtyPolicy::ClearOnFlush {
                state.dirty = false;
            }
        }
        drop(state);

        // logging may route back into this entry through a global logger
        ledger::log_placement(&path, &placed, warnings);
        let placement = placed?;

        let elapsed = start.elapsed();
        log::info!(
            target: "logforth_buffer",
            service_name = entry.service_name(),
            extra_info = entry.extra_info(),
            bytes = bytes,
            elapsed_us = elapsed.as_micros() as u64;
            "flushed buffer to file"
        );
        Ok(FlushReport {
            outcome: FlushOutcome::Written { path, placement },
            bytes,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::ErrorKind;

    fn prefix(dir: &TempDir) -> String {
        format!("{}/", dir.path().display())
    }

    #[test]
    fn test_clean_flush_touches_nothing() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let controller = FlushController::new(2, DirtyPolicy::Sticky);
        let entry = BufferEntry::new(prefix(&dir), "svc", "1");
        entry.write(b"info\n");

        let report = controller.flush(&entry).unwrap();

        assert_eq!(report.outcome, FlushOutcome::Discarded);
        assert_eq!(report.bytes, 5);
        assert!(entry.is_empty());
        assert!(controller.ledger().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_dirty_flush_writes_exact_bytes() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let controller = FlushController::new(2, DirtyPolicy::Sticky);
        let entry = BufferEntry::new(prefix(&dir), "svc", "1");
        entry.write(b"info\nerror\n");
        entry.mark_dirty();

        let report = controller.flush(&entry).unwrap();

        let path = dir.path().join("svc1.log");
        assert_eq!(
            report.outcome,
            FlushOutcome::Written {
                path: entry.path(),
                placement: Placement::Created
            }
        );
        assert_eq!(report.bytes, 11);
        assert_eq!(fs::read(&path).unwrap(), b"info\nerror\n");
        assert_eq!(controller.ledger().paths(), vec![entry.path()]);
        assert!(entry.is_empty());
    }

    #[test]
    fn test_sticky_dirty_rewrites_empty_buffer() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let controller = FlushController::new(2, DirtyPolicy::Sticky);
        let entry = BufferEntry::new(prefix(&dir), "svc", "");
        entry.write(b"error\n");
        entry.mark_dirty();
        controller.flush(&entry).unwrap();

        assert!(entry.is_dirty());
        let report = controller.flush(&entry).unwrap();
        assert_eq!(
            report.outcome,
            FlushOutcome::Written {
                path: entry.path(),
                placement: Placement::Appended
            }
        );
        assert_eq!(report.bytes, 0);

        entry.write(b"later info\n");
        controller.flush(&entry).unwrap();
        assert_eq!(
            fs::read_to_string(entry.path()).unwrap(),
            "error\nlater info\n"
        );
    }

    #[test]
    fn test_clear_on_flush_resets_dirty() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let controller = FlushController::new(2, DirtyPolicy::ClearOnFlush);
        let entry = BufferEntry::new(prefix(&dir), "svc", "");
        entry.write(b"error\n");
        entry.mark_dirty();
        controller.flush(&entry).unwrap();

        assert!(!entry.is_dirty());
        entry.write(b"info\n");
        let report = controller.flush(&entry).unwrap();
        assert_eq!(report.outcome, FlushOutcome::Discarded);
        assert_eq!(fs::read_to_string(entry.path()).unwrap(), "error\n");
    }

    #[test]
    fn test_io_failure_keeps_buffer() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let controller = FlushController::new(2, DirtyPolicy::Sticky);
        let entry = BufferEntry::new(prefix(&dir), "svc", "");
        fs::create_dir(entry.path()).unwrap();
        entry.write(b"error\n");
        entry.mark_dirty();

        let err = controller.flush(&entry).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(entry.contents(), b"error\n");
        assert!(entry.is_dirty());
    }
}
