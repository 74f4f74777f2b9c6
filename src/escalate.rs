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

//! Leveled recording helpers that escalate errors into the dirty mark and, for fatal and panic
//! levels, into a flush before the process goes down.

use std::error::Error as StdError;
use std::io::Write;

use crate::BufferEntry;
use crate::BufferedLogging;
use crate::StructuredLogger;

/// Record an informational message. The entry's dirty mark is left alone.
pub fn record_info<L>(logger: &L, msg: &str)
where
    L: StructuredLogger + ?Sized,
{
    logger.log_info(msg);
}

/// Record an error and mark the entry dirty, so its next flush writes to disk.
///
/// The entry is marked even when the logger's filters drop the record.
pub fn record_error<L>(entry: &BufferEntry, logger: &L, msg: &str, err: &dyn StdError)
where
    L: StructuredLogger + ?Sized,
{
    logger.log_error(msg, err);
    entry.mark_dirty();
}

impl BufferedLogging {
    /// Record an informational message. See [`record_info`].
    pub fn record_info<L>(&self, logger: &L, msg: &str)
    where
        L: StructuredLogger + ?Sized,
    {
        record_info(logger, msg);
    }

    /// Record an error and mark the entry dirty. See [`record_error`].
    pub fn record_error<L>(&self, entry: &BufferEntry, logger: &L, msg: &str, err: &dyn StdError)
    where
        L: StructuredLogger + ?Sized,
    {
        record_error(entry, logger, msg, err);
    }

    /// Record an error, flush the entry to disk, then terminate the process with status 1.
    ///
    /// The exit hook set on the builder runs after the flush; if it returns,
    /// [`std::process::exit`] is called. A failed flush is reported to stderr and does not
    /// prevent the exit.
    pub fn record_fatal<L>(
        &self,
        entry: &BufferEntry,
        logger: &L,
        msg: &str,
        err: &dyn StdError,
    ) -> !
    where
        L: StructuredLogger + ?Sized,
    {
        self.escalate(entry, logger, msg, err, "fatal");
        (self.exit)(1);
        std::process::exit(1)
    }

    /// Record an error, flush the entry to disk, then panic with `"{msg}: {err}"`.
    ///
    /// A failed flush is reported to stderr and does not prevent the panic.
    pub fn record_panic<L>(
        &self,
        entry: &BufferEntry,
        logger: &L,
        msg: &str,
        err: &dyn StdError,
    ) -> !
    where
        L: StructuredLogger + ?Sized,
    {
        self.escalate(entry, logger, msg, err, "panic");
        panic!("{msg}: {err}")
    }

    fn escalate<L>(
        &self,
        entry: &BufferEntry,
        logger: &L,
        msg: &str,
        err: &dyn StdError,
        level: &str,
    ) where
        L: StructuredLogger + ?Sized,
    {
        record_error(entry, logger, msg, err);
        logger.flush();

        if let Err(flush_error) = self.flush(entry) {
            let _ = writeln!(
                std::io::stderr(),
                "failed to flush buffer of {}{} before {level}: {flush_error}",
                entry.service_name(),
                entry.extra_info(),
            );
        }

        let error = err.to_string();
        log::error!(
            target: "logforth_buffer",
            service_name = entry.service_name(),
            extra_info = entry.extra_info(),
            escalation = level,
            error = error.as_str();
            "{msg}"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;
    use std::panic;
    use std::panic::AssertUnwindSafe;
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::append::BufferAppend;

    fn logging(dir: &TempDir) -> (BufferedLogging, String) {
        let logging = BufferedLogging::builder()
            .logger_factory(|entry| {
                crate::builder()
                    .target(entry.service_name())
                    .dispatch(|d| d.append(BufferAppend::new(entry.clone())))
                    .build()
            })
            .exit_hook(|code| panic!("exit {code}"))
            .build();
        (logging, format!("{}/", dir.path().display()))
    }

    #[test]
    fn test_info_keeps_entry_clean() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let (logging, prefix) = logging(&dir);
        let (entry, logger) = logging.create_or_get_buffer(&prefix, "svc", "");

        logging.record_info(&*logger, "step");
        assert!(!entry.is_dirty());
        assert!(!entry.is_empty());
    }

    #[test]
    fn test_error_marks_entry_dirty() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let (logging, prefix) = logging(&dir);
        let (entry, logger) = logging.create_or_get_buffer(&prefix, "svc", "");

        logging.record_error(&entry, &*logger, "failed", &io::Error::other("boom"));
        assert!(entry.is_dirty());
    }

    #[test]
    fn test_free_functions_match_methods() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let (logging, prefix) = logging(&dir);
        let (entry, logger) = logging.create_or_get_buffer(&prefix, "svc", "");

        record_info(&*logger, "step");
        assert!(!entry.is_dirty());
        record_error(&entry, &*logger, "failed", &io::Error::other("boom"));
        assert!(entry.is_dirty());

        let text = String::from_utf8(entry.contents()).unwrap();
        assert_eq!(text.lines().count(), 2, "{text}");
    }

    #[test]
    fn test_panic_flushes_before_unwinding() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let (logging, prefix) = logging(&dir);
        let (entry, logger) = logging.create_or_get_buffer(&prefix, "svc", "1");
        logging.record_info(&*logger, "before");

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            logging.record_panic(&entry, &*logger, "broken", &io::Error::other("boom"))
        }));

        let payload = result.err().expect("record_panic must unwind");
        assert_eq!(payload.downcast_ref::<String>().unwrap(), "broken: boom");
        let text = fs::read_to_string(entry.path()).unwrap();
        assert!(text.contains("message=before"), "{text}");
        assert!(text.contains("message=broken error=boom"), "{text}");
        assert!(entry.is_empty());
    }

    #[test]
    fn test_fatal_flushes_before_exit_hook() {
        let dir = TempDir::new().expect("failed to create a temporary directory");
        let prefix = format!("{}/", dir.path().display());
        let path = dir.path().join("svc.log");
        let seen = Arc::new(std::sync::Mutex::new(None));

        let hook_path = path.clone();
        let hook_seen = seen.clone();
        let logging = BufferedLogging::builder()
            .logger_factory(|entry| {
                crate::builder()
                    .dispatch(|d| d.append(BufferAppend::new(entry.clone())))
                    .build()
            })
            .exit_hook(move |code| {
                *hook_seen.lock().unwrap() = Some((code, fs::read_to_string(&hook_path).ok()));
                panic!("exit {code}");
            })
            .build();
        let (entry, logger) = logging.create_or_get_buffer(&prefix, "svc", "");

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            logging.record_fatal(&entry, &*logger, "gone", &io::Error::other("boom"))
        }));

        assert!(result.is_err());
        let (code, text) = seen.lock().unwrap().take().unwrap();
        assert_eq!(code, 1);
        assert!(text.unwrap().contains("message=gone error=boom"));
    }
}
