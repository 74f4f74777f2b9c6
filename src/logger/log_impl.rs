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

use std::io::Write;

use log::Metadata;
use log::Record;

use crate::Error;
use crate::append::Append;
use crate::filter::Filter;
use crate::filter::FilterResult;
use crate::logger::StructuredLogger;

/// A logger that dispatches log records to one or more dispatcher.
///
/// A buffered logger is a [`Logger`] whose dispatch carries both a live appender (stdout by
/// default) and a [`BufferAppend`](crate::append::BufferAppend). It also implements
/// [`log::Log`], so the same type can serve as the process-wide logger.
#[derive(Debug)]
pub struct Logger {
    target: String,
    dispatches: Vec<Dispatch>,
}

impl Logger {
    pub(super) fn new(target: String, dispatches: Vec<Dispatch>) -> Self {
        Self { target, dispatches }
    }

    /// Whether any dispatch would accept a record with this metadata.
    pub fn enabled(&self, metadata: &Metadata) -> bool {
        self.dispatches
            .iter()
            .any(|dispatch| dispatch.enabled(metadata))
    }

    /// Dispatch a record to every dispatch of this logger.
    ///
    /// Appender failures are reported to stderr and never reach the caller.
    pub fn log(&self, record: &Record) {
        for dispatch in &self.dispatches {
            if let Err(err) = dispatch.log(record) {
                handle_log_error(record, err);
            }
        }
    }

    /// Flush every appender of this logger.
    pub fn flush(&self) {
        for dispatch in &self.dispatches {
            if let Err(err) = dispatch.flush() {
                handle_flush_error(err);
            }
        }
    }
}

impl StructuredLogger for Logger {
    fn log(&self, record: &Record) {
        Logger::log(self, record);
    }

    fn flush(&self) {
        Logger::flush(self);
    }

    fn target(&self) -> &str {
        &self.target
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        Logger::enabled(self, metadata)
    }

    fn log(&self, record: &Record) {
        Logger::log(self, record);
    }

    fn flush(&self) {
        Logger::flush(self);
    }
}

/// A grouped set of appenders and filters.
///
/// The [`Logger`] facade dispatches log records to one or more [`Dispatch`] instances.
/// Each [`Dispatch`] instance contains a set of filters and appenders.
///
/// `filters` are used to determine whether a log record should be passed to the appenders.
/// `appends` are used to write log records to a destination.
#[derive(Debug)]
pub(crate) struct Dispatch {
    filters: Vec<Filter>,
    appends: Vec<Box<dyn Append>>,
}

impl Dispatch {
    pub(super) fn new(filters: Vec<Filter>, appends: Vec<Box<dyn Append>>) -> Self {
        debug_assert!(
            !appends.is_empty(),
            "A Dispatch must have at least one append"
        );

        Self { filters, appends }
    }

    fn enabled(&self, metadata: &Metadata) -> bool {
        for filter in &self.filters {
            match filter.enabled(metadata) {
                FilterResult::Reject => return false,
                FilterResult::Accept => return true,
                FilterResult::Neutral => {}
            }
        }

        true
    }

    fn log(&self, record: &Record) -> Result<(), Error> {
        for filter in &self.filters {
            match filter.matches(record) {
                FilterResult::Reject => return Ok(()),
                FilterResult::Accept => break,
                FilterResult::Neutral => {}
            }
        }

        for append in &self.appends {
            append.append(record)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        for append in &self.appends {
            append.flush()?;
        }
        Ok(())
    }
}

fn handle_log_error(record: &Record, error: Error) {
    let Err(fallback_error) = write!(
        std::io::stderr(),
        r###"
Error perform logging.
    Attempted to log: {args}
    Record: {record:?}
    Error: {error:?}
"###,
        args = record.args(),
        record = record,
        error = error,
    ) else {
        return;
    };

    panic!(
        r###"
Error performing stderr logging after error occurred during regular logging.
    Attempted to log: {args}
    Record: {record:?}
    Error: {error:?}
    Fallback error: {fallback_error}
"###,
        args = record.args(),
        record = record,
        error = error,
        fallback_error = fallback_error,
    );
}

fn handle_flush_error(error: Error) {
    let Err(fallback_error) = write!(
        std::io::stderr(),
        r###"
Error perform flush.
    Error: {error:?}
"###,
    ) else {
        return;
    };

    panic!(
        r###"
Error performing stderr logging after error occurred during regular flush.
    Error: {error:?}
    Fallback error: {fallback_error}
"###,
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use log::LevelFilter;

    use super::*;
    use crate::BufferEntry;
    use crate::append::BufferAppend;

    fn buffered(entry: &Arc<BufferEntry>, filter: LevelFilter) -> Logger {
        crate::builder()
            .target(entry.service_name())
            .dispatch(|d| d.filter(filter).append(BufferAppend::new(entry.clone())))
            .build()
    }

    #[test]
    fn test_structured_logger_uses_logger_target() {
        let entry = Arc::new(BufferEntry::new("", "svc", "1"));
        let logger = buffered(&entry, LevelFilter::Trace);

        logger.log_info("hello");
        logger.log_error("failed", &std::io::Error::other("boom"));

        let text = String::from_utf8(entry.contents()).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("level=INFO target=svc message=hello"), "{text}");
        assert!(lines[1].contains("message=failed error=boom"), "{text}");
        assert!(entry.is_dirty());
    }

    #[test]
    fn test_filtered_records_never_reach_the_buffer() {
        let entry = Arc::new(BufferEntry::new("", "svc", ""));
        let logger = buffered(&entry, LevelFilter::Warn);

        logger.log_info("dropped");
        assert!(entry.is_empty());
        assert!(!Logger::enabled(
            &logger,
            &log::Metadata::builder().level(log::Level::Info).build()
        ));
    }
}
