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

use std::fmt;
use std::sync::Arc;

use crate::BufferEntry;
use crate::BufferHandle;
use crate::BufferRegistry;
use crate::DirtyPolicy;
use crate::Error;
use crate::FileLedger;
use crate::FlushController;
use crate::FlushReport;
use crate::Logger;
use crate::append::BufferAppend;
use crate::append::Stdout;
use crate::filter::EnvFilter;

/// Default maximum number of buffers held by a registry.
pub const DEFAULT_MAX_BUFFERS: usize = 200;

/// Default maximum number of log files kept on disk.
pub const DEFAULT_MAX_FILES: usize = 20;

/// A shared handle to the logger paired with a buffer.
pub type LoggerHandle = Arc<Logger>;

type MakeLogger = Box<dyn Fn(&BufferHandle) -> Logger + Send + Sync>;
type ExitHook = Box<dyn Fn(i32) + Send + Sync>;

/// The buffered logging layer: a buffer registry, a flush controller and their settings.
///
/// Create one at startup, pass it (or an `Arc` of it) to the places that log, and drop it on
/// shutdown. Nothing is shared through global state; two instances are fully independent, but
/// two instances writing the same paths will step on each other's files.
///
/// # Examples
///
/// ```no_run
/// use logforth_buffer::BufferedLogging;
///
/// let logging = BufferedLogging::builder().max_files(5).build();
/// let (buffer, logger) = logging.create_or_get_buffer("logs/", "XML-converter", "1");
///
/// logging.record_info(&*logger, "converting");
/// let err = std::io::Error::other("malformed input");
/// logging.record_error(&buffer, &*logger, "conversion failed", &err);
///
/// logging.flush(&buffer).unwrap();
/// ```
pub struct BufferedLogging {
    registry: BufferRegistry<Logger>,
    controller: FlushController,
    make_logger: MakeLogger,
    pub(crate) exit: ExitHook,
}

impl fmt::Debug for BufferedLogging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedLogging")
            .field("registry", &self.registry)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl Default for BufferedLogging {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl BufferedLogging {
    /// Create a new [`BufferedLoggingBuilder`].
    pub fn builder() -> BufferedLoggingBuilder {
        BufferedLoggingBuilder::new()
    }

    /// Return the buffer and logger for this identity, creating them when absent.
    ///
    /// A new logger writes every record to stdout and to the buffer. When the registry is full,
    /// the oldest-inserted buffer is evicted first.
    pub fn create_or_get_buffer(
        &self,
        prefix: &str,
        service_name: &str,
        extra_info: &str,
    ) -> (BufferHandle, LoggerHandle) {
        let (slot, reused) =
            self.registry
                .get_or_create(prefix, service_name, extra_info, |entry| {
                    (self.make_logger)(entry)
                });
        if reused {
            log::warn!(
                target: "logforth_buffer",
                service_name = service_name,
                extra_info = extra_info;
                "buffer already exists, returning existing buffer"
            );
        }
        (slot.entry, slot.logger)
    }

    /// Find the buffer for this identity.
    pub fn lookup_buffer(&self, service_name: &str, extra_info: &str) -> Option<BufferHandle> {
        self.lookup(service_name, extra_info).map(|(entry, _)| entry)
    }

    /// Find the logger for this identity.
    pub fn lookup_logger(&self, service_name: &str, extra_info: &str) -> Option<LoggerHandle> {
        self.lookup(service_name, extra_info)
            .map(|(_, logger)| logger)
    }

    /// Find the buffer and logger for this identity.
    pub fn lookup(
        &self,
        service_name: &str,
        extra_info: &str,
    ) -> Option<(BufferHandle, LoggerHandle)> {
        self.registry
            .lookup(service_name, extra_info)
            .map(|slot| (slot.entry, slot.logger))
    }

    /// Flush a buffer. See [`FlushController::flush`].
    pub fn flush(&self, entry: &BufferEntry) -> Result<FlushReport, Error> {
        self.controller.flush(entry)
    }

    /// Flush every registered buffer, oldest first, continuing past failures.
    pub fn flush_all(&self) -> Vec<Result<FlushReport, Error>> {
        self.registry
            .handles()
            .iter()
            .map(|entry| self.controller.flush(entry))
            .collect()
    }

    /// The maximum number of buffers held.
    pub fn max_buffers(&self) -> usize {
        self.registry.capacity()
    }

    /// Change the maximum number of buffers held.
    pub fn set_max_buffers(&self, n: usize) {
        self.registry.set_capacity(n);
    }

    /// The maximum number of log files kept.
    pub fn max_files(&self) -> usize {
        self.controller.ledger().capacity()
    }

    /// Change the maximum number of log files kept.
    pub fn set_max_files(&self, n: usize) {
        self.controller.ledger().set_capacity(n);
    }

    /// The buffer registry.
    pub fn registry(&self) -> &BufferRegistry<Logger> {
        &self.registry
    }

    /// The ledger of log files written so far.
    pub fn ledger(&self) -> &FileLedger {
        self.controller.ledger()
    }

    /// The flush controller.
    pub fn controller(&self) -> &FlushController {
        &self.controller
    }
}

/// A builder for configuring [`BufferedLogging`].
#[must_use = "call `build` to construct the buffered logging layer"]
pub struct BufferedLoggingBuilder {
    max_buffers: usize,
    max_files: usize,
    dirty_policy: DirtyPolicy,
    make_logger: Option<MakeLogger>,
    exit: Option<ExitHook>,
}

impl fmt::Debug for BufferedLoggingBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedLoggingBuilder")
            .field("max_buffers", &self.max_buffers)
            .field("max_files", &self.max_files)
            .field("dirty_policy", &self.dirty_policy)
            .finish_non_exhaustive()
    }
}

impl Default for BufferedLoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferedLoggingBuilder {
    /// Create a builder with the default settings.
    pub fn new() -> Self {
        Self {
            max_buffers: DEFAULT_MAX_BUFFERS,
            max_files: DEFAULT_MAX_FILES,
            dirty_policy: DirtyPolicy::default(),
            make_logger: None,
            exit: None,
        }
    }

    /// Set the maximum number of buffers held. Default to [`DEFAULT_MAX_BUFFERS`].
    pub fn max_buffers(mut self, n: usize) -> Self {
        self.max_buffers = n;
        self
    }

    /// Set the maximum number of log files kept. Default to [`DEFAULT_MAX_FILES`].
    pub fn max_files(mut self, n: usize) -> Self {
        self.max_files = n;
        self
    }

    /// Set whether flushes reset the dirty mark. Default to [`DirtyPolicy::Sticky`].
    pub fn dirty_policy(mut self, policy: DirtyPolicy) -> Self {
        self.dirty_policy = policy;
        self
    }

    /// Set how the logger of a new buffer is built.
    ///
    /// The default logger writes logfmt lines to stdout, filtered by `RUST_LOG` (default `info`),
    /// and every record unfiltered to a [`BufferAppend`], with the service name as the record
    /// target. A custom logger must include a [`BufferAppend`] for the buffer to receive
    /// anything.
    ///
    /// # Examples
    ///
    /// ```
    /// use logforth_buffer::BufferedLogging;
    /// use logforth_buffer::append::BufferAppend;
    /// use logforth_buffer::append::Testing;
    ///
    /// let logging = BufferedLogging::builder()
    ///     .logger_factory(|entry| {
    ///         logforth_buffer::builder()
    ///             .target(entry.service_name())
    ///             .dispatch(|d| {
    ///                 d.append(Testing::default())
    ///                     .append(BufferAppend::new(entry.clone()))
    ///             })
    ///             .build()
    ///     })
    ///     .build();
    /// ```
    pub fn logger_factory<F>(mut self, f: F) -> Self
    where
        F: Fn(&BufferHandle) -> Logger + Send + Sync + 'static,
    {
        self.make_logger = Some(Box::new(f));
        self
    }

    /// Set the hook called with the exit status on a fatal escalation.
    ///
    /// Default to [`std::process::exit`]. If the hook returns, the process exits anyway.
    pub fn exit_hook<F>(mut self, f: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit = Some(Box::new(f));
        self
    }

    /// Build the [`BufferedLogging`] layer.
    pub fn build(self) -> BufferedLogging {
        BufferedLogging {
            registry: BufferRegistry::new(self.max_buffers),
            controller: FlushController::new(self.max_files, self.dirty_policy),
            make_logger: self
                .make_logger
                .unwrap_or_else(|| Box::new(default_logger)),
            exit: self
                .exit
                .unwrap_or_else(|| Box::new(|code| std::process::exit(code))),
        }
    }
}

fn default_logger(entry: &BufferHandle) -> Logger {
    mirrored_logger(entry, EnvFilter::from_default_env_or("info"))
}

// The live filter only gates stdout; the buffer receives every record.
fn mirrored_logger(entry: &BufferHandle, live_filter: EnvFilter) -> Logger {
    crate::builder()
        .target(entry.service_name())
        .dispatch(|d| d.filter(live_filter).append(Stdout::default()))
        .dispatch(|d| d.append(BufferAppend::new(entry.clone())))
        .build()
}
