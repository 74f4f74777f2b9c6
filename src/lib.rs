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

//! Buffered logging that only reaches the disk once something went wrong.
//!
//! # Overview
//!
//! Each source of work (a service, a job, a connection) gets a buffer identified by its service
//! name and extra info. Its logger writes every record live to stdout and also appends the
//! formatted line to the buffer. When the work is done, the buffer is flushed: if an error was
//! recorded, the bytes go to `{prefix}{service_name}{extra_info}.log`; otherwise they are
//! dropped. The number of buffers and the number of files on disk are both bounded, and the
//! oldest ones are evicted or reused first.
//!
//! # Examples
//!
//! ```
//! use logforth_buffer::BufferedLogging;
//! use logforth_buffer::append::BufferAppend;
//! use logforth_buffer::append::Testing;
//!
//! let dir = std::env::temp_dir().join("logforth-buffer-doc");
//! let prefix = format!("{}/", dir.display());
//!
//! let logging = BufferedLogging::builder()
//!     .max_buffers(10)
//!     .max_files(2)
//!     .logger_factory(|entry| {
//!         logforth_buffer::builder()
//!             .target(entry.service_name())
//!             .dispatch(|d| {
//!                 d.append(Testing::default())
//!                     .append(BufferAppend::new(entry.clone()))
//!             })
//!             .build()
//!     })
//!     .build();
//!
//! let (buffer, logger) = logging.create_or_get_buffer(&prefix, "importer", "-42");
//! logging.record_info(&*logger, "reading input");
//! logging.record_error(&buffer, &*logger, "row rejected", &std::io::Error::other("bad row"));
//!
//! let report = logging.flush(&buffer).unwrap();
//! assert!(matches!(
//!     report.outcome,
//!     logforth_buffer::FlushOutcome::Written { .. }
//! ));
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod filter;
pub mod layout;

pub use append::Append;
pub use filter::Filter;
pub use layout::Layout;

mod error;
pub use error::Error;
pub use error::ErrorKind;

mod buffer;
pub use buffer::BufferEntry;
pub use buffer::BufferHandle;
pub use buffer::BufferRegistry;
pub use buffer::BufferSlot;

mod ledger;
pub use ledger::FileLedger;
pub use ledger::Placement;

mod flush;
pub use flush::DirtyPolicy;
pub use flush::FlushController;
pub use flush::FlushOutcome;
pub use flush::FlushReport;

mod escalate;
pub use escalate::record_error;
pub use escalate::record_info;

mod logging;
pub use logging::BufferedLogging;
pub use logging::BufferedLoggingBuilder;
pub use logging::DEFAULT_MAX_BUFFERS;
pub use logging::DEFAULT_MAX_FILES;
pub use logging::LoggerHandle;

mod logger;
pub use logger::*;
