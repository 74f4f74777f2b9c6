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

mod builder;
pub use self::builder::DispatchBuilder;
pub use self::builder::LoggerBuilder;
pub use self::builder::builder;

mod log_impl;
pub use self::log_impl::Logger;

/// Something that records leveled messages, possibly to several sinks at once.
///
/// The buffer layer only needs a logger that can be told to also mirror its writes into a
/// [`BufferEntry`](crate::BufferEntry). [`Logger`] with a
/// [`BufferAppend`](crate::append::BufferAppend) is the provided implementation.
pub trait StructuredLogger: fmt::Debug + Send + Sync {
    /// Record a log record.
    fn log(&self, record: &log::Record);

    /// Flush the sinks of this logger. This does not flush buffers to files.
    fn flush(&self) {}

    /// The target attached to records produced by [`log_info`](Self::log_info) and
    /// [`log_error`](Self::log_error).
    fn target(&self) -> &str;

    /// Record an informational message.
    fn log_info(&self, msg: &str) {
        self.log(
            &log::Record::builder()
                .level(log::Level::Info)
                .target(self.target())
                .args(format_args!("{msg}"))
                .build(),
        );
    }

    /// Record an error message, with the error attached as the `error` key.
    fn log_error(&self, msg: &str, err: &dyn std::error::Error) {
        let err = err.to_string();
        let kvs = vec![("error", err.as_str())];
        self.log(
            &log::Record::builder()
                .level(log::Level::Error)
                .target(self.target())
                .args(format_args!("{msg}"))
                .key_values(&kvs)
                .build(),
        );
    }
}
