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

//! Layouts for formatting log records.

use std::borrow::Cow;
use std::fmt;

#[cfg(feature = "layout-json")]
pub use self::json::JsonLayout;
pub use self::logfmt::LogfmtLayout;
pub use self::text::TextLayout;
use crate::Error;

#[cfg(feature = "layout-json")]
mod json;
mod kv;
mod logfmt;
mod text;

pub(crate) use self::kv::KvDisplay;

/// A layout turns a log record into the bytes of one line, without the trailing newline.
pub trait Layout: fmt::Debug + Send + Sync + 'static {
    /// Formats a log record.
    fn format(&self, record: &log::Record) -> Result<Vec<u8>, Error>;
}

impl<T: Layout> From<T> for Box<dyn Layout> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

// obtain filename only from record's full file path
// reason: the module is already logged + full file path is noisy for some layouts
pub(crate) fn filename<'a>(record: &'a log::Record<'a>) -> Cow<'a, str> {
    record
        .file()
        .map(std::path::Path::new)
        .and_then(std::path::Path::file_name)
        .map(std::ffi::OsStr::to_string_lossy)
        .unwrap_or_default()
}
