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

//! In-memory accumulation of log lines, one [`BufferEntry`] per logical source.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

pub use self::registry::BufferRegistry;
pub use self::registry::BufferSlot;

mod registry;

/// A shared handle to a [`BufferEntry`].
pub type BufferHandle = Arc<BufferEntry>;

/// An append-only in-memory accumulator bound to a `(service_name, extra_info)` identity.
///
/// The entry is marked dirty once it has recorded an error. Only dirty entries are written to
/// disk on flush; clean entries are discarded. See [`DirtyPolicy`](crate::DirtyPolicy) for
/// whether a flush resets the mark.
pub struct BufferEntry {
    prefix: String,
    service_name: String,
    extra_info: String,
    state: Mutex<EntryState>,
}

#[derive(Debug, Default)]
pub(crate) struct EntryState {
    pub(crate) buffer: Vec<u8>,
    pub(crate) dirty: bool,
}

impl fmt::Debug for BufferEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("BufferEntry")
            .field("prefix", &self.prefix)
            .field("service_name", &self.service_name)
            .field("extra_info", &self.extra_info)
            .field("buffered", &state.buffer.len())
            .field("dirty", &state.dirty)
            .finish()
    }
}

impl BufferEntry {
    /// Create a clean entry with an empty accumulator.
    pub fn new(
        prefix: impl Into<String>,
        service_name: impl Into<String>,
        extra_info: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            service_name: service_name.into(),
            extra_info: extra_info.into(),
            state: Mutex::new(EntryState::default()),
        }
    }

    /// The path prefix used to derive the on-disk filename.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The service name half of the identity.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// The extra info half of the identity.
    pub fn extra_info(&self) -> &str {
        &self.extra_info
    }

    /// Whether this entry has the given identity.
    pub fn matches(&self, service_name: &str, extra_info: &str) -> bool {
        self.service_name == service_name && self.extra_info == extra_info
    }

    /// The logical file path: `{prefix}{service_name}{extra_info}.log`.
    ///
    /// The parts are concatenated as strings, so a prefix naming a directory must end with a
    /// path separator.
    pub fn path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}{}{}.log",
            self.prefix, self.service_name, self.extra_info
        ))
    }

    /// Whether this entry has recorded an error.
    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    /// Mark this entry as having recorded an error.
    pub fn mark_dirty(&self) {
        self.state().dirty = true;
    }

    /// Append raw bytes to the accumulator.
    pub fn write(&self, bytes: &[u8]) {
        self.state().buffer.extend_from_slice(bytes);
    }

    /// Number of bytes currently buffered.
    pub fn len(&self) -> usize {
        self.state().buffer.len()
    }

    /// Whether nothing is currently buffered.
    pub fn is_empty(&self) -> bool {
        self.state().buffer.is_empty()
    }

    /// A copy of the bytes currently buffered.
    pub fn contents(&self) -> Vec<u8> {
        self.state().buffer.clone()
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, EntryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
