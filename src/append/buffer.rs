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

use crate::Error;
use crate::append::Append;
use crate::buffer::BufferHandle;
use crate::layout::Layout;
use crate::layout::LogfmtLayout;

/// An appender that accumulates formatted records in a [`BufferEntry`](crate::BufferEntry).
///
/// Error records mark the entry dirty in the same critical section that appends the line, so a
/// concurrent flush observes either both or neither.
#[derive(Debug)]
pub struct BufferAppend {
    entry: BufferHandle,
    layout: Box<dyn Layout>,
}

impl BufferAppend {
    /// Create an appender writing into the given entry.
    pub fn new(entry: BufferHandle) -> Self {
        Self {
            entry,
            layout: Box::new(LogfmtLayout::default()),
        }
    }

    /// Sets the layout for the [`BufferAppend`] appender.
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// The entry this appender writes into.
    pub fn entry(&self) -> &BufferHandle {
        &self.entry
    }
}

impl Append for BufferAppend {
    fn append(&self, record: &log::Record) -> Result<(), Error> {
        let mut bytes = self.layout.format(record)?;
        bytes.push(b'\n');

        let mut state = self.entry.state();
        state.buffer.extend_from_slice(&bytes);
        if record.level() == log::Level::Error {
            state.dirty = true;
        }
        Ok(())
    }
}
