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

use log::LevelFilter;

use crate::Logger;
use crate::append::Append;
use crate::filter::Filter;
use crate::logger::log_impl::Dispatch;

/// Create a new empty [`LoggerBuilder`] instance for configuring log dispatching.
///
/// # Examples
///
/// ```
/// use logforth_buffer::append;
///
/// let logger = logforth_buffer::builder()
///     .target("XML-converter")
///     .dispatch(|d| d.append(append::Stdout::default()))
///     .build();
/// ```
pub fn builder() -> LoggerBuilder {
    LoggerBuilder {
        target: String::new(),
        dispatches: vec![],
    }
}

/// A builder for configuring a [`Logger`]. See also [`builder`] for a fluent API.
#[must_use = "call `build` to construct a logger instance or `apply` to set the global logger"]
#[derive(Debug)]
pub struct LoggerBuilder {
    target: String,
    // stashed dispatches
    dispatches: Vec<Dispatch>,
}

impl LoggerBuilder {
    /// Set the target attached to records the logger creates itself.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Register a new dispatch with the [`LoggerBuilder`].
    ///
    /// # Examples
    ///
    /// ```
    /// use logforth_buffer::append;
    ///
    /// let logger = logforth_buffer::builder()
    ///     .dispatch(|d| d.append(append::Testing::default()))
    ///     .build();
    /// ```
    pub fn dispatch<F>(mut self, f: F) -> Self
    where
        F: FnOnce(DispatchBuilder<false>) -> DispatchBuilder<true>,
    {
        self.dispatches.push(f(DispatchBuilder::new()).build());
        self
    }

    /// Build the [`Logger`].
    pub fn build(self) -> Logger {
        Logger::new(self.target, self.dispatches)
    }

    /// Set up the global logger of the [`log`] crate with all the configured dispatches.
    ///
    /// Internal events of the buffer layer, such as flush timings and rotation warnings, are
    /// emitted through the `log` facade, so this is one way to collect them.
    ///
    /// # Errors
    ///
    /// Return an error if a global logger has already been set.
    pub fn try_apply(self) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(self.build()))?;
        log::set_max_level(LevelFilter::Trace);
        Ok(())
    }

    /// Set up the global logger of the [`log`] crate with all the configured dispatches.
    ///
    /// # Panics
    ///
    /// Panic if the global logger has already been set.
    pub fn apply(self) {
        self.try_apply()
            .expect("LoggerBuilder::apply must be called before the global logger initialized");
    }
}

/// A builder for a single dispatch. At least one appender is required.
#[derive(Debug)]
pub struct DispatchBuilder<const APPEND: bool> {
    filters: Vec<Filter>,
    appends: Vec<Box<dyn Append>>,
}

impl DispatchBuilder<false> {
    fn new() -> Self {
        DispatchBuilder {
            filters: vec![],
            appends: vec![],
        }
    }

    /// Add a filter to this dispatch.
    ///
    /// # Examples
    ///
    /// ```
    /// use log::LevelFilter;
    /// use logforth_buffer::append;
    ///
    /// let logger = logforth_buffer::builder()
    ///     .dispatch(|d| d.filter(LevelFilter::Error).append(append::Stdout::default()))
    ///     .build();
    /// ```
    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filters.push(filter.into());
        self
    }
}

impl DispatchBuilder<true> {
    fn build(self) -> Dispatch {
        Dispatch::new(self.filters, self.appends)
    }
}

impl<const APPEND: bool> DispatchBuilder<APPEND> {
    /// Add an appender to this dispatch.
    pub fn append(mut self, append: impl Into<Box<dyn Append>>) -> DispatchBuilder<true> {
        self.appends.push(append.into());
        DispatchBuilder {
            filters: self.filters,
            appends: self.appends,
        }
    }
}
