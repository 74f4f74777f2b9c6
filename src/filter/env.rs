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

use std::borrow::Cow;

pub use env_filter::Builder as EnvFilterBuilder;
use log::Metadata;

use crate::filter::FilterResult;

const DEFAULT_FILTER_ENV: &str = "RUST_LOG";

/// A filter in the `env_logger` directive syntax.
///
/// Records produced by a buffered logger use the service name as their target, so directives
/// such as `RUST_LOG=info,XML-converter=debug` select stdout verbosity per service.
#[derive(Debug)]
pub struct EnvFilter(env_filter::Filter);

impl EnvFilter {
    /// Parse the directives in `RUST_LOG`, or `default` when the variable is unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use logforth_buffer::filter::EnvFilter;
    /// let filter = EnvFilter::from_default_env_or("info");
    /// ```
    pub fn from_default_env_or<'a>(default: impl Into<Cow<'a, str>>) -> Self {
        let directives = match std::env::var(DEFAULT_FILTER_ENV) {
            Ok(directives) => Cow::Owned(directives),
            Err(_) => default.into(),
        };
        EnvFilter::parse(&directives)
    }

    /// Parse directives such as `warn,XML-converter=debug`.
    pub fn parse(directives: &str) -> Self {
        let mut builder = EnvFilterBuilder::new();
        builder.parse(directives);
        EnvFilter::new(builder)
    }

    /// Build the filter from an [`EnvFilterBuilder`].
    pub fn new(mut builder: EnvFilterBuilder) -> Self {
        EnvFilter(builder.build())
    }

    pub(crate) fn enabled(&self, metadata: &Metadata) -> FilterResult {
        if self.0.enabled(metadata) {
            FilterResult::Neutral
        } else {
            FilterResult::Reject
        }
    }

    pub(crate) fn matches(&self, record: &log::Record) -> FilterResult {
        if self.0.matches(record) {
            FilterResult::Neutral
        } else {
            FilterResult::Reject
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_select_per_service_level() {
        let filter = EnvFilter::parse("warn,XML-converter=debug");

        let chatty = Metadata::builder()
            .level(log::Level::Debug)
            .target("XML-converter")
            .build();
        assert_eq!(filter.enabled(&chatty), FilterResult::Neutral);

        let quiet = Metadata::builder()
            .level(log::Level::Info)
            .target("importer")
            .build();
        assert_eq!(filter.enabled(&quiet), FilterResult::Reject);
    }
}
