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

use std::fmt::Write;

use jiff::Timestamp;
use jiff::Zoned;
use jiff::tz::TimeZone;

use crate::Error;
use crate::ErrorKind;
use crate::layout::Layout;
use crate::layout::filename;

/// A layout that formats log record as logfmt key-value pairs.
///
/// This is the default layout of buffered loggers, since log collectors that tail the flushed
/// files commonly parse logfmt out of the box.
///
/// Output format:
///
/// ```text
/// timestamp=2025-03-31T21:04:28.986032+08:00 level=INFO target=XML-converter message="Info 1"
/// timestamp=2025-03-31T21:04:28.991277+08:00 level=ERROR target=XML-converter message="Error in loop" error=boom
/// ```
#[derive(Default, Debug, Clone)]
pub struct LogfmtLayout {
    tz: Option<TimeZone>,
}

impl LogfmtLayout {
    /// Sets the timezone for timestamps.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use logforth_buffer::layout::LogfmtLayout;
    ///
    /// let logfmt_layout = LogfmtLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }
}

fn encode_key_value(result: &mut String, key: &str, value: &str) -> Result<(), Error> {
    if key.contains([' ', '=', '"']) {
        // omit keys contain special chars
        return Err(Error::new(ErrorKind::Format, "key contains special chars")
            .with_context("key", key));
    }

    if value.is_empty() || value.contains([' ', '=', '"']) {
        write!(result, " {key}=\"{}\"", value.escape_debug()).map_err(Error::from_fmt_error)
    } else {
        write!(result, " {key}={value}").map_err(Error::from_fmt_error)
    }
}

struct KvFormatter {
    text: String,
}

impl<'kvs> log::kv::VisitSource<'kvs> for KvFormatter {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        encode_key_value(&mut self.text, key.as_str(), value.to_string().as_str())
            .map_err(log::kv::Error::boxed)
    }
}

impl Layout for LogfmtLayout {
    fn format(&self, record: &log::Record) -> Result<Vec<u8>, Error> {
        let time = match self.tz.clone() {
            Some(tz) => Timestamp::now().to_zoned(tz),
            None => Zoned::now(),
        };

        let mut text = format!("timestamp={time:.6}");
        encode_key_value(&mut text, "level", record.level().as_str())?;
        encode_key_value(&mut text, "target", record.target())?;
        if record.file().is_some() {
            let position = format!("{}:{}", filename(record), record.line().unwrap_or_default());
            encode_key_value(&mut text, "position", &position)?;
        }
        encode_key_value(&mut text, "message", &record.args().to_string())?;

        let mut visitor = KvFormatter { text };
        record.key_values().visit(&mut visitor).map_err(|err| {
            Error::new(ErrorKind::Format, "failed to format key-values")
                .with_source(anyhow::anyhow!("{err}"))
        })?;

        Ok(visitor.text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logfmt_quotes_values_with_spaces() {
        let kvs = vec![("error", "disk full"), ("attempt", "1")];
        let bytes = LogfmtLayout::default()
            .timezone(TimeZone::UTC)
            .format(
                &log::Record::builder()
                    .level(log::Level::Error)
                    .target("XML-converter")
                    .args(format_args!("Error in loop"))
                    .key_values(&kvs)
                    .build(),
            )
            .unwrap();
        let line = String::from_utf8(bytes).unwrap();

        assert!(line.starts_with("timestamp="), "{line}");
        assert!(
            line.ends_with(
                " level=ERROR target=XML-converter message=\"Error in loop\" error=\"disk full\" attempt=1"
            ),
            "{line}"
        );
    }

    #[test]
    fn test_logfmt_rejects_keys_with_special_chars() {
        let kvs = vec![("bad key", "v")];
        let result = LogfmtLayout::default().format(
            &log::Record::builder()
                .args(format_args!("hello"))
                .key_values(&kvs)
                .build(),
        );

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Format);
    }
}
