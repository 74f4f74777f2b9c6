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

use jiff::Timestamp;
use jiff::Zoned;
use jiff::tz::TimeZone;

use crate::Error;
use crate::layout::KvDisplay;
use crate::layout::Layout;

/// A layout that formats log record as human-readable text.
///
/// Output format:
///
/// ```text
/// 2024-08-11T22:44:57.172105+08:00 ERROR XML-converter: Error in loop error=boom
/// 2024-08-11T22:44:57.172276+08:00  INFO XML-converter: Info 1
/// ```
///
/// With the `colored` feature enabled, log levels are colored unless [`TextLayout::no_color`]
/// is set. Files produced by a flush are usually read by machines, so prefer keeping colors
/// off for layouts shared with the buffer sink.
#[derive(Default, Debug, Clone)]
pub struct TextLayout {
    no_color: bool,
    tz: Option<TimeZone>,
}

impl TextLayout {
    /// Disables colored output.
    pub fn no_color(mut self) -> Self {
        self.no_color = true;
        self
    }

    /// Sets the timezone for timestamps.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use logforth_buffer::layout::TextLayout;
    ///
    /// let text_layout = TextLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }

    #[cfg(feature = "colored")]
    fn level(&self, level: log::Level) -> String {
        use colored::Color;
        use colored::Colorize;

        if self.no_color {
            return level.to_string();
        }

        let color = match level {
            log::Level::Error => Color::Red,
            log::Level::Warn => Color::Yellow,
            log::Level::Info => Color::Green,
            log::Level::Debug => Color::Blue,
            log::Level::Trace => Color::Magenta,
        };
        level.as_str().color(color).to_string()
    }

    #[cfg(not(feature = "colored"))]
    fn level(&self, level: log::Level) -> String {
        let _ = self.no_color;
        level.to_string()
    }
}

impl Layout for TextLayout {
    fn format(&self, record: &log::Record) -> Result<Vec<u8>, Error> {
        let time = match self.tz.clone() {
            Some(tz) => Timestamp::now().to_zoned(tz),
            None => Zoned::now(),
        };
        let level = self.level(record.level());
        let target = record.target();
        let message = record.args();
        let kvs = KvDisplay::new(record.key_values());

        let text = format!("{time:.6} {level:>5} {target}: {message}{kvs}");
        Ok(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_layout_renders_target_message_and_kvs() {
        let kvs = vec![("error", "boom")];
        let bytes = TextLayout::default()
            .no_color()
            .timezone(TimeZone::UTC)
            .format(
                &log::Record::builder()
                    .level(log::Level::Info)
                    .target("svc")
                    .args(format_args!("Info 1"))
                    .key_values(&kvs)
                    .build(),
            )
            .unwrap();
        let line = String::from_utf8(bytes).unwrap();

        assert!(line.ends_with("  INFO svc: Info 1 error=boom"), "{line}");
    }
}
