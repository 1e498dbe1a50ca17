#![forbid(unsafe_code)]

//! key=value option-line tokenizer.
//!
//! Display drivers receive their configuration as a single line of
//! `name=value` pairs separated by whitespace; values may be double-quoted to
//! preserve embedded spaces, or bare (terminated by whitespace), or absent.
//! Unknown names are reported through tracing and skipped, per the
//! configuration-time error policy.

use tracing::warn;

/// One recognized option: its spelled-out name and the short code handed back
/// to the driver.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub code: char,
}

/// Iterator over the `(code, value)` pairs of an option line.
#[derive(Debug)]
pub struct OptionLine<'a> {
    rest: &'a str,
    options: &'static [OptionSpec],
}

/// Tokenize `line` against the driver's option table.
#[must_use]
pub fn option_line<'a>(line: &'a str, options: &'static [OptionSpec]) -> OptionLine<'a> {
    OptionLine { rest: line, options }
}

impl<'a> Iterator for OptionLine<'a> {
    type Item = (char, &'a str);

    fn next(&mut self) -> Option<(char, &'a str)> {
        loop {
            self.rest = self.rest.trim_start();
            if self.rest.is_empty() {
                return None;
            }

            let name_end = self
                .rest
                .find(|c: char| c.is_whitespace() || c == '=')
                .unwrap_or(self.rest.len());
            let name = &self.rest[..name_end];
            self.rest = &self.rest[name_end..];

            let value = if let Some(tail) = self.rest.strip_prefix('=') {
                if let Some(quoted) = tail.strip_prefix('"') {
                    let end = quoted.find('"').unwrap_or(quoted.len());
                    self.rest = quoted.get(end + 1..).unwrap_or("");
                    &quoted[..end]
                } else {
                    let end = tail
                        .find(char::is_whitespace)
                        .unwrap_or(tail.len());
                    self.rest = &tail[end..];
                    &tail[..end]
                }
            } else {
                ""
            };

            match self.options.iter().find(|o| o.name == name) {
                Some(option) => return Some((option.code, value)),
                None => warn!(option = name, "unrecognized display option"),
            }
        }
    }
}
