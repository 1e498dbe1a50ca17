#![forbid(unsafe_code)]

//! `%spec` text substitution.
//!
//! Item drivers build their display text from a format line: `%` introduces a
//! driver-defined specifier, `%%` emits a literal percent, and everything else
//! is copied through. The driver resolves specifiers through a callback that
//! receives a [`SpecCursor`] positioned right after the `%`; whatever the
//! callback leaves unconsumed continues as plain text.
//!
//! A specifier may carry a trailing comparison clause
//! `{<,<=,>,>=,=,!=}N<literal>` which substitutes `literal` only when the
//! resolved numeric value satisfies the comparison against `N`, else
//! substitutes nothing. Drivers opt in by calling
//! [`SpecCursor::read_comparison`] with the value they computed.

/// Cursor over the unconsumed tail of a format string.
#[derive(Debug)]
pub struct SpecCursor<'a> {
    rest: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    fn holds(self, value: i64, against: i64) -> bool {
        match self {
            Self::Lt => value < against,
            Self::Le => value <= against,
            Self::Gt => value > against,
            Self::Ge => value >= against,
            Self::Eq => value == against,
            Self::Ne => value != against,
        }
    }
}

impl<'a> SpecCursor<'a> {
    /// Next unconsumed character, without advancing.
    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    /// Consume one character.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.rest.chars().next()?;
        self.rest = &self.rest[c.len_utf8()..];
        Some(c)
    }

    /// Consume a run of decimal digits, if any.
    pub fn read_uint(&mut self) -> Option<u64> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let value = self.rest[..end].parse().ok();
        self.rest = &self.rest[end..];
        value
    }

    /// Consume a `<literal>` group, returning the literal.
    pub fn read_angle_group(&mut self) -> Option<&'a str> {
        if !self.rest.starts_with('<') {
            return None;
        }
        self.rest = &self.rest[1..];
        let end = self.rest.find('>').unwrap_or(self.rest.len());
        let literal = &self.rest[..end];
        self.rest = self.rest.get(end + 1..).unwrap_or("");
        Some(literal)
    }

    /// Consume a trailing comparison clause, if present, and evaluate it
    /// against `value`.
    ///
    /// Returns `Some(text)` when a clause was consumed: the literal when the
    /// comparison holds, the empty string otherwise. Returns `None` when the
    /// specifier carries no clause and the driver should format the value
    /// itself.
    pub fn read_comparison(&mut self, value: i64) -> Option<&'a str> {
        let comparison = match self.peek()? {
            '<' if !self.rest.starts_with("<=") && self.looks_like_clause() => {
                self.bump();
                Comparison::Lt
            }
            '<' if self.rest.starts_with("<=") => {
                self.bump();
                self.bump();
                Comparison::Le
            }
            '>' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    Comparison::Ge
                } else {
                    Comparison::Gt
                }
            }
            '=' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                }
                Comparison::Eq
            }
            '!' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                }
                Comparison::Ne
            }
            _ => return None,
        };

        let negative = if self.peek() == Some('-') {
            self.bump();
            true
        } else {
            false
        };
        let mut against = self.read_uint().unwrap_or(0) as i64;
        if negative {
            against = -against;
        }

        let literal = self.read_angle_group().unwrap_or("");
        Some(if comparison.holds(value, against) { literal } else { "" })
    }

    /// A bare `<` begins a comparison only when a threshold number follows;
    /// item drivers also use `<…>` groups as separator arguments.
    fn looks_like_clause(&self) -> bool {
        let tail = &self.rest[1..];
        tail.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '=')
    }
}

/// Expand `format` by resolving each `%spec` through `resolve`.
///
/// The callback returns the substitution text, or `None` when the specifier
/// is not recognized; unrecognized specifiers expand to nothing and scanning
/// resumes where the callback left the cursor.
pub fn expand<F>(format: &str, mut resolve: F) -> String
where
    F: FnMut(&mut SpecCursor<'_>) -> Option<String>,
{
    let mut out = String::with_capacity(format.len());
    let mut rest = format;

    while let Some(at) = rest.find('%') {
        out.push_str(&rest[..at]);
        rest = &rest[at + 1..];

        if let Some(tail) = rest.strip_prefix('%') {
            out.push('%');
            rest = tail;
            continue;
        }
        if rest.is_empty() {
            break;
        }

        let mut cursor = SpecCursor { rest };
        if let Some(text) = resolve(&mut cursor) {
            out.push_str(&text);
        }
        rest = cursor.rest;
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_load(cursor: &mut SpecCursor<'_>) -> Option<String> {
        match cursor.peek()? {
            'p' => {
                cursor.bump();
                if let Some(text) = cursor.read_comparison(72) {
                    return Some(text.to_owned());
                }
                Some("72".to_owned())
            }
            _ => None,
        }
    }

    #[test]
    fn literal_and_escape() {
        assert_eq!(expand("cpu 100%%", |_| None), "cpu 100%");
        assert_eq!(expand("plain", |_| None), "plain");
    }

    #[test]
    fn spec_substitution() {
        assert_eq!(expand("cpu %p%%", resolve_load), "cpu 72%");
    }

    #[test]
    fn comparison_substitutes_literal_on_match() {
        assert_eq!(expand("%p>70<{ff0000}>high", resolve_load), "{ff0000}high");
        assert_eq!(expand("%p>90<{ff0000}>ok", resolve_load), "ok");
        assert_eq!(expand("%p<=72<eq>", resolve_load), "eq");
        assert_eq!(expand("%p!=72<ne>", resolve_load), "");
    }

    #[test]
    fn comparison_with_negative_threshold() {
        let resolved = expand("%p>-1<pos>", resolve_load);
        assert_eq!(resolved, "pos");
    }

    #[test]
    fn unknown_spec_expands_to_nothing() {
        assert_eq!(expand("a%zb", resolve_load), "azb");
    }

    #[test]
    fn trailing_percent_is_dropped() {
        assert_eq!(expand("end%", |_| None), "end");
    }
}
