#![forbid(unsafe_code)]

//! Inline markup carried by item text.
//!
//! The markup grammar is small: `{RRGGBB}` opens a color span, `{}` resets to
//! the default color, `[` … `]` delimits a segment that is dropped when the
//! shortened rendering is requested, and `\` escapes the next character
//! literally. Display drivers consume the text through [`tokens`], which
//! yields plain text runs annotated with the color active at that point.

use unicode_width::UnicodeWidthStr;

/// A 24-bit RGB color parsed from a `{RRGGBB}` span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(u32);

impl Color {
    #[must_use]
    pub fn red(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    #[must_use]
    pub fn green(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    #[must_use]
    pub fn blue(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// The `RRGGBB` value, e.g. for `#{:06x}` formatting.
    #[must_use]
    pub fn rgb(self) -> u32 {
        self.0 & 0x00ff_ffff
    }

    fn from_hex(hex: &str) -> Option<Self> {
        u32::from_str_radix(hex, 16).ok().map(Self)
    }
}

/// A run of visible text and the color active while it is displayed.
///
/// `color` of `None` means the terminal/display default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub text: &'a str,
    pub color: Option<Color>,
}

/// Iterator over the visible spans of a markup string.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
    color: Option<Color>,
    shorten: bool,
}

/// Tokenize `text`, dropping `[` … `]` segments when `shorten` is set.
#[must_use]
pub fn tokens(text: &str, shorten: bool) -> Tokens<'_> {
    Tokens { rest: text, color: None, shorten }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Span<'a>;

    fn next(&mut self) -> Option<Span<'a>> {
        let mut escaped = false;

        // Consume control sequences until plain text begins.
        while let Some(c) = self.rest.chars().next() {
            match c {
                '[' if self.shorten => {
                    self.rest = match self.rest.find(']') {
                        Some(end) => &self.rest[end + 1..],
                        None => "",
                    };
                }
                '[' | ']' => self.rest = &self.rest[1..],
                '{' => {
                    self.rest = &self.rest[1..];
                    match self.rest.find('}') {
                        Some(end) => {
                            let hex = &self.rest[..end];
                            self.color =
                                if hex.is_empty() { None } else { Color::from_hex(hex) };
                            self.rest = &self.rest[end + 1..];
                        }
                        None => self.rest = "",
                    }
                }
                '\\' => {
                    self.rest = &self.rest['\\'.len_utf8()..];
                    escaped = true;
                    break;
                }
                _ => break,
            }
        }

        if self.rest.is_empty() {
            return None;
        }

        // The first character is always taken (it may be escaped); after it
        // the run extends to the next control character.
        let mut end = 0;
        for (i, c) in self.rest.char_indices() {
            if i > 0 && matches!(c, '{' | '\\' | '[' | ']') {
                break;
            }
            if i == 0 && !escaped && matches!(c, '{' | '\\' | '[' | ']') {
                break;
            }
            end = i + c.len_utf8();
        }

        if end == 0 {
            return None;
        }

        let text = &self.rest[..end];
        self.rest = &self.rest[end..];
        Some(Span { text, color: self.color })
    }
}

/// Visible width of the text in terminal columns, control sequences excluded.
#[must_use]
pub fn visible_width(text: &str, shorten: bool) -> usize {
    tokens(text, shorten).map(|span| span.text.width()).sum()
}

/// The text with all markup stripped.
#[must_use]
pub fn plain_text(text: &str, shorten: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for span in tokens(text, shorten) {
        out.push_str(span.text);
    }
    out
}
