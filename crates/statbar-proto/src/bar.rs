#![forbid(unsafe_code)]

//! Compositor protocol decoder.
//!
//! Scans a stream of JSON-like click objects as emitted by i3bar-compatible
//! bars. The only semantically meaningful keys are `name` (an item index,
//! read as the decimal digits after the literal `index_` prefix of the quoted
//! value) and `button` (the leading decimal digits of the value). Every other
//! key and value is skipped structurally: quoted values are consumed verbatim
//! with `\"` escapes honored, so a `}` inside a string is not structural;
//! unquoted values run to the next `,` or `}`. The structural closing `}`
//! always resets the scanner, emitting a click when both name and button were
//! captured in the object.

use statbar_core::event::{Click, POSITION_UNSUPPORTED};

/// Longest key worth remembering; anything longer cannot be `name`/`button`.
const MAX_KEY_LEN: usize = 32;

/// Bound on the buffered `name` value.
const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    /// Outside any object; array framing and separators are ignored.
    #[default]
    Ground,
    /// Inside an object, before a key.
    AwaitKey,
    /// Inside a quoted key.
    Key,
    KeyEscape,
    /// Key closed, awaiting the `:`.
    AfterKey,
    /// After the `:`, awaiting the value.
    ValueStart,
    /// Inside a quoted value.
    QuotedValue,
    QuotedEscape,
    /// Inside an unquoted value.
    BareValue,
    /// Value finished, awaiting `,` or `}`.
    AfterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum KeyKind {
    Name,
    Button,
    #[default]
    Other,
}

/// Resumable decoder for the compositor click protocol.
#[derive(Debug, Default)]
pub struct BarDecoder {
    state: State,
    key: String,
    kind: KeyKind,
    name_value: String,
    bare_value: i64,
    bare_started: bool,
    bare_done: bool,
    index: Option<i32>,
    button: Option<i32>,
}

impl BarDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; returns a click when a completed object captured both
    /// a `name` index and a `button`.
    pub fn push(&mut self, byte: u8) -> Option<Click> {
        let c = byte as char;
        match self.state {
            State::Ground => {
                if c == '{' {
                    self.index = None;
                    self.button = None;
                    self.state = State::AwaitKey;
                }
                None
            }
            State::AwaitKey => match c {
                '"' => {
                    self.key.clear();
                    self.state = State::Key;
                    None
                }
                '}' => self.close_object(),
                _ => None,
            },
            State::Key => {
                match c {
                    '"' => {
                        self.kind = classify(&self.key);
                        self.state = State::AfterKey;
                    }
                    '\\' => self.state = State::KeyEscape,
                    _ => {
                        if self.key.len() < MAX_KEY_LEN {
                            self.key.push(c);
                        }
                    }
                }
                None
            }
            State::KeyEscape => {
                self.state = State::Key;
                None
            }
            State::AfterKey => match c {
                ':' => {
                    self.begin_value();
                    None
                }
                ',' => {
                    self.state = State::AwaitKey;
                    None
                }
                '}' => self.close_object(),
                _ => None,
            },
            State::ValueStart => match c {
                '"' => {
                    self.state = State::QuotedValue;
                    None
                }
                ',' => {
                    self.state = State::AwaitKey;
                    None
                }
                '}' => self.close_object(),
                c if c.is_whitespace() => None,
                _ => {
                    self.state = State::BareValue;
                    self.bare_byte(c);
                    None
                }
            },
            State::QuotedValue => {
                match c {
                    '"' => {
                        self.finish_quoted();
                        self.state = State::AfterValue;
                    }
                    '\\' => self.state = State::QuotedEscape,
                    _ => {
                        if self.kind == KeyKind::Name && self.name_value.len() < MAX_NAME_LEN {
                            self.name_value.push(c);
                        }
                    }
                }
                None
            }
            State::QuotedEscape => {
                self.state = State::QuotedValue;
                None
            }
            State::BareValue => match c {
                ',' => {
                    self.finish_bare();
                    self.state = State::AwaitKey;
                    None
                }
                '}' => {
                    self.finish_bare();
                    self.close_object()
                }
                _ => {
                    self.bare_byte(c);
                    None
                }
            },
            State::AfterValue => match c {
                ',' => {
                    self.state = State::AwaitKey;
                    None
                }
                '}' => self.close_object(),
                _ => None,
            },
        }
    }

    fn begin_value(&mut self) {
        self.state = State::ValueStart;
        self.name_value.clear();
        self.bare_value = 0;
        self.bare_started = false;
        self.bare_done = false;
    }

    fn bare_byte(&mut self, c: char) {
        if self.kind != KeyKind::Button {
            return;
        }
        if let Some(digit) = c.to_digit(10) {
            if !self.bare_done {
                self.bare_value = self.bare_value * 10 + i64::from(digit);
                self.bare_started = true;
            }
        } else if self.bare_started {
            self.bare_done = true;
        }
    }

    fn finish_bare(&mut self) {
        if self.kind == KeyKind::Button && self.bare_started {
            self.button = Some(self.bare_value as i32);
        }
    }

    fn finish_quoted(&mut self) {
        if self.kind == KeyKind::Name
            && let Some(index) = parse_index(&self.name_value)
        {
            self.index = Some(index);
        }
    }

    fn close_object(&mut self) -> Option<Click> {
        let event = match (self.index, self.button) {
            (Some(index), Some(button)) => {
                Some(Click { index, button, position: POSITION_UNSUPPORTED })
            }
            _ => None,
        };
        self.index = None;
        self.button = None;
        self.state = State::Ground;
        event
    }
}

fn classify(key: &str) -> KeyKind {
    match key {
        "name" => KeyKind::Name,
        "button" => KeyKind::Button,
        _ => KeyKind::Other,
    }
}

/// `index_<digits>` → the digits, anything else → no index.
fn parse_index(value: &str) -> Option<i32> {
    let digits = value.strip_prefix("index_")?;
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse().ok()
}
