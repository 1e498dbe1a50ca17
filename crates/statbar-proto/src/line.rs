#![forbid(unsafe_code)]

//! Line protocol decoder.
//!
//! Recognizes ASCII lines of the form `click <index> <button> <position>\n`
//! where each field is a possibly-negative decimal integer and fields are
//! separated by whitespace. Any line that does not begin with the `click`
//! keyword is consumed up to its newline without producing an event.

use statbar_core::event::Click;

const KEYWORD: &[u8] = b"click";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    /// Start of a line, leading whitespace allowed.
    #[default]
    Ground,
    /// Matched this many bytes of the `click` keyword.
    Keyword(usize),
    /// Reading integer field 0..=2; slot 3 means all fields are complete and
    /// only the newline is outstanding.
    Field(usize),
    /// Unrecognized line, discarding to the newline.
    Invalid,
}

/// Resumable decoder for the line protocol.
#[derive(Debug, Default)]
pub struct LineDecoder {
    state: State,
    fields: [i32; 3],
    value: i64,
    negative: bool,
    seen_digit: bool,
}

impl LineDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; returns a click when it completes a valid line.
    pub fn push(&mut self, byte: u8) -> Option<Click> {
        match self.state {
            State::Ground => {
                if byte == KEYWORD[0] {
                    self.state = State::Keyword(1);
                } else if !byte.is_ascii_whitespace() {
                    self.state = State::Invalid;
                }
                None
            }
            State::Keyword(matched) => {
                if matched < KEYWORD.len() {
                    if byte == KEYWORD[matched] {
                        self.state = State::Keyword(matched + 1);
                    } else {
                        self.state = self.discard(byte);
                    }
                } else if byte == b'\n' {
                    self.state = State::Ground;
                } else if byte.is_ascii_whitespace() {
                    self.begin_field(0);
                } else {
                    self.state = State::Invalid;
                }
                None
            }
            State::Field(slot) => self.push_field(slot, byte),
            State::Invalid => {
                if byte == b'\n' {
                    self.state = State::Ground;
                }
                None
            }
        }
    }

    fn push_field(&mut self, slot: usize, byte: u8) -> Option<Click> {
        match byte {
            b'-' => {
                self.negative = true;
                None
            }
            b'0'..=b'9' if slot < 3 => {
                self.value = self.value * 10 + i64::from(byte - b'0');
                self.seen_digit = true;
                None
            }
            b'\n' => {
                let complete = slot == 3 || (slot == 2 && self.seen_digit);
                if slot == 2 && self.seen_digit {
                    self.commit_field(2);
                }
                let fields = self.fields;
                self.state = State::Ground;
                self.reset_fields();
                complete.then(|| Click {
                    index: fields[0],
                    button: fields[1],
                    position: fields[2],
                })
            }
            b if b.is_ascii_whitespace() => {
                if self.seen_digit && slot < 3 {
                    self.commit_field(slot);
                    self.begin_field(slot + 1);
                }
                None
            }
            _ => {
                self.state = State::Invalid;
                self.reset_fields();
                None
            }
        }
    }

    fn begin_field(&mut self, slot: usize) {
        self.state = State::Field(slot);
        self.value = 0;
        self.negative = false;
        self.seen_digit = false;
    }

    fn commit_field(&mut self, slot: usize) {
        let value = if self.negative { -self.value } else { self.value };
        self.fields[slot] = value as i32;
    }

    fn reset_fields(&mut self) {
        self.fields = [0; 3];
        self.value = 0;
        self.negative = false;
        self.seen_digit = false;
    }

    fn discard(&mut self, byte: u8) -> State {
        if byte == b'\n' { State::Ground } else { State::Invalid }
    }
}
