//! i3bar protocol display.
//!
//! Emits the handshake header and an endless JSON array of per-refresh block
//! arrays on stdout, and decodes click objects from non-blocking stdin.
//! Options: `align={left,right,center}`, `separator={true,false}`,
//! `spacing=N`.

use std::collections::VecDeque;
use std::io::{self, Write};

use serde::Serialize;
use statbar_core::event::DisplayEvent;
use statbar_core::markup;
use statbar_core::options::{OptionSpec, option_line};
use statbar_items::Item;
use statbar_process::fd::{read_raw, set_nonblocking};
use statbar_process::RunContext;
use statbar_proto::BarDecoder;
use tracing::warn;

use crate::{Display, DisplayError};

const STDIN: i32 = 0;

const OPTIONS: &[OptionSpec] = &[
    OptionSpec { name: "align", code: 'a' },
    OptionSpec { name: "separator", code: 'b' },
    OptionSpec { name: "spacing", code: 's' },
];

#[derive(Serialize)]
struct Block<'a> {
    /// `index_N`; echoed back by the bar in click events.
    name: String,
    full_text: String,
    short_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    separator: bool,
    separator_block_width: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    align: Option<&'a str>,
}

pub struct I3barDisplay {
    alignment: &'static str,
    separator: bool,
    spacing: u32,
    first_batch: bool,
    decoder: BarDecoder,
    pending: VecDeque<u8>,
}

impl Default for I3barDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl I3barDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self {
            alignment: "center",
            separator: true,
            spacing: 21,
            first_batch: true,
            decoder: BarDecoder::new(),
            pending: VecDeque::new(),
        }
    }

    fn block<'a>(&'a self, index: usize, item: &Item) -> Block<'a> {
        let sized = item.min_width() > 0;
        Block {
            name: format!("index_{index}"),
            full_text: markup::plain_text(item.text(), false),
            short_text: markup::plain_text(item.text(), true),
            color: markup::tokens(item.text(), false)
                .find_map(|span| span.color)
                .map(|color| format!("#{:06x}", color.rgb())),
            separator: self.separator,
            separator_block_width: self.spacing,
            min_width: sized.then(|| " ".repeat(item.min_width())),
            align: sized.then_some(self.alignment),
        }
    }

    fn batch(&self, items: &[Item]) -> Result<String, DisplayError> {
        let blocks: Vec<Block<'_>> = items
            .iter()
            .enumerate()
            .map(|(index, item)| self.block(index, item))
            .collect();
        serde_json::to_string(&blocks).map_err(|err| DisplayError::Io(err.into()))
    }
}

impl Display for I3barDisplay {
    fn set(&mut self, line: &str) {
        for (code, value) in option_line(line, OPTIONS) {
            match code {
                'a' => match value.chars().next() {
                    Some('l' | 'L') => self.alignment = "left",
                    Some('r' | 'R') => self.alignment = "right",
                    Some('c' | 'C') => self.alignment = "center",
                    _ => {}
                },
                'b' => match value.chars().next() {
                    Some('t' | 'T') => self.separator = true,
                    Some('f' | 'F') => self.separator = false,
                    _ => {}
                },
                's' => {
                    if let Ok(spacing) = value.parse() {
                        self.spacing = spacing;
                    }
                }
                _ => {}
            }
        }
    }

    fn start(&mut self, run: &mut RunContext) -> Result<(), DisplayError> {
        set_nonblocking(STDIN)?;
        run.poller.watch(STDIN);

        let mut stdout = io::stdout().lock();
        stdout.write_all(b"{\"version\":1,\"click_events\":true}\n[\n")?;
        stdout.flush()?;
        Ok(())
    }

    fn finish(&mut self, run: &mut RunContext) {
        run.poller.unwatch(STDIN);
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(b"]\n");
        let _ = stdout.flush();
    }

    fn update_items(&mut self, items: &[Item], _run: &mut RunContext) -> Result<(), DisplayError> {
        let batch = self.batch(items)?;
        let mut stdout = io::stdout().lock();
        if self.first_batch {
            self.first_batch = false;
        } else {
            stdout.write_all(b",")?;
        }
        stdout.write_all(batch.as_bytes())?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
        Ok(())
    }

    fn poll(&mut self, run: &mut RunContext) -> Option<DisplayEvent> {
        if self.pending.is_empty() {
            if !run.poller.is_ready(STDIN) {
                return None;
            }
            let mut buf = [0u8; 256];
            loop {
                match read_raw(STDIN, &mut buf) {
                    Ok(0) => {
                        warn!("EOF on the bar's event stream");
                        run.poller.unwatch(STDIN);
                        break;
                    }
                    Ok(n) => self.pending.extend(&buf[..n]),
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                    Err(err) => {
                        warn!(%err, "cannot read the bar's event stream");
                        run.poller.unwatch(STDIN);
                        break;
                    }
                }
            }
        }

        // One event per call; undecoded bytes stay queued for the next.
        while let Some(byte) = self.pending.pop_front() {
            if let Some(click) = self.decoder.push(byte) {
                return Some(DisplayEvent::Click(click));
            }
        }
        None
    }
}
