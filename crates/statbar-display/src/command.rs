//! External program display.
//!
//! Spawns the program named on the display line, feeds it status lines on
//! its fd 3 (`<min_width>:<text>` per item, an empty line ending each batch)
//! and decodes line-protocol click events from its fd 4. The child dying
//! stops the whole run.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};

use statbar_core::event::DisplayEvent;
use statbar_items::Item;
use statbar_process::{Redirect, RunContext, parse_argv, pid_t, spawn};
use statbar_proto::LineDecoder;
use tracing::{error, warn};

use crate::{Display, DisplayError};

const STATUS_FD: RawFd = 3;
const EVENTS_FD: RawFd = 4;

pub struct CommandDisplay {
    argv: Vec<String>,
    pid: Option<pid_t>,
    /// Child's fd 3: where status lines go.
    to_child: Option<File>,
    /// Child's fd 4: where events come from.
    from_child: Option<File>,
    read_fd: RawFd,
    decoder: LineDecoder,
    pending: VecDeque<u8>,
}

impl Default for CommandDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self {
            argv: Vec::new(),
            pid: None,
            to_child: None,
            from_child: None,
            read_fd: -1,
            decoder: LineDecoder::new(),
            pending: VecDeque::new(),
        }
    }
}

impl Display for CommandDisplay {
    fn set(&mut self, line: &str) {
        self.argv = parse_argv(line);
    }

    fn start(&mut self, run: &mut RunContext) -> Result<(), DisplayError> {
        if self.argv.is_empty() {
            return Err(DisplayError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "command display needs a program on the display line",
            )));
        }

        let spawned = spawn(
            &self.argv,
            &[Redirect::write_to(STATUS_FD), Redirect::read_from(EVENTS_FD)],
        )?;
        run.procs.watch(spawned.pid).map_err(DisplayError::Supervise)?;

        let mut fds = spawned.fds.into_iter();
        self.to_child = fds.next().map(File::from);
        self.from_child = fds.next().map(File::from);
        self.read_fd = self.from_child.as_ref().map_or(-1, |f| f.as_raw_fd());
        run.poller.watch(self.read_fd);
        self.pid = Some(spawned.pid);
        Ok(())
    }

    fn finish(&mut self, run: &mut RunContext) {
        run.poller.unwatch(self.read_fd);
        self.to_child = None;
        self.from_child = None;
    }

    fn update_items(&mut self, items: &[Item], run: &mut RunContext) -> Result<(), DisplayError> {
        if let Some(pid) = self.pid
            && let Some(statbar_process::ProcessStatus::Exited(_)) = run.procs.status(pid)
        {
            error!(pid, "display program ended unexpectedly");
            run.stop.set();
            return Ok(());
        }

        let Some(out) = self.to_child.as_mut() else { return Ok(()) };
        let mut batch = String::new();
        for item in items {
            batch.push_str(&format!("{}:{}\n", item.min_width(), item.text()));
        }
        batch.push('\n');
        out.write_all(batch.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    fn poll(&mut self, run: &mut RunContext) -> Option<DisplayEvent> {
        if self.pending.is_empty() {
            if !run.poller.is_ready(self.read_fd) {
                return None;
            }
            let file = self.from_child.as_mut()?;
            let mut buf = [0u8; 256];
            loop {
                match file.read(&mut buf) {
                    Ok(0) => {
                        warn!("EOF on the display program's event stream");
                        run.poller.unwatch(self.read_fd);
                        break;
                    }
                    Ok(n) => self.pending.extend(&buf[..n]),
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                    Err(err) => {
                        warn!(%err, "cannot read the display program's events");
                        run.poller.unwatch(self.read_fd);
                        break;
                    }
                }
            }
        }

        while let Some(byte) = self.pending.pop_front() {
            if let Some(click) = self.decoder.push(byte) {
                return Some(DisplayEvent::Click(click));
            }
        }
        None
    }
}
