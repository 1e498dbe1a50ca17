//! External command item.
//!
//! Runs a program whose stdout lines become the item text; `!N` lines set the
//! minimum width instead. Display events are fed back on the child's stdin as
//! `click <button> <position>` lines. With no program on the item line the
//! stock runner `statbar-command` is used, and the config block (when
//! present) is appended as the final argument either way.

use std::fs::File;
use std::io::{self, Read, Write};
use std::mem;
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

use statbar_core::event::DisplayEvent;
use statbar_process::{Redirect, RunContext, parse_argv, pid_t, spawn};

use crate::item::{Driver, ItemBody, ItemError, UpdateContext};

const DEFAULT_RUNNER: &str = "statbar-command";

pub struct CommandDriver {
    pid: pid_t,
    read_fd: RawFd,
    from_child: Option<File>,
    to_child: Option<File>,
    /// Line under construction, swapped into the body on newline.
    reading: Vec<u8>,
}

impl CommandDriver {
    /// Spawn the program and register its output pipe with the loop.
    pub fn spawn(
        line: &str,
        block: Option<&str>,
        run: &mut RunContext,
    ) -> Result<Self, ItemError> {
        let mut argv = parse_argv(line);
        if argv.is_empty() {
            argv.push(DEFAULT_RUNNER.to_owned());
        }
        if let Some(block) = block {
            argv.push(block.to_owned());
        }

        let spawned = spawn(&argv, &[Redirect::write_to(0), Redirect::read_from(1)])?;
        run.procs.watch(spawned.pid).map_err(ItemError::Supervise)?;

        let mut fds = spawned.fds.into_iter();
        let to_child = fds.next().map(File::from);
        let from_child = fds.next().map(File::from);
        let read_fd = from_child.as_ref().map_or(-1, |f| f.as_raw_fd());
        run.poller.watch(read_fd);

        Ok(Self { pid: spawned.pid, read_fd, from_child, to_child, reading: Vec::new() })
    }

    #[must_use]
    pub fn read_fd(&self) -> RawFd {
        self.read_fd
    }

    fn commit_line(&mut self, body: &mut ItemBody) {
        if self.reading.first() == Some(&b'!') {
            // !N sets the minimum width; the line is not displayed.
            let digits: Vec<u8> = self.reading[1..]
                .iter()
                .copied()
                .take_while(u8::is_ascii_digit)
                .collect();
            body.min_width = String::from_utf8_lossy(&digits).parse().unwrap_or(0);
            self.reading.clear();
        } else {
            body.text = String::from_utf8_lossy(&mem::take(&mut self.reading)).into_owned();
        }
    }
}

impl Driver for CommandDriver {
    fn update(
        &mut self,
        body: &mut ItemBody,
        cx: &mut UpdateContext<'_>,
    ) -> Result<Option<Duration>, ItemError> {
        if let Some(statbar_process::ProcessStatus::Exited(status)) =
            cx.run.procs.status(self.pid)
        {
            return Err(ItemError::ChildExited(status));
        }
        if !cx.run.poller.is_ready(self.read_fd) {
            return Ok(None);
        }

        let mut incoming = Vec::new();
        let mut eof = false;
        {
            let Some(file) = self.from_child.as_mut() else {
                return Err(ItemError::EndOfStream);
            };
            let mut buf = [0u8; 256];
            loop {
                match file.read(&mut buf) {
                    Ok(0) => {
                        eof = true;
                        break;
                    }
                    Ok(n) => incoming.extend_from_slice(&buf[..n]),
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                    Err(err) => return Err(ItemError::Io(err)),
                }
            }
        }

        for &byte in &incoming {
            if byte == b'\n' {
                self.commit_line(body);
            } else {
                self.reading.push(byte);
            }
        }

        if eof {
            return Err(ItemError::EndOfStream);
        }
        Ok(None)
    }

    fn on_event(&mut self, _body: &mut ItemBody, event: &DisplayEvent) -> Result<(), ItemError> {
        if let DisplayEvent::Click(click) = event
            && let Some(file) = self.to_child.as_mut()
        {
            writeln!(file, "click {} {}", click.button, click.position)?;
        }
        Ok(())
    }

    fn finish(&mut self, run: &mut RunContext) {
        run.poller.unwatch(self.read_fd);
        self.from_child = None;
        self.to_child = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallclock::WallClock;
    use statbar_process::{SIGKILL, StopFlag};
    use std::sync::Mutex;
    use std::time::Instant;

    // signal_all_and_wait reaps with waitpid(-1); run one child-spawning
    // test at a time so exits are not collected by a concurrent test.
    static CHILD_LOCK: Mutex<()> = Mutex::new(());

    fn wait_for_output(run: &mut RunContext, fd: RawFd) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !run.poller.is_ready(fd) {
            assert!(Instant::now() < deadline, "child produced no output");
            run.poller.wait(Some(Duration::from_millis(50))).unwrap();
        }
    }

    fn update_once(
        driver: &mut CommandDriver,
        body: &mut ItemBody,
        run: &mut RunContext,
    ) -> Result<Option<Duration>, ItemError> {
        let clock = WallClock::now();
        let mut cx = UpdateContext { cycle: 1, delay_ms: 100, clock: &clock, run };
        driver.update(body, &mut cx)
    }

    #[test]
    fn lines_become_text_and_bang_lines_set_the_width() {
        let _guard = CHILD_LOCK.lock().unwrap();
        let mut run = RunContext::new(StopFlag);
        let mut driver = CommandDriver::spawn(
            "sh -c \"echo !7; echo hello; sleep 5\"",
            None,
            &mut run,
        )
        .unwrap();
        let mut body = ItemBody::default();

        // The child emits `!7\n` and `hello\n` as separate writes; keep
        // polling until the text line has arrived.
        let deadline = Instant::now() + Duration::from_secs(5);
        while body.text.is_empty() {
            assert!(Instant::now() < deadline, "child produced no output");
            run.poller.wait(Some(Duration::from_millis(50))).unwrap();
            update_once(&mut driver, &mut body, &mut run).unwrap();
        }

        assert_eq!(body.text, "hello");
        assert_eq!(body.min_width, 7);

        driver.finish(&mut run);
        run.procs.signal_all_and_wait(SIGKILL, 0);
    }

    #[test]
    fn clicks_round_trip_through_the_child() {
        let _guard = CHILD_LOCK.lock().unwrap();
        let mut run = RunContext::new(StopFlag);
        let mut driver = CommandDriver::spawn(
            "sh -c \"read ev; echo got $ev; sleep 5\"",
            None,
            &mut run,
        )
        .unwrap();
        let mut body = ItemBody::default();

        let click = statbar_core::event::Click { index: 0, button: 3, position: 12 };
        driver
            .on_event(&mut body, &DisplayEvent::Click(click))
            .unwrap();

        wait_for_output(&mut run, driver.read_fd());
        update_once(&mut driver, &mut body, &mut run).unwrap();
        assert_eq!(body.text, "got click 3 12");

        driver.finish(&mut run);
        run.procs.signal_all_and_wait(SIGKILL, 0);
    }

    #[test]
    fn a_reaped_child_surfaces_as_an_error() {
        let _guard = CHILD_LOCK.lock().unwrap();
        let mut run = RunContext::new(StopFlag);
        let mut driver = CommandDriver::spawn("sh -c \"exit 3\"", None, &mut run).unwrap();
        let mut body = ItemBody::default();

        // Block until the exit is recorded, then the next update must fail.
        run.procs.signal_all_and_wait(0, 1);
        let err = update_once(&mut driver, &mut body, &mut run).unwrap_err();
        assert!(matches!(err, ItemError::ChildExited(_)));
    }

    #[test]
    fn the_config_block_is_appended_as_an_argument() {
        let _guard = CHILD_LOCK.lock().unwrap();
        let mut run = RunContext::new(StopFlag);
        let mut driver = CommandDriver::spawn(
            "sh -c \"echo $0; sleep 5\" ",
            Some("from-block"),
            &mut run,
        )
        .unwrap();
        let mut body = ItemBody::default();

        wait_for_output(&mut run, driver.read_fd());
        update_once(&mut driver, &mut body, &mut run).unwrap();
        assert_eq!(body.text, "from-block");

        driver.finish(&mut run);
        run.procs.signal_all_and_wait(SIGKILL, 0);
    }
}
