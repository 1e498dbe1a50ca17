#![forbid(unsafe_code)]

//! The event loop.
//!
//! Single-threaded: one readiness multiplex per pass, every read elsewhere
//! drains to `WouldBlock`. Per pass: drain display events and dispatch them,
//! advance item scheduling by the monotonic elapsed time, render, then block
//! until the earliest timed wake or fd readiness. The loop ends when the stop
//! flag is raised or the multiplex fails for real (interruption by a signal
//! is not a failure).

use std::fmt;
use std::io;
use std::time::Instant;

use statbar_display::{ActiveDisplay, DisplayError};
use statbar_items::Registry;
use statbar_process::RunContext;
use tracing::{debug, trace};

#[derive(Debug)]
pub enum LoopError {
    Poll(io::Error),
    Display(DisplayError),
}

impl fmt::Display for LoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poll(err) => write!(f, "readiness multiplex failed: {err}"),
            Self::Display(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for LoopError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Poll(err) => Some(err),
            Self::Display(err) => Some(err),
        }
    }
}

/// Drive the status line until the stop flag is raised.
pub fn run(
    run: &mut RunContext,
    items: &mut Registry,
    display: &mut ActiveDisplay,
) -> Result<(), LoopError> {
    let mut last_pass = Instant::now();

    while !run.stop.is_set() {
        while let Some(event) = display.poll(run) {
            trace!(?event, "display event");
            items.dispatch(&event, run);
        }

        let now = Instant::now();
        let elapsed_ms = now.duration_since(last_pass).as_millis() as u64;
        last_pass = now;

        let timeout = items.update_all(elapsed_ms, run);
        display.update_items(items.items(), run).map_err(LoopError::Display)?;

        // An item or display may raise the stop flag mid-pass; check again
        // before blocking, since nothing would wake an empty fd set.
        if run.stop.is_set() {
            break;
        }

        // `None` blocks until fd readiness or a signal; EINTR surfaces as
        // zero ready fds, not an error.
        run.poller.wait(timeout).map_err(LoopError::Poll)?;
        run.procs.reap_exited();
    }

    debug!("stop requested, leaving the loop");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use statbar_items::item::{Driver, Item, ItemBody, ItemError, UpdateContext};
    use statbar_process::StopFlag;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    struct StopAfter {
        cycles_left: Rc<Cell<u32>>,
    }

    impl Driver for StopAfter {
        fn update(
            &mut self,
            _body: &mut ItemBody,
            cx: &mut UpdateContext<'_>,
        ) -> Result<Option<Duration>, ItemError> {
            let left = self.cycles_left.get();
            if left == 0 {
                cx.run.stop.set();
                return Ok(None);
            }
            self.cycles_left.set(left - 1);
            Ok(Some(Duration::from_millis(5)))
        }
    }

    #[test]
    fn the_loop_runs_until_the_stop_flag() {
        let mut run_cx = RunContext::new(StopFlag);
        let cycles = Rc::new(Cell::new(3));
        let mut items = Registry::new();
        items.add(Item::new(Box::new(StopAfter { cycles_left: Rc::clone(&cycles) })));
        let mut display = ActiveDisplay::new();

        run(&mut run_cx, &mut items, &mut display).unwrap();
        assert_eq!(cycles.get(), 0);
        assert!(run_cx.stop.is_set());
    }
}
