//! The item model and driver seam.

use std::fmt;
use std::io;
use std::time::Duration;

use statbar_core::event::DisplayEvent;
use statbar_core::markup;
use statbar_process::{RunContext, WatchError, exit_code};
use tracing::error;

use crate::wallclock::WallClock;

/// Markup prefix applied to inline error placeholders.
const ERROR_PREFIX: &str = "{ff0000}";

/// What broke inside an item driver.
#[derive(Debug)]
pub enum ItemError {
    /// No driver registered under the requested name.
    UnknownDriver(String),
    Io(io::Error),
    /// The backing child died; carries the raw wait status.
    ChildExited(i32),
    /// The backing child closed its output.
    EndOfStream,
    /// The process watch table rejected the backing child.
    Supervise(WatchError),
    /// A strftime-style format chrono refused to render.
    InvalidFormat,
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDriver(name) => write!(f, "no such item: {name}"),
            Self::Io(err) => write!(f, "read error: {err}"),
            Self::ChildExited(status) => {
                write!(f, "process ended with exit status {}", exit_code(*status))
            }
            Self::EndOfStream => write!(f, "EOF received"),
            Self::Supervise(err) => write!(f, "{err}"),
            Self::InvalidFormat => write!(f, "invalid time format"),
        }
    }
}

impl std::error::Error for ItemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Supervise(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ItemError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// The rendered state a driver writes into.
#[derive(Debug, Default)]
pub struct ItemBody {
    /// Markup text, as understood by `statbar_core::markup`.
    pub text: String,
    /// Minimum display width in terminal columns.
    pub min_width: usize,
}

/// Per-update state handed to a driver.
pub struct UpdateContext<'a> {
    /// Strictly increasing update pass counter.
    pub cycle: u64,
    /// Milliseconds since this driver last ran, skipped passes included.
    pub delay_ms: u64,
    /// The shared wall clock for this pass.
    pub clock: &'a WallClock,
    pub run: &'a mut RunContext,
}

/// One item driver. All methods default to no-ops except `update`.
pub trait Driver {
    /// Refresh the body. Returns the delay until the next timed wake, or
    /// `None` for a demand-driven item that only reacts to fd readiness
    /// (it still runs every pass, but contributes no deadline).
    fn update(
        &mut self,
        body: &mut ItemBody,
        cx: &mut UpdateContext<'_>,
    ) -> Result<Option<Duration>, ItemError>;

    /// React to a display event addressed at this item.
    fn on_event(&mut self, body: &mut ItemBody, event: &DisplayEvent) -> Result<(), ItemError> {
        let _ = (body, event);
        Ok(())
    }

    /// Release fds and other loop registrations. Child processes stay in the
    /// watch table; teardown signalling reaps them.
    fn finish(&mut self, run: &mut RunContext) {
        let _ = run;
    }
}

/// One segment of the status line.
pub struct Item {
    pub body: ItemBody,
    /// Remaining delay before the next timed update; `None` runs every pass.
    wake_ms: Option<u64>,
    delayed_ms: u64,
    driver: Option<Box<dyn Driver>>,
}

impl Item {
    #[must_use]
    pub fn new(driver: Box<dyn Driver>) -> Self {
        Self { body: ItemBody::default(), wake_ms: None, delayed_ms: 0, driver: Some(driver) }
    }

    /// Advance this item by `elapsed_ms`, running the driver when due.
    /// Returns the remaining delay to its next timed wake, if it has one.
    pub(crate) fn tick(
        &mut self,
        elapsed_ms: u64,
        cycle: u64,
        clock: &WallClock,
        run: &mut RunContext,
    ) -> Option<u64> {
        self.driver.as_ref()?;

        if let Some(wake) = self.wake_ms
            && wake > elapsed_ms
        {
            self.wake_ms = Some(wake - elapsed_ms);
            self.delayed_ms += elapsed_ms;
            return self.wake_ms;
        }

        let delay_ms = elapsed_ms + self.delayed_ms;
        self.delayed_ms = 0;
        let mut cx = UpdateContext { cycle, delay_ms, clock, run: &mut *run };
        let outcome = match self.driver.as_mut() {
            Some(driver) => driver.update(&mut self.body, &mut cx),
            None => return None,
        };
        match outcome {
            Ok(next) => {
                self.wake_ms = next.map(|d| d.as_millis() as u64);
                self.wake_ms
            }
            Err(err) => {
                self.fail(&err, run);
                None
            }
        }
    }

    pub(crate) fn dispatch(&mut self, event: &DisplayEvent, run: &mut RunContext) {
        let Some(driver) = self.driver.as_mut() else { return };
        if let Err(err) = driver.on_event(&mut self.body, event) {
            self.fail(&err, run);
        }
    }

    pub(crate) fn finish(&mut self, run: &mut RunContext) {
        if let Some(mut driver) = self.driver.take() {
            driver.finish(run);
        }
    }

    /// Replace the item in place with a red inline error; the driver is
    /// released and the item never updates again. The loop keeps running.
    fn fail(&mut self, err: &ItemError, run: &mut RunContext) {
        error!(%err, "item failed");
        self.finish(run);
        self.body.text = format!("{ERROR_PREFIX}{err}");
        self.wake_ms = None;
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.body.text
    }

    #[must_use]
    pub fn min_width(&self) -> usize {
        self.body.min_width
    }
}

/// Build a named item. `line` is the remainder of the config `item` line;
/// `block` is the indented block following it, if any.
pub fn create(
    name: &str,
    line: &str,
    block: Option<&str>,
    run: &mut RunContext,
) -> Result<Item, ItemError> {
    let (driver, seed_min_width): (Box<dyn Driver>, bool) = match name {
        "clock" => (Box::new(crate::clock::ClockDriver::new(line)), false),
        "cpu" => (Box::new(crate::cpu::CpuDriver::new(line)), true),
        "memory" => (Box::new(crate::memory::MemoryDriver::new(line)), true),
        "network" => (Box::new(crate::network::NetworkDriver::new(line)), true),
        "command" => (Box::new(crate::command::CommandDriver::spawn(line, block, run)?), false),
        other => return Err(ItemError::UnknownDriver(other.to_owned())),
    };

    let mut item = Item::new(driver);

    // Rate drivers report full utilization on their first sample, so the
    // seeding update renders the widest text the item will produce.
    let clock = WallClock::now();
    item.tick(0, 0, &clock, run);
    if seed_min_width {
        item.body.min_width = markup::visible_width(&item.body.text, false);
    }
    item.wake_ms = None;
    item.delayed_ms = 0;

    Ok(item)
}
