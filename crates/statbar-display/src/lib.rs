#![forbid(unsafe_code)]

//! Display drivers.
//!
//! A display owns the outward surface of the status line: it renders the item
//! set on each refresh and feeds inbound events back to the loop. Exactly one
//! display is active at a time; all of its capabilities besides `update_items`
//! may be no-ops. Drivers: `standard` (terminal), `i3bar` (the compositor
//! JSON protocol), `command` (an external program on fds 3 and 4).

pub mod command;
pub mod i3bar;
pub mod standard;

use std::fmt;
use std::io;

use statbar_core::event::DisplayEvent;
use statbar_items::Item;
use statbar_process::{RunContext, WatchError};
use tracing::debug;

pub use command::CommandDisplay;
pub use i3bar::I3barDisplay;
pub use standard::StandardDisplay;

#[derive(Debug)]
pub enum DisplayError {
    Io(io::Error),
    Supervise(WatchError),
    UnknownDriver(String),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "display I/O failed: {err}"),
            Self::Supervise(err) => write!(f, "{err}"),
            Self::UnknownDriver(name) => write!(f, "no such display: {name}"),
        }
    }
}

impl std::error::Error for DisplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Supervise(err) => Some(err),
            Self::UnknownDriver(_) => None,
        }
    }
}

impl From<io::Error> for DisplayError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// One display driver. `set` receives the remainder of the config `display`
/// line; `start`/`finish` bracket the run; `poll` must never block.
pub trait Display {
    /// Apply driver options from the config line.
    fn set(&mut self, line: &str) {
        let _ = line;
    }

    fn start(&mut self, run: &mut RunContext) -> Result<(), DisplayError> {
        let _ = run;
        Ok(())
    }

    fn finish(&mut self, run: &mut RunContext) {
        let _ = run;
    }

    /// Render one refresh of the whole status line.
    fn update_items(&mut self, items: &[Item], run: &mut RunContext) -> Result<(), DisplayError>;

    /// Drain available input and return at most one decoded event. Decoder
    /// state persists across calls.
    fn poll(&mut self, run: &mut RunContext) -> Option<DisplayEvent> {
        let _ = run;
        None
    }
}

/// The single active display. Selecting a new driver finishes the old one
/// first; rendering before a successful `start` is a no-op.
pub struct ActiveDisplay {
    driver: Box<dyn Display>,
    started: bool,
}

impl Default for ActiveDisplay {
    fn default() -> Self {
        Self { driver: Box::new(StandardDisplay::new()), started: false }
    }
}

impl ActiveDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in the named driver and hand it the rest of the display line.
    pub fn select(&mut self, name: &str, line: &str, run: &mut RunContext) -> Result<(), DisplayError> {
        let mut driver: Box<dyn Display> = match name {
            "standard" => Box::new(StandardDisplay::new()),
            "i3bar" => Box::new(I3barDisplay::new()),
            "command" => Box::new(CommandDisplay::new()),
            other => return Err(DisplayError::UnknownDriver(other.to_owned())),
        };
        debug!(display = name, "selected display driver");
        driver.set(line);

        if self.started {
            self.driver.finish(run);
            self.started = false;
        }
        self.driver = driver;
        Ok(())
    }

    pub fn start(&mut self, run: &mut RunContext) -> Result<(), DisplayError> {
        self.driver.start(run)?;
        self.started = true;
        Ok(())
    }

    pub fn finish(&mut self, run: &mut RunContext) {
        if self.started {
            self.driver.finish(run);
            self.started = false;
        }
    }

    pub fn update_items(&mut self, items: &[Item], run: &mut RunContext) -> Result<(), DisplayError> {
        if !self.started {
            return Ok(());
        }
        self.driver.update_items(items, run)
    }

    pub fn poll(&mut self, run: &mut RunContext) -> Option<DisplayEvent> {
        if !self.started {
            return None;
        }
        self.driver.poll(run)
    }
}
