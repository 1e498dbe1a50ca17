//! Local time item.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::{Local, TimeZone};

use crate::item::{Driver, ItemBody, ItemError, UpdateContext};

/// Renders the shared wall clock through a strftime-style format
/// (`chrono::format::strftime`). Wakes aligned to the next full second.
pub struct ClockDriver {
    format: String,
}

impl ClockDriver {
    #[must_use]
    pub fn new(line: &str) -> Self {
        let line = line.trim();
        let format = if line.is_empty() { "%H:%M:%S" } else { line };
        Self { format: format.to_owned() }
    }
}

impl Driver for ClockDriver {
    fn update(
        &mut self,
        body: &mut ItemBody,
        cx: &mut UpdateContext<'_>,
    ) -> Result<Option<Duration>, ItemError> {
        let now = Local
            .timestamp_opt(cx.clock.secs(), 0)
            .single()
            .unwrap_or_else(Local::now);

        // chrono surfaces an unknown %-escape as a fmt error during the
        // write, not during parsing.
        let mut text = String::new();
        write!(text, "{}", now.format(&self.format)).map_err(|_| ItemError::InvalidFormat)?;
        body.text = text;

        Ok(Some(Duration::from_millis(1000 - u64::from(cx.clock.msec()))))
    }
}
