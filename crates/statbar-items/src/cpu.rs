//! CPU utilization item, fed by `/proc/stat`.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use statbar_core::format::{self, SpecCursor};
use statbar_process::clock_ticks_per_sec;

use crate::item::{Driver, ItemBody, ItemError, UpdateContext};

/// Specs: `%p` total percentage (one decimal), `%cN` core N percentage,
/// `%C<sep>` every core joined by `sep` (default `" | "`). Each accepts a
/// trailing comparison clause. The first sample reports full utilization so
/// the seeded text is the widest the item will render.
pub struct CpuDriver {
    format_line: String,
    path: PathBuf,
    jiffies: i64,
    /// Previous jiffy sums per slot, slot 0 the aggregate row; -1 until the
    /// first sample.
    sums: Vec<i64>,
    /// Utilization percentages per slot, slot 0 the sum over cores.
    usage: Vec<i64>,
}

impl CpuDriver {
    #[must_use]
    pub fn new(line: &str) -> Self {
        Self::with_path(line, "/proc/stat".into())
    }

    fn with_path(line: &str, path: PathBuf) -> Self {
        Self {
            format_line: line.trim().to_owned(),
            path,
            jiffies: clock_ticks_per_sec(),
            sums: Vec::new(),
            usage: Vec::new(),
        }
    }

    fn recalculate(&mut self, delay_ms: u64) -> Result<(), ItemError> {
        let stat = fs::read_to_string(&self.path)?;

        let mut samples = Vec::new();
        for line in stat.lines() {
            let Some(rest) = line.strip_prefix("cpu") else { continue };
            let mut fields = rest.split_whitespace();
            let slot = if rest.starts_with(|c: char| c.is_ascii_digit()) {
                match fields.next().and_then(|t| t.parse::<usize>().ok()) {
                    Some(core) => core + 1,
                    None => continue,
                }
            } else {
                0
            };
            let mut jiffy_field = || -> i64 {
                fields.next().and_then(|t| t.parse().ok()).unwrap_or(0)
            };
            // user + nice + system
            let sum = jiffy_field() + jiffy_field() + jiffy_field();
            samples.push((slot, sum));
        }

        let slots = samples.iter().map(|&(slot, _)| slot + 1).max().unwrap_or(0);
        if self.sums.len() < slots {
            self.sums.resize(slots, -1);
            self.usage.resize(slots, 0);
        }
        let cores = self.cores() as i64;

        for (slot, sum) in samples {
            if self.sums[slot] < 0 {
                self.sums[slot] = sum;
                self.usage[slot] = if slot == 0 { 100 * cores } else { 100 };
            } else if delay_ms > 0 {
                let delta = sum - self.sums[slot];
                self.sums[slot] = sum;
                self.usage[slot] = delta * 100_000 / delay_ms as i64 / self.jiffies;
            }
        }
        Ok(())
    }

    fn cores(&self) -> usize {
        self.usage.len().saturating_sub(1).max(1)
    }
}

impl Driver for CpuDriver {
    fn update(
        &mut self,
        body: &mut ItemBody,
        cx: &mut UpdateContext<'_>,
    ) -> Result<Option<Duration>, ItemError> {
        self.recalculate(cx.delay_ms)?;

        let usage = &self.usage;
        let cores = self.cores();
        body.text = format::expand(&self.format_line, |cursor| resolve(usage, cores, cursor));

        Ok(Some(Duration::from_millis(
            500 - u64::from(cx.clock.msec()) % 500,
        )))
    }
}

fn resolve(usage: &[i64], cores: usize, cursor: &mut SpecCursor<'_>) -> Option<String> {
    match cursor.peek()? {
        'p' => {
            cursor.bump();
            let total = usage.first().copied().unwrap_or(0);
            let percent = total as f64 / cores as f64;
            if let Some(text) = cursor.read_comparison(percent as i64) {
                return Some(text.to_owned());
            }
            Some(format!("{percent:.1}"))
        }
        'c' => {
            cursor.bump();
            let slot = cursor.read_uint()? as usize + 1;
            let value = *usage.get(slot)?;
            if let Some(text) = cursor.read_comparison(value) {
                return Some(text.to_owned());
            }
            Some(value.to_string())
        }
        'C' => {
            cursor.bump();
            let separator = cursor.read_angle_group().unwrap_or(" | ");
            let cores: Vec<String> = usage.iter().skip(1).map(i64::to_string).collect();
            Some(cores.join(separator))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallclock::WallClock;
    use statbar_process::{RunContext, StopFlag};
    use std::io::Write;

    fn stat_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    fn driver_over(file: &tempfile::NamedTempFile, line: &str) -> CpuDriver {
        let mut driver = CpuDriver::with_path(line, file.path().to_path_buf());
        driver.jiffies = 100;
        driver
    }

    const FIRST: &str = "cpu  100 0 100 5000\ncpu0 50 0 50 2500\ncpu1 50 0 50 2500\n";
    const SECOND: &str = "cpu  190 0 190 5400\ncpu0 140 0 50 2700\ncpu1 60 0 130 2700\n";

    fn updated(driver: &mut CpuDriver, delay_ms: u64) -> String {
        let mut body = ItemBody::default();
        let mut run = RunContext::new(StopFlag);
        let clock = WallClock::now();
        let mut cx = UpdateContext { cycle: 0, delay_ms, clock: &clock, run: &mut run };
        driver.update(&mut body, &mut cx).unwrap();
        body.text
    }

    #[test]
    fn first_sample_reports_full_utilization() {
        let file = stat_file(FIRST);
        let mut driver = driver_over(&file, "%p%% %C");
        assert_eq!(updated(&mut driver, 0), "100.0% 100 | 100");
    }

    #[test]
    fn usage_follows_the_jiffy_delta() {
        let file = stat_file(FIRST);
        let mut driver = driver_over(&file, "%p %c0 %c1");
        updated(&mut driver, 0);

        std::fs::write(file.path(), SECOND).unwrap();
        // 90 jiffies per core over 1000 ms at 100 Hz = 90% per core.
        assert_eq!(updated(&mut driver, 1000), "90.0 90 90");
    }

    #[test]
    fn comparison_clause_substitutes_a_literal() {
        let file = stat_file(FIRST);
        let mut driver = driver_over(&file, "%p>90<hot>%p<=90<cool>");
        assert_eq!(updated(&mut driver, 0), "hot");
    }

    #[test]
    fn custom_core_separator() {
        let file = stat_file(FIRST);
        let mut driver = driver_over(&file, "%C</>");
        assert_eq!(updated(&mut driver, 0), "100/100");
    }

    #[test]
    fn missing_stat_file_is_an_error() {
        let mut driver = CpuDriver::with_path("%p", "/nonexistent/stat".into());
        let mut body = ItemBody::default();
        let mut run = RunContext::new(StopFlag);
        let clock = WallClock::now();
        let mut cx = UpdateContext { cycle: 0, delay_ms: 0, clock: &clock, run: &mut run };
        assert!(driver.update(&mut body, &mut cx).is_err());
    }
}
