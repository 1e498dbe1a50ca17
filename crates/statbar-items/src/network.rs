//! Network throughput item, fed by `/proc/net/dev`.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use statbar_core::format::{self, SpecCursor};
use tracing::warn;

use crate::item::{Driver, ItemBody, ItemError, UpdateContext};

/// The item line is `<iface> <format>`; `*` sums every interface. Specs:
/// `%d`/`%u` total bytes received/transmitted, `%D`/`%U` the current rate in
/// bytes per second computed from the update delay. Figures are humanized
/// with power-of-1000 prefixes.
pub struct NetworkDriver {
    iface: String,
    format_line: String,
    path: PathBuf,
    bytes_in: i64,
    bytes_in_last: i64,
    bytes_out: i64,
    bytes_out_last: i64,
    delay_ms: u64,
}

struct Rates {
    bytes_in: i64,
    bytes_in_last: i64,
    bytes_out: i64,
    bytes_out_last: i64,
    delay_ms: u64,
}

impl NetworkDriver {
    #[must_use]
    pub fn new(line: &str) -> Self {
        Self::with_path(line, "/proc/net/dev".into())
    }

    fn with_path(line: &str, path: PathBuf) -> Self {
        let line = line.trim();
        let (iface, format_line) = match line.split_once(char::is_whitespace) {
            Some((iface, rest)) => (iface, rest.trim_start()),
            None => (line, ""),
        };
        Self {
            iface: iface.to_owned(),
            format_line: format_line.to_owned(),
            path,
            bytes_in: 0,
            bytes_in_last: 0,
            bytes_out: 0,
            bytes_out_last: 0,
            delay_ms: 0,
        }
    }

    fn read_counters(&mut self) {
        self.bytes_in_last = self.bytes_in;
        self.bytes_out_last = self.bytes_out;
        self.bytes_in = 0;
        self.bytes_out = 0;

        let table = match fs::read_to_string(&self.path) {
            Ok(table) => table,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "cannot read interface counters");
                return;
            }
        };

        // Rows are "<iface>: <16 counters>"; received bytes is the first
        // field, transmitted bytes the ninth. Header lines carry no colon.
        for line in table.lines() {
            let Some((name, counters)) = line.split_once(':') else { continue };
            if self.iface != "*" && name.trim() != self.iface {
                continue;
            }
            let mut fields = counters.split_whitespace();
            let down: i64 = fields.next().and_then(|t| t.parse().ok()).unwrap_or(0);
            let up: i64 = fields.nth(7).and_then(|t| t.parse().ok()).unwrap_or(0);
            self.bytes_in += down;
            self.bytes_out += up;
        }
    }
}

impl Driver for NetworkDriver {
    fn update(
        &mut self,
        body: &mut ItemBody,
        cx: &mut UpdateContext<'_>,
    ) -> Result<Option<Duration>, ItemError> {
        self.delay_ms = cx.delay_ms;
        self.read_counters();

        let rates = Rates {
            bytes_in: self.bytes_in,
            bytes_in_last: self.bytes_in_last,
            bytes_out: self.bytes_out,
            bytes_out_last: self.bytes_out_last,
            delay_ms: self.delay_ms,
        };
        body.text = format::expand(&self.format_line, |cursor| resolve(&rates, cursor));

        Ok(Some(Duration::from_millis(
            500 - u64::from(cx.clock.msec()) % 500,
        )))
    }
}

fn resolve(rates: &Rates, cursor: &mut SpecCursor<'_>) -> Option<String> {
    let per_ms = |current: i64, last: i64| {
        if rates.delay_ms > 0 {
            (current - last) * 1000 / rates.delay_ms as i64
        } else {
            999_999
        }
    };

    let (amount, per_second) = match cursor.peek()? {
        'd' => (rates.bytes_in, false),
        'D' => (per_ms(rates.bytes_in, rates.bytes_in_last), true),
        'u' => (rates.bytes_out, false),
        'U' => (per_ms(rates.bytes_out, rates.bytes_out_last), true),
        _ => return None,
    };
    cursor.bump();

    if let Some(text) = cursor.read_comparison(amount) {
        return Some(text.to_owned());
    }
    Some(humanize_bytes(amount, per_second))
}

fn humanize_bytes(mut amount: i64, per_second: bool) -> String {
    const PREFIXES: &[u8] = b"kMGTPEZY";
    let mut remainder = 0;
    let mut prefix: Option<usize> = None;
    while amount >= 1000 && prefix.is_none_or(|p| p + 1 < PREFIXES.len()) {
        amount /= 100;
        remainder = amount % 10;
        amount /= 10;
        prefix = Some(prefix.map_or(0, |p| p + 1));
    }
    let unit = if per_second { "B/s" } else { "B" };
    match prefix {
        Some(p) => format!("{amount}.{remainder} {}{unit}", PREFIXES[p] as char),
        None => format!("{amount} {unit}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallclock::WallClock;
    use statbar_process::{RunContext, StopFlag};

    const FIRST: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:    5000      50    0    0    0     0          0         0     5000      50    0    0    0     0       0          0
  eth0: 1000000    1000    0    0    0     0          0         0   200000     400    0    0    0     0       0          0
";

    const SECOND: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:    5000      50    0    0    0     0          0         0     5000      50    0    0    0     0       0          0
  eth0: 3000000    2000    0    0    0     0          0         0   700000     800    0    0    0     0       0          0
";

    fn rendered(driver: &mut NetworkDriver, delay_ms: u64) -> String {
        let mut body = ItemBody::default();
        let mut run = RunContext::new(StopFlag);
        let clock = WallClock::now();
        let mut cx = UpdateContext { cycle: 0, delay_ms, clock: &clock, run: &mut run };
        driver.update(&mut body, &mut cx).unwrap();
        body.text
    }

    fn counters_file(body: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), body).unwrap();
        file
    }

    #[test]
    fn totals_for_a_single_interface() {
        let file = counters_file(FIRST);
        let mut driver = NetworkDriver::with_path("eth0 %d %u", file.path().to_path_buf());
        assert_eq!(rendered(&mut driver, 0), "1.0 MB 200.0 kB");
    }

    #[test]
    fn wildcard_sums_every_interface() {
        let file = counters_file(FIRST);
        let mut driver = NetworkDriver::with_path("* %d", file.path().to_path_buf());
        assert_eq!(rendered(&mut driver, 0), "1.0 MB");
    }

    #[test]
    fn rates_use_the_passed_delay() {
        let file = counters_file(FIRST);
        let mut driver = NetworkDriver::with_path("eth0 %D %U", file.path().to_path_buf());
        rendered(&mut driver, 0);

        std::fs::write(file.path(), SECOND).unwrap();
        // 2 MB down and 500 kB up over 2 seconds.
        assert_eq!(rendered(&mut driver, 2000), "1.0 MB/s 250.0 kB/s");
    }

    #[test]
    fn rate_comparison_gates_a_literal() {
        let file = counters_file(FIRST);
        let mut driver =
            NetworkDriver::with_path("eth0 %D>999<busy>", file.path().to_path_buf());
        // Zero delay reports the saturated sentinel rate.
        assert_eq!(rendered(&mut driver, 0), "busy");
    }
}
