//! Memory utilization item, fed by `/proc/meminfo`.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use statbar_core::format::{self, SpecCursor};

use crate::item::{Driver, ItemBody, ItemError, UpdateContext};

/// Specs: `%[p]{m,s,c}{t,f,u,c,a}` selecting ram, swap, or commit crossed
/// with total, free, used, cached, available; a leading `p` renders the value
/// as a percentage of the source's total. Sizes are humanized from the kB
/// base with power-of-1000 prefixes.
pub struct MemoryDriver {
    format_line: String,
    path: PathBuf,
}

#[derive(Debug, Default, Clone, Copy)]
struct Source {
    total: i64,
    free: i64,
    used: i64,
    cached: i64,
    avail: i64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Snapshot {
    ram: Source,
    swap: Source,
    commit: Source,
}

impl MemoryDriver {
    #[must_use]
    pub fn new(line: &str) -> Self {
        Self::with_path(line, "/proc/meminfo".into())
    }

    fn with_path(line: &str, path: PathBuf) -> Self {
        Self { format_line: line.trim().to_owned(), path }
    }

    fn snapshot(&self) -> Result<Snapshot, ItemError> {
        let meminfo = fs::read_to_string(&self.path)?;
        let mut snap = Snapshot::default();

        for line in meminfo.lines() {
            let Some((name, value)) = line.split_once(':') else { continue };
            let Some(store) = (match name {
                "MemTotal" => Some(&mut snap.ram.total),
                "MemFree" => Some(&mut snap.ram.free),
                "Cached" => Some(&mut snap.ram.cached),
                "MemAvailable" => Some(&mut snap.ram.avail),
                "SwapTotal" => Some(&mut snap.swap.total),
                "SwapFree" => Some(&mut snap.swap.free),
                "SwapCached" => Some(&mut snap.swap.cached),
                "CommitLimit" => Some(&mut snap.commit.total),
                "Committed_AS" => Some(&mut snap.commit.used),
                _ => None,
            }) else {
                continue;
            };
            // Values are "<N> kB"; take the leading number.
            *store = value
                .trim_start()
                .split_whitespace()
                .next()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0);
        }

        // Derived figures /proc/meminfo does not carry directly.
        snap.ram.used = snap.ram.total - snap.ram.free;
        snap.swap.used = snap.swap.total - snap.swap.free;
        snap.swap.avail = snap.swap.free + snap.swap.cached;
        snap.commit.free = snap.commit.total - snap.commit.used;
        snap.commit.cached = snap.ram.cached + snap.swap.cached;
        snap.commit.avail = snap.commit.free;

        Ok(snap)
    }
}

impl Driver for MemoryDriver {
    fn update(
        &mut self,
        body: &mut ItemBody,
        cx: &mut UpdateContext<'_>,
    ) -> Result<Option<Duration>, ItemError> {
        let snap = self.snapshot()?;
        body.text = format::expand(&self.format_line, |cursor| resolve(&snap, cursor));
        Ok(Some(Duration::from_millis(
            500 - u64::from(cx.clock.msec()) % 500,
        )))
    }
}

fn resolve(snap: &Snapshot, cursor: &mut SpecCursor<'_>) -> Option<String> {
    let as_percent = cursor.peek() == Some('p');
    if as_percent {
        cursor.bump();
    }

    let source = match cursor.peek()? {
        'm' => snap.ram,
        's' => snap.swap,
        'c' => snap.commit,
        _ => return None,
    };
    cursor.bump();

    let size = match cursor.peek()? {
        't' => source.total,
        'f' => source.free,
        'u' => source.used,
        'c' => source.cached,
        'a' => source.avail,
        _ => return None,
    };
    cursor.bump();

    if as_percent {
        if source.total > 0 {
            if let Some(text) = cursor.read_comparison(size * 100 / source.total) {
                return Some(text.to_owned());
            }
            return Some(format!("{:.1}", size as f64 * 100.0 / source.total as f64));
        }
        return Some("0.0".to_owned());
    }

    if let Some(text) = cursor.read_comparison(size) {
        return Some(text.to_owned());
    }
    Some(humanize_kb(size))
}

/// Render a kB figure with a power-of-1000 prefix and one decimal.
fn humanize_kb(mut size: i64) -> String {
    const PREFIXES: &[u8] = b"kMGTPEZY";
    let mut remainder = 0;
    let mut prefix = 0;
    while size >= 1000 && prefix + 1 < PREFIXES.len() {
        size /= 100;
        remainder = size % 10;
        size /= 10;
        prefix += 1;
    }
    if prefix > 0 {
        format!("{size}.{remainder} {}B", PREFIXES[prefix] as char)
    } else {
        format!("{size} kB")
    }
}
