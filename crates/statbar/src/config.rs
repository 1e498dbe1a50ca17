//! Configuration file parsing.
//!
//! The format is line based. The first word of a line selects a directive:
//!
//! ```text
//! display i3bar s12
//! item clock %H:%M
//! item command
//!     amixer get Master
//! log /tmp/statbar.log
//! suppress
//! kill-delay 3
//! ```
//!
//! Lines following an `item` directive that are blank or start with
//! whitespace form the item's block, passed verbatim to the driver.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use tracing::warn;

/// One `item` directive with its optional indented block. `name` is the
/// item driver, `line` the rest of the directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLine {
    pub name: String,
    pub line: String,
    pub block: Option<String>,
}

#[derive(Debug, Default)]
pub struct Config {
    /// Display driver name and the rest of its directive line.
    pub display: Option<(String, String)>,
    pub items: Vec<ItemLine>,
    pub log: Option<PathBuf>,
    pub suppress: bool,
    pub kill_delay: Option<u32>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let text = if path.as_os_str() == "-" {
            io::read_to_string(io::stdin()).context("reading configuration from stdin")?
        } else {
            fs::read_to_string(path)
                .with_context(|| format!("reading configuration from {}", path.display()))?
        };
        Ok(Config::parse(&text))
    }

    pub fn parse(text: &str) -> Config {
        let mut config = Config::default();
        let mut lines = text.lines().peekable();
        while let Some(line) = lines.next() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (word, rest) = split_word(trimmed);
            match word {
                "display" => {
                    let (name, line) = split_word(rest);
                    config.display = Some((name.to_string(), line.to_string()));
                }
                "item" => {
                    let (name, line) = split_word(rest);
                    let mut block = String::new();
                    while let Some(next) = lines.peek() {
                        if !next.is_empty() && !next.starts_with(char::is_whitespace) {
                            break;
                        }
                        block.push_str(next);
                        block.push('\n');
                        lines.next();
                    }
                    config.items.push(ItemLine {
                        name: name.to_string(),
                        line: line.to_string(),
                        block: (!block.is_empty()).then_some(block),
                    });
                }
                "log" => config.log = Some(PathBuf::from(rest)),
                "suppress" => config.suppress = true,
                "kill-delay" => match rest.parse() {
                    Ok(secs) => config.kill_delay = Some(secs),
                    Err(_) => warn!(value = rest, "ignoring bad kill-delay"),
                },
                _ => warn!(directive = word, "ignoring unknown directive"),
            }
        }
        config
    }
}

/// Default configuration location: `~/.statbar.conf` if it exists,
/// otherwise `/etc/statbar.conf`.
pub fn default_path() -> anyhow::Result<PathBuf> {
    if let Some(home) = std::env::var_os("HOME") {
        let path = Path::new(&home).join(".statbar.conf");
        if path.exists() {
            return Ok(path);
        }
    }
    let path = PathBuf::from("/etc/statbar.conf");
    if path.exists() {
        return Ok(path);
    }
    bail!("no configuration file found; pass one with --config");
}

fn split_word(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (line, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_parse() {
        let config = Config::parse(
            "# comment\n\
             display i3bar s12\n\
             item clock %H:%M\n\
             log /tmp/out.log\n\
             suppress\n\
             kill-delay 3\n",
        );
        assert_eq!(
            config.display,
            Some(("i3bar".to_string(), "s12".to_string()))
        );
        assert_eq!(config.items.len(), 1);
        assert_eq!(config.items[0].name, "clock");
        assert_eq!(config.items[0].line, "%H:%M");
        assert_eq!(config.items[0].block, None);
        assert_eq!(config.log, Some(PathBuf::from("/tmp/out.log")));
        assert!(config.suppress);
        assert_eq!(config.kill_delay, Some(3));
    }

    #[test]
    fn item_blocks_keep_raw_lines() {
        let config = Config::parse(
            "item command\n\
             \tamixer get Master\n\
             \n\
             \t# still part of the block\n\
             item cpu %p\n",
        );
        assert_eq!(config.items.len(), 2);
        assert_eq!(
            config.items[0].block.as_deref(),
            Some("\tamixer get Master\n\n\t# still part of the block\n")
        );
        assert_eq!(config.items[1].block, None);
    }

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        let config = Config::parse("\n  \n# display i3bar\n");
        assert!(config.display.is_none());
        assert!(config.items.is_empty());
    }

    #[test]
    fn unknown_directives_are_ignored() {
        let config = Config::parse("colour red\nitem clock\n");
        assert_eq!(config.items.len(), 1);
    }

    #[test]
    fn bad_kill_delay_is_ignored() {
        let config = Config::parse("kill-delay soon\n");
        assert_eq!(config.kill_delay, None);
    }

    #[test]
    fn load_reads_a_file() {
        use std::io::Write as _;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "item clock").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.items.len(), 1);
    }

    #[test]
    fn load_reports_missing_files() {
        let err = Config::load(Path::new("/nonexistent/statbar.conf")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/statbar.conf"));
    }
}
