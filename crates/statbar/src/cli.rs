//! Command line parsing. Everything here can also come from the config file;
//! the command line wins.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "statbar", version, about = "Generate a status line from independently updating items")]
pub struct Cli {
    /// Configuration file to read; `-` reads standard input
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append log output to FILE instead of standard error
    #[arg(short, long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Log errors only
    #[arg(short, long)]
    pub suppress: bool,

    /// Seconds between the graceful and forced shutdown signals; 0 skips
    /// the graceful pass
    #[arg(short, long, value_name = "SECS")]
    pub kill_delay: Option<u32>,
}
