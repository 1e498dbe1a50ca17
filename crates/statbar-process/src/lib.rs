//! OS plumbing: pipe-redirected spawning, pid supervision, fd readiness
//! multiplexing, and the stop-flag signal handlers.
//!
//! This is the only crate in the workspace that touches raw syscalls; all
//! unsafe code lives behind the safe APIs exported here. Everything else
//! forbids unsafe outright.

pub mod argv;
pub mod fd;
pub mod poll;
pub mod signal;
pub mod spawn;
pub mod watch;

pub use argv::parse_argv;
pub use poll::Poller;
pub use signal::StopFlag;
pub use spawn::{Direction, Redirect, Spawned, spawn};
pub use watch::{ProcessStatus, WatchError, WatchTable, exit_code};

pub use libc::{SIGINT, SIGKILL, SIGTERM, pid_t};

/// The process-wide runtime state threaded through items, displays, and the
/// event loop: fd interest set, supervised children, and the cooperative
/// stop flag. Constructed once at startup and passed explicitly; nothing here
/// is a global.
#[derive(Debug)]
pub struct RunContext {
    pub poller: Poller,
    pub procs: WatchTable,
    pub stop: StopFlag,
}

impl RunContext {
    #[must_use]
    pub fn new(stop: StopFlag) -> Self {
        Self { poller: Poller::new(), procs: WatchTable::new(), stop }
    }
}

/// Scheduler clock ticks per second, for converting /proc/stat jiffies.
#[must_use]
pub fn clock_ticks_per_sec() -> i64 {
    // Default to 100 if sysconf cannot answer, the common kernel value.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 { ticks } else { 100 }
}
