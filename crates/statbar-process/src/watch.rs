//! Child process bookkeeping.
//!
//! A fixed-capacity open-addressing table keyed by pid. Slots are never
//! removed once occupied; a reaped child keeps its slot with a dead flag and
//! the recorded exit status, so lookups for an exited pid stay answerable for
//! the life of the table.

use std::fmt;
use std::io;

use tracing::{debug, warn};

const CAPACITY: usize = 64;

/// Observed state of a watched child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    /// Raw wait status as reported by `waitpid`.
    Exited(i32),
}

/// Exit code carried by a raw `waitpid` status, or the negated signal number
/// for a signalled death.
#[must_use]
pub fn exit_code(status: i32) -> i32 {
    if libc::WIFEXITED(status) {
        libc::WEXITSTATUS(status)
    } else if libc::WIFSIGNALED(status) {
        -libc::WTERMSIG(status)
    } else {
        status
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchError {
    /// Every slot is occupied; the table never evicts.
    CapacityExceeded,
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded => write!(f, "process watch table is full"),
        }
    }
}

impl std::error::Error for WatchError {}

#[derive(Debug, Clone, Copy)]
struct Slot {
    pid: libc::pid_t,
    dead: bool,
    status: i32,
}

/// Fixed-capacity pid table with linear probing.
#[derive(Debug)]
pub struct WatchTable {
    slots: [Option<Slot>; CAPACITY],
    occupied: usize,
    alive: usize,
}

impl Default for WatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchTable {
    #[must_use]
    pub fn new() -> Self {
        Self { slots: [None; CAPACITY], occupied: 0, alive: 0 }
    }

    /// Number of watched children not yet reaped.
    #[must_use]
    pub fn alive(&self) -> usize {
        self.alive
    }

    fn find(&self, pid: libc::pid_t) -> Option<usize> {
        let start = pid as usize % CAPACITY;
        for offset in 0..CAPACITY {
            let index = (start + offset) % CAPACITY;
            match self.slots[index] {
                Some(slot) if slot.pid == pid => return Some(index),
                Some(_) => continue,
                None => return None,
            }
        }
        None
    }

    /// Start tracking `pid`.
    pub fn watch(&mut self, pid: libc::pid_t) -> Result<(), WatchError> {
        if self.occupied == CAPACITY {
            return Err(WatchError::CapacityExceeded);
        }
        let start = pid as usize % CAPACITY;
        for offset in 0..CAPACITY {
            let index = (start + offset) % CAPACITY;
            if self.slots[index].is_none() {
                self.slots[index] = Some(Slot { pid, dead: false, status: 0 });
                self.occupied += 1;
                self.alive += 1;
                return Ok(());
            }
        }
        Err(WatchError::CapacityExceeded)
    }

    /// Status of a watched pid, or `None` if it was never watched.
    #[must_use]
    pub fn status(&self, pid: libc::pid_t) -> Option<ProcessStatus> {
        let index = self.find(pid)?;
        self.slots[index].as_ref().map(|slot| {
            if slot.dead {
                ProcessStatus::Exited(slot.status)
            } else {
                ProcessStatus::Running
            }
        })
    }

    fn mark_dead(&mut self, pid: libc::pid_t, status: i32) {
        match self.find(pid) {
            Some(index) => {
                if let Some(slot) = self.slots[index].as_mut()
                    && !slot.dead
                {
                    slot.dead = true;
                    slot.status = status;
                    self.alive -= 1;
                }
            }
            None => warn!(pid, "reaped a child that was never watched"),
        }
    }

    /// Collect every child that has exited since the last call, without
    /// blocking. Safe to call when no children exist.
    pub fn reap_exited(&mut self) {
        loop {
            let mut status = 0;
            let pid = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
            if pid <= 0 {
                return;
            }
            debug!(pid, status, "child exited");
            self.mark_dead(pid, status);
        }
    }

    /// Send `signal` to every live watched child, then wait for them to exit.
    ///
    /// With a non-zero `timeout_secs` (or when delivering SIGKILL, which
    /// cannot be ignored) the wait blocks, bounded by a forked sleeper child
    /// whose own exit unblocks `waitpid` once the timeout elapses. With a
    /// zero timeout and a catchable signal this only collects children that
    /// are already gone.
    pub fn signal_all_and_wait(&mut self, signal: libc::c_int, timeout_secs: u32) {
        for slot in self.slots.iter().flatten() {
            if !slot.dead {
                unsafe { libc::kill(slot.pid, signal) };
            }
        }
        if self.alive == 0 {
            return;
        }

        let blocking = timeout_secs > 0 || signal == libc::SIGKILL;
        let sleeper = if blocking && timeout_secs > 0 {
            let pid = unsafe { libc::fork() };
            if pid == 0 {
                unsafe {
                    libc::sleep(timeout_secs);
                    libc::_exit(0);
                }
            }
            if pid > 0 { Some(pid) } else { None }
        } else {
            None
        };

        loop {
            let mut status = 0;
            let flags = if blocking { 0 } else { libc::WNOHANG };
            let pid = unsafe { libc::waitpid(-1, &mut status, flags) };
            if pid < 0 && io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            if pid <= 0 {
                break;
            }
            if Some(pid) == sleeper {
                // Timeout elapsed before the children did.
                warn!(signal, "children still alive after the wait timeout");
                return;
            }
            self.mark_dead(pid, status);
            if self.alive == 0 {
                break;
            }
        }

        if let Some(pid) = sleeper {
            unsafe {
                libc::kill(pid, libc::SIGKILL);
                let mut status = 0;
                libc::waitpid(pid, &mut status, 0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawn::spawn;
    use std::sync::Mutex;

    // These tests reap with waitpid(-1); keep them from collecting each
    // other's children.
    static REAP_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn unknown_pid_has_no_status() {
        let table = WatchTable::new();
        assert_eq!(table.status(12345), None);
    }

    #[test]
    fn watch_then_reap_records_the_exit() {
        let _guard = REAP_LOCK.lock().unwrap();
        let spawned = spawn(&["/bin/true".to_string()], &[]).unwrap();
        let mut table = WatchTable::new();
        table.watch(spawned.pid).unwrap();
        assert_eq!(table.status(spawned.pid), Some(ProcessStatus::Running));
        assert_eq!(table.alive(), 1);

        // Block until the child is gone, then confirm the non-blocking path
        // recorded it.
        table.signal_all_and_wait(0, 1);
        assert!(matches!(table.status(spawned.pid), Some(ProcessStatus::Exited(_))));
        assert_eq!(table.alive(), 0);
    }

    #[test]
    fn the_wait_gives_up_on_unresponsive_children_after_the_timeout() {
        let _guard = REAP_LOCK.lock().unwrap();
        let spawned = spawn(
            &[
                "sh".to_string(),
                "-c".to_string(),
                "trap '' TERM; sleep 30".to_string(),
            ],
            &[],
        )
        .unwrap();
        let mut table = WatchTable::new();
        table.watch(spawned.pid).unwrap();
        // Give the shell a moment to install the trap.
        std::thread::sleep(std::time::Duration::from_millis(200));

        let start = std::time::Instant::now();
        table.signal_all_and_wait(libc::SIGTERM, 1);
        let elapsed = start.elapsed();
        assert!(elapsed >= std::time::Duration::from_millis(900), "returned too early: {elapsed:?}");
        assert!(elapsed < std::time::Duration::from_secs(2), "timeout not honored: {elapsed:?}");
        assert_eq!(table.alive(), 1);

        table.signal_all_and_wait(libc::SIGKILL, 0);
        assert_eq!(table.alive(), 0);
    }

    #[test]
    fn sigkill_waits_even_with_zero_timeout() {
        let _guard = REAP_LOCK.lock().unwrap();
        let spawned = spawn(&["/bin/sleep".to_string(), "30".to_string()], &[]).unwrap();
        let mut table = WatchTable::new();
        table.watch(spawned.pid).unwrap();

        table.signal_all_and_wait(libc::SIGKILL, 0);
        assert_eq!(table.alive(), 0);
    }

    #[test]
    fn table_capacity_is_bounded() {
        let mut table = WatchTable::new();
        for pid in 1..=64 {
            table.watch(pid).unwrap();
        }
        assert_eq!(table.watch(65), Err(WatchError::CapacityExceeded));
    }

    #[test]
    fn colliding_pids_probe_to_separate_slots() {
        let mut table = WatchTable::new();
        table.watch(7).unwrap();
        table.watch(7 + 64).unwrap();
        table.watch(7 + 128).unwrap();
        assert_eq!(table.status(7), Some(ProcessStatus::Running));
        assert_eq!(table.status(7 + 64), Some(ProcessStatus::Running));
        assert_eq!(table.status(7 + 128), Some(ProcessStatus::Running));
        assert_eq!(table.alive(), 3);
    }

    #[test]
    fn dead_slots_are_not_reused() {
        let mut table = WatchTable::new();
        table.watch(1).unwrap();
        table.mark_dead(1, 0);
        table.watch(1 + 64).unwrap();
        assert_eq!(table.status(1), Some(ProcessStatus::Exited(0)));
        assert_eq!(table.status(1 + 64), Some(ProcessStatus::Running));
    }
}
