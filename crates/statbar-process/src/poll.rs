//! Readiness multiplexing over raw descriptors.

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Thin wrapper over `poll(2)` tracking a registered fd set and the subset
/// that was readable on the last wait.
#[derive(Debug, Default)]
pub struct Poller {
    interest: Vec<RawFd>,
    ready: Vec<RawFd>,
}

impl Poller {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor for readability. Registering twice is a no-op.
    pub fn watch(&mut self, fd: RawFd) {
        if !self.interest.contains(&fd) {
            self.interest.push(fd);
        }
    }

    /// Drop a descriptor from the set. The caller still owns and closes it.
    pub fn unwatch(&mut self, fd: RawFd) {
        self.interest.retain(|&f| f != fd);
        self.ready.retain(|&f| f != fd);
    }

    /// Was `fd` readable on the last `wait`?
    #[must_use]
    pub fn is_ready(&self, fd: RawFd) -> bool {
        self.ready.contains(&fd)
    }

    /// Block until a registered descriptor is readable or `timeout` elapses;
    /// `None` blocks indefinitely. Returns the number of ready descriptors.
    /// Interruption by a signal counts as zero ready, not an error.
    pub fn wait(&mut self, timeout: Option<Duration>) -> io::Result<usize> {
        self.ready.clear();

        let mut fds: Vec<libc::pollfd> = self
            .interest
            .iter()
            .map(|&fd| libc::pollfd { fd, events: libc::POLLIN, revents: 0 })
            .collect();

        let timeout_ms: libc::c_int = match timeout {
            None => -1,
            Some(d) => d.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
        };

        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(err);
        }

        // Hangup and error conditions count as readable so the owner gets a
        // chance to read the final bytes and observe EOF.
        for pollfd in &fds {
            if pollfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0 {
                self.ready.push(pollfd.fd);
            }
        }
        Ok(self.ready.len())
    }
}
