//! Pipe-redirected process spawning.
//!
//! `spawn` prepares one pipe per requested redirection before forking, binds
//! the child-side ends to the requested descriptor numbers in the child, and
//! hands the parent-side ends back as owned fds. The contract:
//!
//! - a freshly created child-side end that numerically collides with a
//!   descriptor some other redirection still needs is relocated above the
//!   highest requested child fd first, so the dup2 sequence never clobbers an
//!   in-flight pipe end;
//! - parent ends are close-on-exec, read-direction parent ends non-blocking;
//! - any setup failure closes every descriptor opened for the attempt, and
//!   the fork only happens once all pipes are ready, so a failed call never
//!   leaves a child running;
//! - in the child, exec failure writes a diagnostic and `_exit`s without
//!   returning into caller logic.

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use tracing::debug;

use crate::fd;

/// Which way the parent uses the pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Parent reads what the child writes to `child_fd`.
    Read,
    /// Parent writes what the child reads from `child_fd`.
    Write,
}

/// One requested pipe redirection.
#[derive(Debug, Clone, Copy)]
pub struct Redirect {
    pub direction: Direction,
    pub child_fd: RawFd,
}

impl Redirect {
    /// Parent will read from the child's `child_fd`.
    #[must_use]
    pub fn read_from(child_fd: RawFd) -> Self {
        Self { direction: Direction::Read, child_fd }
    }

    /// Parent will write to the child's `child_fd`.
    #[must_use]
    pub fn write_to(child_fd: RawFd) -> Self {
        Self { direction: Direction::Write, child_fd }
    }
}

/// A successfully spawned child: its pid and the parent-side pipe ends, in
/// the same order as the requested redirections.
#[derive(Debug)]
pub struct Spawned {
    pub pid: libc::pid_t,
    pub fds: Vec<OwnedFd>,
}

struct PreparedPipe {
    parent: OwnedFd,
    child: OwnedFd,
}

/// Fork and exec `argv[0]` (PATH-resolved) with the given redirections.
pub fn spawn(argv: &[String], redirects: &[Redirect]) -> io::Result<Spawned> {
    if argv.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty argv"));
    }

    let cargs: Vec<CString> = argv
        .iter()
        .map(|a| CString::new(a.as_str()))
        .collect::<Result<_, _>>()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "argument contains NUL"))?;
    let mut argv_ptrs: Vec<*const libc::c_char> = cargs.iter().map(|a| a.as_ptr()).collect();
    argv_ptrs.push(std::ptr::null());

    let max_child_fd = redirects.iter().map(|r| r.child_fd).max().unwrap_or(0);

    // Prepare all pipes up front; on any error the OwnedFds drop and close
    // everything this attempt opened.
    let mut pipes = Vec::with_capacity(redirects.len());
    for redirect in redirects {
        pipes.push(prepare_pipe(redirect, max_child_fd)?);
    }

    // Written by the child only if exec fails.
    let exec_diagnostic = format!("statbar: exec {}: {}\n", argv[0], "failed");

    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io::Error::last_os_error());
    }

    if pid == 0 {
        // Child. Bind the requested fds, drop the originals, exec.
        for (redirect, pipe) in redirects.iter().zip(&pipes) {
            let raw = pipe.child.as_raw_fd();
            if raw != redirect.child_fd {
                if unsafe { libc::dup2(raw, redirect.child_fd) } < 0 {
                    unsafe { libc::_exit(127) };
                }
                unsafe { libc::close(raw) };
            }
        }
        unsafe {
            libc::execvp(cargs[0].as_ptr(), argv_ptrs.as_ptr());
            libc::write(
                libc::STDERR_FILENO,
                exec_diagnostic.as_ptr().cast(),
                exec_diagnostic.len(),
            );
            libc::_exit(127);
        }
    }

    // Parent: release the child-side ends.
    let fds = pipes
        .into_iter()
        .map(|PreparedPipe { parent, child }| {
            drop(child);
            parent
        })
        .collect();

    debug!(pid, command = %argv[0], "spawned child process");
    Ok(Spawned { pid, fds })
}

fn prepare_pipe(redirect: &Redirect, max_child_fd: RawFd) -> io::Result<PreparedPipe> {
    let mut ends: [RawFd; 2] = [0; 2];
    if unsafe { libc::pipe(ends.as_mut_ptr()) } < 0 {
        return Err(io::Error::last_os_error());
    }

    let (parent_raw, mut child_raw) = match redirect.direction {
        Direction::Read => (ends[0], ends[1]),
        Direction::Write => (ends[1], ends[0]),
    };
    let parent = unsafe { OwnedFd::from_raw_fd(parent_raw) };

    // Relocate the child end above every requested child fd unless it already
    // sits on its target; otherwise a later dup2 could close it prematurely.
    if child_raw != redirect.child_fd && child_raw <= max_child_fd {
        let moved = unsafe { libc::fcntl(child_raw, libc::F_DUPFD, max_child_fd + 1) };
        if moved < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(child_raw) };
            return Err(err);
        }
        unsafe { libc::close(child_raw) };
        child_raw = moved;
    }
    let child = unsafe { OwnedFd::from_raw_fd(child_raw) };

    fd::set_cloexec(parent.as_raw_fd())?;
    if redirect.direction == Direction::Read {
        fd::set_nonblocking(parent.as_raw_fd())?;
    }

    Ok(PreparedPipe { parent, child })
}
