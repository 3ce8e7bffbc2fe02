//! Linux `epoll` backend.
//!
//! Owns an `epoll` instance plus an `eventfd` used as the wakeup signal.
//! The eventfd is registered persistently under a reserved token; writing
//! to it interrupts a blocking `epoll_wait`, and because the counter stays
//! non-zero until drained, a wakeup issued with no waiter is latched and
//! observed by the next wait.

use super::Event;
use crate::interest::Ops;

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLERR, EPOLLHUP, EPOLLIN,
    EPOLLOUT, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Reserved token for the wakeup event.
///
/// Arena tokens grow from zero, so `u64::MAX` can never collide.
const WAKE_TOKEN: u64 = u64::MAX;

/// Upper bound on events collected per wait call.
const MAX_EVENTS: usize = 64;

pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Eventfd written by `wake`, drained during `wait`.
    wake_fd: RawFd,

    /// Guards against releasing the descriptors twice.
    closed: AtomicBool,
}

impl EpollPoller {
    /// Create the epoll instance and its wakeup eventfd, and register the
    /// eventfd as a persistent wake source.
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        let wake_fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if wake_fd < 0 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(epoll);
            }
            return Err(err);
        }

        let mut event = epoll_event {
            events: EPOLLIN as u32,
            u64: WAKE_TOKEN,
        };

        let rc = unsafe { epoll_ctl(epoll, EPOLL_CTL_ADD, wake_fd, &mut event) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(wake_fd);
                libc::close(epoll);
            }
            return Err(err);
        }

        Ok(Self {
            epoll,
            wake_fd,
            closed: AtomicBool::new(false),
        })
    }

    /// Register a descriptor under `token` with the given ops.
    pub(crate) fn add(&self, fd: RawFd, token: usize, ops: Ops) -> io::Result<()> {
        self.ctl(EPOLL_CTL_ADD, fd, token, ops)
    }

    /// Update ops for an already registered descriptor.
    pub(crate) fn modify(&self, fd: RawFd, token: usize, ops: Ops) -> io::Result<()> {
        self.ctl(EPOLL_CTL_MOD, fd, token, ops)
    }

    /// Remove a descriptor from the epoll set.
    pub(crate) fn delete(&self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn ctl(&self, op: libc::c_int, fd: RawFd, token: usize, ops: Ops) -> io::Result<()> {
        let mut event = epoll_event {
            events: interest_flags(ops),
            u64: token as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, op, fd, &mut event) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Interrupt a blocking `wait`, or latch the signal for the next one.
    pub(crate) fn wake(&self) {
        let buf: u64 = 1;
        unsafe {
            let _ = libc::write(self.wake_fd, &buf as *const _ as *const _, 8);
        }
    }

    /// Block for readiness events.
    ///
    /// Returns with `events` empty when the timeout elapses, when a wakeup
    /// arrives with nothing ready, or when the wait is interrupted by a
    /// signal. `None` waits without bound; `Duration::ZERO` polls.
    pub(crate) fn wait(&self, events: &mut Vec<Event>, timeout: Option<Duration>) -> io::Result<()> {
        events.clear();

        let timeout_ms = match timeout {
            None => -1,
            Some(t) => {
                let ms = t.as_millis().min(i32::MAX as u128) as i32;
                // A positive sub-millisecond timeout still has to block.
                if ms == 0 && !t.is_zero() { 1 } else { ms }
            }
        };

        let mut buffer: [epoll_event; MAX_EVENTS] = unsafe { std::mem::zeroed() };

        let n = unsafe {
            epoll_wait(
                self.epoll,
                buffer.as_mut_ptr(),
                MAX_EVENTS as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        for ev in &buffer[..n as usize] {
            let token = ev.u64;

            if token == WAKE_TOKEN {
                let mut drained = 0u64;
                unsafe {
                    let _ = libc::read(self.wake_fd, &mut drained as *mut _ as *mut _, 8);
                }
                continue;
            }

            events.push(Event {
                token: token as usize,
                readable: ev.events & (EPOLLIN | EPOLLERR | EPOLLHUP) as u32 != 0,
                writable: ev.events & (EPOLLOUT | EPOLLERR) as u32 != 0,
            });
        }

        Ok(())
    }

    /// Release the epoll instance and the wakeup eventfd, exactly once.
    pub(crate) fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            unsafe {
                let _ = libc::close(self.wake_fd);
                let _ = libc::close(self.epoll);
            }
        }
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        self.close();
    }
}

fn interest_flags(ops: Ops) -> u32 {
    let mut flags = 0;

    if ops.intersects(Ops::READ_CLASS) {
        flags |= EPOLLIN;
    }
    if ops.intersects(Ops::WRITE_CLASS) {
        flags |= EPOLLOUT;
    }

    flags as u32
}
