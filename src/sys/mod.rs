//! Platform-specific multiplexer backends.
//!
//! This module provides a unified interface over the OS-level polling
//! mechanism: `epoll` on Linux, `WSAPoll` on Windows. A backend owns the
//! native multiplexer handle plus a wakeup primitive, and exposes
//! `add` / `modify` / `delete` / `wait` / `wake` / `close` over raw
//! descriptors and caller-chosen tokens.
//!
//! The concrete implementation is selected at compile time depending on
//! the target operating system.

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "linux")]
pub(crate) use epoll::EpollPoller as Poller;

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub(crate) use unix::{is_valid, set_nonblocking};

#[cfg(windows)]
mod windows;

#[cfg(windows)]
mod wsapoll;

#[cfg(windows)]
pub(crate) use windows::{is_valid, set_nonblocking};

#[cfg(windows)]
pub(crate) use wsapoll::WsaPoller as Poller;

/// Raw identity of a multiplexable resource.
#[cfg(unix)]
pub type RawId = std::os::unix::io::RawFd;

/// Raw identity of a multiplexable resource.
#[cfg(windows)]
pub type RawId = std::os::windows::io::RawSocket;

/// The native mechanism backing a selector on this platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Linux `epoll`.
    Epoll,
    /// Windows `WSAPoll`.
    Wsapoll,
}

impl Backend {
    #[cfg(target_os = "linux")]
    pub(crate) const CURRENT: Backend = Backend::Epoll;

    #[cfg(windows)]
    pub(crate) const CURRENT: Backend = Backend::Wsapoll;
}

/// A readiness event reported by the backend.
///
/// `token` identifies the registration inside the selector's key arena;
/// the flags say which directions are currently satisfied.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Event {
    pub(crate) token: usize,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
}
