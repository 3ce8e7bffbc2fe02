//! Unix descriptor helpers.

use libc::{F_GETFD, F_GETFL, F_SETFL, O_NONBLOCK, fcntl};
use std::io;
use std::os::unix::io::RawFd;

/// Whether `fd` refers to an open descriptor this process can poll.
pub(crate) fn is_valid(fd: RawFd) -> bool {
    fd >= 0 && unsafe { fcntl(fd, F_GETFD) } != -1
}

/// Sets a file descriptor to non-blocking mode.
pub(crate) fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    let rc = unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
