//! The resource boundary.
//!
//! The engine never owns the I/O resources it watches; it only needs three
//! things from them: a native multiplexable identity, a capability-flags
//! query, and a non-blocking-mode switch. [`Selectable`] is that seam,
//! implemented here for the std socket types.

use crate::sys::{self, RawId};
use std::io;
use std::net::{TcpListener, TcpStream, UdpSocket};
#[cfg(unix)]
use std::os::unix::io::AsRawFd;
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(windows)]
use std::os::windows::io::AsRawSocket;

/// Which readiness classes a resource can meaningfully request.
///
/// `connect` means the resource is connection-oriented and the connection
/// has not completed yet; the translator prefers connect-class readiness
/// over plain write for such resources, and accept-class over plain read
/// for `accept`-capable ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Supports read-class readiness.
    pub read: bool,
    /// Supports write-class readiness.
    pub write: bool,
    /// Accepts incoming connections.
    pub accept: bool,
    /// Connection-oriented with the connection still in flight.
    pub connect: bool,
}

/// An I/O resource a [`Selector`](crate::Selector) can register.
///
/// The caller keeps ownership of the resource; the selector records only
/// its raw identity.
pub trait Selectable {
    /// The native multiplexable identity of this resource.
    fn raw_id(&self) -> RawId;

    /// Which readiness classes this resource supports right now.
    fn capabilities(&self) -> Capabilities;

    /// Switch the resource to non-blocking mode.
    fn set_nonblocking(&self) -> io::Result<()> {
        sys::set_nonblocking(self.raw_id())
    }
}

#[cfg(unix)]
fn raw<T: AsRawFd>(resource: &T) -> RawId {
    resource.as_raw_fd()
}

#[cfg(windows)]
fn raw<T: AsRawSocket>(resource: &T) -> RawId {
    resource.as_raw_socket()
}

impl Selectable for TcpListener {
    fn raw_id(&self) -> RawId {
        raw(self)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            accept: true,
            ..Capabilities::default()
        }
    }
}

impl Selectable for TcpStream {
    fn raw_id(&self) -> RawId {
        raw(self)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            read: true,
            write: true,
            accept: false,
            // No peer yet means the non-blocking connect is still in
            // flight, so write interest maps to connect-class readiness.
            connect: self.peer_addr().is_err(),
        }
    }
}

impl Selectable for UdpSocket {
    fn raw_id(&self) -> RawId {
        raw(self)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            read: true,
            write: true,
            ..Capabilities::default()
        }
    }
}

#[cfg(unix)]
impl Selectable for UnixListener {
    fn raw_id(&self) -> RawId {
        raw(self)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            accept: true,
            ..Capabilities::default()
        }
    }
}

#[cfg(unix)]
impl Selectable for UnixStream {
    fn raw_id(&self) -> RawId {
        raw(self)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            read: true,
            write: true,
            ..Capabilities::default()
        }
    }
}

impl<T: Selectable + ?Sized> Selectable for &T {
    fn raw_id(&self) -> RawId {
        (**self).raw_id()
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn set_nonblocking(&self) -> io::Result<()> {
        (**self).set_nonblocking()
    }
}
