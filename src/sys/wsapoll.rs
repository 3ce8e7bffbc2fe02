//! Windows `WSAPoll` backend.
//!
//! Mirrors the semantics of the Linux `epoll` backend using non-blocking
//! sockets and `WSAPoll`. Registrations live in an internal map; each wait
//! rebuilds the `WSAPOLLFD` array from it. The wakeup primitive is a
//! connected UDP socket pair: a queued datagram keeps the receive side
//! readable until drained, which gives wakeups the same latched,
//! level-triggered behavior as the eventfd on Linux.

use super::Event;
use super::windows::ensure_winsock;
use crate::interest::Ops;
use crate::sys::RawId;

use std::collections::HashMap;
use std::io;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use windows_sys::Win32::Networking::WinSock::{
    AF_INET, FIONBIO, INVALID_SOCKET, IPPROTO_UDP, POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT,
    SOCK_DGRAM, SOCKADDR_IN, SOCKET, SOCKET_ERROR, WSAPOLLFD, WSAPoll, WSASocketW, bind,
    closesocket, connect, getsockname, ioctlsocket, recv, send,
};

pub(crate) struct WsaPoller {
    /// Registered sockets: `id → (token, ops)`.
    reg: Mutex<HashMap<RawId, (usize, Ops)>>,

    /// Wakeup socket (receive side), polled alongside registrations.
    wake_recv: SOCKET,

    /// Wakeup socket (send side), written by `wake`.
    wake_send: SOCKET,

    /// Guards against releasing the sockets twice.
    closed: AtomicBool,
}

unsafe impl Send for WsaPoller {}
unsafe impl Sync for WsaPoller {}

impl WsaPoller {
    /// Create the poller: initialize Winsock (once per process), then build
    /// the non-blocking UDP socket pair used for wakeups.
    pub(crate) fn new() -> io::Result<Self> {
        unsafe {
            ensure_winsock();

            let recv_sock = WSASocketW(
                AF_INET as i32,
                SOCK_DGRAM,
                IPPROTO_UDP,
                std::ptr::null(),
                0,
                0,
            );
            if recv_sock == INVALID_SOCKET {
                return Err(io::Error::last_os_error());
            }

            let mut nonblocking: u32 = 1;
            let _ = ioctlsocket(recv_sock, FIONBIO, &mut nonblocking);

            let mut addr: SOCKADDR_IN = std::mem::zeroed();
            addr.sin_family = AF_INET;
            addr.sin_port = 0;
            addr.sin_addr.S_un.S_addr = u32::from_ne_bytes(Ipv4Addr::LOCALHOST.octets());

            let rc = bind(
                recv_sock,
                &addr as *const _ as *const _,
                std::mem::size_of::<SOCKADDR_IN>() as i32,
            );
            if rc == SOCKET_ERROR {
                let err = io::Error::last_os_error();
                let _ = closesocket(recv_sock);
                return Err(err);
            }

            // Discover the bound port so the send side can connect to it.
            let mut bound: SOCKADDR_IN = std::mem::zeroed();
            let mut len = std::mem::size_of::<SOCKADDR_IN>() as i32;

            let rc = getsockname(recv_sock, &mut bound as *mut _ as *mut _, &mut len);
            if rc == SOCKET_ERROR {
                let err = io::Error::last_os_error();
                let _ = closesocket(recv_sock);
                return Err(err);
            }

            let send_sock = WSASocketW(
                AF_INET as i32,
                SOCK_DGRAM,
                IPPROTO_UDP,
                std::ptr::null(),
                0,
                0,
            );
            if send_sock == INVALID_SOCKET {
                let err = io::Error::last_os_error();
                let _ = closesocket(recv_sock);
                return Err(err);
            }

            let _ = ioctlsocket(send_sock, FIONBIO, &mut nonblocking);

            let rc = connect(
                send_sock,
                &bound as *const _ as *const _,
                std::mem::size_of::<SOCKADDR_IN>() as i32,
            );
            if rc == SOCKET_ERROR {
                let err = io::Error::last_os_error();
                let _ = closesocket(recv_sock);
                let _ = closesocket(send_sock);
                return Err(err);
            }

            Ok(Self {
                reg: Mutex::new(HashMap::new()),
                wake_recv: recv_sock,
                wake_send: send_sock,
                closed: AtomicBool::new(false),
            })
        }
    }

    /// Register a socket under `token` with the given ops.
    pub(crate) fn add(&self, id: RawId, token: usize, ops: Ops) -> io::Result<()> {
        crate::lock(&self.reg).insert(id, (token, ops));
        Ok(())
    }

    /// Update ops for a registered socket.
    pub(crate) fn modify(&self, id: RawId, token: usize, ops: Ops) -> io::Result<()> {
        crate::lock(&self.reg).insert(id, (token, ops));
        Ok(())
    }

    /// Remove a socket from the poll set.
    pub(crate) fn delete(&self, id: RawId) -> io::Result<()> {
        crate::lock(&self.reg).remove(&id);
        Ok(())
    }

    /// Interrupt a blocking `wait`, or latch the signal for the next one.
    pub(crate) fn wake(&self) {
        unsafe {
            let buf = [1u8; 1];
            let _ = send(self.wake_send, buf.as_ptr(), 1, 0);
        }
    }

    /// Block for readiness events.
    ///
    /// Returns with `events` empty when the timeout elapses or a wakeup
    /// arrives with nothing ready. `None` waits without bound;
    /// `Duration::ZERO` polls.
    pub(crate) fn wait(&self, events: &mut Vec<Event>, timeout: Option<Duration>) -> io::Result<()> {
        events.clear();

        let mut fds: Vec<WSAPOLLFD> = Vec::new();

        fds.push(WSAPOLLFD {
            fd: self.wake_recv,
            events: POLLIN,
            revents: 0,
        });

        {
            let reg = crate::lock(&self.reg);
            fds.reserve(reg.len());

            for (&id, &(_, ops)) in reg.iter() {
                let mut ev = 0;
                if ops.intersects(Ops::READ_CLASS) {
                    ev |= POLLIN;
                }
                if ops.intersects(Ops::WRITE_CLASS) {
                    ev |= POLLOUT;
                }

                fds.push(WSAPOLLFD {
                    fd: id as SOCKET,
                    events: ev,
                    revents: 0,
                });
            }
        }

        let timeout_ms = match timeout {
            None => -1,
            Some(t) => {
                let ms = t.as_millis().min(i32::MAX as u128) as i32;
                // A positive sub-millisecond timeout still has to block.
                if ms == 0 && !t.is_zero() { 1 } else { ms }
            }
        };

        let rc = unsafe { WSAPoll(fds.as_mut_ptr(), fds.len() as u32, timeout_ms) };
        if rc == SOCKET_ERROR {
            return Err(io::Error::last_os_error());
        }

        let wake_mask = (POLLIN | POLLERR | POLLHUP | POLLNVAL) as i32;
        if (fds[0].revents as i32 & wake_mask) != 0 {
            unsafe {
                let mut buf = [0u8; 64];
                while recv(
                    self.wake_recv,
                    buf.as_mut_ptr() as *mut _,
                    buf.len() as i32,
                    0,
                ) > 0
                {}
            }
        }

        let reg = crate::lock(&self.reg);
        for pfd in fds.iter().skip(1) {
            let re = pfd.revents as i32;
            if re == 0 {
                continue;
            }

            if let Some(&(token, _)) = reg.get(&(pfd.fd as RawId)) {
                events.push(Event {
                    token,
                    readable: (re & (POLLIN | POLLERR | POLLHUP) as i32) != 0,
                    writable: (re & (POLLOUT | POLLERR) as i32) != 0,
                });
            }
        }

        Ok(())
    }

    /// Release the wakeup socket pair, exactly once.
    pub(crate) fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            unsafe {
                let _ = closesocket(self.wake_recv);
                let _ = closesocket(self.wake_send);
            }
        }
    }
}

impl Drop for WsaPoller {
    fn drop(&mut self) {
        self.close();
    }
}
