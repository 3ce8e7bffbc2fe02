//! Windows socket helpers.

use std::io;
use std::mem;
use std::sync::Once;

use windows_sys::Win32::Networking::WinSock::{
    FIONBIO, SO_TYPE, SOCKET, SOL_SOCKET, WSADATA, WSAStartup, getsockopt, ioctlsocket,
};

use super::RawId;

/// Creates a MAKEWORD value for the Winsock version.
#[inline]
const fn makeword(low: u8, high: u8) -> u16 {
    ((high as u16) << 8) | (low as u16)
}

static WINSOCK_INIT: Once = Once::new();

/// Initialize Winsock if not already initialized.
pub(crate) fn ensure_winsock() {
    WINSOCK_INIT.call_once(|| unsafe {
        let mut data: WSADATA = mem::zeroed();
        let rc = WSAStartup(makeword(2, 2), &mut data as *mut _);
        assert_eq!(rc, 0, "WSAStartup failed: {}", rc);
    });
}

/// Whether `id` refers to a live socket this process can poll.
///
/// Only WinSock sockets are multiplexable through `WSAPoll`; file handles
/// are not.
pub(crate) fn is_valid(id: RawId) -> bool {
    ensure_winsock();
    unsafe {
        let mut ty: i32 = 0;
        let mut len = mem::size_of::<i32>() as i32;

        getsockopt(
            id as SOCKET,
            SOL_SOCKET,
            SO_TYPE,
            &mut ty as *mut _ as *mut u8,
            &mut len,
        ) == 0
    }
}

/// Sets a socket to non-blocking mode.
pub(crate) fn set_nonblocking(id: RawId) -> io::Result<()> {
    unsafe {
        let mut nonblocking: u32 = 1;
        if ioctlsocket(id as SOCKET, FIONBIO, &mut nonblocking) != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}
