//! # muxio
//!
//! **muxio** is a readiness-based non-blocking I/O multiplexer: a small
//! synchronous primitive underneath event-driven network code.
//!
//! A caller registers interest in read/write readiness for any number of
//! I/O resources, blocks until one or more become ready, and gets back
//! exactly which ones and why. muxio owns no event loop of its own — your
//! loop calls [`Selector::select`] as often as it likes.
//!
//! The engine is built on the platform's native multiplexer (`epoll` on
//! Linux, `WSAPoll` on Windows) and provides:
//!
//! - **Symbolic interests** ([`Interest::Read`], [`Interest::Write`],
//!   [`Interest::ReadWrite`]) translated to whatever readiness classes the
//!   resource actually supports (accept for listeners, connect for
//!   in-progress stream connections)
//! - **Monitors**, one per registration, carrying the last observed
//!   readiness and an arbitrary caller-attached value
//! - **Deferred cancellation**: deregistration never mutates the native
//!   key set out from under a wait in progress
//! - **Cross-thread wakeup** with latched, level-triggered semantics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use muxio::{Interest, Selector};
//! use std::net::TcpListener;
//! use std::time::Duration;
//!
//! let listener = TcpListener::bind("127.0.0.1:0")?;
//! let selector: Selector = Selector::new()?;
//!
//! let monitor = selector.register(&listener, Interest::Read)?;
//!
//! for ready in selector.select(Some(Duration::from_secs(1)))? {
//!     if ready.is_readable() {
//!         // accept on the listener, hand the socket off, ...
//!     }
//! }
//! # Ok::<(), muxio::Error>(())
//! ```
//!
//! ## Concurrency
//!
//! A [`Selector`] is `Send + Sync`. While one thread blocks in
//! [`Selector::select`], other threads may freely register, deregister,
//! wake, or close the same selector. Overlapping `select` calls serialize:
//! the second caller blocks until the first returns.

mod arena;
mod errors;
mod interest;
mod monitor;
mod selectable;
mod selector;
mod sys;
mod translate;

pub use errors::{Error, Result};
pub use interest::Interest;
pub use monitor::Monitor;
pub use selectable::{Capabilities, Selectable};
pub use selector::{Selector, timeout_from_secs};
pub use sys::{Backend, RawId};

use std::sync::{Mutex, MutexGuard};

/// Acquire a mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
