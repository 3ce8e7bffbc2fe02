//! Error taxonomy for the multiplexer.
//!
//! Every fallible operation surfaces its error synchronously to the
//! caller; nothing is retried internally. Native I/O failures are carried
//! in [`Error::Io`] without translation so callers can still inspect the
//! underlying [`std::io::ErrorKind`].

use crate::interest::Interest;
use std::io;

/// Errors reported by [`Selector`](crate::Selector) and
/// [`Monitor`](crate::Monitor) operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The resource does not expose a native multiplexable descriptor.
    #[error("resource is not selectable")]
    InvalidResource,

    /// None of the requested interest classes are supported by the
    /// resource's capabilities.
    #[error("interest {interest:?} is not supported by this resource")]
    UnsupportedInterest {
        /// The interest that was requested.
        interest: Interest,
    },

    /// The selector has been closed; only `close` and `is_closed` remain
    /// valid.
    #[error("selector is closed")]
    ClosedSelector,

    /// The monitor has been closed and cannot be revived.
    #[error("monitor is closed")]
    ClosedMonitor,

    /// A timeout outside the valid range (negative or NaN seconds).
    #[error("timeout must be a non-negative number of seconds")]
    InvalidTimeout,

    /// The native layer reported a readiness combination outside the
    /// known whitelist.
    #[error("unrecognized readiness combination: {ops:#06b}")]
    UnrecognizedReadiness {
        /// The raw readiness bits that failed to map.
        ops: u8,
    },

    /// A native I/O failure during registration, waiting, or teardown.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
