//! Interest translation.
//!
//! Two pure mappings connect the symbolic surface to the native layer:
//!
//! - [`to_native`]: a requested [`Interest`] plus the resource's
//!   [`Capabilities`] become the native op bitmask to register. Listeners
//!   get accept-class readiness instead of plain read; streams with a
//!   connection still in flight get connect-class readiness instead of
//!   plain write.
//! - [`from_native`]: an observed op bitmask back to an [`Interest`].
//!   This is a closed whitelist over the six combinations the engine can
//!   legitimately produce, not a general bitmask decoder.

use crate::errors::{Error, Result};
use crate::interest::{Interest, Ops};
use crate::selectable::Capabilities;

/// Translate a symbolic interest into the native ops to request.
///
/// For `ReadWrite` the two directions are unioned sloppily: a direction
/// the capabilities do not support is silently omitted rather than
/// rejected. Only when *no* requested direction is supported does this
/// fail with [`Error::UnsupportedInterest`].
pub(crate) fn to_native(caps: Capabilities, interest: Interest) -> Result<Ops> {
    let ops = match interest {
        Interest::Read => read_ops(caps),
        Interest::Write => write_ops(caps),
        Interest::ReadWrite => read_ops(caps).or(write_ops(caps)),
    };

    if ops.is_empty() {
        Err(Error::UnsupportedInterest { interest })
    } else {
        Ok(ops)
    }
}

fn read_ops(caps: Capabilities) -> Ops {
    if caps.accept {
        Ops::ACCEPT
    } else if caps.read {
        Ops::READ
    } else {
        Ops::EMPTY
    }
}

fn write_ops(caps: Capabilities) -> Ops {
    if caps.connect {
        Ops::CONNECT
    } else if caps.write {
        Ops::WRITE
    } else {
        Ops::EMPTY
    }
}

const READ_WRITE: Ops = Ops::READ.or(Ops::WRITE);
const READ_CONNECT: Ops = Ops::READ.or(Ops::CONNECT);

/// Map an observed op bitmask back to its symbolic interest.
///
/// Anything outside the canonical six combinations fails with
/// [`Error::UnrecognizedReadiness`].
pub(crate) fn from_native(ops: Ops) -> Result<Interest> {
    match ops {
        Ops::READ | Ops::ACCEPT => Ok(Interest::Read),
        Ops::WRITE | Ops::CONNECT => Ok(Interest::Write),
        READ_WRITE | READ_CONNECT => Ok(Interest::ReadWrite),
        other => Err(Error::UnrecognizedReadiness { ops: other.bits() }),
    }
}
