//! Symbolic interests and the native-op bitmask they translate into.

use std::fmt;
use std::ops::BitOr;

/// Event classes a caller can register interest in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interest {
    /// Readable (or, for listeners, acceptable).
    Read,
    /// Writable (or, for connecting streams, connected).
    Write,
    /// Either direction.
    ReadWrite,
}

/// Native readiness-request bitmask.
///
/// These are the op classes the engine distinguishes internally. Backends
/// collapse them onto whatever the OS multiplexer understands (`ACCEPT`
/// and `READ` both poll as input readiness, `CONNECT` and `WRITE` as
/// output readiness), but the distinction is kept here because the
/// reverse readiness-to-interest mapping depends on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub(crate) struct Ops(u8);

impl Ops {
    pub(crate) const EMPTY: Ops = Ops(0);
    pub(crate) const READ: Ops = Ops(0b0001);
    pub(crate) const WRITE: Ops = Ops(0b0010);
    pub(crate) const ACCEPT: Ops = Ops(0b0100);
    pub(crate) const CONNECT: Ops = Ops(0b1000);

    /// Ops that satisfy a read-class readiness query.
    pub(crate) const READ_CLASS: Ops = Ops::READ.or(Ops::ACCEPT);

    /// Ops that satisfy a write-class readiness query.
    pub(crate) const WRITE_CLASS: Ops = Ops::WRITE.or(Ops::CONNECT);

    pub(crate) const fn or(self, other: Ops) -> Ops {
        Ops(self.0 | other.0)
    }

    pub(crate) const fn without(self, other: Ops) -> Ops {
        Ops(self.0 & !other.0)
    }

    pub(crate) const fn intersect(self, other: Ops) -> Ops {
        Ops(self.0 & other.0)
    }

    pub(crate) fn contains(self, other: Ops) -> bool {
        self.0 & other.0 == other.0
    }

    pub(crate) fn intersects(self, other: Ops) -> bool {
        self.0 & other.0 != 0
    }

    pub(crate) fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for Ops {
    type Output = Ops;

    fn bitor(self, rhs: Ops) -> Ops {
        self.or(rhs)
    }
}

impl fmt::Binary for Ops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}
