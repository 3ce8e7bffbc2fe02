//! Per-registration monitors.

use crate::errors::{Error, Result};
use crate::interest::{Interest, Ops};
use crate::lock;
use crate::selectable::Capabilities;
use crate::selector::Shared;
use crate::sys::RawId;
use crate::translate;

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

/// A live registration: one resource, its current interest, the readiness
/// last observed for it, and an arbitrary caller-attached value.
///
/// Monitors are created exclusively by
/// [`Selector::register`](crate::Selector::register) and handed back from
/// [`Selector::select`](crate::Selector::select) whenever their resource is
/// ready. They are cheap handles: cloning shares the same registration.
///
/// A monitor holds only a weak back-reference to its selector, used to
/// request deregistration; it never keeps the selector alive, and the
/// caller retains ownership of the I/O resource itself.
pub struct Monitor<T = ()> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    id: RawId,
    selector: Weak<Shared<T>>,
    state: Mutex<MonitorState<T>>,
}

struct MonitorState<T> {
    /// Capability flags for the resource. The `connect` flag starts from
    /// the registration-time snapshot and clears once the connection
    /// completes.
    caps: Capabilities,
    /// Current native interest ops; mirrors the selector's key entry.
    ops: Ops,
    /// Readiness ops observed by the most recent wait that reported this
    /// monitor. Empty until then.
    readiness: Ops,
    value: Option<T>,
    closed: bool,
}

impl<T> Monitor<T> {
    pub(crate) fn new(
        id: RawId,
        caps: Capabilities,
        ops: Ops,
        selector: Weak<Shared<T>>,
    ) -> Monitor<T> {
        Monitor {
            inner: Arc::new(Inner {
                id,
                selector,
                state: Mutex::new(MonitorState {
                    caps,
                    ops,
                    readiness: Ops::EMPTY,
                    value: None,
                    closed: false,
                }),
            }),
        }
    }

    /// The raw identity of the registered resource.
    pub fn raw_id(&self) -> RawId {
        self.inner.id
    }

    /// The resource's capabilities as currently known. The `connect`
    /// flag clears once the in-flight connection completes.
    pub fn capabilities(&self) -> Capabilities {
        lock(&self.inner.state).caps
    }

    /// A handle to the owning selector, while it is still alive.
    pub fn selector(&self) -> Option<crate::Selector<T>> {
        self.inner
            .selector
            .upgrade()
            .map(crate::Selector::from_shared)
    }

    /// The current effective interest, derived from the native ops.
    ///
    /// This reflects what is actually registered, not what was asked for:
    /// a listener registered for `ReadWrite` reports `Read`, because the
    /// write half of the union was dropped as unsupported.
    pub fn interests(&self) -> Result<Interest> {
        translate::from_native(lock(&self.inner.state).ops)
    }

    /// Re-apply a new interest to the underlying registration.
    ///
    /// Fails with [`Error::ClosedMonitor`] once closed, and with
    /// [`Error::UnsupportedInterest`] if the resource's capabilities cannot
    /// express the new interest.
    pub fn set_interests(&self, interest: Interest) -> Result<()> {
        let caps = {
            let state = lock(&self.inner.state);
            if state.closed {
                return Err(Error::ClosedMonitor);
            }
            state.caps
        };

        let ops = translate::to_native(caps, interest)?;

        let shared = self.inner.selector.upgrade().ok_or(Error::ClosedSelector)?;
        shared.reapply(self.inner.id, ops)?;

        lock(&self.inner.state).ops = ops;
        Ok(())
    }

    /// The readiness observed by the last wait that reported this monitor,
    /// or `None` if it has never been reported ready.
    pub fn readiness(&self) -> Result<Option<Interest>> {
        let ops = lock(&self.inner.state).readiness;
        if ops.is_empty() {
            Ok(None)
        } else {
            translate::from_native(ops).map(Some)
        }
    }

    /// Whether the last observed readiness includes a read-class op.
    pub fn is_readable(&self) -> bool {
        lock(&self.inner.state).readiness.intersects(Ops::READ_CLASS)
    }

    /// Whether the last observed readiness includes a write-class op.
    pub fn is_writable(&self) -> bool {
        lock(&self.inner.state).readiness.intersects(Ops::WRITE_CLASS)
    }

    /// The attached value, if any.
    pub fn value(&self) -> Option<T>
    where
        T: Clone,
    {
        lock(&self.inner.state).value.clone()
    }

    /// Attach a value, replacing any previous one. Opaque to the engine.
    pub fn set_value(&self, value: T) {
        lock(&self.inner.state).value = Some(value);
    }

    /// Detach and return the attached value.
    pub fn take_value(&self) -> Option<T> {
        lock(&self.inner.state).value.take()
    }

    /// Close this monitor and deregister its resource from the owning
    /// selector. Idempotent.
    ///
    /// The closed flag is set before the selector is involved, so the
    /// selector's own close-without-deregister callback cannot recurse.
    pub fn close(&self) {
        {
            let mut state = lock(&self.inner.state);
            if state.closed {
                return;
            }
            state.closed = true;
        }

        if let Some(shared) = self.inner.selector.upgrade() {
            shared.deregister_id(self.inner.id);
        }
    }

    /// Whether this monitor has been closed. Readiness and interest
    /// queries stay valid for their last known values afterwards.
    pub fn is_closed(&self) -> bool {
        lock(&self.inner.state).closed
    }

    /// Mark closed without going back through the selector. Used by
    /// deregistration to avoid re-entering itself.
    pub(crate) fn mark_closed(&self) {
        lock(&self.inner.state).closed = true;
    }

    /// Record the ops observed by a wait, and the (possibly rewritten)
    /// native interest now in effect.
    pub(crate) fn record(&self, readiness: Ops, ops: Ops) {
        let mut state = lock(&self.inner.state);
        state.readiness = readiness;
        state.ops = ops;
    }

    /// The connection has completed; later interest translations must map
    /// write interest to plain write, not connect.
    pub(crate) fn settle_connection(&self) {
        lock(&self.inner.state).caps.connect = false;
    }
}

impl<T> Clone for Monitor<T> {
    fn clone(&self) -> Self {
        Monitor {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Two monitors are equal when they are handles to the same registration.
impl<T> PartialEq for Monitor<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for Monitor<T> {}

impl<T> fmt::Debug for Monitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("Monitor")
            .field("id", &self.inner.id)
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}
