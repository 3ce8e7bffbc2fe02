//! The multiplexing engine.
//!
//! A [`Selector`] owns one native multiplexer handle and the bookkeeping
//! around it: a registry mapping each resource to its native key, a
//! deferred-cancellation set, and the serialization of the blocking wait.
//!
//! Cancellation is deliberately deferred: `deregister` only moves the key
//! out of the registry and parks it in the cancellation set, which is
//! flushed at the top of the next [`select`](Selector::select) call.
//! Mutating the native key set while another thread's wait may be
//! iterating it is unsafe or undefined in most multiplexer APIs; deferring
//! avoids that hazard entirely, lets `deregister` return immediately, and
//! allows a same-cycle `register` to resurrect the parked key in place.

use crate::arena::Slab;
use crate::errors::{Error, Result};
use crate::interest::{Interest, Ops};
use crate::lock;
use crate::monitor::Monitor;
use crate::selectable::Selectable;
use crate::sys::{self, Backend, Event, Poller, RawId};
use crate::translate;

use log::{debug, trace};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Convert a float-second timeout to a [`Duration`].
///
/// This is the boundary where invalid timeouts are rejected: negative or
/// NaN seconds fail with [`Error::InvalidTimeout`]. Pass the result (or
/// `None` for an unbounded wait) to [`Selector::select`].
pub fn timeout_from_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(Error::InvalidTimeout);
    }
    Ok(Duration::from_secs_f64(secs))
}

/// A readiness multiplexer over many I/O resources.
///
/// `T` is the type of the value callers may attach to each
/// [`Monitor`]; it defaults to `()`.
///
/// See the [crate docs](crate) for the overall model and an example.
pub struct Selector<T = ()> {
    shared: Arc<Shared<T>>,
}

/// Selector internals, shared with monitors through weak back-references.
pub(crate) struct Shared<T> {
    poller: Poller,

    /// Registry bookkeeping. Held only for short, non-blocking sections;
    /// never across the native wait.
    registry: Mutex<Registry<T>>,

    /// Serializes `select` callers and owns the reusable event buffer.
    /// The native wait blocks while holding only this lock, so
    /// registration, deregistration, wakeup, and close proceed freely.
    select_lock: Mutex<Vec<Event>>,

    closed: AtomicBool,
}

struct Registry<T> {
    /// Live registrations: resource identity → key token.
    live: HashMap<RawId, usize>,

    /// Keys pending native cancellation, flushed at the top of the next
    /// `select`. Small and ordered; no lock-free cleverness here.
    cancelled: BTreeMap<RawId, usize>,

    /// Key arena; the token is the index stored in the native layer's
    /// user-data slot.
    keys: Slab<KeyEntry<T>>,
}

/// A native registration key: the resource, its current native interest,
/// and the monitor handed to the caller.
struct KeyEntry<T> {
    id: RawId,
    ops: Ops,
    monitor: Monitor<T>,
}

impl<T> Selector<T> {
    /// Open a new selector on the platform's native multiplexer.
    pub fn new() -> Result<Selector<T>> {
        let poller = Poller::new()?;

        Ok(Selector {
            shared: Arc::new(Shared {
                poller,
                registry: Mutex::new(Registry {
                    live: HashMap::new(),
                    cancelled: BTreeMap::new(),
                    keys: Slab::with_capacity(16),
                }),
                select_lock: Mutex::new(Vec::with_capacity(64)),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub(crate) fn from_shared(shared: Arc<Shared<T>>) -> Selector<T> {
        Selector { shared }
    }

    /// The native mechanism backing this selector.
    pub fn backend(&self) -> Backend {
        Backend::CURRENT
    }

    /// Register a resource and return its [`Monitor`].
    ///
    /// The resource is switched to non-blocking mode and its interest
    /// translated against its capabilities. If the resource has a key
    /// parked in the deferred-cancellation set, that key is resurrected by
    /// rewriting its native interest in place — cheaper than cancelling
    /// and recreating, and correct because the cancellation has not been
    /// flushed yet.
    pub fn register<R: Selectable>(&self, resource: &R, interest: Interest) -> Result<Monitor<T>> {
        self.ensure_open()?;

        let id = resource.raw_id();
        if !sys::is_valid(id) {
            return Err(Error::InvalidResource);
        }

        resource.set_nonblocking()?;

        let caps = resource.capabilities();
        let ops = translate::to_native(caps, interest)?;

        let mut registry = lock(&self.shared.registry);

        if registry.live.contains_key(&id) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "resource is already registered with this selector",
            )));
        }

        let monitor = Monitor::new(id, caps, ops, Arc::downgrade(&self.shared));

        if let Some(token) = registry.cancelled.remove(&id) {
            if let Err(err) = self.shared.poller.modify(id, token, ops) {
                registry.cancelled.insert(id, token);
                return Err(Error::Io(err));
            }

            let entry = registry
                .keys
                .get_mut(token)
                .ok_or(Error::InvalidResource)?;
            entry.ops = ops;
            entry.monitor = monitor.clone();
            registry.live.insert(id, token);

            trace!("resurrected pending key for resource {id:?}");
        } else {
            let token = registry.keys.insert(KeyEntry {
                id,
                ops,
                monitor: monitor.clone(),
            });

            if let Err(err) = self.shared.poller.add(id, token, ops) {
                registry.keys.remove(token);
                return Err(Error::Io(err));
            }

            registry.live.insert(id, token);

            trace!("registered resource {id:?} as token {token}");
        }

        Ok(monitor)
    }

    /// Deregister a resource, returning its now-closed [`Monitor`], or
    /// `None` when the resource has no live registration.
    ///
    /// The native key is not cancelled here; it is parked for the next
    /// `select` call to flush.
    pub fn deregister<R: Selectable>(&self, resource: &R) -> Result<Option<Monitor<T>>> {
        self.ensure_open()?;
        Ok(self.shared.deregister_id(resource.raw_id()))
    }

    /// Registration status of a resource: `None` when unknown (never
    /// registered, or already flushed away), `Some(true)` when live with
    /// an open monitor, `Some(false)` when deregistered and awaiting
    /// flush.
    pub fn registered<R: Selectable>(&self, resource: &R) -> Result<Option<bool>> {
        self.ensure_open()?;

        let id = resource.raw_id();
        let registry = lock(&self.shared.registry);

        if let Some(&token) = registry.live.get(&id) {
            let open = registry
                .keys
                .get(token)
                .is_some_and(|entry| !entry.monitor.is_closed());
            return Ok(Some(open));
        }

        if registry.cancelled.contains_key(&id) {
            return Ok(Some(false));
        }

        Ok(None)
    }

    /// Block until one or more registered resources become ready, and
    /// return their monitors in native-reported order.
    ///
    /// `None` waits without bound; `Some(Duration::ZERO)` polls without
    /// blocking; a positive timeout waits up to that long with sub-second
    /// precision (see [`timeout_from_secs`] for the float-second
    /// boundary). An elapsed timeout, an external [`wakeup`]
    /// (`Selector::wakeup`), or an interrupted native wait all return an
    /// empty list, never an error.
    ///
    /// Overlapping calls from several threads serialize: the second caller
    /// blocks until the first returns.
    ///
    /// [`wakeup`]: Selector::wakeup
    pub fn select(&self, timeout: Option<Duration>) -> Result<Vec<Monitor<T>>> {
        self.ensure_open()?;

        let mut events = lock(&self.shared.select_lock);

        // A close may have won the race for the lock.
        self.ensure_open()?;

        self.flush_cancelled();

        self.shared.poller.wait(&mut events, timeout)?;

        self.collect_ready(&events)
    }

    /// Like [`select`](Selector::select), but invokes `on_ready` with each
    /// ready monitor and returns how many there were.
    pub fn select_with<F>(&self, timeout: Option<Duration>, mut on_ready: F) -> Result<usize>
    where
        F: FnMut(&Monitor<T>),
    {
        let ready = self.select(timeout)?;
        for monitor in &ready {
            on_ready(monitor);
        }
        Ok(ready.len())
    }

    /// Cancel every parked key at the native layer. This is the only point
    /// where cancellation becomes observable to the native multiplexer.
    fn flush_cancelled(&self) {
        let mut registry = lock(&self.shared.registry);
        if registry.cancelled.is_empty() {
            return;
        }

        let cancelled = std::mem::take(&mut registry.cancelled);
        for (id, token) in cancelled {
            // The caller may have closed the resource after deregistering
            // it, in which case the native delete has nothing to do.
            if let Err(err) = self.shared.poller.delete(id) {
                debug!("cancelling key for resource {id:?}: {err}");
            }
            registry.keys.remove(token);
        }
    }

    fn collect_ready(&self, events: &[Event]) -> Result<Vec<Monitor<T>>> {
        let mut ready = Vec::with_capacity(events.len());

        let mut guard = lock(&self.shared.registry);
        let registry = &mut *guard;
        for event in events {
            // Skip keys cancelled while the wait was in flight.
            let Some(entry) = registry.keys.get_mut(event.token) else {
                continue;
            };
            if registry.live.get(&entry.id) != Some(&event.token) {
                continue;
            }

            let mut observed = Ops::EMPTY;
            if event.readable {
                observed = observed.or(entry.ops.intersect(Ops::READ_CLASS));
            }
            if event.writable {
                observed = observed.or(entry.ops.intersect(Ops::WRITE_CLASS));
            }
            if observed.is_empty() {
                continue;
            }

            // A connect event is one-shot: rewrite the native interest to
            // plain write before handing the monitor back, or the same
            // event would spuriously refire on the next wait.
            if observed.contains(Ops::CONNECT) {
                let rewritten = entry.ops.without(Ops::CONNECT).or(Ops::WRITE);
                self.shared.poller.modify(entry.id, event.token, rewritten)?;
                entry.ops = rewritten;
                entry.monitor.settle_connection();
            }

            entry.monitor.record(observed, entry.ops);
            ready.push(entry.monitor.clone());
        }

        Ok(ready)
    }

    /// Wake a thread blocked in [`select`](Selector::select), if any.
    ///
    /// The woken call returns promptly with empty readiness, not an error.
    /// The signal is latched: issued with no waiter, it makes the next
    /// `select` return immediately instead of blocking.
    pub fn wakeup(&self) -> Result<()> {
        self.ensure_open()?;
        self.shared.poller.wake();
        Ok(())
    }

    /// Close the selector and release the native handle.
    ///
    /// Idempotent. A thread currently blocked in `select` is woken first;
    /// its next operation observes [`Error::ClosedSelector`].
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Wake any in-flight wait, then take its lock so the native
        // handle is not released out from under it.
        self.shared.poller.wake();
        let _serialized = lock(&self.shared.select_lock);

        let mut registry = lock(&self.shared.registry);
        registry.live.clear();
        registry.cancelled.clear();
        for entry in registry.keys.take_all() {
            entry.monitor.mark_closed();
        }
        drop(registry);

        self.shared.poller.close();
        debug!("selector closed");
    }

    /// Whether this selector has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Whether nothing is registered — neither live nor awaiting
    /// cancellation flush.
    pub fn is_empty(&self) -> bool {
        let registry = lock(&self.shared.registry);
        registry.live.is_empty() && registry.cancelled.is_empty()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::ClosedSelector)
        } else {
            Ok(())
        }
    }
}

impl<T> Shared<T> {
    /// Close the monitor and park its key for deferred cancellation.
    ///
    /// The monitor is marked closed directly (not via `Monitor::close`) so
    /// the two cannot recurse into each other.
    pub(crate) fn deregister_id(&self, id: RawId) -> Option<Monitor<T>> {
        let monitor = {
            let mut registry = lock(&self.registry);
            let token = registry.live.remove(&id)?;
            registry.cancelled.insert(id, token);
            registry.keys.get(token)?.monitor.clone()
        };

        monitor.mark_closed();
        trace!("deregistered resource {id:?}; cancellation deferred");
        Some(monitor)
    }

    /// Re-apply a monitor's native interest in place.
    pub(crate) fn reapply(&self, id: RawId, ops: Ops) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ClosedSelector);
        }

        let mut registry = lock(&self.registry);
        let token = *registry.live.get(&id).ok_or(Error::ClosedMonitor)?;
        self.poller.modify(id, token, ops)?;

        if let Some(entry) = registry.keys.get_mut(token) {
            entry.ops = ops;
        }
        Ok(())
    }
}

impl<T> std::fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("backend", &self.backend())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
