//! Keyed async resource cell (product, statistics).
//!
//! DESIGN
//! ======
//! [`ResourceState`] is the pure lifecycle: key, held value, phase, and a
//! generation counter that stamps every issued fetch with a [`Ticket`]. A
//! result is applied only when its ticket is the one in flight, so a fetch
//! for an old key can never overwrite the value for the current key.
//! [`ResourceCell`] drives that state with a fetcher and a [`Runtime`], and
//! notifies a trigger on every visible change so snapshots read inside a
//! reactive scope re-run.
//!
//! TRADE-OFFS
//! ==========
//! During a refetch the previous value is held and only readiness flips. A
//! held value is tagged with its key; [`ResourceState::current_value`] hides
//! it once the key moves on.

#[cfg(test)]
#[path = "resource_test.rs"]
mod resource_test;

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;
use leptos::prelude::{ArcTrigger, Notify, Track};

use crate::error::{ApiError, FetchError};
use crate::util::runtime::SharedRuntime;

/// Produces the fetch future for a key.
pub type Fetcher<K, T> = Rc<dyn Fn(K) -> LocalBoxFuture<'static, Result<T, ApiError>>>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResourcePhase {
    /// No key yet, or the cell was disposed.
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Stamp of one issued fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

/// What happened to a settled fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution<K> {
    /// The ticket was superseded; nothing changed.
    Stale,
    Applied,
    /// A refetch was requested while this one was in flight; the follow-up
    /// must be started.
    Reissued(Ticket, K),
}

#[derive(Clone, Debug)]
pub struct ResourceState<K, T> {
    key: Option<K>,
    value: Option<(K, T)>,
    phase: ResourcePhase,
    error: Option<FetchError>,
    generation: u64,
    in_flight: Option<Ticket>,
    rerun: bool,
}

impl<K, T> Default for ResourceState<K, T> {
    fn default() -> Self {
        Self { key: None, value: None, phase: ResourcePhase::Idle, error: None, generation: 0, in_flight: None, rerun: false }
    }
}

impl<K: Clone + PartialEq, T> ResourceState<K, T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> ResourcePhase {
        self.phase
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase == ResourcePhase::Ready
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.phase == ResourcePhase::Failed
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == ResourcePhase::Loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    /// Last value any fetch produced, possibly for an older key.
    #[must_use]
    pub fn held_value(&self) -> Option<&T> {
        self.value.as_ref().map(|(_, value)| value)
    }

    /// Held value, only if it belongs to the current key.
    #[must_use]
    pub fn current_value(&self) -> Option<&T> {
        match (&self.value, &self.key) {
            (Some((value_key, value)), Some(key)) if value_key == key => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<Ticket> {
        self.in_flight
    }

    /// Switch to `key`. Returns the fetch to start, or `None` when the key is
    /// unchanged.
    pub fn set_key(&mut self, key: K) -> Option<(Ticket, K)> {
        if self.key.as_ref() == Some(&key) {
            return None;
        }
        self.key = Some(key.clone());
        self.rerun = false;
        Some(self.issue(key))
    }

    /// Refetch the current key. While a fetch is in flight this only queues
    /// one follow-up and returns `None`.
    pub fn refetch(&mut self) -> Option<(Ticket, K)> {
        let key = self.key.clone()?;
        if self.in_flight.is_some() {
            self.rerun = true;
            return None;
        }
        Some(self.issue(key))
    }

    /// Apply a settled fetch.
    pub fn resolve(&mut self, ticket: Ticket, result: Result<T, FetchError>) -> Resolution<K> {
        if self.in_flight != Some(ticket) {
            return Resolution::Stale;
        }
        self.in_flight = None;
        let Some(key) = self.key.clone() else {
            return Resolution::Stale;
        };

        match result {
            Ok(value) => {
                self.value = Some((key.clone(), value));
                self.error = None;
            }
            Err(error) if !self.rerun => {
                self.error = Some(error);
                self.phase = ResourcePhase::Failed;
                return Resolution::Applied;
            }
            Err(_) => {}
        }

        if self.rerun {
            self.rerun = false;
            let (ticket, key) = self.issue(key);
            return Resolution::Reissued(ticket, key);
        }
        self.phase = ResourcePhase::Ready;
        Resolution::Applied
    }

    /// Drop any in-flight fetch so its result lands as stale.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight = None;
        self.rerun = false;
        if self.phase == ResourcePhase::Loading {
            self.phase = ResourcePhase::Idle;
        }
    }

    fn issue(&mut self, key: K) -> (Ticket, K) {
        self.generation += 1;
        let ticket = Ticket(self.generation);
        self.in_flight = Some(ticket);
        self.phase = ResourcePhase::Loading;
        self.error = None;
        (ticket, key)
    }
}

/// Render-facing copy of a cell.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceView<T> {
    pub value: Option<T>,
    pub is_ready: bool,
    pub is_error: bool,
    pub is_loading: bool,
    pub error: Option<FetchError>,
}

// =============================================================================
// CELL
// =============================================================================

struct CellInner<K, T> {
    name: &'static str,
    state: RefCell<ResourceState<K, T>>,
    fetcher: Fetcher<K, T>,
    runtime: SharedRuntime,
    changed: ArcTrigger,
    alive: Cell<bool>,
}

/// Fetch-on-key-change container for one remote value.
pub struct ResourceCell<K, T> {
    inner: Rc<CellInner<K, T>>,
}

impl<K, T> Clone for ResourceCell<K, T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<K, T> ResourceCell<K, T>
where
    K: Clone + PartialEq + Debug + 'static,
    T: Clone + 'static,
{
    pub fn new<F>(name: &'static str, runtime: SharedRuntime, fetcher: F) -> Self
    where
        F: Fn(K) -> LocalBoxFuture<'static, Result<T, ApiError>> + 'static,
    {
        Self {
            inner: Rc::new(CellInner {
                name,
                state: RefCell::new(ResourceState::new()),
                fetcher: Rc::new(fetcher),
                runtime,
                changed: ArcTrigger::new(),
                alive: Cell::new(true),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Point the cell at `key`, fetching when it differs from the current one.
    pub fn set_key(&self, key: K) {
        if !self.inner.alive.get() {
            return;
        }
        let issued = self.inner.state.borrow_mut().set_key(key);
        if let Some(request) = issued {
            self.start(request);
            self.notify();
        }
    }

    /// Fetch the current key again, coalescing with any in-flight fetch.
    pub fn refetch(&self) {
        if !self.inner.alive.get() {
            return;
        }
        let issued = self.inner.state.borrow_mut().refetch();
        if let Some(request) = issued {
            self.start(request);
            self.notify();
        }
    }

    /// Render-facing copy; tracks the cell.
    #[must_use]
    pub fn snapshot(&self) -> ResourceView<T> {
        self.inner.changed.track();
        let state = self.inner.state.borrow();
        ResourceView {
            value: state.current_value().cloned(),
            is_ready: state.is_ready(),
            is_error: state.is_error(),
            is_loading: state.is_loading(),
            error: state.error().cloned(),
        }
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&ResourceState<K, T>) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Stop applying results; in-flight fetches settle into nothing.
    pub fn dispose(&self) {
        self.inner.alive.set(false);
        self.inner.state.borrow_mut().invalidate();
    }

    fn start(&self, (ticket, key): (Ticket, K)) {
        leptos::logging::log!("{}: fetching {:?}", self.inner.name, key);
        let pending = (self.inner.fetcher)(key);
        let weak: Weak<CellInner<K, T>> = Rc::downgrade(&self.inner);
        self.inner.runtime.spawn(Box::pin(async move {
            let result = pending.await;
            if let Some(inner) = weak.upgrade() {
                Self { inner }.finish(ticket, result);
            }
        }));
    }

    fn finish(&self, ticket: Ticket, result: Result<T, ApiError>) {
        if !self.inner.alive.get() {
            return;
        }
        let name = self.inner.name;
        let result = result.map_err(|source| {
            leptos::logging::warn!("{name}: fetch failed: {source}");
            FetchError { resource: name, source }
        });
        let resolution = self.inner.state.borrow_mut().resolve(ticket, result);
        match resolution {
            Resolution::Stale => {
                leptos::logging::debug_warn!("{name}: discarded stale response");
            }
            Resolution::Applied => self.notify(),
            Resolution::Reissued(ticket, key) => {
                self.start((ticket, key));
                self.notify();
            }
        }
    }

    fn notify(&self) {
        self.inner.changed.notify();
    }
}
