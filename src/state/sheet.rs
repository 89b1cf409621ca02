//! Review composer sheet: open/close with timed enter and exit animations.
//!
//! DESIGN
//! ======
//! [`SheetMachine`] is the pure lifecycle `Closed → Opening → Open → Closing
//! → Closed`. Each scheduled transition carries a sequence number and only
//! the latest one may complete, so a timer that outlives a forced close is
//! inert even if it fires. [`Sheet`] runs the timers on a [`Runtime`] and
//! aborts the pending one when a newer transition replaces it. Reading the
//! phase inside a reactive scope tracks it.
//!
//! TRADE-OFFS
//! ==========
//! A toggle while the sheet is animating is ignored rather than reversing the
//! animation. Only a forced close can interrupt an opening sheet.
//!
//! [`Runtime`]: crate::util::runtime::Runtime

#[cfg(test)]
#[path = "sheet_test.rs"]
mod sheet_test;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures::future::{AbortHandle, abortable};
use leptos::prelude::{ArcTrigger, Notify, Track};

use crate::config::SheetTimings;
use crate::util::runtime::SharedRuntime;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SheetPhase {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

impl SheetPhase {
    /// Whether the sheet is in the tree (including mid-animation).
    #[must_use]
    pub fn is_mounted(self) -> bool {
        self != Self::Closed
    }

    /// Whether the sheet is open or heading there.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Opening | Self::Open)
    }
}

/// A timed transition the driver must schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub seq: u64,
    pub delay: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct SheetMachine {
    phase: SheetPhase,
    timings: SheetTimings,
    seq: u64,
    pending: Option<u64>,
}

impl SheetMachine {
    #[must_use]
    pub fn new(timings: SheetTimings) -> Self {
        Self { timings, ..Self::default() }
    }

    #[must_use]
    pub fn phase(&self) -> SheetPhase {
        self.phase
    }

    #[must_use]
    pub fn pending(&self) -> Option<u64> {
        self.pending
    }

    /// Start opening from `Closed` or closing from `Open`. Ignored while
    /// animating.
    pub fn toggle(&mut self) -> Option<Transition> {
        match self.phase {
            SheetPhase::Closed => Some(self.enter(SheetPhase::Opening, self.timings.enter)),
            SheetPhase::Open => Some(self.enter(SheetPhase::Closing, self.timings.exit)),
            SheetPhase::Opening | SheetPhase::Closing => None,
        }
    }

    /// Close now from `Open` or `Opening`, superseding any pending timer.
    pub fn force_close(&mut self) -> Option<Transition> {
        match self.phase {
            SheetPhase::Open | SheetPhase::Opening => Some(self.enter(SheetPhase::Closing, self.timings.exit)),
            SheetPhase::Closing | SheetPhase::Closed => None,
        }
    }

    /// Finish the animation scheduled as `seq`. Returns `false` when `seq`
    /// was superseded.
    pub fn complete(&mut self, seq: u64) -> bool {
        if self.pending != Some(seq) {
            return false;
        }
        self.pending = None;
        self.phase = match self.phase {
            SheetPhase::Opening => SheetPhase::Open,
            SheetPhase::Closing => SheetPhase::Closed,
            settled => settled,
        };
        true
    }

    /// Drop the pending timer without moving.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    fn enter(&mut self, phase: SheetPhase, delay: Duration) -> Transition {
        self.seq += 1;
        self.phase = phase;
        self.pending = Some(self.seq);
        Transition { seq: self.seq, delay }
    }
}

// =============================================================================
// DRIVER
// =============================================================================

struct SheetInner {
    machine: RefCell<SheetMachine>,
    runtime: SharedRuntime,
    timer: RefCell<Option<AbortHandle>>,
    changed: ArcTrigger,
    alive: Cell<bool>,
}

/// Shared handle to the composer sheet.
#[derive(Clone)]
pub struct Sheet {
    inner: Rc<SheetInner>,
}

impl Sheet {
    #[must_use]
    pub fn new(timings: SheetTimings, runtime: SharedRuntime) -> Self {
        Self {
            inner: Rc::new(SheetInner {
                machine: RefCell::new(SheetMachine::new(timings)),
                runtime,
                timer: RefCell::new(None),
                changed: ArcTrigger::new(),
                alive: Cell::new(true),
            }),
        }
    }

    #[must_use]
    pub fn phase(&self) -> SheetPhase {
        self.inner.changed.track();
        self.phase_untracked()
    }

    #[must_use]
    pub fn phase_untracked(&self) -> SheetPhase {
        self.inner.machine.borrow().phase()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.phase().is_mounted()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.phase().is_open()
    }

    /// Returns `false` when the toggle was ignored (mid-animation or
    /// disposed).
    pub fn toggle(&self) -> bool {
        if !self.inner.alive.get() {
            return false;
        }
        let transition = self.inner.machine.borrow_mut().toggle();
        match transition {
            Some(transition) => {
                self.schedule(transition);
                true
            }
            None => {
                leptos::logging::debug_warn!("sheet: toggle ignored while {:?}", self.phase_untracked());
                false
            }
        }
    }

    pub fn force_close(&self) {
        if !self.inner.alive.get() {
            return;
        }
        let transition = self.inner.machine.borrow_mut().force_close();
        if let Some(transition) = transition {
            leptos::logging::log!("sheet: closing early");
            self.schedule(transition);
        }
    }

    /// Cancel the pending timer and stop reacting.
    pub fn dispose(&self) {
        self.inner.alive.set(false);
        self.inner.machine.borrow_mut().cancel();
        self.abort_timer();
    }

    fn schedule(&self, Transition { seq, delay }: Transition) {
        self.abort_timer();
        let (timer, handle) = abortable(self.inner.runtime.sleep(delay));
        *self.inner.timer.borrow_mut() = Some(handle);
        let weak: Weak<SheetInner> = Rc::downgrade(&self.inner);
        self.inner.runtime.spawn(Box::pin(async move {
            if timer.await.is_err() {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                Sheet { inner }.complete(seq);
            }
        }));
        self.notify();
    }

    fn complete(&self, seq: u64) {
        if !self.inner.alive.get() {
            return;
        }
        let applied = self.inner.machine.borrow_mut().complete(seq);
        if applied {
            self.inner.timer.borrow_mut().take();
            self.notify();
        }
    }

    fn abort_timer(&self) {
        let handle = self.inner.timer.borrow_mut().take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn notify(&self) {
        self.inner.changed.notify();
    }
}

impl std::fmt::Debug for Sheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sheet").field("phase", &self.phase_untracked()).finish_non_exhaustive()
    }
}
