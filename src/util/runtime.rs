//! Task and timer seam for the single-threaded page runtime.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every asynchronous effect the page starts (fetches, mutation follow-ups,
//! sheet animation timers) goes through a [`Runtime`]. In the browser that is
//! the Leptos local executor plus `gloo-timers`; tests drive a manual runtime
//! with virtual time.

use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;

/// Spawns local (non-`Send`) tasks and produces sleep futures.
pub trait Runtime {
    /// Run `task` to completion in the background.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);

    /// Future that resolves once `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

pub type SharedRuntime = Rc<dyn Runtime>;

/// [`Runtime`] backed by the Leptos task executor.
///
/// Off the browser (SSR) sleeps resolve immediately; nothing animates there.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserRuntime;

impl Runtime for BrowserRuntime {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        leptos::task::spawn_local(task);
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        #[cfg(feature = "hydrate")]
        {
            Box::pin(gloo_timers::future::sleep(duration))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = duration;
            Box::pin(futures::future::ready(()))
        }
    }
}
