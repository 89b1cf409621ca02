//! Utility helpers shared across the page modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules isolate browser/environment concerns (tasks, timers,
//! viewport) from state logic so the latter stays testable off the browser.

pub mod device;
pub mod runtime;
