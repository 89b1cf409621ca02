//! Client-side state for the product review page.
//!
//! ARCHITECTURE
//! ============
//! Each module pairs a pure state type (unit-testable without a runtime)
//! with a thin `Rc` driver that owns timers and fetch tasks. Pages compose
//! the drivers; components only read snapshots.

pub mod auth_gate;
pub mod resource;
pub mod reviews;
pub mod session;
pub mod sheet;
