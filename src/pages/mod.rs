//! Page modules for route-level screens.
//!
//! ARCHITECTURE
//! ============
//! Each page owns route-scoped orchestration (a controller over `state`)
//! and keeps rendering details in small private view helpers.

pub mod product;
