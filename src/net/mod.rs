//! Network boundary: wire types and the review API seam.
//!
//! SYSTEM CONTEXT
//! ==============
//! State modules depend only on the [`api::ReviewApi`] trait; the HTTP
//! implementation is one adapter among others (tests use a scripted fake).

pub mod api;
pub mod types;
