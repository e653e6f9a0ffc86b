//! Core domain types
//!
//! These structures are supplied by the platform services (already
//! validated and access-checked) and are read-only inputs to the compiler.

pub mod dataset;
pub mod organization;
pub mod scenario;
pub mod solution;
