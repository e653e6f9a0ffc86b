//! Data Transfer Objects
//!
//! Outputs of the compiler: the container pipeline produced for one run and
//! the workflow object it is lowered into.

pub mod container;
pub mod workflow;
