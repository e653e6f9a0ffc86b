//! Simforge Core
//!
//! Core types shared by the Simforge pipeline compiler and its callers.
//!
//! This crate contains:
//! - Domain types: the validated inputs of a run (Organization, Workspace,
//!   Solution, Scenario, Dataset, Connector)
//! - DTOs: the compiled container pipeline and the workflow engine's
//!   custom-resource object model

pub mod domain;
pub mod dto;
