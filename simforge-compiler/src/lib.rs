//! Simforge Pipeline Compiler
//!
//! Compiles a scenario's run template into a dependency-ordered pipeline of
//! containers, then lowers that pipeline into the workflow engine's custom
//! resource.
//!
//! Compiling is a pure function of its inputs: the caller resolves the
//! organization, workspace, solution, scenario, datasets and connectors
//! beforehand and passes them in with the platform configuration.
//!
//! # Example
//!
//! ```no_run
//! use simforge_compiler::{PipelineCompiler, PlatformConfig, RunInputs, WorkflowLowering};
//!
//! fn launch(config: &PlatformConfig, inputs: &RunInputs) -> simforge_compiler::Result<()> {
//!     let start = PipelineCompiler::new(config).compile(inputs, "sim-1")?;
//!     let workflow = WorkflowLowering::new(config).lower(&start)?;
//!
//!     println!("{} templates", workflow.spec.templates.len());
//!     Ok(())
//! }
//! ```

pub mod compiler;
pub mod config;
pub mod connector;
pub mod env;
pub mod error;
pub mod lowering;
pub mod sizing;
pub mod stage;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use compiler::{PipelineCompiler, RunInputs};
pub use config::PlatformConfig;
pub use error::{CompileError, Result};
pub use lowering::WorkflowLowering;
pub use sizing::resolve_sizing;
