//! Sizing command handler

use anyhow::Result;
use colored::*;
use simforge_compiler::resolve_sizing;

/// Print the node pool a compute size resolves to
pub fn show_sizing(compute_size: Option<&str>) -> Result<()> {
    match resolve_sizing(compute_size) {
        Some(pool) => println!("{}", pool.cyan()),
        None => println!("{}", "No node pool, default placement applies.".yellow()),
    }
    Ok(())
}
