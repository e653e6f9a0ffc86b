//! Node pool selection
//!
//! Maps a run template's compute size to the node pool label the workflow
//! is scheduled on.

use tracing::warn;

/// Compute size meaning "explicitly no preference"
pub const NONE_SIZE: &str = "%NONE%";
pub const DEFAULT_SIZE: &str = "basic";
pub const POOL_SUFFIX: &str = "pool";

/// Resolves the node pool of a run
///
/// - `Some("highcpu")` -> `Some("highcpupool")`
/// - `Some("%NONE%")` -> `Some("basicpool")`
/// - `None` -> `None`, the engine's default placement applies
pub fn resolve_sizing(compute_size: Option<&str>) -> Option<String> {
    let size = compute_size?.trim();

    if size.is_empty() {
        warn!("Empty compute size, using the engine's default placement");
        return None;
    }

    if size == NONE_SIZE {
        return Some(format!("{}{}", DEFAULT_SIZE, POOL_SUFFIX));
    }

    Some(format!("{}{}", size, POOL_SUFFIX))
}
