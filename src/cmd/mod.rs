//! CLI command implementations.
//!
//! Each submodule owns one or more `Commands` variants:
//!
//! | Module     | Commands handled |
//! |------------|------------------|
//! | `status`   | `Plans`, `Show`  |
//! | `parallel` | `Parallel`       |
//! | `watch`    | `Watch`          |
//!
//! The engine never prints; every line of user-facing output lives here.

pub mod parallel;
pub mod status;
pub mod watch;

pub use parallel::cmd_parallel;
pub use status::{cmd_plans, cmd_show};
pub use watch::cmd_watch;

use anyhow::{Result, bail};
use cairn::discovery::Plan;
use std::path::Path;

/// Resolve a plan name against the root, insisting the directory exists.
pub(crate) fn resolve_plan(root: &Path, name: &str) -> Result<Plan> {
    let dir = root.join(name);
    if !dir.is_dir() {
        bail!("No plan directory '{}' under {}", name, root.display());
    }
    Ok(Plan::from_dir(dir))
}
