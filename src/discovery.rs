//! Plan discovery: enumerating plan directories and locating index files.
//!
//! A plan is a directory holding one `PLAN_*.md` index file. Discovery is
//! performed fresh on every call; nothing is cached between queries, so two
//! calls against an unmodified tree return the same answer.

use crate::errors::DiscoveryError;
use glob::glob;
use std::path::{Path, PathBuf};

/// A discovered plan directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Directory name.
    pub name: String,
    /// Absolute or caller-relative path to the plan directory.
    pub dir: PathBuf,
}

impl Plan {
    /// Build a `Plan` directly from a directory path, without enumerating
    /// the root. The name is the final path component.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self { name, dir }
    }
}

/// Enumerate the immediate subdirectories of `root` as plans.
///
/// Dotfile-prefixed names and non-directories are skipped, and the result
/// is sorted by name. A non-existent root is not an error: it yields an
/// empty list. A root that exists but cannot be read raises
/// [`DiscoveryError::RootUnreadable`].
pub fn list_plans(root: &Path) -> Result<Vec<Plan>, DiscoveryError> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(DiscoveryError::RootUnreadable {
                path: root.to_path_buf(),
                source: err,
            });
        }
    };

    let mut plans = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| DiscoveryError::RootUnreadable {
            path: root.to_path_buf(),
            source: err,
        })?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        plans.push(Plan {
            name,
            dir: entry.path(),
        });
    }

    plans.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(plans)
}

/// Locate the plan's index file: the first `PLAN_*.md` directly inside the
/// plan directory.
///
/// Returns `None` when no file matches. When several match, the first one
/// the directory scan yields wins; the tie-break is not defined beyond that.
pub fn find_index_file(plan: &Plan) -> Option<PathBuf> {
    let pattern = plan.dir.join("PLAN_*.md").to_string_lossy().to_string();
    glob(&pattern).ok()?.filter_map(|entry| entry.ok()).next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn list_plans_missing_root_yields_empty() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("no-such-root");
        let plans = list_plans(&missing).unwrap();
        assert!(plans.is_empty());
    }

    #[test]
    fn list_plans_skips_dotdirs_and_files() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("AUTH")).unwrap();
        fs::create_dir(dir.path().join(".archive")).unwrap();
        fs::write(dir.path().join("README.md"), "not a plan").unwrap();

        let plans = list_plans(dir.path()).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name, "AUTH");
        assert_eq!(plans[0].dir, dir.path().join("AUTH"));
    }

    #[test]
    fn list_plans_sorts_by_name() {
        let dir = tempdir().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }

        let plans = list_plans(dir.path()).unwrap();
        let names: Vec<&str> = plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn find_index_file_none_when_absent() {
        let dir = tempdir().unwrap();
        let plan_dir = dir.path().join("AUTH");
        fs::create_dir(&plan_dir).unwrap();
        let plan = Plan::from_dir(&plan_dir);
        assert!(find_index_file(&plan).is_none());
    }

    #[test]
    fn find_index_file_matches_plan_prefix_only() {
        let dir = tempdir().unwrap();
        let plan_dir = dir.path().join("AUTH");
        fs::create_dir(&plan_dir).unwrap();
        fs::write(plan_dir.join("NOTES.md"), "").unwrap();
        fs::write(plan_dir.join("PLAN_AUTH.md"), "# plan").unwrap();

        let plan = Plan::from_dir(&plan_dir);
        assert_eq!(find_index_file(&plan), Some(plan_dir.join("PLAN_AUTH.md")));
    }

    #[test]
    fn plan_from_dir_uses_final_component_as_name() {
        let plan = Plan::from_dir("/plans/BILLING");
        assert_eq!(plan.name, "BILLING");
    }
}
