//! Parallel-execution detection.
//!
//! Reads a plan's optional `parallel.json`, drops achievements that are
//! already approved, and layers the remainder into dependency levels.
//! Every achievement inside one level can run concurrently; levels must
//! run in order.
//!
//! Time estimates use a fixed per-achievement duration rather than any
//! measurement: for a level of size `k`, sequential time is `k × D`,
//! parallel time is `D`, and the savings follow. Only the ratios carry
//! meaning.

pub mod leveler;
pub mod manifest;

pub use manifest::{ManifestAchievement, ParallelManifest, load_manifest};

use crate::achievement;
use crate::discovery::Plan;
use crate::errors::ManifestError;
use serde::{Deserialize, Serialize};

/// Assumed duration of one achievement, in minutes.
pub const ACHIEVEMENT_DURATION_MINS: f64 = 30.0;

/// One dependency level of concurrently executable achievements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelGroup {
    /// Dependency level, starting at 0.
    pub level: usize,
    /// Members of the level, in manifest order.
    pub achievement_ids: Vec<String>,
    /// Time to run the members one after another.
    pub sequential_minutes: f64,
    /// Time to run the members concurrently.
    pub parallel_minutes: f64,
    pub savings_minutes: f64,
    pub savings_percent: f64,
}

impl ParallelGroup {
    fn for_level(level: usize, achievement_ids: Vec<String>) -> Self {
        let sequential_minutes = achievement_ids.len() as f64 * ACHIEVEMENT_DURATION_MINS;
        let parallel_minutes = if achievement_ids.is_empty() {
            0.0
        } else {
            ACHIEVEMENT_DURATION_MINS
        };
        let savings_minutes = sequential_minutes - parallel_minutes;
        let savings_percent = if sequential_minutes == 0.0 {
            0.0
        } else {
            100.0 * savings_minutes / sequential_minutes
        };
        Self {
            level,
            achievement_ids,
            sequential_minutes,
            parallel_minutes,
            savings_minutes,
            savings_percent,
        }
    }
}

/// Check whether the plan opted into parallel execution.
pub fn has_manifest(plan: &Plan) -> bool {
    plan.dir.join("parallel.json").exists()
}

/// Compute the plan's parallel-execution groups.
///
/// Achievements whose `APPROVED_<suffix>.md` already exists under
/// `execution/feedbacks/` are filtered out before leveling; a missing
/// feedbacks directory means nothing is complete. An absent manifest yields
/// no groups; a manifest that exists but cannot be read or parsed raises
/// [`ManifestError`]. Groups come back in increasing level order, and only
/// levels with at least one incomplete achievement are emitted.
pub fn detect_groups(plan: &Plan) -> Result<Vec<ParallelGroup>, ManifestError> {
    let path = plan.dir.join("parallel.json");
    let parsed = match manifest::load_manifest(&path) {
        Ok(parsed) => parsed,
        Err(ManifestError::Unreadable { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            return Ok(Vec::new());
        }
        Err(err) => return Err(err),
    };

    let feedbacks_dir = plan.dir.join("execution").join("feedbacks");
    let incomplete: Vec<ManifestAchievement> = parsed
        .achievements
        .into_iter()
        .filter(|a| {
            let approved = feedbacks_dir.join(format!("APPROVED_{}.md", achievement::suffix(&a.id)));
            !approved.exists()
        })
        .collect();

    if incomplete.is_empty() {
        return Ok(Vec::new());
    }

    let mut groups = Vec::new();
    for current in 0.. {
        let members = leveler::level(&incomplete, current);
        if members.is_empty() {
            break;
        }
        let ids = members.iter().map(|a| a.id.clone()).collect();
        groups.push(ParallelGroup::for_level(current, ids));
    }

    Ok(groups)
}

/// The next group that can execute, if any work remains.
pub fn first_incomplete_group(plan: &Plan) -> Result<Option<ParallelGroup>, ManifestError> {
    Ok(detect_groups(plan)?.into_iter().next())
}
