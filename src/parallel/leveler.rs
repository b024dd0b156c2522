//! Dependency leveling: generic topological layering of achievements.
//!
//! A level is the minimum number of sequential stages before an achievement
//! can start. Level 0 holds achievements with no unsatisfied prerequisites;
//! level N holds those whose prerequisites all sit in levels below N.

use crate::parallel::manifest::ManifestAchievement;
use std::collections::{HashMap, HashSet};

/// Select the achievements belonging to `target_level`.
///
/// Pure function over its input: levels are assigned from 0 upward until
/// `target_level` is reached, and the members of that level are returned in
/// input order. A dependency naming an id outside `achievements` counts as
/// satisfied: the caller filters completed work out of the set, and a
/// finished prerequisite must not hold back its dependents.
///
/// Returns an empty vec once the set is exhausted (or when the only
/// remaining members depend on each other in a cycle, which can never
/// level).
pub fn level(
    achievements: &[ManifestAchievement],
    target_level: usize,
) -> Vec<&ManifestAchievement> {
    let known: HashSet<&str> = achievements.iter().map(|a| a.id.as_str()).collect();
    let mut assigned: HashMap<&str, usize> = HashMap::new();

    for current in 0..=target_level {
        let members: Vec<&ManifestAchievement> = achievements
            .iter()
            .filter(|a| !assigned.contains_key(a.id.as_str()))
            .filter(|a| {
                a.dependencies.iter().all(|dep| {
                    !known.contains(dep.as_str())
                        || assigned.get(dep.as_str()).is_some_and(|&lvl| lvl < current)
                })
            })
            .collect();

        if current == target_level {
            return members;
        }
        if members.is_empty() {
            // Nothing leveled here, so nothing can level above it either.
            return Vec::new();
        }
        for member in members {
            assigned.insert(member.id.as_str(), current);
        }
    }

    Vec::new()
}
