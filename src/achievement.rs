//! Achievement identifiers, artifact naming, and per-achievement status.
//!
//! Achievements are identified by a dotted `major.minor` id (`"3.1"`) and
//! appear in artifact filenames as a *suffix* with the dot removed (`"31"`).
//! The suffix encoding is ambiguous once any component exceeds one digit:
//! `"1.23"` and `"12.3"` both encode to `"123"`. Decoding assumes a
//! single-digit major, matching how plans name their files today. See
//! DESIGN.md before changing this.

use serde::{Deserialize, Serialize};

/// A unit of work enumerated in a plan's achievement index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    /// Dotted id, e.g. `"0.1"`.
    pub id: String,
    /// Title text following the id in the index line; empty if none.
    pub title: String,
}

impl Achievement {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Where an achievement sits in the Subplan → Execution → Review pipeline,
/// derived purely from which artifact files exist.
///
/// Display precedence: `Complete` > `NeedsFix` > `InProgress` >
/// `SubplanReady` > `NotStarted`. An Approved file and a Fix file can
/// coexist on disk; precedence only governs what is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementStatus {
    /// No artifacts exist yet.
    NotStarted,
    /// A subplan has been written but execution has not begun.
    SubplanReady,
    /// An execution task exists without an approval.
    InProgress,
    /// A fix request is outstanding.
    NeedsFix,
    /// An approval exists; wins over every other artifact.
    Complete,
}

impl AchievementStatus {
    /// Check if this status counts as done for progress purposes.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Encode an achievement id as its filename suffix: `"3.1"` → `"31"`.
pub fn suffix(id: &str) -> String {
    id.replace('.', "")
}

/// Decode a filename suffix back to an achievement id: `"31"` → `"3.1"`.
///
/// Assumes a single-digit major; a suffix shorter than two characters is
/// returned unchanged.
pub fn id_from_suffix(sfx: &str) -> String {
    match sfx.char_indices().nth(1) {
        Some((split, _)) => format!("{}.{}", &sfx[..split], &sfx[split..]),
        None => sfx.to_string(),
    }
}
