//! State detection: deriving a [`PlanState`] snapshot from the file tree.
//!
//! Nothing here holds state of its own. Every query re-reads the plan's
//! index file and re-scans its artifact directories, so a snapshot is a
//! pure function of the tree: two calls against an unmodified plan return
//! identical results.
//!
//! Per-achievement derivation, in display precedence order:
//! - `Complete` — an `APPROVED_<suffix>.md` exists (wins over everything)
//! - `NeedsFix` — a `FIX_<suffix>.md` exists
//! - `InProgress` — an `EXECUTION_TASK_*` exists without an approval
//! - `SubplanReady` — a `SUBPLAN_*` exists and nothing further
//! - `NotStarted` — no artifacts at all

use crate::achievement::{self, Achievement, AchievementStatus};
use crate::discovery::{self, Plan};
use crate::errors::StateDetectionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ACHIEVEMENT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Achievement\s+(\d+\.\d+)").unwrap());

/// At most this many upcoming achievements are reported per snapshot.
const NEXT_AVAILABLE_LIMIT: usize = 3;

/// Overall status of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Work remains and nothing is flagged.
    Active,
    /// At least one achievement has an outstanding fix request.
    NeedsAttention,
    /// Every indexed achievement is approved.
    Complete,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::NeedsAttention => "needs attention",
            Self::Complete => "complete",
        };
        write!(f, "{label}")
    }
}

/// Aggregate snapshot of one plan, recomputed from the tree on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanState {
    /// Plan directory name.
    pub name: String,
    /// Index file the snapshot was derived from, if one exists.
    pub index_file: Option<PathBuf>,
    /// Id of the last approved achievement, by greatest approval suffix.
    pub last_completed: Option<String>,
    /// Up to three upcoming achievement ids, in index order.
    pub next_available: Vec<String>,
    /// Ids executed but not yet approved or flagged, in index order.
    pub pending_reviews: Vec<String>,
    /// Ids with an outstanding fix request, sorted and de-duplicated.
    pub pending_fixes: Vec<String>,
    /// Number of achievements in the index.
    pub total: usize,
    /// Number of approval artifacts on disk.
    pub completed: usize,
    /// Completion percentage, rounded to one decimal; 0 when the index is empty.
    pub progress: f64,
    pub status: PlanStatus,
}

impl PlanState {
    /// Snapshot for a plan with no readable achievements: empty counts,
    /// `Active` status.
    fn empty(name: String, index_file: Option<PathBuf>) -> Self {
        Self {
            name,
            index_file,
            last_completed: None,
            next_available: Vec::new(),
            pending_reviews: Vec::new(),
            pending_fixes: Vec::new(),
            total: 0,
            completed: 0,
            progress: 0.0,
            status: PlanStatus::Active,
        }
    }
}

/// Derive the current [`PlanState`] for a plan.
///
/// A missing index file is normal: it yields an empty snapshot. An index
/// that exists but cannot be read (I/O failure, non-UTF-8 content) raises
/// [`StateDetectionError::IndexUnreadable`] for the caller to decide on.
pub fn plan_state(plan: &Plan) -> Result<PlanState, StateDetectionError> {
    let Some(index_file) = discovery::find_index_file(plan) else {
        return Ok(PlanState::empty(plan.name.clone(), None));
    };

    let content =
        std::fs::read_to_string(&index_file).map_err(|err| StateDetectionError::IndexUnreadable {
            path: index_file.clone(),
            source: err,
        })?;

    let achievements = parse_achievement_index(&content);
    let label = plan_label(&index_file);

    let feedbacks_dir = plan.dir.join("execution").join("feedbacks");
    let approved_suffixes = scan_suffixes(&feedbacks_dir, "APPROVED_")?;
    let fix_suffixes = scan_suffixes(&feedbacks_dir, "FIX_")?;

    let last_completed = approved_suffixes
        .last()
        .map(|sfx| achievement::id_from_suffix(sfx));

    let pending_fixes: Vec<String> = fix_suffixes
        .iter()
        .map(|sfx| achievement::id_from_suffix(sfx))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let fix_set: HashSet<&str> = pending_fixes.iter().map(String::as_str).collect();
    let ids: Vec<&str> = achievements.iter().map(|a| a.id.as_str()).collect();

    let next_available: Vec<String> = match &last_completed {
        None => match ids.first() {
            Some(first) if !fix_set.contains(first) => vec![(*first).to_string()],
            _ => Vec::new(),
        },
        Some(last) => {
            // Walk past the last completed achievement, skipping (not
            // stopping at) anything with a pending fix.
            let start = ids
                .iter()
                .position(|id| *id == last.as_str())
                .map_or(0, |idx| idx + 1);
            ids[start..]
                .iter()
                .filter(|id| !fix_set.contains(**id))
                .take(NEXT_AVAILABLE_LIMIT)
                .map(|id| (*id).to_string())
                .collect()
        }
    };

    let approved_set: HashSet<&str> = approved_suffixes.iter().map(String::as_str).collect();
    let pending_reviews: Vec<String> = achievements
        .iter()
        .filter(|a| {
            let sfx = achievement::suffix(&a.id);
            !approved_set.contains(sfx.as_str())
                && !fix_set.contains(a.id.as_str())
                && has_execution_task(&plan.dir, &label, &sfx)
        })
        .map(|a| a.id.clone())
        .collect();

    let total = achievements.len();
    let completed = approved_suffixes.len();
    let progress = if total == 0 {
        0.0
    } else {
        round_one_decimal(completed as f64 / total as f64 * 100.0)
    };

    let status = if !pending_fixes.is_empty() {
        PlanStatus::NeedsAttention
    } else if total > 0 && completed == total {
        PlanStatus::Complete
    } else {
        PlanStatus::Active
    };

    Ok(PlanState {
        name: plan.name.clone(),
        index_file: Some(index_file),
        last_completed,
        next_available,
        pending_reviews,
        pending_fixes,
        total,
        completed,
        progress,
        status,
    })
}

/// Status of a single achievement, derived from artifact existence alone.
pub fn achievement_status(plan_dir: &Path, label: &str, id: &str) -> AchievementStatus {
    let sfx = achievement::suffix(id);
    let feedbacks = plan_dir.join("execution").join("feedbacks");

    if feedbacks.join(format!("APPROVED_{sfx}.md")).exists() {
        return AchievementStatus::Complete;
    }
    if feedbacks.join(format!("FIX_{sfx}.md")).exists() {
        return AchievementStatus::NeedsFix;
    }
    if has_execution_task(plan_dir, label, &sfx) {
        return AchievementStatus::InProgress;
    }
    if plan_dir
        .join("subplans")
        .join(format!("SUBPLAN_{label}_{sfx}.md"))
        .exists()
    {
        return AchievementStatus::SubplanReady;
    }
    AchievementStatus::NotStarted
}

/// Plan label as embedded in artifact filenames, derived from the index
/// filename: `PLAN_AUTH.md` → `AUTH`.
pub fn plan_label(index_file: &Path) -> String {
    let stem = index_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    stem.strip_prefix("PLAN_").unwrap_or(&stem).to_string()
}

/// Parse the "Achievement Index" section of an index file.
///
/// Scans line by line from the heading containing "Achievement Index"
/// (an optional leading icon is tolerated) to the next `##`-level heading
/// or end of file, extracting `Achievement <major>.<minor>` entries in
/// order. The first occurrence of an id wins.
pub fn parse_achievement_index(content: &str) -> Vec<Achievement> {
    let mut achievements = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut in_index = false;

    for line in content.lines() {
        if !in_index {
            if line.trim_start().starts_with('#') && line.contains("Achievement Index") {
                in_index = true;
            }
            continue;
        }
        if line.starts_with("## ") {
            break;
        }
        let Some(caps) = ACHIEVEMENT_LINE.captures(line) else {
            continue;
        };
        let matched = caps.get(0).map_or(0, |m| m.end());
        let id = caps[1].to_string();
        if seen.insert(id.clone()) {
            achievements.push(Achievement::new(id, title_after(line, matched)));
        }
    }

    achievements
}

/// Extract the title text following an `Achievement X.Y` match, shedding
/// separator punctuation and bold markers.
fn title_after(line: &str, match_end: usize) -> String {
    line[match_end..]
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | '–' | '*'))
        .trim_end_matches(|c: char| c.is_whitespace() || c == '*')
        .to_string()
}

/// Collect artifact suffixes from `dir` for filenames shaped
/// `<prefix><suffix>.md`, sorted lexicographically.
///
/// A missing directory contributes nothing; a directory that exists but
/// cannot be scanned is an error.
fn scan_suffixes(dir: &Path, prefix: &str) -> Result<Vec<String>, StateDetectionError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(StateDetectionError::ArtifactScanFailed {
                path: dir.to_path_buf(),
                source: err,
            });
        }
    };

    let mut suffixes = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(rest) = name.strip_prefix(prefix)
            && let Some(sfx) = rest.strip_suffix(".md")
            && !sfx.is_empty()
        {
            suffixes.push(sfx.to_string());
        }
    }

    suffixes.sort();
    Ok(suffixes)
}

/// Check whether any execution task attempt exists for the achievement.
/// Filenames carry an attempt counter, so this is a prefix scan.
fn has_execution_task(plan_dir: &Path, label: &str, sfx: &str) -> bool {
    let execution_dir = plan_dir.join("execution");
    let prefix = format!("EXECUTION_TASK_{label}_{sfx}_");
    let Ok(entries) = std::fs::read_dir(&execution_dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let name = entry.file_name().to_string_lossy().to_string();
        name.starts_with(&prefix) && name.ends_with(".md")
    })
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const INDEX: &str = "\
# AUTH plan

## 🎯 Achievement Index

- **Achievement 0.1**: Scaffold data model
- **Achievement 0.2**: Wire storage layer
- **Achievement 1.1**: Session tokens

## Notes

Achievement 9.9 mentioned outside the index is ignored.
";

    fn make_plan(index: Option<&str>) -> (Plan, TempDir) {
        let dir = tempdir().unwrap();
        let plan_dir = dir.path().join("AUTH");
        fs::create_dir_all(plan_dir.join("execution/feedbacks")).unwrap();
        fs::create_dir_all(plan_dir.join("subplans")).unwrap();
        if let Some(content) = index {
            fs::write(plan_dir.join("PLAN_AUTH.md"), content).unwrap();
        }
        (Plan::from_dir(plan_dir), dir)
    }

    fn approve(plan: &Plan, sfx: &str) {
        fs::write(
            plan.dir.join(format!("execution/feedbacks/APPROVED_{sfx}.md")),
            "approved",
        )
        .unwrap();
    }

    fn flag_fix(plan: &Plan, sfx: &str) {
        fs::write(
            plan.dir.join(format!("execution/feedbacks/FIX_{sfx}.md")),
            "fix me",
        )
        .unwrap();
    }

    #[test]
    fn missing_index_yields_empty_active_state() {
        let (plan, _dir) = make_plan(None);
        let state = plan_state(&plan).unwrap();
        assert_eq!(state.total, 0);
        assert_eq!(state.completed, 0);
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.status, PlanStatus::Active);
        assert!(state.index_file.is_none());
        assert!(state.next_available.is_empty());
    }

    #[test]
    fn unreadable_index_raises_typed_error() {
        let (plan, _dir) = make_plan(None);
        fs::write(plan.dir.join("PLAN_AUTH.md"), [0xff, 0xfe, 0xfd]).unwrap();
        let err = plan_state(&plan).unwrap_err();
        match err {
            StateDetectionError::IndexUnreadable { path, .. } => {
                assert!(path.ends_with("PLAN_AUTH.md"));
            }
            other => panic!("Expected IndexUnreadable, got {other:?}"),
        }
    }

    #[test]
    fn fresh_plan_offers_first_achievement() {
        let (plan, _dir) = make_plan(Some(INDEX));
        let state = plan_state(&plan).unwrap();
        assert_eq!(state.last_completed, None);
        assert_eq!(state.next_available, vec!["0.1"]);
        assert_eq!(state.status, PlanStatus::Active);
    }

    #[test]
    fn fix_on_first_achievement_blocks_start() {
        let (plan, _dir) = make_plan(Some(INDEX));
        flag_fix(&plan, "01");
        let state = plan_state(&plan).unwrap();
        assert_eq!(state.last_completed, None);
        assert!(state.next_available.is_empty());
        assert_eq!(state.status, PlanStatus::NeedsAttention);
    }

    #[test]
    fn approval_advances_next_available() {
        let (plan, _dir) = make_plan(Some(INDEX));
        approve(&plan, "01");
        let state = plan_state(&plan).unwrap();
        assert_eq!(state.last_completed.as_deref(), Some("0.1"));
        assert_eq!(state.next_available, vec!["0.2", "1.1"]);
        assert_eq!(state.completed, 1);
        assert_eq!(state.progress, 33.3);
    }

    #[test]
    fn next_available_skips_pending_fixes() {
        let (plan, _dir) = make_plan(Some(INDEX));
        approve(&plan, "01");
        flag_fix(&plan, "02");
        let state = plan_state(&plan).unwrap();
        // 0.2 is skipped, not stopped at.
        assert_eq!(state.next_available, vec!["1.1"]);
        assert_eq!(state.pending_fixes, vec!["0.2"]);
    }

    #[test]
    fn next_available_caps_at_three() {
        let index = "\
## Achievement Index
- Achievement 0.1: a
- Achievement 0.2: b
- Achievement 0.3: c
- Achievement 0.4: d
- Achievement 0.5: e
";
        let (plan, _dir) = make_plan(Some(index));
        approve(&plan, "01");
        let state = plan_state(&plan).unwrap();
        assert_eq!(state.next_available, vec!["0.2", "0.3", "0.4"]);
    }

    #[test]
    fn pending_fixes_sorted_and_deduplicated() {
        let (plan, _dir) = make_plan(Some(INDEX));
        flag_fix(&plan, "11");
        flag_fix(&plan, "02");
        let state = plan_state(&plan).unwrap();
        assert_eq!(state.pending_fixes, vec!["0.2", "1.1"]);
    }

    #[test]
    fn all_approved_is_complete() {
        let (plan, _dir) = make_plan(Some(INDEX));
        for sfx in ["01", "02", "11"] {
            approve(&plan, sfx);
        }
        let state = plan_state(&plan).unwrap();
        assert_eq!(state.status, PlanStatus::Complete);
        assert_eq!(state.progress, 100.0);
        assert!(state.next_available.is_empty());
    }

    #[test]
    fn fix_outranks_complete_for_plan_status() {
        let (plan, _dir) = make_plan(Some(INDEX));
        for sfx in ["01", "02", "11"] {
            approve(&plan, sfx);
        }
        flag_fix(&plan, "02");
        let state = plan_state(&plan).unwrap();
        assert_eq!(state.status, PlanStatus::NeedsAttention);
    }

    #[test]
    fn pending_reviews_lists_executed_unreviewed_work() {
        let (plan, _dir) = make_plan(Some(INDEX));
        fs::write(plan.dir.join("execution/EXECUTION_TASK_AUTH_01_1.md"), "").unwrap();
        fs::write(plan.dir.join("execution/EXECUTION_TASK_AUTH_02_1.md"), "").unwrap();
        approve(&plan, "01");
        let state = plan_state(&plan).unwrap();
        assert_eq!(state.pending_reviews, vec!["0.2"]);
    }

    #[test]
    fn snapshots_are_deterministic() {
        let (plan, _dir) = make_plan(Some(INDEX));
        approve(&plan, "01");
        flag_fix(&plan, "11");
        let first = plan_state(&plan).unwrap();
        let second = plan_state(&plan).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parse_index_bounded_by_next_heading() {
        let achievements = parse_achievement_index(INDEX);
        let ids: Vec<&str> = achievements.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["0.1", "0.2", "1.1"]);
    }

    #[test]
    fn parse_index_extracts_titles() {
        let achievements = parse_achievement_index(INDEX);
        assert_eq!(achievements[0].title, "Scaffold data model");
        assert_eq!(achievements[2].title, "Session tokens");
    }

    #[test]
    fn parse_index_first_occurrence_wins() {
        let content = "\
## Achievement Index
- Achievement 1.1: first
- Achievement 1.1: duplicate
- Achievement 1.2: second
";
        let achievements = parse_achievement_index(content);
        assert_eq!(achievements.len(), 2);
        assert_eq!(achievements[0].title, "first");
    }

    #[test]
    fn parse_index_without_heading_is_empty() {
        assert!(parse_achievement_index("# just a title\nAchievement 1.1").is_empty());
    }

    #[test]
    fn achievement_status_precedence() {
        let (plan, _dir) = make_plan(Some(INDEX));
        assert_eq!(
            achievement_status(&plan.dir, "AUTH", "0.1"),
            AchievementStatus::NotStarted
        );

        fs::write(plan.dir.join("subplans/SUBPLAN_AUTH_01.md"), "").unwrap();
        assert_eq!(
            achievement_status(&plan.dir, "AUTH", "0.1"),
            AchievementStatus::SubplanReady
        );

        fs::write(plan.dir.join("execution/EXECUTION_TASK_AUTH_01_1.md"), "").unwrap();
        assert_eq!(
            achievement_status(&plan.dir, "AUTH", "0.1"),
            AchievementStatus::InProgress
        );

        flag_fix(&plan, "01");
        assert_eq!(
            achievement_status(&plan.dir, "AUTH", "0.1"),
            AchievementStatus::NeedsFix
        );

        // Approval wins even with a fix file still on disk.
        approve(&plan, "01");
        assert_eq!(
            achievement_status(&plan.dir, "AUTH", "0.1"),
            AchievementStatus::Complete
        );
    }

    #[test]
    fn plan_label_strips_prefix() {
        assert_eq!(plan_label(Path::new("/p/AUTH/PLAN_AUTH.md")), "AUTH");
        assert_eq!(plan_label(Path::new("PLAN_USER-SYNC.md")), "USER-SYNC");
    }
}
