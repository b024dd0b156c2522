//! `parallel.json` decoding.
//!
//! The on-disk schema tolerates either an `id` or an `achievement_id` key
//! per record. That duck-typing stops at this boundary: records are
//! normalized into [`ManifestAchievement`] with one canonical field while
//! decoding, and the rest of the crate never sees the alternative key.

use crate::errors::ManifestError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One achievement entry from the manifest, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestAchievement {
    /// Dotted achievement id, e.g. `"1.2"`.
    pub id: String,
    /// Ids that must complete before this achievement can start.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// The parsed per-plan parallel-execution manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelManifest {
    pub plan_name: String,
    pub achievements: Vec<ManifestAchievement>,
}

/// Raw manifest as found on disk.
#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    plan_name: String,
    #[serde(default)]
    achievements: Vec<RawAchievement>,
}

/// Raw achievement record tolerating either id key.
#[derive(Debug, Deserialize)]
struct RawAchievement {
    #[serde(default)]
    achievement_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Read and normalize a `parallel.json`.
///
/// An unreadable file or malformed JSON raises [`ManifestError`] with the
/// path and the underlying cause; a record carrying neither id key raises
/// [`ManifestError::MissingId`] naming the record's position.
pub fn load_manifest(path: &Path) -> Result<ParallelManifest, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|err| ManifestError::Unreadable {
        path: path.to_path_buf(),
        source: err,
    })?;

    let raw: RawManifest =
        serde_json::from_str(&content).map_err(|err| ManifestError::Malformed {
            path: path.to_path_buf(),
            source: err,
        })?;

    let mut achievements = Vec::with_capacity(raw.achievements.len());
    for (index, record) in raw.achievements.into_iter().enumerate() {
        let id = record
            .achievement_id
            .or(record.id)
            .ok_or_else(|| ManifestError::MissingId {
                path: path.to_path_buf(),
                index,
            })?;
        achievements.push(ManifestAchievement {
            id,
            dependencies: record.dependencies,
        });
    }

    Ok(ParallelManifest {
        plan_name: raw.plan_name,
        achievements,
    })
}
