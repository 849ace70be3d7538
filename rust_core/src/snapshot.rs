//! Last-observed price snapshot and its JSON persistence.
//!
//! The snapshot is owned by exactly one task (the monitor loop), so neither
//! the in-memory map nor the file carry any locking.

use crate::models::PriceKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_SNAPSHOT_PATH: &str = "last_prices.json";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Mapping of `"<marketId>||<outcomeName>"` to the last observed price.
/// Last write wins; no history is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSnapshot {
    prices: BTreeMap<PriceKey, f64>,
}

impl PriceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PriceKey) -> Option<f64> {
        self.prices.get(key).copied()
    }

    /// Record a price, returning the value it replaced.
    pub fn record(&mut self, key: PriceKey, price: f64) -> Option<f64> {
        self.prices.insert(key, price)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PriceKey, f64)> {
        self.prices.iter().map(|(k, v)| (k, *v))
    }
}

impl FromIterator<(PriceKey, f64)> for PriceSnapshot {
    fn from_iter<I: IntoIterator<Item = (PriceKey, f64)>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().collect(),
        }
    }
}

/// Durable home of the snapshot: a single JSON file, rewritten in full.
#[derive(Debug, Clone)]
pub struct PriceSnapshotStore {
    path: PathBuf,
}

impl PriceSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted snapshot. A missing or unreadable artifact is not
    /// an error: the monitor simply starts from an empty snapshot.
    pub fn load(&self) -> PriceSnapshot {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no snapshot on disk, starting empty");
            return PriceSnapshot::new();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read snapshot, starting empty");
                return PriceSnapshot::new();
            }
        };

        match serde_json::from_str::<PriceSnapshot>(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt snapshot, starting empty");
                PriceSnapshot::new()
            }
        }
    }

    /// Overwrite the artifact with the full snapshot.
    ///
    /// Written to a sibling temp file first and renamed into place, so a
    /// crash mid-write leaves the previous snapshot intact.
    pub fn save(&self, snapshot: &PriceSnapshot) -> Result<(), SnapshotError> {
        let content = serde_json::to_string_pretty(snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SnapshotError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp_path = self.tmp_path();
        if let Err(source) = fs::write(&tmp_path, content) {
            return Err(SnapshotError::Io {
                path: tmp_path,
                source,
            });
        }

        fs::rename(&tmp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            SnapshotError::Io {
                path: self.path.clone(),
                source,
            }
        })
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()))
    }
}

impl Default for PriceSnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_PATH)
    }
}
