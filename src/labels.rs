use crate::error::{MinerError, Result};
use std::collections::HashSet;
use std::path::Path;

pub const DEFAULT_BIC_COLUMN: &str = "bic_commit";
pub const DEFAULT_FIX_COLUMN: &str = "git_hash";

/// Commit hashes classified upstream as bug-inducing or as fixes.
#[derive(Debug, Clone, Default)]
pub struct LabelSets {
    pub bug_inducing: HashSet<String>,
    pub fixes: HashSet<String>,
}

impl LabelSets {
    pub fn new(bug_inducing: HashSet<String>, fixes: HashSet<String>) -> Self {
        Self { bug_inducing, fixes }
    }

    pub fn load(
        bic: Option<(&Path, &str)>,
        fix: Option<(&Path, &str)>,
    ) -> Result<Self> {
        let bug_inducing = match bic {
            Some((path, column)) => read_hash_column(path, column)?,
            None => HashSet::new(),
        };
        let fixes = match fix {
            Some((path, column)) => read_hash_column(path, column)?,
            None => HashSet::new(),
        };
        tracing::info!(
            bug_inducing = bug_inducing.len(),
            fixes = fixes.len(),
            "loaded commit labels"
        );
        Ok(Self { bug_inducing, fixes })
    }

    pub fn is_bug_inducing(&self, hash: &str) -> bool {
        self.bug_inducing.contains(hash)
    }

    pub fn is_fix(&self, hash: &str) -> bool {
        self.fixes.contains(hash)
    }
}

/// Reads one column of a headed CSV file into a set of hashes.
pub fn read_hash_column(path: &Path, column: &str) -> Result<HashSet<String>> {
    let labels_err = |reason: String| MinerError::Labels { path: path.to_path_buf(), reason };

    if !path.is_file() {
        return Err(labels_err("file does not exist".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| labels_err(e.to_string()))?;

    let index = reader
        .headers()
        .map_err(|e| labels_err(e.to_string()))?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| labels_err(format!("missing column '{column}'")))?;

    let mut hashes = HashSet::new();
    for row in reader.records() {
        let row = row.map_err(|e| labels_err(e.to_string()))?;
        if let Some(value) = row.get(index) {
            let value = value.trim();
            if !value.is_empty() {
                hashes.insert(value.to_string());
            }
        }
    }
    Ok(hashes)
}
