use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used when a key is rendered into a single output column.
pub const KEY_SEPARATOR: &str = "$$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Delete,
    Rename,
    Modify,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::Delete => "delete",
            ChangeKind::Rename => "rename",
            ChangeKind::Modify => "modify",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLines {
    #[serde(default)]
    pub added: Vec<(u32, String)>,
    #[serde(default)]
    pub deleted: Vec<(u32, String)>,
}

impl DiffLines {
    pub fn added_within(&self, start: u32, end: u32) -> u64 {
        count_within(&self.added, start, end)
    }

    pub fn deleted_within(&self, start: u32, end: u32) -> u64 {
        count_within(&self.deleted, start, end)
    }
}

fn count_within(lines: &[(u32, String)], start: u32, end: u32) -> u64 {
    lines
        .iter()
        .filter(|(line, _)| (start..=end).contains(line))
        .count() as u64
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default)]
    pub nloc: u64,
    #[serde(default)]
    pub complexity: u64,
    #[serde(default)]
    pub token_count: u64,
    #[serde(default)]
    pub fan_in: u64,
    #[serde(default)]
    pub fan_out: u64,
    #[serde(default)]
    pub general_fan_out: u64,
    #[serde(default)]
    pub parameter_count: u64,
}

impl Method {
    pub fn number_of_lines(&self) -> u64 {
        u64::from(self.end_line.saturating_sub(self.start_line)) + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    pub change_kind: ChangeKind,
    #[serde(default)]
    pub old_path: Option<String>,
    #[serde(default)]
    pub new_path: Option<String>,
    #[serde(default)]
    pub added_lines: u64,
    #[serde(default)]
    pub removed_lines: u64,
    #[serde(default)]
    pub nloc: u64,
    #[serde(default)]
    pub complexity: u64,
    #[serde(default)]
    pub token_count: u64,
    #[serde(default)]
    pub diff: DiffLines,
    #[serde(default)]
    pub methods: Vec<Method>,
}

impl Modification {
    /// The path this change leaves the file at, falling back to the old path for deletions.
    pub fn path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or("")
    }

    /// The path older commits know this file by.
    ///
    /// History is walked newest-first, so after a rename the next event for
    /// the file carries the pre-rename path.
    pub fn tracking_path(&self) -> &str {
        match (self.change_kind, self.old_path.as_deref()) {
            (ChangeKind::Rename, Some(old)) => old,
            _ => self.path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub author_timestamp: DateTime<Utc>,
    pub committer_timestamp: DateTime<Utc>,
    pub author_email: String,
    #[serde(default)]
    pub modifications: Vec<Modification>,
}

/// Identity of a tracked method: the file it lives in and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    path: String,
    method: String,
}

impl MethodKey {
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self { path: path.into(), method: method.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn with_path(&self, path: &str) -> Self {
        Self { path: path.to_string(), method: self.method.clone() }
    }

    /// Parses the `path$$method` form used on the command line.
    pub fn parse(input: &str) -> Option<Self> {
        let (path, method) = input.rsplit_once(KEY_SEPARATOR)?;
        if path.is_empty() || method.is_empty() {
            return None;
        }
        Some(Self::new(path, method))
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.path, KEY_SEPARATOR, self.method)
    }
}

/// One observation of a method at one commit.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    /// Position in traversal order, assigned when the record is appended.
    pub sequence: u64,
    pub hash: String,
    pub author_timestamp: DateTime<Utc>,
    pub committer_timestamp: DateTime<Utc>,
    pub change_kind: ChangeKind,
    pub file_name: String,
    pub method_name: String,
    pub method_start_line: u32,
    pub author_email: String,

    pub file_count: u64,
    pub file_added: u64,
    pub file_removed: u64,
    pub file_nloc: u64,
    pub file_comp: u64,
    pub file_token_count: u64,
    pub method_count: u64,

    pub method_added: u64,
    pub method_removed: u64,
    pub method_nloc: u64,
    pub method_comp: u64,
    pub method_token: u64,
    pub method_number_of_lines: u64,
    pub method_fan_in: u64,
    pub method_fan_out: u64,
    pub method_general_fan_out: u64,
    pub method_parameters_count: u64,

    pub touched: bool,
    pub is_fix: bool,
    pub is_buggy: bool,
    pub file_fix: bool,
    pub file_buggy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MineSummary {
    pub commits: u64,
    pub modifications: u64,
    pub records: u64,
    pub flushed: u64,
    pub flushed_on_add: u64,
    pub open_peak: usize,
    pub renames: u64,
    pub merges: u64,
    pub skipped_closed: u64,
    pub skipped_scope: u64,
}
