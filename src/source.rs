use crate::error::{MinerError, Result};
use crate::model::Commit;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub type CommitIter<'a> = Box<dyn Iterator<Item = Result<Commit>> + 'a>;

/// Yields commits newest-first, each with its modifications and parsed methods.
pub trait CommitSource {
    fn commits(&mut self) -> Result<CommitIter<'_>>;
}

impl CommitSource for Vec<Commit> {
    fn commits(&mut self) -> Result<CommitIter<'_>> {
        Ok(Box::new(self.iter().cloned().map(Ok)))
    }
}

/// Commit stream produced by an external extractor: one JSON commit per line,
/// newest first.
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl CommitSource for JsonlSource {
    fn commits(&mut self) -> Result<CommitIter<'_>> {
        let file = File::open(&self.path).map_err(|e| MinerError::Source {
            line: 0,
            reason: format!("{}: {e}", self.path.display()),
        })?;
        let lines = BufReader::new(file).lines().enumerate();
        Ok(Box::new(lines.filter_map(|(i, line)| {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(MinerError::Io(e))),
            };
            if line.trim().is_empty() {
                return None;
            }
            Some(serde_json::from_str::<Commit>(&line).map_err(|e| MinerError::Source {
                line: i + 1,
                reason: e.to_string(),
            }))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChangeKind;
    use std::fs;

    const STREAM: &str = r#"{"hash":"c2","author_timestamp":"2024-01-02T00:00:00Z","committer_timestamp":"2024-01-02T00:00:00Z","author_email":"a@x","modifications":[{"change_kind":"modify","old_path":"a.cpp","new_path":"a.cpp","added_lines":1,"diff":{"added":[[3,"x"]]},"methods":[{"name":"foo","start_line":1,"end_line":5}]}]}

{"hash":"c1","author_timestamp":"2024-01-01T00:00:00Z","committer_timestamp":"2024-01-01T00:00:00Z","author_email":"a@x","modifications":[{"change_kind":"add","new_path":"a.cpp"}]}
"#;

    #[test]
    fn reads_commits_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commits.jsonl");
        fs::write(&path, STREAM).unwrap();

        let mut source = JsonlSource::new(&path);
        let commits: Vec<Commit> = source.commits().unwrap().collect::<Result<_>>().unwrap();

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "c2");
        assert_eq!(commits[0].modifications[0].diff.added, vec![(3, "x".to_string())]);
        assert_eq!(commits[1].modifications[0].change_kind, ChangeKind::Add);
        assert!(commits[1].modifications[0].old_path.is_none());
    }

    #[test]
    fn bad_line_reports_its_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commits.jsonl");
        fs::write(&path, "{\"hash\": 3}\n").unwrap();

        let mut source = JsonlSource::new(&path);
        let err = source.commits().unwrap().next().unwrap().unwrap_err();
        assert!(matches!(err, MinerError::Source { line: 1, .. }));
    }
}
