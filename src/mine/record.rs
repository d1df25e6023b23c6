use crate::labels::LabelSets;
use crate::model::{Commit, Method, MetricRecord, Modification};

/// Builds the observation of `method` at `commit`.
///
/// A method is touched when any added or deleted diff line falls inside its
/// current line range; the fix and bug labels only stick to touched methods.
pub fn build_record(
    sequence: u64,
    commit: &Commit,
    file_count: u64,
    modification: &Modification,
    method: &Method,
    labels: &LabelSets,
) -> MetricRecord {
    let method_added = modification.diff.added_within(method.start_line, method.end_line);
    let method_removed = modification.diff.deleted_within(method.start_line, method.end_line);
    let touched = method_added + method_removed > 0;
    let file_fix = labels.is_fix(&commit.hash);
    let file_buggy = labels.is_bug_inducing(&commit.hash);

    MetricRecord {
        sequence,
        hash: commit.hash.clone(),
        author_timestamp: commit.author_timestamp,
        committer_timestamp: commit.committer_timestamp,
        change_kind: modification.change_kind,
        file_name: modification.path().to_string(),
        method_name: method.name.clone(),
        method_start_line: method.start_line,
        author_email: commit.author_email.clone(),

        file_count,
        file_added: modification.added_lines,
        file_removed: modification.removed_lines,
        file_nloc: modification.nloc,
        file_comp: modification.complexity,
        file_token_count: modification.token_count,
        method_count: modification.methods.len() as u64,

        method_added,
        method_removed,
        method_nloc: method.nloc,
        method_comp: method.complexity,
        method_token: method.token_count,
        method_number_of_lines: method.number_of_lines(),
        method_fan_in: method.fan_in,
        method_fan_out: method.fan_out,
        method_general_fan_out: method.general_fan_out,
        method_parameters_count: method.parameter_count,

        touched,
        is_fix: file_fix && touched,
        is_buggy: file_buggy && touched,
        file_fix,
        file_buggy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChangeKind, DiffLines};
    use chrono::Utc;
    use std::collections::HashSet;

    fn fixture(added: Vec<u32>) -> (Commit, Modification) {
        let now = Utc::now();
        let modification = Modification {
            change_kind: ChangeKind::Modify,
            old_path: Some("a.cpp".into()),
            new_path: Some("a.cpp".into()),
            added_lines: added.len() as u64,
            removed_lines: 0,
            nloc: 20,
            complexity: 3,
            token_count: 100,
            diff: DiffLines {
                added: added.into_iter().map(|l| (l, String::new())).collect(),
                deleted: vec![],
            },
            methods: vec![Method {
                name: "foo".into(),
                start_line: 5,
                end_line: 10,
                ..Method::default()
            }],
        };
        let commit = Commit {
            hash: "h1".into(),
            author_timestamp: now,
            committer_timestamp: now,
            author_email: "a@example.com".into(),
            modifications: vec![modification.clone()],
        };
        (commit, modification)
    }

    fn labels() -> LabelSets {
        LabelSets::new(HashSet::from(["h1".to_string()]), HashSet::from(["h1".to_string()]))
    }

    #[test]
    fn untouched_method_carries_no_method_labels() {
        let (commit, m) = fixture(vec![1, 2, 30]);
        let record = build_record(0, &commit, 1, &m, &m.methods[0], &labels());

        assert!(!record.touched);
        assert!(!record.is_fix);
        assert!(!record.is_buggy);
        assert!(record.file_fix);
        assert!(record.file_buggy);
        assert_eq!(record.method_added, 0);
        assert_eq!(record.file_added, 3);
    }

    #[test]
    fn touched_method_takes_commit_labels() {
        let (commit, m) = fixture(vec![5, 10, 11]);
        let record = build_record(7, &commit, 2, &m, &m.methods[0], &labels());

        assert!(record.touched);
        assert!(record.is_fix);
        assert!(record.is_buggy);
        assert_eq!(record.method_added, 2);
        assert_eq!(record.method_number_of_lines, 6);
        assert_eq!(record.file_count, 2);
        assert_eq!(record.sequence, 7);
    }
}
