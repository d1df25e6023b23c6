use crate::model::{MethodKey, MetricRecord};
use chrono::Duration;
use std::collections::HashSet;

/// Column stems of the `{last,max,mean,sum}` groups, in output order.
pub const STAT_COLUMNS: [&str; 17] = [
    "file_count",
    "file_added",
    "file_removed",
    "file_nloc",
    "file_comp",
    "file_token_count",
    "method_count",
    "method_added",
    "method_removed",
    "method_nloc",
    "method_comp",
    "method_token",
    "method_method_number_of_line",
    "method_fan_in",
    "method_fan_out",
    "method_general_fan_out",
    "method_parameters_counts",
];

/// Last, max, mean and sum of one numeric field over a closed history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stat {
    pub last: u64,
    pub max: u64,
    pub mean: f64,
    pub sum: u64,
}

impl Stat {
    /// `last` comes from `head`; the other figures from `records`.
    fn over(
        head: &MetricRecord,
        records: &[&MetricRecord],
        field: impl Fn(&MetricRecord) -> u64,
    ) -> Self {
        let values: Vec<u64> = records.iter().map(|r| field(r)).collect();
        let sum: u64 = values.iter().sum();
        Self {
            last: field(head),
            max: values.iter().copied().max().unwrap_or(0),
            mean: ratio(sum, values.len()),
            sum,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRecord {
    pub key: String,
    pub git_hash: String,
    pub file_name: String,
    pub method_name: String,
    pub method_start_line: u32,
    pub file_rename_count: usize,
    pub method_rename_count: usize,
    pub change_type_count: usize,

    pub file_count: Stat,
    pub file_added: Stat,
    pub file_removed: Stat,
    pub file_nloc: Stat,
    pub file_comp: Stat,
    pub file_token_count: Stat,

    pub method_count: Stat,
    pub method_added: Stat,
    pub method_removed: Stat,
    pub method_nloc: Stat,
    pub method_comp: Stat,
    pub method_token: Stat,
    pub method_number_of_lines: Stat,
    pub method_fan_in: Stat,
    pub method_fan_out: Stat,
    pub method_general_fan_out: Stat,
    pub method_parameters_count: Stat,

    pub author_email_mean: f64,
    pub author_email_sum: usize,
    pub method_touched_sum: u64,
    pub method_touched_mean: f64,
    pub method_fixes_sum: u64,
    pub method_fixes_mean: f64,
    pub method_bug_sum: u64,
    pub method_bug_mean: f64,

    pub file_buggy: bool,
    pub file_fix: bool,
    pub method_fix: bool,
    pub method_buggy: bool,
}

impl AggregatedRecord {
    /// Folds a closed history into one row, or `None` for an empty history.
    ///
    /// `window` keeps only records committed strictly within that span of the
    /// oldest record, which always survives. Identity, `last` and the terminal
    /// flags come from `records[0]` whether or not it falls inside the window.
    pub fn from_records(
        key: &MethodKey,
        records: &[MetricRecord],
        window: Option<Duration>,
    ) -> Option<Self> {
        let oldest = records.last()?;
        let kept: Vec<&MetricRecord> = match window {
            Some(span) => records
                .iter()
                .filter(|r| (r.committer_timestamp - oldest.committer_timestamp).abs() < span)
                .collect(),
            None => records.iter().collect(),
        };
        let head = records.first()?;
        let n = kept.len();

        let distinct = |f: fn(&MetricRecord) -> String| -> usize {
            kept.iter().map(|r| f(r)).collect::<HashSet<_>>().len()
        };
        let flag_sum = |f: fn(&MetricRecord) -> bool| -> u64 {
            kept.iter().filter(|r| f(r)).count() as u64
        };

        let authors = distinct(|r| r.author_email.clone());
        let touched = flag_sum(|r| r.touched);
        let fixes = flag_sum(|r| r.is_fix);
        let bugs = flag_sum(|r| r.is_buggy);

        Some(Self {
            key: key.to_string(),
            git_hash: head.hash.clone(),
            file_name: head.file_name.clone(),
            method_name: head.method_name.clone(),
            method_start_line: head.method_start_line,
            file_rename_count: distinct(|r| r.file_name.clone()),
            method_rename_count: distinct(|r| r.method_name.clone()),
            change_type_count: kept.iter().map(|r| r.change_kind).collect::<HashSet<_>>().len(),

            file_count: Stat::over(head, &kept, |r| r.file_count),
            file_added: Stat::over(head, &kept, |r| r.file_added),
            file_removed: Stat::over(head, &kept, |r| r.file_removed),
            file_nloc: Stat::over(head, &kept, |r| r.file_nloc),
            file_comp: Stat::over(head, &kept, |r| r.file_comp),
            file_token_count: Stat::over(head, &kept, |r| r.file_token_count),

            method_count: Stat::over(head, &kept, |r| r.method_count),
            method_added: Stat::over(head, &kept, |r| r.method_added),
            method_removed: Stat::over(head, &kept, |r| r.method_removed),
            method_nloc: Stat::over(head, &kept, |r| r.method_nloc),
            method_comp: Stat::over(head, &kept, |r| r.method_comp),
            method_token: Stat::over(head, &kept, |r| r.method_token),
            method_number_of_lines: Stat::over(head, &kept, |r| r.method_number_of_lines),
            method_fan_in: Stat::over(head, &kept, |r| r.method_fan_in),
            method_fan_out: Stat::over(head, &kept, |r| r.method_fan_out),
            method_general_fan_out: Stat::over(head, &kept, |r| r.method_general_fan_out),
            method_parameters_count: Stat::over(head, &kept, |r| r.method_parameters_count),

            author_email_mean: ratio(authors as u64, n),
            author_email_sum: authors,
            method_touched_sum: touched,
            method_touched_mean: ratio(touched, n),
            method_fixes_sum: fixes,
            method_fixes_mean: ratio(fixes, n),
            method_bug_sum: bugs,
            method_bug_mean: ratio(bugs, n),

            file_buggy: head.file_buggy,
            file_fix: head.file_fix,
            method_fix: head.is_fix,
            method_buggy: head.is_buggy,
        })
    }

    /// Numeric groups in the order of [`STAT_COLUMNS`].
    pub fn stat_groups(&self) -> [&Stat; 17] {
        [
            &self.file_count,
            &self.file_added,
            &self.file_removed,
            &self.file_nloc,
            &self.file_comp,
            &self.file_token_count,
            &self.method_count,
            &self.method_added,
            &self.method_removed,
            &self.method_nloc,
            &self.method_comp,
            &self.method_token,
            &self.method_number_of_lines,
            &self.method_fan_in,
            &self.method_fan_out,
            &self.method_general_fan_out,
            &self.method_parameters_count,
        ]
    }
}

fn ratio(value: u64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        value as f64 / count as f64
    }
}
