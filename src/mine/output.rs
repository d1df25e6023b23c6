use super::aggregate::{AggregatedRecord, STAT_COLUMNS};
use crate::error::{MinerError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const IDENTITY_COLUMNS: [&str; 8] = [
    "key",
    "git_hash",
    "file_name",
    "method_name",
    "method_start_line",
    "file_rename_count",
    "method_rename_count",
    "change_type_count",
];

const LABEL_COLUMNS: [&str; 12] = [
    "author_email_mean",
    "author_email_sum",
    "method_touched_sum",
    "method_touched_mean",
    "method_fixes_sum",
    "method_fixes_mean",
    "file_buggy",
    "file_fix",
    "method_bug_sum",
    "method_bug_mean",
    "method_fix",
    "method_buggy",
];

const STAT_SUFFIXES: [&str; 4] = ["last", "max", "mean", "sum"];

/// Destination for flushed rows. Rows arrive in flush order.
pub trait RowSink {
    fn write_row(&mut self, row: &AggregatedRecord) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

pub fn header() -> Vec<String> {
    let mut columns: Vec<String> = IDENTITY_COLUMNS.iter().map(|c| c.to_string()).collect();
    for group in STAT_COLUMNS {
        for suffix in STAT_SUFFIXES {
            columns.push(format!("{group}_{suffix}"));
        }
    }
    columns.extend(LABEL_COLUMNS.iter().map(|c| c.to_string()));
    columns
}

fn clean(value: &str) -> String {
    value.replace(',', "-comma-")
}

fn flag(value: bool) -> String {
    let text = if value { "1" } else { "0" };
    text.to_string()
}

pub fn row_fields(row: &AggregatedRecord) -> Vec<String> {
    let mut fields = vec![
        clean(&row.key),
        row.git_hash.clone(),
        clean(&row.file_name),
        clean(&row.method_name),
        row.method_start_line.to_string(),
        row.file_rename_count.to_string(),
        row.method_rename_count.to_string(),
        row.change_type_count.to_string(),
    ];
    for stat in row.stat_groups() {
        fields.push(stat.last.to_string());
        fields.push(stat.max.to_string());
        fields.push(stat.mean.to_string());
        fields.push(stat.sum.to_string());
    }
    fields.extend([
        row.author_email_mean.to_string(),
        row.author_email_sum.to_string(),
        row.method_touched_sum.to_string(),
        row.method_touched_mean.to_string(),
        row.method_fixes_sum.to_string(),
        row.method_fixes_mean.to_string(),
        flag(row.file_buggy),
        flag(row.file_fix),
        row.method_bug_sum.to_string(),
        row.method_bug_mean.to_string(),
        flag(row.method_fix),
        flag(row.method_buggy),
    ]);
    fields
}

/// CSV writer that pushes every row to the underlying writer as it is flushed,
/// so a crash mid-run leaves every completed row on disk.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
}

impl CsvSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let open_err = |source| MinerError::OutputOpen { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(open_err)?;
        }
        let file = File::create(path).map_err(open_err)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(header())?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| MinerError::Io(std::io::Error::other(e.to_string())))
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    fn write_row(&mut self, row: &AggregatedRecord) -> Result<()> {
        self.writer.write_record(row_fields(row))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects rows in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<AggregatedRecord>,
}

impl RowSink for MemorySink {
    fn write_row(&mut self, row: &AggregatedRecord) -> Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mine::store::tests::record;
    use crate::model::MethodKey;
    use pretty_assertions::assert_eq;

    #[test]
    fn header_matches_column_layout() {
        let columns = header();
        assert_eq!(columns.len(), 8 + 17 * 4 + 12);
        assert_eq!(&columns[..3], &["key", "git_hash", "file_name"]);
        assert_eq!(columns[8], "file_count_last");
        assert_eq!(columns[11], "file_count_sum");
        assert_eq!(columns[8 + 12 * 4], "method_method_number_of_line_last");
        assert_eq!(columns.last().unwrap(), "method_buggy");
    }

    #[test]
    fn rows_line_up_with_header() {
        let records = vec![record(0, 1), record(1, 2), record(2, 0)];
        let key = MethodKey::new("a,b.cpp", "foo");
        let row = AggregatedRecord::from_records(&key, &records, None).unwrap();
        let fields = row_fields(&row);

        assert_eq!(fields.len(), header().len());
        assert_eq!(fields[0], "a-comma-b.cpp$$foo");
        let added_last = header().iter().position(|c| c == "method_added_last").unwrap();
        assert_eq!(&fields[added_last..added_last + 4], &["1", "2", "1", "3"]);
    }

    #[test]
    fn csv_sink_writes_header_then_rows() {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        let key = MethodKey::new("a.cpp", "foo");
        let row = AggregatedRecord::from_records(&key, &[record(0, 1)], None).unwrap();
        sink.write_row(&row).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.rows(), 1);

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("key,git_hash,file_name,method_name,method_start_line"));
        assert!(lines[1].starts_with("a.cpp$$foo,c0,a.cpp,foo,1,1,1,1"));
    }

    #[test]
    fn create_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let err = CsvSink::create(&blocker.join("out.csv")).err().unwrap();
        assert_eq!(err.exit_code(), 4);
    }
}
