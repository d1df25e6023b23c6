use super::aggregate::AggregatedRecord;
use super::output::RowSink;
use super::progress::{NoProgress, ProgressReporter};
use super::record::build_record;
use super::store::MetricStore;
use super::tracker::IdentityTracker;
use super::MineOptions;
use crate::error::Result;
use crate::labels::LabelSets;
use crate::model::{ChangeKind, Commit, MethodKey, MetricRecord, MineSummary, Modification};
use crate::util::short_hash;
use std::collections::HashSet;

/// Drives a newest-first pass over history, accumulating one history per method
/// and flushing it once the commit that created its file has been seen.
///
/// Memory is bounded by the methods alive at one point in history plus the
/// identities already closed.
pub struct Miner<'a, S: RowSink> {
    options: MineOptions,
    labels: &'a LabelSets,
    store: MetricStore,
    tracker: IdentityTracker,
    closed: HashSet<MethodKey>,
    sink: S,
    progress: Box<dyn ProgressReporter + 'a>,
    sequence: u64,
    summary: MineSummary,
}

impl<'a, S: RowSink> Miner<'a, S> {
    pub fn new(options: MineOptions, labels: &'a LabelSets, sink: S) -> Self {
        Self {
            options,
            labels,
            store: MetricStore::new(),
            tracker: IdentityTracker::new(),
            closed: HashSet::new(),
            sink,
            progress: Box::new(NoProgress),
            sequence: 0,
            summary: MineSummary::default(),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter + 'a>) -> Self {
        self.progress = progress;
        self
    }

    /// Mines every commit, then flushes whatever is still open.
    pub fn run<I>(mut self, commits: I) -> Result<(MineSummary, S)>
    where
        I: IntoIterator<Item = Result<Commit>>,
    {
        for commit in commits {
            self.process_commit(&commit?)?;
        }
        self.finish()
    }

    pub fn process_commit(&mut self, commit: &Commit) -> Result<()> {
        let file_count = commit.modifications.len() as u64;
        for modification in &commit.modifications {
            self.process_modification(commit, file_count, modification)?;
        }

        self.summary.commits += 1;
        self.progress
            .update(self.summary.commits, self.store.len(), self.summary.flushed);
        tracing::trace!(
            commit = short_hash(&commit.hash),
            open = self.store.len(),
            "processed commit"
        );
        Ok(())
    }

    fn process_modification(
        &mut self,
        commit: &Commit,
        file_count: u64,
        modification: &Modification,
    ) -> Result<()> {
        let path = modification.path();
        if modification.change_kind == ChangeKind::Delete || !self.options.extensions.allows(path) {
            return Ok(());
        }
        if let Some(scope) = &self.options.scope {
            if !scope.admits_file(path) && !self.store.has_path(path) {
                self.summary.skipped_scope += modification.methods.len() as u64;
                return Ok(());
            }
        }
        self.summary.modifications += 1;

        if modification.change_kind == ChangeKind::Rename {
            if let Some(old_path) = modification.old_path.as_deref() {
                self.tracker.remap(&mut self.store, old_path, path);
            }
        }

        let tracking_path = modification.tracking_path();
        for method in &modification.methods {
            let key = MethodKey::new(tracking_path, method.name.as_str());
            // a renamed history may have moved onto a closed identity and is still open
            if self.closed.contains(&key) && !self.store.contains(&key) {
                self.summary.skipped_closed += 1;
                tracing::warn!(
                    %key,
                    commit = short_hash(&commit.hash),
                    "method seen again after its file was created; skipping"
                );
                continue;
            }
            if !self.store.contains(&key) && !self.admits(path, &method.name) {
                self.summary.skipped_scope += 1;
                continue;
            }

            let record =
                build_record(self.sequence, commit, file_count, modification, method, self.labels);
            self.sequence += 1;
            self.summary.records += 1;
            self.store.append(key, record);
        }
        self.summary.open_peak = self.summary.open_peak.max(self.store.len());

        if modification.change_kind == ChangeKind::Add {
            self.close_path(tracking_path)?;
        }
        Ok(())
    }

    fn admits(&self, path: &str, method: &str) -> bool {
        self.options
            .scope
            .as_ref()
            .map_or(true, |scope| scope.admits(path, method))
    }

    /// Flushes and evicts every open history on `path`; they can never reopen.
    fn close_path(&mut self, path: &str) -> Result<()> {
        for key in self.store.keys_on_path(path) {
            if let Some(records) = self.store.extract_and_remove(&key) {
                self.flush(&key, &records)?;
                self.summary.flushed_on_add += 1;
                tracing::debug!(%key, records = records.len(), "closed on file creation");
                self.closed.insert(key);
            }
        }
        Ok(())
    }

    fn flush(&mut self, key: &MethodKey, records: &[MetricRecord]) -> Result<()> {
        if let Some(row) = AggregatedRecord::from_records(key, records, self.options.window) {
            self.sink.write_row(&row)?;
            self.summary.flushed += 1;
        }
        Ok(())
    }

    /// Flushes every history still open, in the order they were opened.
    pub fn finish(mut self) -> Result<(MineSummary, S)> {
        for (key, records) in self.store.remaining() {
            self.flush(&key, &records)?;
        }
        self.sink.finish()?;

        self.summary.renames = self.tracker.renames();
        self.summary.merges = self.tracker.merges();
        self.progress.finish(self.summary.commits, self.summary.flushed);
        tracing::info!(
            commits = self.summary.commits,
            rows = self.summary.flushed,
            closed_on_add = self.summary.flushed_on_add,
            open_peak = self.summary.open_peak,
            renames = self.summary.renames,
            "mining finished"
        );
        Ok((self.summary, self.sink))
    }

    pub fn open_keys(&self) -> usize {
        self.store.len()
    }

    pub fn is_closed(&self, key: &MethodKey) -> bool {
        self.closed.contains(key)
    }

    pub fn summary(&self) -> &MineSummary {
        &self.summary
    }
}
