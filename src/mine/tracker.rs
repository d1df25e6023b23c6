use super::store::MetricStore;
use crate::model::{MetricRecord, MethodKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemapOutcome {
    pub moved: usize,
    pub merged: usize,
}

/// Keeps method histories attached across file renames.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    renames: u64,
    merges: u64,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves every open key under `new_path` to `old_path`.
    ///
    /// Walking newest-first, the histories gathered so far were recorded under
    /// the post-rename path while every older commit will report the file by
    /// its previous name. A key that already exists under `old_path` is merged
    /// in traversal order.
    pub fn remap(
        &mut self,
        store: &mut MetricStore,
        old_path: &str,
        new_path: &str,
    ) -> RemapOutcome {
        let mut outcome = RemapOutcome::default();
        if old_path == new_path {
            return outcome;
        }

        for key in store.keys_on_path(new_path) {
            let Some(moving) = store.extract_and_remove(&key) else {
                continue;
            };
            let target = key.with_path(old_path);
            let list = match store.extract_and_remove(&target) {
                Some(existing) => {
                    outcome.merged += 1;
                    tracing::debug!(from = %key, into = %target, "merging histories on rename");
                    merge_by_sequence(existing, moving)
                }
                None => moving,
            };
            store.insert_list(target, list);
            outcome.moved += 1;
        }

        if outcome.moved > 0 {
            self.renames += 1;
            tracing::debug!(old_path, new_path, moved = outcome.moved, "remapped renamed file");
        }
        self.merges += outcome.merged as u64;
        outcome
    }

    pub fn renames(&self) -> u64 {
        self.renames
    }

    pub fn merges(&self) -> u64 {
        self.merges
    }
}

fn merge_by_sequence(a: Vec<MetricRecord>, b: Vec<MetricRecord>) -> Vec<MetricRecord> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut a = a.into_iter().peekable();
    let mut b = b.into_iter().peekable();
    loop {
        let take_a = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => x.sequence <= y.sequence,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_a { a.next() } else { b.next() };
        merged.extend(next);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mine::store::tests::record;

    #[test]
    fn remap_moves_only_matching_path() {
        let mut store = MetricStore::new();
        let mut tracker = IdentityTracker::new();
        store.append(MethodKey::new("b.cpp", "foo"), record(0, 1));
        store.append(MethodKey::new("b.cpp", "bar"), record(1, 1));
        store.append(MethodKey::new("c.cpp", "foo"), record(2, 1));

        let outcome = tracker.remap(&mut store, "a.cpp", "b.cpp");

        assert_eq!(outcome, RemapOutcome { moved: 2, merged: 0 });
        assert!(store.contains(&MethodKey::new("a.cpp", "foo")));
        assert!(store.contains(&MethodKey::new("a.cpp", "bar")));
        assert!(store.contains(&MethodKey::new("c.cpp", "foo")));
        assert!(!store.has_path("b.cpp"));
        assert_eq!(store.record_count(), 3);
        assert_eq!(tracker.renames(), 1);
    }

    #[test]
    fn remap_chain_keeps_every_record() {
        let mut store = MetricStore::new();
        let mut tracker = IdentityTracker::new();
        store.append(MethodKey::new("p3.cpp", "m"), record(0, 1));
        tracker.remap(&mut store, "p2.cpp", "p3.cpp");
        store.append(MethodKey::new("p2.cpp", "m"), record(1, 1));
        tracker.remap(&mut store, "p1.cpp", "p2.cpp");
        store.append(MethodKey::new("p1.cpp", "m"), record(2, 1));
        tracker.remap(&mut store, "p0.cpp", "p1.cpp");

        let list = store.get(&MethodKey::new("p0.cpp", "m")).unwrap();
        let seqs: Vec<_> = list.iter().map(|r| r.sequence).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn collision_merges_in_traversal_order() {
        let mut store = MetricStore::new();
        let mut tracker = IdentityTracker::new();
        store.append(MethodKey::new("b.cpp", "foo"), record(0, 1));
        store.append(MethodKey::new("a.cpp", "foo"), record(1, 1));
        store.append(MethodKey::new("b.cpp", "foo"), record(2, 1));
        store.append(MethodKey::new("a.cpp", "foo"), record(3, 1));

        let outcome = tracker.remap(&mut store, "a.cpp", "b.cpp");

        assert_eq!(outcome.merged, 1);
        let seqs: Vec<_> = store
            .get(&MethodKey::new("a.cpp", "foo"))
            .unwrap()
            .iter()
            .map(|r| r.sequence)
            .collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
        assert_eq!(store.len(), 1);
        assert_eq!(tracker.merges(), 1);
    }

    #[test]
    fn self_rename_is_a_no_op() {
        let mut store = MetricStore::new();
        let mut tracker = IdentityTracker::new();
        store.append(MethodKey::new("a.cpp", "foo"), record(0, 1));
        assert_eq!(tracker.remap(&mut store, "a.cpp", "a.cpp"), RemapOutcome::default());
        assert_eq!(tracker.renames(), 0);
    }
}
