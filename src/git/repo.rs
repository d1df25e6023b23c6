use super::extract::MethodExtractor;
use crate::error::{MinerError, Result};
use crate::model::{ChangeKind, Commit, DiffLines, MethodKey, Modification};
use crate::source::{CommitIter, CommitSource};
use crate::util::ExtensionFilter;
use chrono::{DateTime, Utc};
use gix::object::tree::diff::ChangeDetached;
use gix::{discover, ObjectId, Repository};
use similar::{ChangeTag, TextDiff};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
}

impl GitRepo {
    /// Open the repository containing `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MinerError::RepoNotFound { path: path.to_path_buf() });
        }
        let repo = discover(path).map_err(|e| MinerError::InvalidRepo {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a revision to the id of the commit it names.
    pub fn resolve(&self, reference: &str) -> Result<ObjectId> {
        let unresolved = |reason: String| MinerError::UnresolvedRef {
            reference: reference.to_string(),
            reason,
        };
        let id = self
            .repo
            .rev_parse_single(reference)
            .map_err(|e| unresolved(e.to_string()))?;
        let commit = id
            .object()?
            .try_into_commit()
            .map_err(|_| unresolved("not a commit".to_string()))?;
        Ok(commit.id)
    }

    /// Commits reachable from `from` but not from `to`, newest first by committer time.
    pub fn commit_range(&self, from: &str, to: Option<&str>) -> Result<Vec<ObjectId>> {
        let tip = self.resolve(from)?;
        let hidden = match to {
            Some(boundary) => self.ancestors(self.resolve(boundary)?)?,
            None => HashSet::new(),
        };

        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut stack: Vec<ObjectId> = vec![tip];
        let mut stamped: Vec<(i64, ObjectId)> = Vec::new();

        while let Some(commit_id) = stack.pop() {
            if hidden.contains(&commit_id) || !seen.insert(commit_id) {
                continue;
            }
            let commit = self.repo.find_commit(commit_id)?;
            stamped.push((commit.time()?.seconds, commit_id));
            stack.extend(commit.parent_ids().map(|id| -> ObjectId { id.into() }));
        }

        stamped.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(stamped.into_iter().map(|(_, id)| id).collect())
    }

    fn ancestors(&self, start: ObjectId) -> Result<HashSet<ObjectId>> {
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(commit_id) = stack.pop() {
            if !seen.insert(commit_id) {
                continue;
            }
            let commit = self.repo.find_commit(commit_id)?;
            stack.extend(commit.parent_ids().map(|id| -> ObjectId { id.into() }));
        }
        Ok(seen)
    }

    /// Load one commit with its modifications; methods are extracted only for
    /// files `extensions` allows. Merge commits carry no modifications.
    pub fn load_commit(
        &self,
        commit_id: ObjectId,
        extensions: &ExtensionFilter,
        extractor: &dyn MethodExtractor,
    ) -> Result<Commit> {
        let commit = self.repo.find_commit(commit_id)?;
        let author = commit.author()?;
        let author_email = author.email.to_string();
        let author_secs = author.seconds();
        let committer_secs = commit.time()?.seconds;
        let parents: Vec<ObjectId> = commit.parent_ids().map(|id| id.into()).collect();

        let modifications = match parents.as_slice() {
            [] => self.diff_commit(commit_id, None, extensions, extractor)?,
            [parent] => self.diff_commit(commit_id, Some(*parent), extensions, extractor)?,
            _ => Vec::new(),
        };

        Ok(Commit {
            hash: commit_id.to_string(),
            author_timestamp: timestamp(author_secs)?,
            committer_timestamp: timestamp(committer_secs)?,
            author_email,
            modifications,
        })
    }

    /// Keys of the methods present in the files a commit adds, renames or modifies.
    pub fn methods_in_commit(
        &self,
        reference: &str,
        extensions: &ExtensionFilter,
        extractor: &dyn MethodExtractor,
    ) -> Result<Vec<MethodKey>> {
        let commit = self.load_commit(self.resolve(reference)?, extensions, extractor)?;
        let keys = commit
            .modifications
            .iter()
            .filter(|m| m.change_kind != ChangeKind::Delete && extensions.allows(m.path()))
            .flat_map(|m| {
                m.methods
                    .iter()
                    .map(move |method| MethodKey::new(m.path(), method.name.as_str()))
            })
            .collect();
        Ok(keys)
    }

    fn diff_commit(
        &self,
        commit_id: ObjectId,
        parent_id: Option<ObjectId>,
        extensions: &ExtensionFilter,
        extractor: &dyn MethodExtractor,
    ) -> Result<Vec<Modification>> {
        let commit_tree = self.repo.find_commit(commit_id)?.tree()?;
        let parent_tree = match parent_id {
            Some(id) => Some(self.repo.find_commit(id)?.tree()?),
            None => None,
        };

        // options come from the repository config; rename tracking follows `diff.renames`
        let changes: Vec<ChangeDetached> =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), None)?;

        let mut modifications = Vec::new();
        for change in changes {
            if let Some(m) = self.handle_change(change, extensions, extractor)? {
                modifications.push(m);
            }
        }
        Ok(modifications)
    }

    fn handle_change(
        &self,
        change: ChangeDetached,
        extensions: &ExtensionFilter,
        extractor: &dyn MethodExtractor,
    ) -> Result<Option<Modification>> {
        let (kind, old, new) = match change {
            ChangeDetached::Addition { location, entry_mode, id, .. } => {
                if !entry_mode.is_blob() {
                    return Ok(None);
                }
                (ChangeKind::Add, None, Some((location.to_string(), id)))
            }
            ChangeDetached::Deletion { location, entry_mode, id, .. } => {
                if !entry_mode.is_blob() {
                    return Ok(None);
                }
                (ChangeKind::Delete, Some((location.to_string(), id)), None)
            }
            ChangeDetached::Modification { location, previous_id, entry_mode, id, .. } => {
                if !entry_mode.is_blob() {
                    return Ok(None);
                }
                let path = location.to_string();
                (ChangeKind::Modify, Some((path.clone(), previous_id)), Some((path, id)))
            }
            ChangeDetached::Rewrite {
                source_location,
                source_id,
                entry_mode,
                id,
                location,
                copy,
                ..
            } => {
                if !entry_mode.is_blob() {
                    return Ok(None);
                }
                if copy {
                    (ChangeKind::Add, None, Some((location.to_string(), id)))
                } else {
                    (
                        ChangeKind::Rename,
                        Some((source_location.to_string(), source_id)),
                        Some((location.to_string(), id)),
                    )
                }
            }
        };

        let old_text = match &old {
            Some((_, id)) => self.blob_text(*id)?,
            None => Some(String::new()),
        };
        let new_text = match &new {
            Some((_, id)) => self.blob_text(*id)?,
            None => Some(String::new()),
        };
        let old_path = old.map(|(path, _)| path);
        let new_path = new.map(|(path, _)| path);

        // binary on either side: keep the change, without line-level detail
        let (Some(old_text), Some(new_text)) = (old_text, new_text) else {
            return Ok(Some(Modification {
                change_kind: kind,
                old_path,
                new_path,
                added_lines: 0,
                removed_lines: 0,
                nloc: 0,
                complexity: 0,
                token_count: 0,
                diff: DiffLines::default(),
                methods: Vec::new(),
            }));
        };

        let diff = diff_lines(&old_text, &new_text);
        let metrics = match new_path.as_deref() {
            Some(path) if extensions.allows(path) => extractor.extract(path, &new_text),
            _ => Default::default(),
        };

        Ok(Some(Modification {
            change_kind: kind,
            old_path,
            new_path,
            added_lines: diff.added.len() as u64,
            removed_lines: diff.deleted.len() as u64,
            nloc: metrics.nloc,
            complexity: metrics.complexity,
            token_count: metrics.token_count,
            diff,
            methods: metrics.methods,
        }))
    }

    /// UTF-8 text of a blob, or `None` for binary content.
    fn blob_text(&self, id: ObjectId) -> Result<Option<String>> {
        let object = self.repo.find_object(id)?;
        let data = object.data.as_slice();
        if data.iter().take(8192).any(|&b| b == 0) {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(data).into_owned()))
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| MinerError::Git(format!("Invalid timestamp: {secs}")))
}

/// Added lines numbered in the new text, deleted lines numbered in the old, both 1-based.
pub fn diff_lines(old: &str, new: &str) -> DiffLines {
    let diff = TextDiff::from_lines(old, new);
    let mut lines = DiffLines::default();
    for change in diff.iter_all_changes() {
        let text = change.value().trim_end_matches(|c| c == '\n' || c == '\r').to_string();
        match change.tag() {
            ChangeTag::Insert => {
                if let Some(index) = change.new_index() {
                    lines.added.push((index as u32 + 1, text));
                }
            }
            ChangeTag::Delete => {
                if let Some(index) = change.old_index() {
                    lines.deleted.push((index as u32 + 1, text));
                }
            }
            ChangeTag::Equal => {}
        }
    }
    lines
}

/// Newest-first commit stream over a repository range.
pub struct GitSource<'r> {
    repo: &'r GitRepo,
    ids: Vec<ObjectId>,
    extensions: ExtensionFilter,
    extractor: Box<dyn MethodExtractor + 'r>,
}

impl<'r> GitSource<'r> {
    pub fn new(
        repo: &'r GitRepo,
        from: &str,
        to: Option<&str>,
        extensions: ExtensionFilter,
        extractor: Box<dyn MethodExtractor + 'r>,
    ) -> Result<Self> {
        let ids = repo.commit_range(from, to)?;
        tracing::info!(
            commits = ids.len(),
            from,
            to = to.unwrap_or("<root>"),
            "resolved commit range"
        );
        Ok(Self { repo, ids, extensions, extractor })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl CommitSource for GitSource<'_> {
    fn commits(&mut self) -> Result<CommitIter<'_>> {
        let repo = self.repo;
        let extensions = &self.extensions;
        let extractor = self.extractor.as_ref();
        Ok(Box::new(
            self.ids
                .iter()
                .map(move |id| repo.load_commit(*id, extensions, extractor)),
        ))
    }
}
