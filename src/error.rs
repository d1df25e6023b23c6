use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MinerError>;

#[derive(Error, Debug)]
pub enum MinerError {
    #[error("Repository path does not exist: {}", path.display())]
    RepoNotFound { path: PathBuf },
    #[error("Not a valid git repository: {}: {source}", path.display())]
    InvalidRepo {
        path: PathBuf,
        #[source]
        source: Box<gix::discover::Error>,
    },
    #[error("Cannot resolve commit '{reference}': {reason}")]
    UnresolvedRef { reference: String, reason: String },
    #[error("Cannot open output {} for writing: {source}", path.display())]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Label file {}: {reason}", path.display())]
    Labels { path: PathBuf, reason: String },
    #[error("Commit stream line {line}: {reason}")]
    Source { line: usize, reason: String },
    #[error("Git error: {0}")]
    Git(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object find error: {0}")]
    ObjectFind(#[from] Box<gix::object::find::existing::Error>),
    #[error("Commit error: {0}")]
    Commit(#[from] Box<gix::object::commit::Error>),
    #[error("Object find with conversion error: {0}")]
    ObjectFindConv(#[from] Box<gix::object::find::existing::with_conversion::Error>),
    #[error("Object decode error: {0}")]
    ObjectDecode(#[from] Box<gix::objs::decode::Error>),
    #[error("Diff tree to tree error: {0}")]
    DiffTreeToTree(#[from] Box<gix::repository::diff_tree_to_tree::Error>),
}

impl MinerError {
    /// Process exit status for this error at the binary boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            MinerError::RepoNotFound { .. } | MinerError::InvalidRepo { .. } => 2,
            MinerError::UnresolvedRef { .. } => 3,
            MinerError::OutputOpen { .. } => 4,
            MinerError::Labels { .. } => 5,
            _ => 1,
        }
    }
}

// Manual From implementations for unboxed to boxed conversions
impl From<gix::object::find::existing::Error> for MinerError {
    fn from(err: gix::object::find::existing::Error) -> Self {
        MinerError::ObjectFind(Box::new(err))
    }
}

impl From<gix::object::commit::Error> for MinerError {
    fn from(err: gix::object::commit::Error) -> Self {
        MinerError::Commit(Box::new(err))
    }
}

impl From<gix::object::find::existing::with_conversion::Error> for MinerError {
    fn from(err: gix::object::find::existing::with_conversion::Error) -> Self {
        MinerError::ObjectFindConv(Box::new(err))
    }
}

impl From<gix::objs::decode::Error> for MinerError {
    fn from(err: gix::objs::decode::Error) -> Self {
        MinerError::ObjectDecode(Box::new(err))
    }
}

impl From<gix::repository::diff_tree_to_tree::Error> for MinerError {
    fn from(err: gix::repository::diff_tree_to_tree::Error) -> Self {
        MinerError::DiffTreeToTree(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classes_have_distinct_exit_codes() {
        let repo = MinerError::RepoNotFound { path: PathBuf::from("/nope") };
        let reference = MinerError::UnresolvedRef {
            reference: "deadbeef".into(),
            reason: "not found".into(),
        };
        let output = MinerError::OutputOpen {
            path: PathBuf::from("/nope/out.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let labels = MinerError::Labels { path: PathBuf::from("bic.csv"), reason: "x".into() };

        let codes = [
            repo.exit_code(),
            reference.exit_code(),
            output.exit_code(),
            labels.exit_code(),
        ];
        assert_eq!(codes, [2, 3, 4, 5]);
        assert_eq!(MinerError::Git("x".into()).exit_code(), 1);
    }

    #[test]
    fn messages_carry_context() {
        let err = MinerError::UnresolvedRef {
            reference: "abc123".into(),
            reason: "not found".into(),
        };
        assert!(err.to_string().contains("abc123"));
    }
}
