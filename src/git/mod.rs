pub mod extract;
pub mod repo;

pub use extract::{CFamilyExtractor, FileMetrics, MethodExtractor};
pub use repo::{GitRepo, GitSource};
