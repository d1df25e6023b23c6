pub mod aggregate;
pub mod exec;
pub mod miner;
pub mod output;
pub mod progress;
pub mod record;
pub mod scope;
pub mod store;
pub mod tracker;

pub use aggregate::{AggregatedRecord, Stat};
pub use exec::exec;
pub use miner::Miner;
pub use output::{CsvSink, MemorySink, RowSink};
pub use progress::{NoProgress, ProgressReporter, SpinnerProgress};
pub use scope::Scope;
pub use store::MetricStore;
pub use tracker::{IdentityTracker, RemapOutcome};

use crate::util::ExtensionFilter;
use chrono::Duration;

#[derive(Debug, Clone, Default)]
pub struct MineOptions {
    pub extensions: ExtensionFilter,
    pub scope: Option<Scope>,
    /// Aggregate only records within this span of a method's oldest record.
    pub window: Option<Duration>,
}
