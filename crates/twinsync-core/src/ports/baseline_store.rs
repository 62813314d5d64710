//! Baseline store port (driven/secondary port)

use crate::domain::Baseline;

/// Persists the baseline of a task between runs
pub trait IBaselineStore {
    /// Load the baseline of `task`; a task that never completed a run has an
    /// empty baseline
    fn load(&self, task: &str) -> anyhow::Result<Baseline>;

    /// Replace the stored baseline of `task`
    fn save(&self, task: &str, baseline: &Baseline) -> anyhow::Result<()>;
}
