/*!
 * Progress reporting for translation runs.
 *
 * The scheduler reports to a `ProgressObserver`; the binary plugs in
 * terminal progress bars, library callers can use the silent or logging
 * observers below.
 */

use log::info;
use std::path::Path;

use super::batch::RunStatistics;

/// Receives progress events from a running scheduler
pub trait ProgressObserver: Send + Sync {
    /// Called once before the first batch
    fn on_run_start(&self, _total_items: usize, _total_batches: usize) {}

    /// Called for every unit of a finished batch
    fn on_item_processed(&self, _unit_id: &str, _translated: bool) {}

    /// Called after a batch has been merged into the document
    fn on_batch_complete(&self, _batch_number: usize, _total_batches: usize, _stats: &RunStatistics) {}

    /// Called after a checkpoint was written
    fn on_checkpoint(&self, _path: &Path) {}

    /// Called once when the run ends, whatever the outcome
    fn on_finish(&self, _stats: &RunStatistics) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressObserver for SilentProgress {}

/// Observer that reports batch progress through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_run_start(&self, total_items: usize, total_batches: usize) {
        info!("Translating {} unit(s) in {} batch(es)", total_items, total_batches);
    }

    fn on_batch_complete(&self, batch_number: usize, total_batches: usize, stats: &RunStatistics) {
        info!(
            "Batch {}/{} done: {} translated, {} error(s)",
            batch_number, total_batches, stats.translated, stats.errors
        );
    }

    fn on_checkpoint(&self, path: &Path) {
        info!("Progress saved to {}", path.display());
    }
}
