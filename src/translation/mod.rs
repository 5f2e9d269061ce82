/*!
 * Translation engine for XLIFF documents.
 *
 * This module contains the batch translation pipeline. It is split into
 * several submodules:
 *
 * - `filter`: Selection of the units that need a translation
 * - `adapter`: The batch translation contract and its provider-backed implementation
 * - `core`: Translation service selecting the configured provider
 * - `batch`: Batch scheduling, pacing, cancellation and statistics
 * - `checkpoint`: Atomic checkpoint writes
 * - `progress`: Progress observers
 * - `prompts`: Prompt framing for batch requests
 */

// Re-export main types for easier usage
pub use self::adapter::{BatchTranslator, ProviderAdapter};
pub use self::batch::{BatchConfig, BatchScheduler, RunStatistics, SchedulerState};
pub use self::checkpoint::CheckpointWriter;
pub use self::core::TranslationService;
pub use self::filter::{WorkItem, count_already_translated, select_for_translation};
pub use self::progress::{LogProgress, ProgressObserver, SilentProgress};

// Submodules
pub mod adapter;
pub mod batch;
pub mod checkpoint;
pub mod core;
pub mod filter;
pub mod progress;
pub mod prompts;
