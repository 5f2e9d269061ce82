/*!
 * Batch scheduling of a translation run.
 *
 * The scheduler walks the work list in fixed-size batches, one provider
 * call per batch, merges the results into the document, checkpoints on a
 * cadence and always writes a final checkpoint. A failed batch only costs
 * its own units; cancellation stops the run between or during batches and
 * still persists everything translated so far.
 */

use log::{debug, error, info, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::{ConfigError, EngineError};
use crate::xliff::{XliffDocument, markup_tags};

use super::adapter::BatchTranslator;
use super::checkpoint::CheckpointWriter;
use super::filter::{WorkItem, select_for_translation};
use super::progress::{ProgressObserver, SilentProgress};

/// Tuning parameters of one run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Units per provider call, at least 1
    pub batch_size: usize,
    /// Pause between batches in seconds, not applied after the last batch
    pub delay_secs: f64,
    /// Leave units with an existing target untouched
    pub skip_existing: bool,
    /// Checkpoint after this many batches, at least 1
    pub save_frequency: usize,
    /// Language handed to the provider
    pub target_language: String,
}

impl BatchConfig {
    pub fn new(target_language: impl Into<String>) -> Self {
        Self {
            batch_size: 10,
            delay_secs: 1.0,
            skip_existing: true,
            save_frequency: 5,
            target_language: target_language.into(),
        }
    }

    /// Check the numeric parameters
    pub fn validate_tuning(&self) -> Result<(), ConfigError> {
        if self.batch_size < 1 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        if self.save_frequency < 1 {
            return Err(ConfigError::InvalidSaveFrequency(self.save_frequency));
        }
        if !self.delay_secs.is_finite() || self.delay_secs < 0.0 {
            return Err(ConfigError::InvalidDelay(self.delay_secs));
        }
        Ok(())
    }

    /// Check every parameter, including the target language
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_tuning()?;
        if self.target_language.trim().is_empty() {
            return Err(ConfigError::MissingTargetLanguage);
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs)
    }
}

/// Lifecycle of a scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
    Completed,
    Interrupted,
}

/// Counters describing a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    /// Units in the document
    pub total: usize,
    /// Units left alone because they did not need a translation
    pub already_translated: usize,
    /// Units that received a new translation
    pub translated: usize,
    /// Units of the work list that did not get a usable translation
    pub errors: usize,
    /// Batches whose response count did not match the request
    pub count_mismatches: usize,
    pub batches_total: usize,
    pub batches_completed: usize,
    /// Checkpoints written, the final one included
    pub checkpoints: usize,
    /// Terminal state of the run
    pub state: SchedulerState,
}

impl RunStatistics {
    /// Share of units that now have a translation, in percent
    pub fn completion_percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.already_translated + self.translated) as f64 * 100.0 / self.total as f64
    }

    /// Units of the work list that were handled, successfully or not
    pub fn processed(&self) -> usize {
        self.translated + self.errors
    }

    pub fn was_interrupted(&self) -> bool {
        self.state == SchedulerState::Interrupted
    }
}

/// A contiguous slice of the work list sent in one provider call
#[derive(Debug, Clone, Copy)]
pub struct BatchJob<'w> {
    /// 1-based batch number
    pub number: usize,
    pub items: &'w [WorkItem],
}

/// Split the work list into order-preserving batches of at most `batch_size` items
pub fn partition(work: &[WorkItem], batch_size: usize) -> Vec<BatchJob<'_>> {
    work.chunks(batch_size.max(1))
        .enumerate()
        .map(|(i, items)| BatchJob { number: i + 1, items })
        .collect()
}

/// Drives a translation run over one document
pub struct BatchScheduler<'a> {
    translator: &'a dyn BatchTranslator,
    config: BatchConfig,
    cancel: CancellationToken,
    observer: &'a dyn ProgressObserver,
    state: SchedulerState,
}

static SILENT: SilentProgress = SilentProgress;

impl<'a> BatchScheduler<'a> {
    /// Create a scheduler, rejecting invalid parameters before any provider call
    pub fn new(translator: &'a dyn BatchTranslator, config: BatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            translator,
            config,
            cancel: CancellationToken::new(),
            observer: &SILENT,
            state: SchedulerState::Idle,
        })
    }

    /// Stop cooperatively when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Translate the document's pending units and checkpoint to `checkpoint`.
    ///
    /// Provider failures and count mismatches are absorbed into the
    /// statistics. Only a failed final checkpoint is returned as an error.
    pub async fn run(
        &mut self,
        document: &mut XliffDocument,
        checkpoint: &CheckpointWriter,
    ) -> Result<RunStatistics, EngineError> {
        self.state = SchedulerState::Running;

        let work = select_for_translation(document, self.config.skip_existing);
        let mut stats = RunStatistics {
            total: document.len(),
            already_translated: document.len() - work.len(),
            ..RunStatistics::default()
        };

        if work.is_empty() {
            info!("Nothing to translate: all {} unit(s) already translated", stats.total);
            self.state = SchedulerState::Completed;
            stats.state = self.state;
            self.observer.on_finish(&stats);
            return Ok(stats);
        }

        let batches = partition(&work, self.config.batch_size);
        stats.batches_total = batches.len();
        info!(
            "Found {} unit(s) to translate ({} already translated), {} batch(es) of up to {}",
            work.len(),
            stats.already_translated,
            batches.len(),
            self.config.batch_size
        );
        self.observer.on_run_start(work.len(), batches.len());

        let mut interrupted = false;
        for batch in &batches {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            let texts: Vec<String> = batch.items.iter().map(|item| item.source_text.clone()).collect();
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = self.translator.translate_batch(&texts, &self.config.target_language) => Some(result),
            };
            let Some(result) = outcome else {
                info!("Interrupted during batch {}/{}", batch.number, batches.len());
                interrupted = true;
                break;
            };

            match result {
                Ok(translations) => self.apply_batch(document, batch, translations, &mut stats),
                Err(e) => {
                    error!("Batch {}/{} failed: {}", batch.number, batches.len(), e);
                    stats.errors += batch.items.len();
                    for item in batch.items {
                        self.observer.on_item_processed(&item.id, false);
                    }
                }
            }

            stats.batches_completed += 1;
            self.observer.on_batch_complete(batch.number, batches.len(), &stats);

            let is_last = batch.number == batches.len();
            if !is_last && stats.batches_completed % self.config.save_frequency == 0 {
                match checkpoint.write(document) {
                    Ok(()) => {
                        stats.checkpoints += 1;
                        self.observer.on_checkpoint(checkpoint.path());
                    }
                    Err(e) => warn!("Periodic checkpoint to {} failed: {}", checkpoint.path().display(), e),
                }
            }

            if !is_last && self.config.delay_secs > 0.0 {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.config.delay()) => {}
                }
            }
        }

        if interrupted {
            warn!(
                "Translation interrupted after {}/{} batch(es), saving progress",
                stats.batches_completed, stats.batches_total
            );
        }

        self.state = if interrupted { SchedulerState::Interrupted } else { SchedulerState::Completed };
        stats.state = self.state;

        checkpoint.write(document).map_err(|source| EngineError::Checkpoint {
            path: checkpoint.path().to_path_buf(),
            source,
        })?;
        stats.checkpoints += 1;
        self.observer.on_checkpoint(checkpoint.path());
        self.observer.on_finish(&stats);

        Ok(stats)
    }

    fn apply_batch(
        &self,
        document: &mut XliffDocument,
        batch: &BatchJob<'_>,
        mut translations: Vec<Option<String>>,
        stats: &mut RunStatistics,
    ) {
        let expected = batch.items.len();
        let received = translations.iter().flatten().count();
        if translations.len() != expected || received != expected {
            warn!(
                "Batch {}: expected {} translation(s), got {}; unmatched units keep their source",
                batch.number, expected, received
            );
            stats.count_mismatches += 1;
            translations.truncate(expected);
        }

        for (position, item) in batch.items.iter().enumerate() {
            let candidate = translations
                .get(position)
                .and_then(|t| t.as_deref())
                .map(str::trim)
                .filter(|t| !t.is_empty() && *t != item.source_text.trim());

            let translated = match (candidate, document.unit_mut(item.index)) {
                (Some(text), Some(unit)) => {
                    unit.set_text(text);
                    if markup_tags(&item.source_text) != markup_tags(unit.target_text()) {
                        warn!("Unit '{}': inline markup differs from the source", item.id);
                    }
                    true
                }
                _ => {
                    debug!("Unit '{}' received no usable translation", item.id);
                    false
                }
            };

            if translated {
                stats.translated += 1;
            } else {
                stats.errors += 1;
            }
            self.observer.on_item_processed(&item.id, translated);
        }
    }
}
