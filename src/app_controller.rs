use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::errors::ConfigError;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::translation::{
    BatchScheduler, BatchTranslator, CheckpointWriter, ProgressObserver, RunStatistics, TranslationService,
};
use crate::xliff::XliffDocument;

// @module: Application controller for XLIFF translation runs

/// Terminal progress display with one bar for batches and one for units
pub struct ConsoleProgress {
    multi_progress: MultiProgress,
    batches: ProgressBar,
    items: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let multi_progress = MultiProgress::new();
        let batches = multi_progress.add(ProgressBar::new(0));
        let items = multi_progress.add(ProgressBar::new(0));

        batches.set_style(Self::style("batches"));
        items.set_style(Self::style("units"));
        batches.set_message("Translating");

        Self { multi_progress, batches, items }
    }

    fn style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
                unit
            ))
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    /// The underlying multi-bar, for callers adding their own bars
    pub fn multi_progress(&self) -> &MultiProgress {
        &self.multi_progress
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_run_start(&self, total_items: usize, total_batches: usize) {
        // One instance serves every file of a folder run
        self.batches.reset();
        self.items.reset();
        self.batches.set_length(total_batches as u64);
        self.items.set_length(total_items as u64);
        self.batches.set_message("Translating");
    }

    fn on_item_processed(&self, _unit_id: &str, _translated: bool) {
        self.items.inc(1);
    }

    fn on_batch_complete(&self, _batch_number: usize, _total_batches: usize, stats: &RunStatistics) {
        self.batches.inc(1);
        self.batches.set_message(format!("{} translated, {} error(s)", stats.translated, stats.errors));
    }

    fn on_finish(&self, _stats: &RunStatistics) {
        self.items.finish_and_clear();
        self.batches.finish_and_clear();
    }
}

/// Outcome of a folder run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderSummary {
    /// Files translated, completely or partially
    pub processed: usize,
    /// Files skipped because no language could be derived from their name
    pub skipped: usize,
    /// Files that could not be processed at all
    pub failed: usize,
    /// Units without a translation, summed over all processed files
    pub unit_errors: usize,
    /// Set when the folder run was cancelled
    pub interrupted: bool,
}

impl FolderSummary {
    pub fn has_errors(&self) -> bool {
        self.failed > 0 || self.unit_errors > 0
    }
}

/// Main application controller for XLIFF translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate_batch().context("Invalid batch settings")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check that the configured provider answers
    pub async fn check_connection(&self) -> Result<()> {
        let service = TranslationService::new(self.config.translation.clone())
            .context("Failed to create translation service")?;
        service.test_connection().await
            .with_context(|| format!("Connection to {} failed", self.config.translation.provider.display_name()))?;
        info!(
            "Connection to {} ({}) works",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model()
        );
        Ok(())
    }

    /// Translate one document with the configured provider.
    ///
    /// The result goes to `output`, or back to `input` when no output is given.
    pub async fn run(&self, input: &Path, output: Option<&Path>, cancel: CancellationToken) -> Result<RunStatistics> {
        let service = TranslationService::new(self.config.translation.clone())
            .context("Failed to create translation service")?;
        info!(
            "Provider: {} - {}",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model()
        );

        let progress = ConsoleProgress::new();
        self.run_with_translator(&service, input, output, None, &progress, cancel).await
    }

    /// Translate one document with an explicit translator and observer.
    ///
    /// `language` overrides the configured target language; without either,
    /// the document's declared target language is used.
    pub async fn run_with_translator(
        &self,
        translator: &dyn BatchTranslator,
        input: &Path,
        output: Option<&Path>,
        language: Option<&str>,
        observer: &dyn ProgressObserver,
        cancel: CancellationToken,
    ) -> Result<RunStatistics> {
        let start_time = Instant::now();

        let mut document = XliffDocument::load(input)
            .with_context(|| format!("Failed to load {}", input.display()))?;

        let target_language = self.resolve_language(language, &document)?;
        info!("Translating {} to {}", input.display(), target_language);

        let output_path = output.unwrap_or(input).to_path_buf();
        let checkpoint = CheckpointWriter::new(&output_path);
        let batch_config = self.config.batch.to_batch_config(target_language);

        let mut scheduler = BatchScheduler::new(translator, batch_config)?
            .with_cancellation(cancel)
            .with_observer(observer);
        let stats = scheduler.run(&mut document, &checkpoint).await?;

        Self::log_summary(&output_path, &stats, start_time.elapsed());
        Ok(stats)
    }

    fn resolve_language(&self, language: Option<&str>, document: &XliffDocument) -> Result<String> {
        let requested = language
            .map(str::to_string)
            .or_else(|| Some(self.config.target_language.clone()).filter(|l| !l.trim().is_empty()))
            .or_else(|| document.target_language().map(str::to_string));

        match requested {
            Some(language) => language_utils::resolve_target_language(&language),
            None => Err(anyhow!(ConfigError::MissingTargetLanguage))
                .context("Pass --language or declare a target language in the document"),
        }
    }

    /// Translate every `<stem>.<lang>.xlf` document under `input_dir` in place
    pub async fn run_folder(&self, input_dir: &Path, cancel: CancellationToken) -> Result<FolderSummary> {
        let service = TranslationService::new(self.config.translation.clone())
            .context("Failed to create translation service")?;
        let progress = ConsoleProgress::new();
        self.run_folder_with_translator(&service, input_dir, &progress, cancel).await
    }

    /// Folder mode with an explicit translator and observer
    pub async fn run_folder_with_translator(
        &self,
        translator: &dyn BatchTranslator,
        input_dir: &Path,
        observer: &dyn ProgressObserver,
        cancel: CancellationToken,
    ) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let files = FileManager::find_xliff_files(input_dir)?;
        if files.is_empty() {
            return Err(anyhow!("No XLIFF files found in directory: {:?}", input_dir));
        }

        let mut summary = FolderSummary::default();
        for file in &files {
            if cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            let Some(code) = language_utils::language_code_from_file_name(file) else {
                warn!("Skipping {}: no language code in the file name", file.display());
                summary.skipped += 1;
                continue;
            };

            match self
                .run_with_translator(translator, file, None, Some(&code), observer, cancel.clone())
                .await
            {
                Ok(stats) => {
                    summary.processed += 1;
                    summary.unit_errors += stats.errors;
                    if stats.was_interrupted() {
                        summary.interrupted = true;
                        break;
                    }
                }
                Err(e) => {
                    error!("Error processing file {}: {:#}", file.display(), e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Folder processing completed: {} processed, {} skipped, {} failed in {}",
            summary.processed,
            summary.skipped,
            summary.failed,
            Self::format_duration(start_time.elapsed())
        );

        Ok(summary)
    }

    fn log_summary(output_path: &Path, stats: &RunStatistics, elapsed: Duration) {
        info!("Translation summary for {}:", output_path.display());
        info!("  Total units:          {}", stats.total);
        info!("  Already translated:   {}", stats.already_translated);
        info!("  Newly translated:     {}", stats.translated);
        if stats.errors > 0 {
            warn!("  Errors:               {}", stats.errors);
        } else {
            info!("  Errors:               0");
        }
        info!("  Completion:           {:.1}%", stats.completion_percent());
        if stats.was_interrupted() {
            warn!(
                "Interrupted after {}/{} batch(es); progress saved, rerun to continue",
                stats.batches_completed, stats.batches_total
            );
        }
        info!("Finished in {}", Self::format_duration(elapsed));
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
