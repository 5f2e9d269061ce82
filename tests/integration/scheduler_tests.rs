/*!
 * Integration tests for batch scheduling over whole documents
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use xliffwai::errors::{ConfigError, EngineError, ProviderError};
use xliffwai::providers::GenerationSettings;
use xliffwai::providers::mock::MockProvider;
use xliffwai::translation::{
    BatchConfig, BatchScheduler, CheckpointWriter, ProviderAdapter, SchedulerState,
};
use xliffwai::xliff::XliffDocument;

use crate::common::{self, RecordingObserver, SAMPLE_XLIFF12, ScriptedTranslator, xliff12_with_units};

fn config(batch_size: usize) -> BatchConfig {
    BatchConfig { batch_size, delay_secs: 0.0, save_frequency: 100, ..BatchConfig::new("French") }
}

struct Fixture {
    _dir: tempfile::TempDir,
    input: PathBuf,
    output: PathBuf,
}

fn fixture(content: &str) -> Result<Fixture> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "messages.xlf", content)?;
    let output = dir.path().join("messages.fr.xlf");
    Ok(Fixture { _dir: dir, input, output })
}

fn targets(path: &Path) -> Result<Vec<String>> {
    let doc = XliffDocument::load(path)?;
    Ok(doc.units().iter().map(|u| u.target_text().to_string()).collect())
}

#[tokio::test]
async fn test_run_withTwelveUnitsInBatchesOfFive_shouldMakeThreeCalls() -> Result<()> {
    common::init_test_logging();
    let fx = fixture(&xliff12_with_units(12))?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let translator = ScriptedTranslator::echo();
    let observer = RecordingObserver::default();

    let mut scheduler = BatchScheduler::new(&translator, config(5))?.with_observer(&observer);
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    let sizes: Vec<usize> = translator.calls().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![5, 5, 2]);
    assert_eq!(stats.total, 12);
    assert_eq!(stats.translated, 12);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.batches_total, 3);
    assert_eq!(stats.batches_completed, 3);
    assert_eq!(stats.checkpoints, 1);
    assert_eq!(stats.state, SchedulerState::Completed);
    assert_eq!(scheduler.state(), SchedulerState::Completed);
    assert_eq!(stats.completion_percent(), 100.0);

    assert_eq!(observer.count("start 12 3"), 1);
    assert_eq!(observer.count("batch "), 3);
    assert_eq!(observer.count("item "), 12);
    assert_eq!(observer.events().last().map(String::as_str), Some("finish Completed"));

    // Input untouched, output holds every translation in document order
    assert_eq!(fs::read_to_string(&fx.input)?, xliff12_with_units(12));
    let expected: Vec<String> = (1..=12).map(|i| format!("[fr] Text {}", i)).collect();
    assert_eq!(targets(&fx.output)?, expected);
    Ok(())
}

#[tokio::test]
async fn test_run_withSaveFrequency_shouldCheckpointPeriodically() -> Result<()> {
    let fx = fixture(&xliff12_with_units(12))?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let translator = ScriptedTranslator::echo();
    let observer = RecordingObserver::default();

    let settings = BatchConfig { save_frequency: 1, ..config(5) };
    let mut scheduler = BatchScheduler::new(&translator, settings)?.with_observer(&observer);
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    // After batches 1 and 2, then the final one
    assert_eq!(stats.checkpoints, 3);
    assert_eq!(observer.count("checkpoint"), 3);
    Ok(())
}

#[tokio::test]
async fn test_run_withNothingToTranslate_shouldNotCallOrWrite() -> Result<()> {
    let fx = fixture(
        r#"<xliff version="1.2"><file><body>
<trans-unit id="a"><source>One</source><target>Un</target></trans-unit>
<trans-unit id="b"><source>  </source></trans-unit>
</body></file></xliff>"#,
    )?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let translator = ScriptedTranslator::echo();

    let mut scheduler = BatchScheduler::new(&translator, config(5))?;
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert_eq!(translator.call_count(), 0);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.already_translated, 2);
    assert_eq!(stats.checkpoints, 0);
    assert_eq!(stats.state, SchedulerState::Completed);
    assert!(!fx.output.exists());
    Ok(())
}

#[tokio::test]
async fn test_run_whenCancelledAfterFirstBatch_shouldSaveFirstBatchOnly() -> Result<()> {
    let fx = fixture(&xliff12_with_units(12))?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let cancel = CancellationToken::new();
    let translator = ScriptedTranslator::echo().cancelling_after(1, cancel.clone());

    let mut scheduler = BatchScheduler::new(&translator, config(5))?.with_cancellation(cancel);
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert_eq!(translator.call_count(), 1);
    assert_eq!(stats.batches_completed, 1);
    assert_eq!(stats.translated, 5);
    assert!(stats.was_interrupted());
    assert_eq!(scheduler.state(), SchedulerState::Interrupted);

    let saved = targets(&fx.output)?;
    assert_eq!(saved.iter().filter(|t| !t.is_empty()).count(), 5);
    assert_eq!(saved[4], "[fr] Text 5");
    assert_eq!(saved[5], "");
    Ok(())
}

#[tokio::test]
async fn test_run_whenCancelledDuringDelay_shouldStopWithoutWaiting() -> Result<()> {
    let fx = fixture(&xliff12_with_units(4))?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let cancel = CancellationToken::new();
    let translator = ScriptedTranslator::echo().cancelling_after(1, cancel.clone());

    let settings = BatchConfig { delay_secs: 30.0, ..config(2) };
    let mut scheduler = BatchScheduler::new(&translator, settings)?.with_cancellation(cancel);

    let started = Instant::now();
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(stats.was_interrupted());
    assert_eq!(stats.translated, 2);
    Ok(())
}

#[tokio::test]
async fn test_run_whenCancelledBeforeStart_shouldNotCallProvider() -> Result<()> {
    let fx = fixture(&xliff12_with_units(3))?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let translator = ScriptedTranslator::echo();

    let mut scheduler = BatchScheduler::new(&translator, config(5))?.with_cancellation(cancel);
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert_eq!(translator.call_count(), 0);
    assert_eq!(stats.batches_completed, 0);
    assert!(stats.was_interrupted());
    Ok(())
}

#[tokio::test]
async fn test_run_withFailingBatch_shouldOnlyLoseThatBatch() -> Result<()> {
    common::init_test_logging();
    let fx = fixture(&xliff12_with_units(12))?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let translator = ScriptedTranslator::new(|call, texts| {
        if call == 1 {
            Err(ProviderError::ConnectionError("connection reset".to_string()))
        } else {
            Ok(texts.iter().map(|t| format!("[fr] {}", t)).collect())
        }
    });

    let mut scheduler = BatchScheduler::new(&translator, config(5))?;
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert_eq!(translator.call_count(), 3);
    assert_eq!(stats.translated, 7);
    assert_eq!(stats.errors, 5);
    assert_eq!(stats.translated + stats.errors + stats.already_translated, stats.total);
    assert_eq!(stats.state, SchedulerState::Completed);

    let saved = targets(&fx.output)?;
    assert!(saved[5..10].iter().all(String::is_empty));
    assert_eq!(saved[10], "[fr] Text 11");
    Ok(())
}

#[tokio::test]
async fn test_run_withShortResponse_shouldTranslatePrefixAndCountMismatch() -> Result<()> {
    let fx = fixture(&xliff12_with_units(6))?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let translator = ScriptedTranslator::new(|_, texts| {
        Ok(texts.iter().take(texts.len() - 1).map(|t| format!("[fr] {}", t)).collect())
    });

    let mut scheduler = BatchScheduler::new(&translator, config(3))?;
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert_eq!(stats.count_mismatches, 2);
    assert_eq!(stats.translated, 4);
    assert_eq!(stats.errors, 2);
    let saved = targets(&fx.output)?;
    assert_eq!(saved[1], "[fr] Text 2");
    assert_eq!(saved[2], "");
    Ok(())
}

#[tokio::test]
async fn test_run_withLongResponse_shouldIgnoreExtraItems() -> Result<()> {
    let fx = fixture(&xliff12_with_units(2))?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let translator = ScriptedTranslator::new(|_, texts| {
        let mut out: Vec<String> = texts.iter().map(|t| format!("[fr] {}", t)).collect();
        out.push("stray line".to_string());
        Ok(out)
    });

    let mut scheduler = BatchScheduler::new(&translator, config(5))?;
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert_eq!(stats.count_mismatches, 1);
    assert_eq!(stats.translated, 2);
    assert_eq!(targets(&fx.output)?, vec!["[fr] Text 1", "[fr] Text 2"]);
    Ok(())
}

#[tokio::test]
async fn test_run_withUntranslatedEcho_shouldCountError() -> Result<()> {
    let fx = fixture(&xliff12_with_units(2))?;
    let mut doc = XliffDocument::load(&fx.input)?;
    // First item comes back unchanged, second blank
    let translator = ScriptedTranslator::new(|_, texts| Ok(vec![format!("  {}  ", texts[0]), "   ".to_string()]));

    let mut scheduler = BatchScheduler::new(&translator, config(5))?;
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert_eq!(stats.translated, 0);
    assert_eq!(stats.errors, 2);
    assert_eq!(fs::read_to_string(&fx.output)?, xliff12_with_units(2));
    Ok(())
}

#[tokio::test]
async fn test_run_twiceWithSkipExisting_shouldBeIdempotent() -> Result<()> {
    let fx = fixture(SAMPLE_XLIFF12)?;
    let translator = ScriptedTranslator::echo();

    let mut doc = XliffDocument::load(&fx.input)?;
    let mut scheduler = BatchScheduler::new(&translator, config(5))?;
    let first = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.input)).await?;
    assert_eq!(first.translated, 2);
    assert_eq!(first.already_translated, 1);
    let after_first = fs::read(&fx.input)?;

    let mut doc = XliffDocument::load(&fx.input)?;
    let mut scheduler = BatchScheduler::new(&translator, config(5))?;
    let second = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.input)).await?;

    assert_eq!(second.translated, 0);
    assert_eq!(second.already_translated, 3);
    assert_eq!(translator.call_count(), 1);
    assert_eq!(fs::read(&fx.input)?, after_first);
    Ok(())
}

#[tokio::test]
async fn test_run_withoutSkip_shouldRetranslateExistingTargets() -> Result<()> {
    let fx = fixture(SAMPLE_XLIFF12)?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let translator = ScriptedTranslator::echo();

    let settings = BatchConfig { skip_existing: false, ..config(5) };
    let mut scheduler = BatchScheduler::new(&translator, settings)?;
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert_eq!(stats.translated, 3);
    assert_eq!(targets(&fx.output)?[1], "[fr] Goodbye");
    Ok(())
}

#[tokio::test]
async fn test_run_withInlineMarkup_shouldKeepMarkupStructured() -> Result<()> {
    let fx = fixture(
        r#"<xliff version="1.2"><file><body>
<trans-unit id="count"><source>You have <x id="INTERPOLATION" equiv-text="{{ n }}"/> <b>new</b> messages</source></trans-unit>
</body></file></xliff>"#,
    )?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let translator = ScriptedTranslator::new(|_, _| {
        Ok(vec![r#"Vous avez <x id="INTERPOLATION" equiv-text="{{ n }}"/> <b>nouveaux</b> messages"#.to_string()])
    });

    let mut scheduler = BatchScheduler::new(&translator, config(5))?;
    scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    let saved = fs::read_to_string(&fx.output)?;
    assert!(saved.contains(
        r#"<target>Vous avez <x id="INTERPOLATION" equiv-text="{{ n }}"/> <b>nouveaux</b> messages</target>"#
    ));
    assert_eq!(translator.calls()[0][0], r#"You have <x id="INTERPOLATION" equiv-text="{{ n }}"/> <b>new</b> messages"#);
    Ok(())
}

#[tokio::test]
async fn test_run_withUnwritableOutput_shouldReturnCheckpointError() -> Result<()> {
    let fx = fixture(&xliff12_with_units(2))?;
    fs::create_dir_all(&fx.output)?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let translator = ScriptedTranslator::echo();

    let mut scheduler = BatchScheduler::new(&translator, config(5))?;
    let result = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await;

    assert!(matches!(result, Err(EngineError::Checkpoint { .. })));
    // The translations are still held in memory
    assert_eq!(doc.modified_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_new_withInvalidConfig_shouldRejectBeforeAnyCall() {
    let translator = ScriptedTranslator::echo();

    let result = BatchScheduler::new(&translator, config(0));
    assert!(matches!(result, Err(ConfigError::InvalidBatchSize(0))));

    let result = BatchScheduler::new(&translator, BatchConfig::new(""));
    assert!(matches!(result, Err(ConfigError::MissingTargetLanguage)));
    assert_eq!(translator.call_count(), 0);
}

#[tokio::test]
async fn test_run_withDelay_shouldPauseBetweenBatchesOnly() -> Result<()> {
    let fx = fixture(&xliff12_with_units(3))?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let translator = ScriptedTranslator::echo();

    let settings = BatchConfig { delay_secs: 0.1, ..config(1) };
    let mut scheduler = BatchScheduler::new(&translator, settings)?;

    let started = Instant::now();
    scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    // Two pauses for three batches
    assert!(started.elapsed() >= Duration::from_millis(200));
    Ok(())
}

#[tokio::test]
async fn test_run_withMockProviderAdapter_shouldTranslateThroughNumberedFraming() -> Result<()> {
    let fx = fixture(SAMPLE_XLIFF12)?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let adapter = ProviderAdapter::new(
        MockProvider::working(),
        "Translate to {target_language}.",
        GenerationSettings::default(),
    );

    let mut scheduler = BatchScheduler::new(&adapter, config(5))?;
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert_eq!(stats.translated, 2);
    let requests = adapter.provider().recorded_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].system, "Translate to French.");
    assert_eq!(requests[0].prompt, "1. Hello\n2. Welcome, <b>friend</b>!");

    let saved = targets(&fx.output)?;
    assert_eq!(saved, vec!["[TRANSLATED] Hello", "Au revoir", "[TRANSLATED] Welcome, <b>friend</b>!"]);
    Ok(())
}

fn mock_adapter(provider: MockProvider) -> ProviderAdapter<MockProvider> {
    ProviderAdapter::new(provider, "Translate to {target_language}.", GenerationSettings::default())
}

const MULTILINE_XLIFF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xliff version="1.2" xmlns="urn:oasis:names:tc:xliff:document:1.2">
  <file source-language="en" datatype="plaintext" original="app">
    <body>
      <trans-unit id="a">
        <source>Steps:
1. Open the lid
2. Close it</source>
      </trans-unit>
      <trans-unit id="b">
        <source>Hello</source>
      </trans-unit>
    </body>
  </file>
</xliff>
"#;

#[tokio::test]
async fn test_run_withTwoOfTwelveTranslated_shouldMakeTwoFullCalls() -> Result<()> {
    let content = xliff12_with_units(12)
        .replace("<source>Text 3</source>", "<source>Text 3</source><target>Texte 3</target>")
        .replace("<source>Text 8</source>", "<source>Text 8</source><target>Texte 8</target>");
    let fx = fixture(&content)?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let translator = ScriptedTranslator::echo();

    let mut scheduler = BatchScheduler::new(&translator, config(5))?;
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    let sizes: Vec<usize> = translator.calls().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![5, 5]);
    assert_eq!(stats.total, 12);
    assert_eq!(stats.already_translated, 2);
    assert_eq!(stats.translated, 10);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.batches_total, 2);

    let saved = targets(&fx.output)?;
    assert_eq!(saved[2], "Texte 3");
    assert_eq!(saved[7], "Texte 8");
    assert_eq!(saved[8], "[fr] Text 9");
    Ok(())
}

#[tokio::test]
async fn test_run_withSkippedAnswerNumber_shouldKeepLaterAnswersOnTheirUnits() -> Result<()> {
    let fx = fixture(&xliff12_with_units(3))?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let adapter = mock_adapter(MockProvider::working().with_custom_response(|_| "1. Texte 1\n3. Texte 3".to_string()));

    let mut scheduler = BatchScheduler::new(&adapter, config(5))?;
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert_eq!(stats.translated, 2);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.count_mismatches, 1);
    assert_eq!(targets(&fx.output)?, vec!["Texte 1", "", "Texte 3"]);
    Ok(())
}

#[tokio::test]
async fn test_run_withNumberedListInSource_shouldKeepUnitsApart() -> Result<()> {
    let fx = fixture(MULTILINE_XLIFF)?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let adapter = mock_adapter(MockProvider::working());

    let mut scheduler = BatchScheduler::new(&adapter, config(5))?;
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert_eq!(stats.translated, 2);
    assert_eq!(stats.count_mismatches, 0);
    assert_eq!(
        targets(&fx.output)?,
        vec!["[TRANSLATED] Steps:\n1. Open the lid\n2. Close it", "[TRANSLATED] Hello"]
    );
    Ok(())
}

#[tokio::test]
async fn test_run_withFlattenedNestedList_shouldCountErrorsInsteadOfMisassigning() -> Result<()> {
    let fx = fixture(MULTILINE_XLIFF)?;
    let mut doc = XliffDocument::load(&fx.input)?;
    let adapter = mock_adapter(MockProvider::working().with_custom_response(|_| {
        "1. Étapes :\n1. Ouvrir le couvercle\n2. Le fermer\n2. Bonjour".to_string()
    }));

    let mut scheduler = BatchScheduler::new(&adapter, config(5))?;
    let stats = scheduler.run(&mut doc, &CheckpointWriter::new(&fx.output)).await?;

    assert_eq!(stats.translated, 0);
    assert_eq!(stats.errors, 2);
    assert_eq!(stats.count_mismatches, 1);
    assert!(targets(&fx.output)?.iter().all(String::is_empty));
    Ok(())
}
