/*!
 * Integration tests for application lifecycle
 */

use anyhow::Result;
use std::fs;
use tokio_util::sync::CancellationToken;
use xliffwai::app_config::Config;
use xliffwai::app_controller::Controller;
use xliffwai::errors::ConfigError;
use xliffwai::translation::{LogProgress, SilentProgress};
use xliffwai::xliff::XliffDocument;

use crate::common::{self, SAMPLE_XLIFF12, SAMPLE_XLIFF2, ScriptedTranslator, xliff12_with_units};

fn test_config() -> Config {
    let mut config = Config::default();
    config.batch.delay_secs = 0.0;
    config.batch.batch_size = 2;
    config
}

fn controller() -> Result<Controller> {
    Controller::with_config(test_config())
}

#[tokio::test]
async fn test_run_withExplicitLanguage_shouldTranslateInPlace() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "messages.xlf", SAMPLE_XLIFF12)?;
    let translator = ScriptedTranslator::echo();

    let stats = controller()?
        .run_with_translator(&translator, &path, None, Some("fr"), &SilentProgress, CancellationToken::new())
        .await?;

    assert_eq!(stats.total, 3);
    assert_eq!(stats.already_translated, 1);
    assert_eq!(stats.translated, 2);
    assert_eq!(stats.errors, 0);

    let doc = XliffDocument::load(&path)?;
    assert_eq!(doc.find("greeting").map(|u| u.target_text()), Some("[fr] Hello"));
    assert_eq!(doc.find("farewell").map(|u| u.target_text()), Some("Au revoir"));
    Ok(())
}

#[tokio::test]
async fn test_run_withOutputPath_shouldLeaveInputUntouched() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "messages.xlf", SAMPLE_XLIFF2)?;
    let output = temp_dir.path().join("out").join("messages.de.xlf");
    let translator = ScriptedTranslator::echo();

    let stats = controller()?
        .run_with_translator(&translator, &input, Some(&output), None, &LogProgress, CancellationToken::new())
        .await?;

    assert_eq!(stats.translated, 2);
    assert_eq!(fs::read_to_string(&input)?, SAMPLE_XLIFF2);
    let doc = XliffDocument::load(&output)?;
    assert_eq!(doc.find("s1").map(|u| u.target_text()), Some("[fr] Save your changes."));
    Ok(())
}

#[tokio::test]
async fn test_run_withoutAnyLanguage_shouldFailBeforeTranslating() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "messages.xlf", &xliff12_with_units(2))?;
    let translator = ScriptedTranslator::echo();

    let result = controller()?
        .run_with_translator(&translator, &path, None, None, &SilentProgress, CancellationToken::new())
        .await;

    let error = result.expect_err("a target language is required");
    assert!(error.chain().any(|cause| cause.downcast_ref::<ConfigError>() == Some(&ConfigError::MissingTargetLanguage)));
    assert_eq!(translator.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_withConfiguredLanguage_shouldOverrideDocumentLanguage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "messages.xlf", SAMPLE_XLIFF12)?;
    let mut config = test_config();
    config.target_language = "es".to_string();
    let translator = ScriptedTranslator::new(|_, texts| Ok(texts.iter().map(|t| format!("[es] {}", t)).collect()));

    Controller::with_config(config)?
        .run_with_translator(&translator, &path, None, None, &SilentProgress, CancellationToken::new())
        .await?;

    let doc = XliffDocument::load(&path)?;
    assert_eq!(doc.find("greeting").map(|u| u.target_text()), Some("[es] Hello"));
    Ok(())
}

#[tokio::test]
async fn test_run_withMissingFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let translator = ScriptedTranslator::echo();

    let result = controller()?
        .run_with_translator(
            &translator,
            &temp_dir.path().join("missing.xlf"),
            None,
            Some("fr"),
            &SilentProgress,
            CancellationToken::new(),
        )
        .await;

    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_runFolder_shouldTranslateLocalizedFilesAndSkipOthers() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let locale_dir = temp_dir.path().join("locale");
    fs::create_dir_all(&locale_dir)?;
    let french = common::create_test_file(&locale_dir, "messages.fr.xlf", &xliff12_with_units(3))?;
    let german = common::create_test_file(&locale_dir, "messages.de.xlf", &xliff12_with_units(3))?;
    let base = common::create_test_file(&locale_dir, "messages.xlf", &xliff12_with_units(3))?;
    common::create_test_file(&locale_dir, "broken.es.xlf", "<xliff><file>")?;

    let translator = ScriptedTranslator::echo();
    let summary = controller()?
        .run_folder_with_translator(&translator, temp_dir.path(), &SilentProgress, CancellationToken::new())
        .await?;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.unit_errors, 0);
    assert!(summary.has_errors());
    assert!(!summary.interrupted);

    for path in [&french, &german] {
        let doc = XliffDocument::load(path)?;
        assert!(doc.units().iter().all(|u| u.has_existing_target()));
    }
    assert_eq!(fs::read_to_string(&base)?, xliff12_with_units(3));
    Ok(())
}

#[test]
fn test_runFolder_withoutXliffFiles_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "notes.txt", "nothing here")?;
    let translator = ScriptedTranslator::echo();
    let controller = controller()?;

    let result = tokio_test::block_on(controller.run_folder_with_translator(
        &translator,
        temp_dir.path(),
        &SilentProgress,
        CancellationToken::new(),
    ));

    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_runFolder_whenCancelled_shouldStopBeforeNextFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "a.fr.xlf", &xliff12_with_units(2))?;
    let second = common::create_test_file(temp_dir.path(), "b.fr.xlf", &xliff12_with_units(2))?;

    let cancel = CancellationToken::new();
    let translator = ScriptedTranslator::echo().cancelling_after(1, cancel.clone());
    let summary = controller()?
        .run_folder_with_translator(&translator, temp_dir.path(), &SilentProgress, cancel)
        .await?;

    assert!(summary.interrupted);
    assert_eq!(summary.processed, 1);
    assert_eq!(fs::read_to_string(&second)?, xliff12_with_units(2));
    Ok(())
}
