/*!
 * Tests for language code resolution
 */

use xliffwai::language_utils::{
    get_language_name, language_code_from_file_name, language_codes_match, language_from_code,
    normalize_to_part2t, resolve_target_language,
};

#[test]
fn test_languageFromCode_withAllCodeForms_shouldFindLanguage() {
    assert!(language_from_code("es").is_some());
    assert!(language_from_code("spa").is_some());
    assert!(language_from_code("ES").is_some());
    assert!(language_from_code("es-MX").is_some());
    assert!(language_from_code("xx").is_none());
    assert!(language_from_code("spanish").is_none());
}

#[test]
fn test_normalizeToPart2t_shouldMapBibliographicCodes() {
    assert_eq!(normalize_to_part2t("fr").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("chi").unwrap(), "zho");
    assert!(normalize_to_part2t("zz").is_err());
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(get_language_name("ja").unwrap(), "Japanese");
    assert_eq!(get_language_name("nld").unwrap(), "Dutch");
    assert!(get_language_name("").is_err());
}

#[test]
fn test_resolveTargetLanguage_shouldAcceptCodesAndNames() {
    assert_eq!(resolve_target_language("es").unwrap(), "Spanish");
    assert_eq!(resolve_target_language(" it ").unwrap(), "Italian");
    assert_eq!(resolve_target_language("en-GB").unwrap(), "English (GB)");
    assert_eq!(resolve_target_language("GERMAN").unwrap(), "German");
    assert_eq!(resolve_target_language("Brazilian Portuguese").unwrap(), "Brazilian Portuguese");
}

#[test]
fn test_languageCodesMatch_shouldCompareLanguagesNotSpelling() {
    assert!(language_codes_match("de", "ger"));
    assert!(language_codes_match("de", "DEU"));
    assert!(!language_codes_match("de", "nl"));
    assert!(!language_codes_match("de", "unknown"));
}

#[test]
fn test_languageCodeFromFileName_shouldHandleCommonLayouts() {
    assert_eq!(language_code_from_file_name("src/locale/messages.es.xlf").as_deref(), Some("es"));
    assert_eq!(language_code_from_file_name("messages.pt-BR.xliff").as_deref(), Some("pt-BR"));
    assert_eq!(language_code_from_file_name("messages.xlf"), None);
    assert_eq!(language_code_from_file_name("fr.xlf"), None);
}
