//! Language utilities for ISO language code handling
//!
//! Resolves the language given on the command line or declared in a document
//! (ISO 639-1, ISO 639-2/T, ISO 639-2/B, BCP 47 tags such as `pt-BR`, or an
//! English language name) to the English name handed to the provider.

use anyhow::{Result, anyhow};
use isolang::Language;
use std::path::Path;

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const PART2B_TO_PART2T: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Primary language subtag of a BCP 47 tag (`pt-BR` -> `pt`, `zh_Hant` -> `zh`)
fn primary_subtag(code: &str) -> &str {
    code.split(['-', '_']).next().unwrap_or(code)
}

/// Region or script subtag of a BCP 47 tag, if any
fn region_subtag(code: &str) -> Option<&str> {
    code.split(['-', '_']).nth(1).filter(|s| !s.is_empty())
}

/// Look up a language by ISO code (2 or 3 letters)
pub fn language_from_code(code: &str) -> Option<Language> {
    let normalized = primary_subtag(code.trim()).to_lowercase();
    match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => {
            let part2t = PART2B_TO_PART2T
                .iter()
                .find(|(b, _)| *b == normalized)
                .map(|(_, t)| *t)
                .unwrap_or(normalized.as_str());
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    language_from_code(code)
        .map(|lang| lang.to_639_3().to_string())
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (language_from_code(code1), language_from_code(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = language_from_code(code)
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    Ok(lang.to_name().to_string())
}

/// Resolve a language code or name to the name used in provider prompts.
///
/// Codes become English names, keeping a region subtag as a qualifier
/// (`pt-BR` -> `Portuguese (BR)`). Names are matched case-insensitively and
/// returned in their canonical spelling. Anything else is passed through.
pub fn resolve_target_language(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("Target language cannot be empty"));
    }

    if let Some(lang) = language_from_code(input) {
        let name = lang.to_name();
        return Ok(match region_subtag(input) {
            Some(region) => format!("{} ({})", name, region.to_uppercase()),
            None => name.to_string(),
        });
    }

    let lowered = input.to_lowercase();
    if let Some(lang) = Language::from_name(&capitalize(&lowered)) {
        return Ok(lang.to_name().to_string());
    }

    Ok(input.to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Extract the locale code from a `<stem>.<lang>.<ext>` file name.
///
/// `messages.fr.xlf` gives `fr`, `messages.pt-BR.xlf` gives `pt-BR`;
/// `messages.xlf` or an unknown code gives `None`.
pub fn language_code_from_file_name<P: AsRef<Path>>(path: P) -> Option<String> {
    let stem = path.as_ref().file_stem()?.to_str()?;
    let (_, code) = stem.rsplit_once('.')?;
    language_from_code(code).map(|_| code.to_string())
}
