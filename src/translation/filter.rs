/*!
 * Selection of the units that still need a translation.
 */

use crate::xliff::XliffDocument;

/// A unit queued for translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Index of the unit in the document
    pub index: usize,
    /// Unit identifier
    pub id: String,
    /// Trimmed source markup sent to the provider
    pub source_text: String,
}

/// Collect the units to translate, in document order.
///
/// Units with a blank source are never selected. With `skip_existing`,
/// units whose target already holds text are left alone.
pub fn select_for_translation(document: &XliffDocument, skip_existing: bool) -> Vec<WorkItem> {
    document
        .units()
        .iter()
        .enumerate()
        .filter(|(_, unit)| !unit.source_text().is_empty())
        .filter(|(_, unit)| !(skip_existing && unit.has_existing_target()))
        .map(|(index, unit)| WorkItem {
            index,
            id: unit.id().to_string(),
            source_text: unit.source_text().to_string(),
        })
        .collect()
}

/// Number of units that will not be sent to the provider
pub fn count_already_translated(document: &XliffDocument, skip_existing: bool) -> usize {
    document.len() - select_for_translation(document, skip_existing).len()
}
