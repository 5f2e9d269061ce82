/*!
 * XLIFF document handling.
 *
 * - `document`: loading, unit indexing and lossless serialization
 * - `fragment`: validation of inline markup attached to targets
 */

pub mod document;
pub mod fragment;

pub use document::{TranslationUnit, XliffDocument, XliffVersion};
pub use fragment::{ContentKind, is_well_formed_fragment, markup_tags};
