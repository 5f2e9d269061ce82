/*!
 * Prompt framing for batch translation.
 *
 * This module provides:
 * - `numbered`: the numbered-list request format and its response parser
 */

pub mod numbered;

pub use numbered::{build_prompt, format_item, parse_response};
