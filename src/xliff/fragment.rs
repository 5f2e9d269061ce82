/*!
 * Inline markup handling for translation unit content.
 *
 * Provider output is untrusted: it is attached as structured content only
 * when it parses as a well-formed XML fragment, otherwise it is escaped and
 * stored as plain text so nothing is ever dropped.
 */

use quick_xml::Reader;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;

/// Wrapper element used to parse a fragment that may have several top-level nodes
const FRAGMENT_WRAPPER: &str = "xliffwai-fragment";

/// How a piece of text was attached to a target element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// The text was a well-formed fragment and is kept as markup
    Markup,
    /// The text was not well-formed and has been escaped
    PlainText,
}

/// Check that `text` is a well-formed XML document (or fragment, when wrapped).
///
/// quick-xml verifies matching end tags but tolerates unclosed elements at EOF
/// and only parses attributes on demand, so element depth, names and
/// attributes are checked here as well. With `check_entities` every text node
/// and attribute value is unescaped, which rejects entity references XML does
/// not predefine.
pub(crate) fn check_well_formed(text: &str, check_entities: bool) -> Result<(), String> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(false);
    reader.check_end_names(true);

    let mut depth: usize = 0;
    let mut roots: usize = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                check_element(&e, check_entities)
                    .map_err(|msg| format!("{} (at byte {})", msg, reader.buffer_position()))?;
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                check_element(&e, check_entities)
                    .map_err(|msg| format!("{} (at byte {})", msg, reader.buffer_position()))?;
                if depth == 0 {
                    roots += 1;
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(t)) => {
                if check_entities {
                    t.unescape().map_err(|e| {
                        format!("invalid character reference at byte {}: {}", reader.buffer_position(), e)
                    })?;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!("{} (at byte {})", e, reader.buffer_position()));
            }
        }
    }

    if depth != 0 {
        return Err(format!("{} element(s) left unclosed at end of input", depth));
    }
    if roots != 1 {
        return Err(format!("expected exactly one root element, found {}", roots));
    }

    Ok(())
}

// Element name and attribute syntax, which the reader does not validate
fn check_element(element: &BytesStart<'_>, check_entities: bool) -> Result<(), String> {
    let name = element.name();
    if !is_xml_name(name.as_ref()) {
        return Err(format!("invalid element name '{}'", String::from_utf8_lossy(name.as_ref())));
    }

    let mut attributes = element.attributes();
    attributes.with_checks(true);
    for attribute in attributes {
        let attribute = attribute.map_err(|e| format!("invalid attribute: {}", e))?;
        let key = attribute.key;
        if !is_xml_name(key.as_ref()) {
            return Err(format!("invalid attribute name '{}'", String::from_utf8_lossy(key.as_ref())));
        }
        if attribute.value.contains(&b'<') {
            return Err(format!("'<' in value of attribute '{}'", String::from_utf8_lossy(key.as_ref())));
        }
        if check_entities {
            attribute.unescape_value().map_err(|e| {
                format!("invalid reference in attribute '{}': {}", String::from_utf8_lossy(key.as_ref()), e)
            })?;
        }
    }

    Ok(())
}

fn is_xml_name(name: &[u8]) -> bool {
    let Ok(name) = std::str::from_utf8(name) else {
        return false;
    };
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.' | '\u{B7}'))
}

/// Check whether `text` can be attached as element content without breaking the document
pub fn is_well_formed_fragment(text: &str) -> bool {
    let wrapped = format!("<{0}>{1}</{0}>", FRAGMENT_WRAPPER, text);
    check_well_formed(&wrapped, true).is_ok()
}

/// Convert provider output into target element content.
///
/// Well-formed fragments are kept verbatim; anything else is escaped so the
/// text round-trips as character data.
pub fn to_element_content(text: &str) -> (String, ContentKind) {
    if is_well_formed_fragment(text) {
        (text.to_string(), ContentKind::Markup)
    } else {
        (partial_escape(text).into_owned(), ContentKind::PlainText)
    }
}

/// Count the inline elements of a fragment by qualified name.
///
/// Returns an empty map for text that is not a well-formed fragment.
pub fn markup_tags(text: &str) -> BTreeMap<String, usize> {
    let mut tags = BTreeMap::new();
    if !is_well_formed_fragment(text) {
        return tags;
    }

    let mut reader = Reader::from_str(text);
    reader.trim_text(false);
    reader.check_end_names(false);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                *tags.entry(name).or_insert(0) += 1;
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }

    tags
}
