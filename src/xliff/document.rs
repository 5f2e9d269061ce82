/*!
 * XLIFF document model.
 *
 * A document keeps the original text and records, for every translation
 * unit, the byte ranges of its `<source>` content and of its target slot.
 * Serialization splices modified target content back into the original, so
 * every byte outside a replaced target is reproduced exactly.
 */

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use super::fragment::{ContentKind, check_well_formed, to_element_content};
use crate::errors::DocumentError;

const UTF8_BOM: char = '\u{feff}';

/// XLIFF dialect detected from the unit containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XliffVersion {
    /// `<file>/<body>/<trans-unit>` layout
    V1,
    /// `<file>/<unit>/<segment>` layout
    V2,
}

/// Location of a unit's target content in the original text
#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetSlot {
    /// `<target ...>content</target>`, range of the inner content
    Content { start: usize, end: usize },
    /// `<target .../>`, range of the whole tag
    SelfClosing {
        start: usize,
        end: usize,
        open_tag: String,
        qname: String,
    },
    /// No target element; one is inserted right after `</source>`
    Missing {
        insert_at: usize,
        separator: String,
        qname: String,
    },
}

/// A translatable segment of the document
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    id: String,
    position: usize,
    source: String,
    target: Option<String>,
    slot: TargetSlot,
    modified: bool,
}

impl TranslationUnit {
    /// Stable identifier, unique within the document
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 1-based position of the unit in document order
    pub fn position(&self) -> usize {
        self.position
    }

    /// Inner markup of `<source>`, trimmed
    pub fn source_text(&self) -> &str {
        self.source.trim()
    }

    /// Inner markup of `<target>`, trimmed; empty when there is no target element
    pub fn target_text(&self) -> &str {
        self.target.as_deref().map(str::trim).unwrap_or("")
    }

    /// Whether the unit has a `<target>` element at all
    pub fn has_target_element(&self) -> bool {
        !matches!(self.slot, TargetSlot::Missing { .. }) || self.modified
    }

    /// Whether the target holds non-blank content
    pub fn has_existing_target(&self) -> bool {
        !self.target_text().is_empty()
    }

    /// Whether the target was replaced since the document was loaded
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Replace the target content.
    ///
    /// Well-formed fragments are attached verbatim, anything else is escaped
    /// and stored as plain text. Never fails.
    pub fn set_text(&mut self, text: &str) -> ContentKind {
        let (content, kind) = to_element_content(text);
        if kind == ContentKind::PlainText {
            debug!("Unit '{}': translation is not well-formed markup, storing as plain text", self.id);
        }
        self.target = Some(content);
        self.modified = true;
        kind
    }
}

/// An XLIFF document with its translation units in file order
#[derive(Debug, Clone)]
pub struct XliffDocument {
    original: String,
    has_bom: bool,
    version: XliffVersion,
    source_language: Option<String>,
    target_language: Option<String>,
    units: Vec<TranslationUnit>,
}

/// Per-unit bookkeeping while the parser walks a unit container
#[derive(Default)]
struct UnitBuilder {
    depth: usize,
    id: Option<String>,
    source_start: Option<usize>,
    source: Option<(usize, usize)>,
    source_after: usize,
    source_separator: String,
    target_qname: String,
    target_start: Option<usize>,
    target: Option<TargetSlot>,
}

fn attribute(e: &BytesStart, local: &[u8]) -> Result<Option<String>, DocumentError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| DocumentError::Format(format!("bad attribute: {}", err)))?;
        if attr.key.local_name().as_ref() == local {
            let value = attr
                .unescape_value()
                .map_err(|err| DocumentError::Format(format!("bad attribute value: {}", err)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Name of a sibling element using the same namespace prefix as `e`
fn sibling_qname(e: &BytesStart, local: &str) -> String {
    match e.name().prefix() {
        Some(prefix) => format!("{}:{}", String::from_utf8_lossy(prefix.as_ref()), local),
        None => local.to_string(),
    }
}

/// Whitespace that precedes a new line holding an element starting at `tag_start`.
///
/// Elements sharing a line with other content get no separator at all.
fn line_separator(text: &str, tag_start: usize) -> String {
    let before = &text[..tag_start];
    let Some(newline) = before.rfind('\n') else {
        return String::new();
    };
    let indent = &before[newline + 1..];
    if !indent.chars().all(|c| c == ' ' || c == '\t') {
        return String::new();
    }
    let line_break = if before[..newline].ends_with('\r') { "\r\n" } else { "\n" };
    format!("{}{}", line_break, indent)
}

fn tag_start_before(text: &str, after: usize) -> usize {
    text[..after].rfind('<').unwrap_or(0)
}

impl XliffDocument {
    /// Load a document from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(DocumentError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(DocumentError::Io(e)),
        };
        let text = String::from_utf8(bytes).map_err(|e| {
            DocumentError::Format(format!("{} is not valid UTF-8: {}", path.display(), e))
        })?;

        let document = Self::parse(&text)?;
        debug!(
            "Loaded {} translation units from {}",
            document.units.len(),
            path.display()
        );
        Ok(document)
    }

    /// Parse a document held in memory
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let (has_bom, body) = match text.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        check_well_formed(body, false).map_err(DocumentError::Format)?;

        let mut document = XliffDocument {
            original: body.to_string(),
            has_bom,
            version: XliffVersion::V1,
            source_language: None,
            target_language: None,
            units: Vec::new(),
        };
        document.index_units()?;
        Ok(document)
    }

    fn index_units(&mut self) -> Result<(), DocumentError> {
        let text = self.original.as_str();
        let mut reader = Reader::from_str(text);
        reader.trim_text(false);
        reader.check_end_names(true);

        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut builder: Option<UnitBuilder> = None;
        let mut unit_id: Option<String> = None;
        let mut segments_in_unit = 0usize;
        let mut seen_ids = HashSet::new();
        let mut units = Vec::new();
        let mut saw_root = false;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| DocumentError::Format(format!("{} (at byte {})", e, reader.buffer_position())))?;
            let after = reader.buffer_position();

            match event {
                Event::Start(e) => {
                    let local = e.local_name().as_ref().to_vec();

                    if !saw_root {
                        saw_root = true;
                        if local != b"xliff" {
                            return Err(DocumentError::Format(format!(
                                "root element is <{}>, expected <xliff>",
                                String::from_utf8_lossy(&local)
                            )));
                        }
                        self.source_language = attribute(&e, b"srcLang")?;
                        self.target_language = attribute(&e, b"trgLang")?;
                        if matches!(attribute(&e, b"version")?.as_deref(), Some(v) if v.starts_with('2')) {
                            self.version = XliffVersion::V2;
                        }
                    }

                    match local.as_slice() {
                        b"file" => {
                            if let Some(lang) = attribute(&e, b"source-language")? {
                                self.source_language.get_or_insert(lang);
                            }
                            if let Some(lang) = attribute(&e, b"target-language")? {
                                self.target_language.get_or_insert(lang);
                            }
                        }
                        b"unit" if builder.is_none() => {
                            unit_id = attribute(&e, b"id")?;
                            segments_in_unit = 0;
                        }
                        _ => {}
                    }

                    let is_container = local == b"trans-unit" || local == b"segment";
                    if builder.is_none() && is_container {
                        let id = match attribute(&e, b"id")? {
                            Some(id) => Some(id),
                            None if local == b"segment" => unit_id.as_ref().map(|uid| {
                                if segments_in_unit == 0 {
                                    uid.clone()
                                } else {
                                    format!("{}#{}", uid, segments_in_unit + 1)
                                }
                            }),
                            None => None,
                        };
                        if local == b"segment" {
                            self.version = XliffVersion::V2;
                            segments_in_unit += 1;
                        }
                        builder = Some(UnitBuilder {
                            depth: stack.len(),
                            id,
                            ..UnitBuilder::default()
                        });
                    } else if let Some(b) = builder.as_mut() {
                        if stack.len() == b.depth + 1 {
                            if local == b"source" && b.source_start.is_none() {
                                let tag_start = tag_start_before(text, after);
                                b.source_start = Some(after);
                                b.source_separator = line_separator(text, tag_start);
                                b.target_qname = sibling_qname(&e, "target");
                            } else if local == b"target" && b.target.is_none() && b.target_start.is_none() {
                                b.target_start = Some(after);
                            }
                        }
                    }

                    stack.push(local);
                }
                Event::End(e) => {
                    stack.pop();
                    let local = e.local_name();
                    let local = local.as_ref();

                    if let Some(b) = builder.as_mut() {
                        if stack.len() == b.depth + 1 {
                            let content_end = text[..after].rfind("</").unwrap_or(after);
                            if local == b"source" && b.source.is_none() {
                                if let Some(start) = b.source_start {
                                    b.source = Some((start, content_end));
                                    b.source_after = after;
                                }
                            } else if local == b"target" && b.target.is_none() {
                                if let Some(start) = b.target_start.take() {
                                    b.target = Some(TargetSlot::Content { start, end: content_end });
                                }
                            }
                        } else if stack.len() == b.depth {
                            if let Some(b) = builder.take() {
                                if let Some(unit) = Self::finish_unit(text, b, units.len() + 1, &mut seen_ids) {
                                    units.push(unit);
                                }
                            }
                        }
                    } else if local == b"unit" {
                        unit_id = None;
                    }
                }
                Event::Empty(e) => {
                    if !saw_root {
                        saw_root = true;
                        if e.local_name().as_ref() != b"xliff" {
                            return Err(DocumentError::Format("root element is not <xliff>".to_string()));
                        }
                        continue;
                    }
                    if let Some(b) = builder.as_mut() {
                        if stack.len() == b.depth + 1 {
                            let local = e.local_name();
                            let tag_start = tag_start_before(text, after);
                            if local.as_ref() == b"source" && b.source.is_none() {
                                b.source = Some((after, after));
                                b.source_after = after;
                                b.source_separator = line_separator(text, tag_start);
                                b.target_qname = sibling_qname(&e, "target");
                            } else if local.as_ref() == b"target" && b.target.is_none() {
                                let open_tag = text[tag_start..after]
                                    .trim_end_matches('>')
                                    .trim_end_matches('/')
                                    .trim_end()
                                    .to_string();
                                b.target = Some(TargetSlot::SelfClosing {
                                    start: tag_start,
                                    end: after,
                                    open_tag,
                                    qname: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                                });
                            }
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(DocumentError::Format("document has no <xliff> root element".to_string()));
        }

        self.units = units;
        Ok(())
    }

    fn finish_unit(
        text: &str,
        b: UnitBuilder,
        position: usize,
        seen_ids: &mut HashSet<String>,
    ) -> Option<TranslationUnit> {
        let (source_start, source_end) = b.source?;

        let mut id = b.id.unwrap_or_else(|| position.to_string());
        if !seen_ids.insert(id.clone()) {
            id = format!("{}#{}", id, position);
            seen_ids.insert(id.clone());
        }

        let slot = b.target.unwrap_or(TargetSlot::Missing {
            insert_at: b.source_after,
            separator: b.source_separator,
            qname: b.target_qname,
        });
        let target = match &slot {
            TargetSlot::Content { start, end } => Some(text[*start..*end].to_string()),
            TargetSlot::SelfClosing { .. } => Some(String::new()),
            TargetSlot::Missing { .. } => None,
        };

        Some(TranslationUnit {
            id,
            position,
            source: text[source_start..source_end].to_string(),
            target,
            slot,
            modified: false,
        })
    }

    /// Detected XLIFF dialect
    pub fn version(&self) -> XliffVersion {
        self.version
    }

    /// Declared source language, if any
    pub fn source_language(&self) -> Option<&str> {
        self.source_language.as_deref()
    }

    /// Declared target language, if any
    pub fn target_language(&self) -> Option<&str> {
        self.target_language.as_deref()
    }

    /// All translation units in document order
    pub fn units(&self) -> &[TranslationUnit] {
        &self.units
    }

    pub fn unit(&self, index: usize) -> Option<&TranslationUnit> {
        self.units.get(index)
    }

    pub fn unit_mut(&mut self, index: usize) -> Option<&mut TranslationUnit> {
        self.units.get_mut(index)
    }

    /// Look up a unit by its identifier
    pub fn find(&self, id: &str) -> Option<&TranslationUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Number of units whose target was replaced since loading
    pub fn modified_count(&self) -> usize {
        self.units.iter().filter(|u| u.modified).count()
    }

    /// Serialize the document, splicing modified targets into the original text.
    ///
    /// The output is re-validated; a failure here means a target slot was
    /// computed wrongly and is reported as a format error.
    pub fn serialize(&self) -> Result<Vec<u8>, DocumentError> {
        let original = self.original.as_str();
        let mut out = String::with_capacity(original.len() + 64 * self.modified_count() + 3);
        if self.has_bom {
            out.push(UTF8_BOM);
        }

        let mut cursor = 0;
        for unit in self.units.iter().filter(|u| u.modified) {
            let content = unit.target.as_deref().unwrap_or("");
            match &unit.slot {
                TargetSlot::Content { start, end } => {
                    out.push_str(&original[cursor..*start]);
                    out.push_str(content);
                    cursor = *end;
                }
                TargetSlot::SelfClosing { start, end, open_tag, qname } => {
                    out.push_str(&original[cursor..*start]);
                    out.push_str(open_tag);
                    out.push('>');
                    out.push_str(content);
                    out.push_str("</");
                    out.push_str(qname);
                    out.push('>');
                    cursor = *end;
                }
                TargetSlot::Missing { insert_at, separator, qname } => {
                    out.push_str(&original[cursor..*insert_at]);
                    out.push_str(separator);
                    out.push('<');
                    out.push_str(qname);
                    out.push('>');
                    out.push_str(content);
                    out.push_str("</");
                    out.push_str(qname);
                    out.push('>');
                    cursor = *insert_at;
                }
            }
        }
        out.push_str(&original[cursor..]);

        let body = out.strip_prefix(UTF8_BOM).unwrap_or(&out);
        check_well_formed(body, false)
            .map_err(|e| DocumentError::Format(format!("serialized document is not well-formed: {}", e)))?;

        Ok(out.into_bytes())
    }
}
