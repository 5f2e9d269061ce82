/*!
 * Numbered list framing for batch requests.
 *
 * Each text is sent as `"<n>. <text>"`. Further lines of a multi-line text
 * are indented under the first one, so a numbered list inside a text is never
 * read as a new item. The provider is asked to answer in the same format and
 * answers are matched back to items by number.
 */

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static NUMBERED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([ \t]*)(\d{1,6})[.)][ \t]?(.*)$").expect("numbered line pattern is valid")
});

/// Format one item, indenting continuation lines to the item's text column
pub fn format_item(number: usize, text: &str) -> String {
    let mut item = format!("{}. ", number);
    let indent = " ".repeat(item.len());

    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            item.push('\n');
            if !line.trim().is_empty() {
                item.push_str(&indent);
            }
        }
        item.push_str(line);
    }
    item
}

/// Build the user prompt for a batch
pub fn build_prompt(texts: &[String]) -> String {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| format_item(i + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}

// An item being read: its number, the column its text starts at and the text so far
struct OpenItem {
    number: usize,
    column: usize,
    text: String,
    blank_lines: usize,
}

impl OpenItem {
    fn push_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            self.blank_lines += 1;
            return;
        }

        let indent = line
            .chars()
            .take(self.column)
            .take_while(|c| *c == ' ' || *c == '\t')
            .count();
        let content = line[indent..].trim_end();

        if self.text.is_empty() {
            self.text.push_str(content.trim_start());
        } else {
            for _ in 0..=self.blank_lines {
                self.text.push('\n');
            }
            self.text.push_str(content);
        }
        self.blank_lines = 0;
    }

    fn finish(self) -> (usize, String) {
        (self.number, self.text.trim().to_string())
    }
}

/// Split a numbered response into answers keyed by item number.
///
/// Lines before the first numbered line are discarded. Lines indented deeper
/// than the item markers, and unnumbered lines, continue the current item.
/// Item numbers must increase; gaps are allowed and simply leave that number
/// unanswered. A repeated or decreasing number makes the end of the current
/// item unknown, so that item and the rest of the response are dropped.
///
/// A response with no numbered line at all yields one answer per non-empty
/// line, numbered in order.
pub fn parse_response(response: &str) -> BTreeMap<usize, String> {
    let mut answers = BTreeMap::new();
    let mut current: Option<OpenItem> = None;
    let mut marker_indent: Option<usize> = None;
    let mut numbered = false;

    for line in response.lines() {
        if let Some(caps) = NUMBERED_LINE.captures(line) {
            let indent = caps[1].len();
            let number: usize = caps[2].parse().unwrap_or(0);

            if marker_indent.is_none_or(|column| indent <= column) {
                let last = current.as_ref().map_or(0, |item| item.number);
                if number > last {
                    if let Some(item) = current.take() {
                        let (number, text) = item.finish();
                        answers.insert(number, text);
                    }
                    marker_indent.get_or_insert(indent);
                    numbered = true;

                    let column = caps.get(3).map_or(line.len(), |m| m.start());
                    let mut item = OpenItem { number, column, text: String::new(), blank_lines: 0 };
                    item.push_line(&caps[3]);
                    current = Some(item);
                    continue;
                }
                if current.is_some() {
                    warn!(
                        "Item number {} follows item {}; ignoring the response from item {} on",
                        number, last, last
                    );
                    return answers;
                }
            }
        }

        if let Some(item) = current.as_mut() {
            item.push_line(line);
        }
    }

    if let Some(item) = current {
        let (number, text) = item.finish();
        answers.insert(number, text);
    }

    if !numbered {
        return response
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| (i + 1, line.to_string()))
            .collect();
    }

    answers
}
