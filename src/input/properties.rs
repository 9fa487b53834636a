//! Line-oriented `key=value` resource file reading and editing.

use std::borrow::Cow;
use std::collections::HashMap;

/// Parses resource file text into a key/value table.
///
/// Lines starting with `#` are comments and lines without `=` are ignored.
/// The key is everything before the first `=`, the value everything after it,
/// both trimmed. A later duplicate key overwrites an earlier one.
///
/// # Examples
/// ```
/// use thymeleaf_i18n_language_server::input::properties::parse_properties;
///
/// let entries = parse_properties("# greetings\ngreeting = Hello\nmalformed line\n");
/// assert_eq!(entries.get("greeting"), Some(&"Hello".to_string()));
/// assert_eq!(entries.len(), 1);
/// ```
#[must_use]
pub fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut entries = HashMap::new();

    for line in text.lines() {
        if line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        entries.insert(key.trim().to_string(), value.trim().to_string());
    }

    entries
}

/// Replaces the `key=...` line of `text`, or appends one when the key is absent.
///
/// Every other line is kept byte-for-byte. Matching is by exact `key=` line
/// prefix, so `key = value` style lines are not rewritten. An appended line
/// goes before a trailing newline so the file keeps ending with one. A
/// replaced line keeps its `\r`, and an appended one gets `\r\n` when the
/// text already uses it.
#[must_use]
pub fn upsert_entry(text: &str, key: &str, value: &str) -> String {
    let prefix = format!("{key}=");
    let replacement = format!("{key}={value}");

    let mut found = false;
    let mut lines: Vec<Cow<'_, str>> = text
        .split('\n')
        .map(|line| {
            if line.starts_with(&prefix) {
                found = true;
                let terminator = if line.ends_with('\r') { "\r" } else { "" };
                Cow::Owned(format!("{replacement}{terminator}"))
            } else {
                Cow::Borrowed(line)
            }
        })
        .collect();

    if !found {
        let crlf = text.contains("\r\n");
        if lines.last().is_some_and(|last| last.is_empty()) {
            let position = lines.len() - 1;
            let line = if crlf { format!("{replacement}\r") } else { replacement };
            lines.insert(position, Cow::Owned(line));
        } else {
            if let Some(last) = lines.last_mut().filter(|last| crlf && !last.ends_with('\r')) {
                last.to_mut().push('\r');
            }
            lines.push(Cow::Owned(replacement));
        }
    }

    lines.join("\n")
}
