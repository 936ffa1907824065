//! Keyval writer
//!
//! Renders a [`KeyvalRecord`] back to a keyval string that
//! [`parse_keyvals`](super::parse_keyvals) reads to the same record.

use super::parser::KeyvalRecord;
use std::fmt;

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_whitespace() || matches!(c, '=' | ',' | '\\' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Escape one key or list item.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(&mut out, text);
    out
}

/// Render a record as `key=item,item key=item ...`.
///
/// An empty item list renders as `key=`; a single empty item renders as
/// `key=""` so it is not read back as an empty list.
pub fn to_keyval_string(record: &KeyvalRecord) -> String {
    let mut out = String::new();
    for (i, (key, items)) in record.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        if key.is_empty() {
            out.push_str("\"\"");
        } else {
            escape_into(&mut out, key);
        }
        out.push('=');
        if let [only] = items {
            if only.is_empty() {
                out.push_str("\"\"");
                continue;
            }
        }
        for (j, item) in items.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            escape_into(&mut out, item);
        }
    }
    out
}

impl fmt::Display for KeyvalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_keyval_string(self))
    }
}
