//! Keyval grammar parser
//!
//! Parses strings of the form `key1=val1 key2="val 2" key3=a,b\,c` into
//! ordered key -> item list records.
//!
//! ```text
//! document  := word '=' value? (whitespace word '=' value?)*
//! word      := quoted | unquoted
//! quoted    := '"' (escape | not('"'))* '"'
//! unquoted  := (escape | not(whitespace | '=' | ','))+
//! escape    := '\' any-character
//! value     := item (',' item)*
//! item      := quoted | (escape | not(whitespace | '=' | ','))*
//! ```
//!
//! The parser is total. Text that does not form a `key=` pair is skipped one
//! character at a time, and a quote with no closing partner is read as an
//! ordinary character.

use serde::{Deserialize, Serialize};

/// The parsed form of one keyval string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyvalRecord {
    /// Keys in order of appearance; duplicates are kept
    pub keys: Vec<String>,
    /// Item lists, parallel to `keys`
    pub values: Vec<Vec<String>>,
}

impl KeyvalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, items: Vec<String>) {
        self.keys.push(key.into());
        self.values.push(items);
    }

    /// Items of the first occurrence of `key`
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|i| self.values[i].as_slice())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.keys
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Vec::as_slice))
    }
}

/// Parse a single keyval string.
pub fn parse_keyvals(text: &str) -> KeyvalRecord {
    let chars: Vec<char> = text.chars().collect();
    let scanner = Scanner { chars: &chars };
    let mut record = KeyvalRecord::new();

    let mut pos = 0;
    while pos < chars.len() {
        match scanner.key_at(pos) {
            Some((key, value_start)) => {
                let (items, end) = scanner.value_at(value_start);
                record.push(key, items);
                pos = end;
            }
            None => pos += 1,
        }
    }
    record
}

/// Parse several keyval strings independently.
pub fn parse_many<I, S>(texts: I) -> Vec<KeyvalRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    texts
        .into_iter()
        .map(|t| parse_keyvals(t.as_ref()))
        .collect()
}

/// Remove backslash escapes: `\x` becomes `x`. A trailing lone backslash is kept.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '=' || c == ','
}

struct Scanner<'a> {
    chars: &'a [char],
}

impl Scanner<'_> {
    fn text(&self, start: usize, end: usize) -> String {
        unescape(&self.chars[start..end].iter().collect::<String>())
    }

    /// End (exclusive, past the closing quote) of a quoted word opening at `start`
    fn quoted_end(&self, start: usize) -> Option<usize> {
        if self.chars.get(start) != Some(&'"') {
            return None;
        }
        let mut i = start + 1;
        while i < self.chars.len() {
            match self.chars[i] {
                '\\' if i + 1 < self.chars.len() => i += 2,
                '"' => return Some(i + 1),
                _ => i += 1,
            }
        }
        None
    }

    /// End of a run of escapes and non-delimiter characters starting at `start`
    fn unquoted_end(&self, start: usize) -> usize {
        let mut i = start;
        while i < self.chars.len() {
            let c = self.chars[i];
            if c == '\\' && i + 1 < self.chars.len() {
                i += 2;
            } else if is_delimiter(c) {
                break;
            } else {
                i += 1;
            }
        }
        i
    }

    fn is_equals(&self, i: usize) -> bool {
        self.chars.get(i) == Some(&'=')
    }

    /// Match `word '='` at `pos`, returning the key and the position after `=`.
    ///
    /// A quoted word not followed by `=` falls back to reading it unquoted,
    /// quotes included: `"a"b=c` has the key `"a"b`, not `a"` with the outer
    /// characters stripped.
    fn key_at(&self, pos: usize) -> Option<(String, usize)> {
        if let Some(end) = self.quoted_end(pos) {
            if self.is_equals(end) {
                return Some((self.text(pos + 1, end - 1), end + 1));
            }
        }
        let end = self.unquoted_end(pos);
        if end > pos && self.is_equals(end) {
            return Some((self.text(pos, end), end + 1));
        }
        None
    }

    /// Read a comma separated item list starting at `pos`.
    fn value_at(&self, pos: usize) -> (Vec<String>, usize) {
        let mut items = Vec::new();
        match self.chars.get(pos) {
            None => return (items, pos),
            Some(&c) if c.is_whitespace() || c == '=' => return (items, pos),
            _ => {}
        }

        let mut i = pos;
        loop {
            if let Some(end) = self.quoted_end(i) {
                items.push(self.text(i + 1, end - 1));
                i = end;
            } else {
                let end = self.unquoted_end(i);
                items.push(self.text(i, end));
                i = end;
            }
            if self.chars.get(i) == Some(&',') {
                i += 1;
            } else {
                break;
            }
        }
        (items, i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_simple_and_quoted_values() {
        let record = parse_keyvals(r#"alpha=one beta="two""#);

        assert_eq!(record.keys, strings(&["alpha", "beta"]));
        assert_eq!(record.values, vec![strings(&["one"]), strings(&["two"])]);
    }

    #[test]
    fn test_quoted_key_lists_and_escaped_comma() {
        let record = parse_keyvals(r#""ga ma"=three,four delta=five\,six epsilon="#);

        assert_eq!(record.keys, strings(&["ga ma", "delta", "epsilon"]));
        assert_eq!(
            record.values,
            vec![strings(&["three", "four"]), strings(&["five,six"]), vec![]]
        );
    }

    #[test]
    fn test_duplicate_keys_first_wins() {
        let record = parse_keyvals("a=1 b=2 a=3");

        assert_eq!(record.len(), 3);
        assert_eq!(record.get("a"), Some(&["1".to_string()][..]));
        assert!(record.get("c").is_none());
    }

    #[test]
    fn test_escaped_whitespace_and_equals() {
        let record = parse_keyvals(r"entry=sym6\ 4 odd\=key=x\\y");

        assert_eq!(record.keys, strings(&["entry", "odd=key"]));
        assert_eq!(record.values, vec![strings(&["sym6 4"]), strings(&[r"x\y"])]);
    }

    #[test]
    fn test_quoted_value_keeps_specials() {
        let record = parse_keyvals(r#"note="a=b, c \"d\"" next=1"#);

        assert_eq!(record.get("note").unwrap(), &[r#"a=b, c "d""#.to_string()][..]);
        assert_eq!(record.get("next").unwrap(), &["1".to_string()][..]);
    }

    #[test]
    fn test_list_edges() {
        let record = parse_keyvals(r#"a=,x b=y, c="p q",r"#);

        assert_eq!(record.get("a").unwrap(), &strings(&["", "x"])[..]);
        assert_eq!(record.get("b").unwrap(), &strings(&["y", ""])[..]);
        assert_eq!(record.get("c").unwrap(), &strings(&["p q", "r"])[..]);
    }

    #[test]
    fn test_malformed_input_is_tolerated() {
        // Unterminated quote reads as a plain character
        let record = parse_keyvals(r#"a="open b=c"#);
        assert_eq!(record.keys, strings(&["a", "b"]));
        assert_eq!(record.values, vec![strings(&["\"open"]), strings(&["c"])]);

        // Stray words without '=' are skipped
        let record = parse_keyvals("junk words k=v ===");
        assert_eq!(record.keys, strings(&["k"]));

        // Nothing parseable at all
        assert!(parse_keyvals("").is_empty());
        assert!(parse_keyvals("\"\\").is_empty());
    }

    #[test]
    fn test_quoted_word_without_equals_falls_back() {
        let record = parse_keyvals(r#""a"b=c"#);
        assert_eq!(record.keys, strings(&["\"a\"b"]));
    }

    #[test]
    fn test_parse_many_is_independent() {
        let records = parse_many(["a=1", "b=\"2", "c=3"]);

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].get("b").unwrap(), &["\"2".to_string()][..]);
        assert_eq!(records[2].keys, strings(&["c"]));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\,b\\c\"), r"a,b\c\");
    }
}
