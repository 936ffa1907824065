//! Keyval strings
//!
//! Every data line in a Tinbergen file other than plain scalars carries a
//! `key=value key=value ...` payload. This module parses those payloads,
//! retrieves keys from them, and writes them back out.

pub mod accessor;
pub mod parser;
pub mod writer;

pub use accessor::{get_key, ResultMode, Shaped, ValueMode};
pub use parser::{parse_keyvals, parse_many, unescape, KeyvalRecord};
pub use writer::{escape, to_keyval_string};
