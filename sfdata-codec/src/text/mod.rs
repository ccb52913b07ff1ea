//! SfFormat text codec
//!
//! SfFormat is a relaxed, human-writable notation for [`Value`] trees:
//!
//! ```text
//! # player profile
//! name:"Song Li",
//! level:99,
//! tags:[1, 2, 3],
//! stats:{ hp:120, mp:40.5 }
//! ```
//!
//! The top level may omit its braces. Square brackets hold either an array or,
//! when the first element is followed by `:`, an object. Parsing is lenient on
//! truncated input: unterminated strings and brackets end at end of input. The
//! only hard parse error is a key without a following `:`.

mod parser;
mod writer;

use std::fmt;
use std::io;
use std::str::FromStr;

use sfdata_format::{Limits, Result, SfError, Value};

use self::parser::Parser;
use self::writer::Writer;

/// Parse SfFormat text with default [`Limits`]
pub fn parse(text: &str) -> Result<Value> {
    parse_with_limits(text, &Limits::default())
}

/// Parse SfFormat text, bounding nesting depth by `limits`
pub fn parse_with_limits(text: &str, limits: &Limits) -> Result<Value> {
    Parser::new(text, limits).parse()
}

/// Serialize `value` to SfFormat text.
///
/// With `indent` every array element and object pair goes on its own line,
/// four spaces per depth; otherwise tokens are joined on one line. A root
/// object is written without enclosing braces.
pub fn dump(value: &Value, indent: bool) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = Writer::new(&mut out, indent).write_root(value);
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out
}

/// Serialize `value` to SfFormat text straight into an [`io::Write`] sink
pub fn dump_to_writer<W: io::Write>(value: &Value, indent: bool, sink: W) -> Result<()> {
    let mut adapter = IoAdapter {
        inner: sink,
        error: None,
    };
    let outcome = Writer::new(&mut adapter, indent).write_root(value);
    match (outcome, adapter.error) {
        (_, Some(err)) => Err(SfError::Io(err)),
        (Err(_), None) => Err(SfError::Internal("formatter error".to_string())),
        (Ok(()), None) => Ok(()),
    }
}

struct IoAdapter<W: io::Write> {
    inner: W,
    error: Option<io::Error>,
}

impl<W: io::Write> fmt::Write for IoAdapter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.inner.write_all(s.as_bytes()).map_err(|err| {
            self.error = Some(err);
            fmt::Error
        })
    }
}

/// A [`Value`] that formats and parses as SfFormat text
///
/// `Display` renders indented text; the alternate flag (`{:#}`) renders it on
/// one line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(pub Value);

impl Document {
    /// Unwrap the document tree
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Document(value)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&dump(&self.0, !f.alternate()))
    }
}

impl FromStr for Document {
    type Err = SfError;

    fn from_str(s: &str) -> Result<Self> {
        parse(s).map(Document)
    }
}
