//! SfFormat parser
//!
//! Works on the UTF-8 bytes of the input. Every delimiter is ASCII, so slicing
//! at delimiter positions always lands on a character boundary.

use sfdata_format::{Limits, Result, SfError, Value};

/// Single-use recursive-descent parser over one input string
pub(crate) struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Close {
    /// Top-level body without braces, runs to end of input
    None,
    Brace,
    Bracket,
}

impl Close {
    fn byte(self) -> Option<u8> {
        match self {
            Close::None => None,
            Close::Brace => Some(b'}'),
            Close::Bracket => Some(b']'),
        }
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_separator(b: u8) -> bool {
    is_whitespace(b) || b == b',' || b == b':'
}

fn is_end(b: u8) -> bool {
    b == b']' || b == b'}'
}

impl<'a> Parser<'a> {
    pub(crate) fn new(text: &'a str, limits: &Limits) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            depth: 0,
            max_depth: limits.max_nesting_depth,
        }
    }

    /// Parse the whole document
    pub(crate) fn parse(mut self) -> Result<Value> {
        self.skip_trivia();
        match self.peek() {
            Some(b'{') | Some(b'[') | None => self.parse_value(),
            Some(_) => self.parse_object_body(Close::None),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_trivia(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'#' {
                while matches!(self.peek(), Some(c) if c != b'\n' && c != b'\r') {
                    self.pos += 1;
                }
                self.pos += 1;
            } else {
                break;
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(SfError::LimitExceeded(format!(
                "nesting depth {} exceeds {}",
                self.depth, self.max_depth
            )));
        }
        Ok(())
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_trivia();
        match self.peek() {
            None => Ok(Value::None),
            Some(b'{') => {
                self.pos += 1;
                self.enter()?;
                let value = self.parse_object_body(Close::Brace)?;
                self.depth -= 1;
                Ok(value)
            }
            Some(b'[') => {
                self.pos += 1;
                self.enter()?;
                let value = self.parse_bracket_block()?;
                self.depth -= 1;
                Ok(value)
            }
            Some(b'"') => self.parse_quoted().map(Value::String),
            Some(_) => Ok(self.parse_primitive()),
        }
    }

    /// `[` has been consumed. Decides between array and object by parsing the
    /// first element and looking for a `:` after it.
    fn parse_bracket_block(&mut self) -> Result<Value> {
        self.skip_trivia();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::None);
        }

        let start = self.pos;
        let first = self.parse_value()?;
        self.skip_trivia();

        if self.peek() == Some(b':') {
            self.pos = start;
            return self.parse_object_body(Close::Bracket);
        }

        // The trial value is the first element; carry on from where it ended.
        let mut items = vec![first];
        loop {
            self.skip_trivia();
            match self.peek() {
                None => break,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(b',') => self.pos += 1,
                Some(_) => {}
            }

            self.skip_trivia();
            match self.peek() {
                None => break,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }

            let before = self.pos;
            let value = self.parse_value()?;
            if self.pos == before && !matches!(self.peek(), Some(b',') | Some(b']')) {
                // stray delimiter such as ':' or '}'
                self.pos += 1;
                continue;
            }
            items.push(value);
        }
        Ok(Value::Array(items))
    }

    fn parse_object_body(&mut self, close: Close) -> Result<Value> {
        let mut map = sfdata_format::Map::new();
        loop {
            self.skip_trivia();
            let Some(b) = self.peek() else { break };
            if Some(b) == close.byte() {
                self.pos += 1;
                break;
            }
            if close == Close::None && is_separator(b) && b != b':' {
                break;
            }

            let key = self.parse_key()?;
            self.skip_trivia();
            if self.peek() == Some(b':') {
                self.pos += 1;
            } else {
                return Err(SfError::MalformedPair {
                    key,
                    offset: self.pos,
                });
            }

            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_trivia();
            if self.peek() == Some(b',') {
                self.pos += 1;
            }
        }
        Ok(Value::Object(map))
    }

    fn parse_key(&mut self) -> Result<String> {
        self.skip_trivia();
        if self.peek() == Some(b'"') {
            return self.parse_quoted();
        }

        let start = self.pos;
        while matches!(self.peek(), Some(b) if b != b':' && !is_whitespace(b) && !is_end(b)) {
            self.pos += 1;
        }
        let key = self.text[start..self.pos].to_string();
        while matches!(self.peek(), Some(b) if is_whitespace(b)) {
            self.pos += 1;
        }
        Ok(key)
    }

    /// Opening quote is at `pos`. An unterminated string runs to end of input.
    fn parse_quoted(&mut self) -> Result<String> {
        self.pos += 1;
        let mut out = Vec::new();
        let mut escaped = false;
        while let Some(b) = self.peek() {
            self.pos += 1;
            if escaped {
                out.push(match b {
                    b'n' => b'\n',
                    b't' => b'\t',
                    other => other,
                });
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                break;
            } else {
                out.push(b);
            }
        }
        String::from_utf8(out).map_err(|_| SfError::InvalidUtf8)
    }

    fn parse_primitive(&mut self) -> Value {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if !is_separator(b) && !is_end(b)) {
            self.pos += 1;
        }
        classify(&self.text[start..self.pos])
    }
}

/// Classify a bare token: boolean, then double (must contain `.`), then
/// integer, otherwise string. An empty token is `None`.
pub(crate) fn classify(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::None;
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if raw.contains('.') {
        if let Ok(d) = raw.parse::<f64>() {
            return Value::Double(d);
        }
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    Value::String(raw.to_string())
}
