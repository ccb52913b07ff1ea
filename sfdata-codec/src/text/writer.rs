//! SfFormat serializer

use std::fmt::{self, Write};

use sfdata_format::Value;

const INDENT: &str = "    ";

/// Depth-first pretty printer writing into any [`fmt::Write`] sink
pub(crate) struct Writer<'w, W: Write> {
    out: &'w mut W,
    indent: bool,
}

impl<'w, W: Write> Writer<'w, W> {
    pub(crate) fn new(out: &'w mut W, indent: bool) -> Self {
        Self { out, indent }
    }

    /// Write `value` as a document root
    pub(crate) fn write_root(&mut self, value: &Value) -> fmt::Result {
        match value {
            Value::Object(map) => {
                for (i, (key, child)) in map.iter().enumerate() {
                    if i > 0 {
                        self.out.write_char(',')?;
                        self.out.write_str(if self.indent { "\n" } else { "" })?;
                    }
                    write_key(self.out, key)?;
                    self.out.write_char(':')?;
                    self.write_value(child, 0)?;
                }
                Ok(())
            }
            other => self.write_value(other, 0),
        }
    }

    fn newline(&mut self, depth: usize) -> fmt::Result {
        if self.indent {
            self.out.write_char('\n')?;
            for _ in 0..depth {
                self.out.write_str(INDENT)?;
            }
            Ok(())
        } else {
            self.out.write_char(' ')
        }
    }

    fn write_value(&mut self, value: &Value, depth: usize) -> fmt::Result {
        match value {
            Value::None => Ok(()),
            Value::Boolean(b) => self.out.write_str(if *b { "true" } else { "false" }),
            Value::Int(i) => write!(self.out, "{i}"),
            Value::Double(d) => write_double(self.out, *d),
            Value::String(s) => write_string(self.out, s),
            Value::Array(items) => {
                self.out.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.write_char(',')?;
                    }
                    self.newline(depth + 1)?;
                    self.write_value(item, depth + 1)?;
                }
                if !items.is_empty() {
                    self.newline(depth)?;
                }
                self.out.write_char(']')
            }
            Value::Object(map) => {
                self.out.write_char('{')?;
                for (i, (key, child)) in map.iter().enumerate() {
                    if i > 0 {
                        self.out.write_char(',')?;
                    }
                    if self.indent {
                        self.newline(depth + 1)?;
                    }
                    write_key(self.out, key)?;
                    self.out.write_char(':')?;
                    self.write_value(child, depth + 1)?;
                }
                if self.indent && !map.is_empty() {
                    self.newline(depth)?;
                }
                self.out.write_char('}')
            }
        }
    }
}

fn write_double<W: Write>(out: &mut W, d: f64) -> fmt::Result {
    let start = format!("{d}");
    out.write_str(&start)?;
    if d.is_finite() && !start.contains('.') {
        out.write_str(".0")?;
    }
    Ok(())
}

/// True if a bare token would not read back as the same string
pub(crate) fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.chars().any(|c| {
            c.is_whitespace() || matches!(c, ':' | ',' | '[' | ']' | '{' | '}' | '"' | '#' | '\\')
        })
        || s.eq_ignore_ascii_case("true")
        || s.eq_ignore_ascii_case("false")
        || s.parse::<f64>().is_ok()
}

fn write_string<W: Write>(out: &mut W, s: &str) -> fmt::Result {
    if needs_quotes(s) {
        write_escaped(out, s)
    } else {
        out.write_str(s)
    }
}

fn write_key<W: Write>(out: &mut W, key: &str) -> fmt::Result {
    let bare_ok = !key.is_empty()
        && !key.chars().any(|c| {
            c.is_whitespace() || matches!(c, ':' | ',' | '[' | ']' | '{' | '}' | '"' | '#' | '\\')
        });
    if bare_ok {
        out.write_str(key)
    } else {
        write_escaped(out, key)
    }
}

fn write_escaped<W: Write>(out: &mut W, s: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\t' => out.write_str("\\t")?,
            other => out.write_char(other)?,
        }
    }
    out.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(value: &Value, indent: bool) -> String {
        let mut out = String::new();
        Writer::new(&mut out, indent).write_root(value).unwrap();
        out
    }

    #[test]
    fn test_quote_rules() {
        for s in ["", "a b", "x:y", "1", "2.5", "TRUE", "false", "#tag", "say \"hi\"", "inf"] {
            assert!(needs_quotes(s), "{s:?} should be quoted");
        }
        for s in ["Song", "hello_world", "v1.2.3", "truthy", "-"] {
            assert!(!needs_quotes(s), "{s:?} should stay bare");
        }
    }

    #[test]
    fn test_double_keeps_decimal_point() {
        assert_eq!(render(&Value::Double(3.0), true), "3.0");
        assert_eq!(render(&Value::Double(-0.25), true), "-0.25");
    }

    #[test]
    fn test_escapes() {
        assert_eq!(render(&Value::from("a\"b\\c\nd\te"), true), r#""a\"b\\c\nd\te""#);
    }

    #[test]
    fn test_nested_layout() {
        let mut root = Value::None;
        root.set("name", "Song").unwrap();
        root.entry_mut("stats").unwrap().set("hp", 10).unwrap();
        root.set("tags", vec![Value::Int(1), Value::Int(2)]).unwrap();

        let expected = "name:Song,\nstats:{\n    hp:10\n},\ntags:[\n    1,\n    2\n]";
        assert_eq!(render(&root, true), expected);
        assert_eq!(render(&root, false), "name:Song,stats:{hp:10},tags:[ 1, 2 ]");
    }

    #[test]
    fn test_root_array_and_nested_object() {
        let mut inner = Value::None;
        inner.set("k", true).unwrap();
        let root = Value::Array(vec![inner]);
        assert_eq!(render(&root, true), "[\n    {\n        k:true\n    }\n]");
    }
}
