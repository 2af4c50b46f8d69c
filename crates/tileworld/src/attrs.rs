//! Typed attribute store: every block, item, mob and player stat sheet is one of these.
//!
//! Text form, one block per object:
//!
//! ```text
//! /begin/
//! # comment
//! prop solid
//! String name village-wall
//! int[] drops-per-level 1 2 3
//! float mob-spawn-chance 0.02
//! LongString img
//!  verbatim lines
//! /end/
//! ```
//!
//! In names and string tokens a space is written as `-`, and an unescaped `-` or `_` reads
//! back as a space. `\` escapes a literal `-`, `_` or `\`; `\e` is the empty string.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};

pub const BEGIN: &str = "/begin/";
pub const END: &str = "/end/";
const COMMENT: char = '#';

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    IntArray(Vec<i64>),
    Str(String),
    StrArray(Vec<String>),
    Float(f64),
    LongText(String),
}

impl Value {
    pub fn tag(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::IntArray(_) => "int[]",
            Value::Str(_) => "String",
            Value::StrArray(_) => "String[]",
            Value::Float(_) => "float",
            Value::LongText(_) => "LongString",
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::IntArray(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StrArray(v)
    }
}

/// Name to typed value, plus a set of presence-only properties.
///
/// A name is never both a variable and a property. `Clone` is a full deep copy; templates are
/// shared behind `Arc<AttrStore>`, which only hands out `&self` reads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttrStore {
    vars: BTreeMap<String, Value>,
    props: BTreeSet<String>,
}

impl AttrStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the stored value.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.value(name).cloned()
    }

    fn value(&self, name: &str) -> Result<&Value> {
        self.vars
            .get(name)
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if self.props.contains(name) {
            return Err(Error::NameConflict(name.to_string()));
        }
        validate_name(name)?;
        match &value {
            Value::Float(f) if !f.is_finite() => {
                return Err(Error::invalid_type(name, "float must be finite"));
            }
            Value::LongText(text) => {
                if text.lines().any(|l| l.trim() == END) {
                    return Err(Error::invalid_type(name, "long text may not contain /end/"));
                }
                let other = self
                    .vars
                    .iter()
                    .any(|(k, v)| k != name && matches!(v, Value::LongText(_)));
                if other {
                    return Err(Error::invalid_type(name, "only one long text per store"));
                }
            }
            _ => {}
        }
        self.vars.insert(name.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Value> {
        self.vars
            .remove(name)
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.props.contains(name)
    }

    pub fn add_property(&mut self, name: &str) -> Result<()> {
        if self.vars.contains_key(name) {
            return Err(Error::NameConflict(name.to_string()));
        }
        validate_name(name)?;
        self.props.insert(name.to_string());
        Ok(())
    }

    pub fn remove_property(&mut self, name: &str) -> bool {
        self.props.remove(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.props.iter().map(|p| p.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.props.is_empty()
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.value(name)? {
            Value::Int(v) => Ok(*v),
            other => Err(wrong_kind(name, "int", other)),
        }
    }

    /// Floats, with ints widened.
    pub fn float(&self, name: &str) -> Result<f64> {
        match self.value(name)? {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => Err(wrong_kind(name, "float", other)),
        }
    }

    pub fn str(&self, name: &str) -> Result<&str> {
        match self.value(name)? {
            Value::Str(v) => Ok(v),
            other => Err(wrong_kind(name, "String", other)),
        }
    }

    pub fn int_array(&self, name: &str) -> Result<Vec<i64>> {
        match self.value(name)? {
            Value::IntArray(v) => Ok(v.clone()),
            other => Err(wrong_kind(name, "int[]", other)),
        }
    }

    pub fn str_array(&self, name: &str) -> Result<Vec<String>> {
        match self.value(name)? {
            Value::StrArray(v) => Ok(v.clone()),
            other => Err(wrong_kind(name, "String[]", other)),
        }
    }

    pub fn long_text(&self, name: &str) -> Result<&str> {
        match self.value(name)? {
            Value::LongText(v) => Ok(v),
            other => Err(wrong_kind(name, "LongString", other)),
        }
    }

    pub fn int_or(&self, name: &str, default: i64) -> Result<i64> {
        if self.has_variable(name) {
            self.int(name)
        } else {
            Ok(default)
        }
    }

    pub fn float_or(&self, name: &str, default: f64) -> Result<f64> {
        if self.has_variable(name) {
            self.float(name)
        } else {
            Ok(default)
        }
    }

    /// Serialize as one `/begin/` .. `/end/` block. Output is sorted so equal stores give equal text.
    pub fn to_block(&self) -> String {
        let mut out = String::new();
        out.push_str(BEGIN);
        out.push('\n');
        for p in &self.props {
            out.push_str("prop ");
            out.push_str(&escape(p));
            out.push('\n');
        }

        let mut long = None;
        for (name, value) in &self.vars {
            let line = match value {
                Value::Int(v) => format!("int {} {v}", escape(name)),
                Value::IntArray(vs) => {
                    let mut s = format!("int[] {}", escape(name));
                    for v in vs {
                        s.push(' ');
                        s.push_str(&v.to_string());
                    }
                    s
                }
                Value::Str(v) => format!("String {} {}", escape(name), escape(v)),
                Value::StrArray(vs) => {
                    let mut s = format!("String[] {}", escape(name));
                    for v in vs {
                        s.push(' ');
                        s.push_str(&escape(v));
                    }
                    s
                }
                Value::Float(v) => format!("float {} {v}", escape(name)),
                Value::LongText(text) => {
                    long = Some((name, text));
                    continue;
                }
            };
            out.push_str(&line);
            out.push('\n');
        }

        // Long text runs up to the block terminator, so it goes last.
        if let Some((name, text)) = long {
            out.push_str("LongString ");
            out.push_str(&escape(name));
            out.push('\n');
            if !text.is_empty() {
                out.push_str(text);
                out.push('\n');
            }
        }
        out.push_str(END);
        out.push('\n');
        out
    }

    /// Parse exactly one block from `text`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = BlockReader::new(text);
        match reader.next_block(None)? {
            Some(store) => Ok(store),
            None => Err(Error::malformed(reader.line_no(), "expected /begin/")),
        }
    }
}

impl fmt::Display for AttrStore {
    /// Human-readable listing, properties first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.props {
            writeln!(f, "{p}")?;
        }
        for (name, value) in &self.vars {
            match value {
                Value::Int(v) => writeln!(f, "{name}: {v}")?,
                Value::Float(v) => writeln!(f, "{name}: {v}")?,
                Value::Str(v) => writeln!(f, "{name}: {v}")?,
                Value::IntArray(vs) => {
                    let parts = vs.iter().map(|v| v.to_string()).collect::<Vec<_>>();
                    writeln!(f, "{name}: {}", parts.join(", "))?
                }
                Value::StrArray(vs) => writeln!(f, "{name}: {}", vs.join(", "))?,
                Value::LongText(v) => writeln!(f, "{name}:\n{v}")?,
            }
        }
        Ok(())
    }
}

fn wrong_kind(name: &str, want: &str, got: &Value) -> Error {
    Error::invalid_type(name, format!("expected {want}, found {}", got.tag()))
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_type(name, "name may not be empty"));
    }
    Ok(())
}

/// Sequential reader over attribute blocks, tracking line numbers for errors.
pub struct BlockReader<'a> {
    lines: std::str::Lines<'a>,
    line_no: usize,
}

impl<'a> BlockReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line_no: 0,
        }
    }

    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Next raw line, untouched.
    pub fn next_line(&mut self) -> Option<&'a str> {
        let line = self.lines.next()?;
        self.line_no += 1;
        Some(line)
    }

    /// Read the next block.
    ///
    /// Blank and comment lines between blocks are skipped. Returns `Ok(None)` at end of input,
    /// or after consuming a line equal to `stop` when one is given.
    pub fn next_block(&mut self, stop: Option<&str>) -> Result<Option<AttrStore>> {
        loop {
            let Some(line) = self.next_line() else {
                return Ok(None);
            };
            let t = line.trim();
            if t.is_empty() || t.starts_with(COMMENT) {
                continue;
            }
            if Some(t) == stop {
                return Ok(None);
            }
            if t != BEGIN {
                return Err(Error::malformed(
                    self.line_no,
                    format!("expected {BEGIN}, found '{t}'"),
                ));
            }
            return self.read_body().map(Some);
        }
    }

    fn read_body(&mut self) -> Result<AttrStore> {
        let mut store = AttrStore::new();
        loop {
            let Some(line) = self.next_line() else {
                return Err(Error::malformed(self.line_no, "missing /end/"));
            };
            let t = line.trim();
            if t.is_empty() || t.starts_with(COMMENT) {
                continue;
            }
            if t == END {
                return Ok(store);
            }

            let line_no = self.line_no;
            let toks = t.split_whitespace().collect::<Vec<_>>();
            let (tag, rest) = (toks[0], &toks[1..]);
            let Some(raw_name) = rest.first() else {
                return Err(Error::malformed(line_no, format!("'{tag}' without a name")));
            };
            let name = unescape(raw_name).map_err(|e| Error::malformed(line_no, e))?;
            let args = &rest[1..];

            let res = match tag {
                "prop" => {
                    expect_args(line_no, tag, args, 0)?;
                    store.add_property(&name)
                }
                "int" => {
                    expect_args(line_no, tag, args, 1)?;
                    let v = parse_int(line_no, args[0])?;
                    store.set(&name, v)
                }
                "int[]" => {
                    let vs = args
                        .iter()
                        .map(|a| parse_int(line_no, a))
                        .collect::<Result<Vec<_>>>()?;
                    store.set(&name, vs)
                }
                "String" => {
                    expect_args(line_no, tag, args, 1)?;
                    let v = unescape(args[0]).map_err(|e| Error::malformed(line_no, e))?;
                    store.set(&name, v)
                }
                "String[]" => {
                    let vs = args
                        .iter()
                        .map(|a| unescape(a))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| Error::malformed(line_no, e))?;
                    store.set(&name, vs)
                }
                "float" | "double" => {
                    expect_args(line_no, tag, args, 1)?;
                    let v = args[0].parse::<f64>().map_err(|_| {
                        Error::malformed(line_no, format!("bad float '{}'", args[0]))
                    })?;
                    store.set(&name, v)
                }
                "LongString" => {
                    expect_args(line_no, tag, args, 0)?;
                    let text = self.read_long_text()?;
                    store.set(&name, Value::LongText(text))?;
                    // The long text consumed the block terminator.
                    return Ok(store);
                }
                other => {
                    return Err(Error::malformed(line_no, format!("unknown type '{other}'")));
                }
            };
            res.map_err(|e| Error::malformed(line_no, e.to_string()))?;
        }
    }

    fn read_long_text(&mut self) -> Result<String> {
        let mut lines = Vec::new();
        loop {
            let Some(line) = self.next_line() else {
                return Err(Error::malformed(self.line_no, "long text missing /end/"));
            };
            if line.trim() == END {
                return Ok(lines.join("\n"));
            }
            lines.push(line);
        }
    }
}

fn expect_args(line: usize, tag: &str, args: &[&str], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(Error::malformed(
            line,
            format!("'{tag}' takes {n} value(s), found {}", args.len()),
        ));
    }
    Ok(())
}

fn parse_int(line: usize, s: &str) -> Result<i64> {
    s.parse::<i64>()
        .map_err(|_| Error::malformed(line, format!("bad int '{s}'")))
}

/// Encode a name or string as one whitespace-free token.
pub fn escape(s: &str) -> String {
    if s.is_empty() {
        return "\\e".to_string();
    }
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ' ' => out.push('-'),
            '-' => out.push_str("\\-"),
            '_' => out.push_str("\\_"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_whitespace() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape`]; also reads plain `-` and `_` as spaces.
pub fn unescape(tok: &str) -> Result<String, String> {
    if tok == "\\e" {
        return Ok(String::new());
    }
    let mut out = String::with_capacity(tok.len());
    let mut it = tok.chars();
    while let Some(c) = it.next() {
        match c {
            '-' | '_' => out.push(' '),
            '\\' => match it.next() {
                Some(e @ ('-' | '_' | '\\')) => out.push(e),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('u') => {
                    if it.next() != Some('{') {
                        return Err(format!("bad unicode escape in '{tok}'"));
                    }
                    let hex = it.by_ref().take_while(|c| *c != '}').collect::<String>();
                    let ch = u32::from_str_radix(&hex, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| format!("bad unicode escape in '{tok}'"))?;
                    out.push(ch);
                }
                _ => return Err(format!("bad escape in '{tok}'")),
            },
            c => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AttrStore {
        let mut s = AttrStore::new();
        s.set("name", "village wall").unwrap();
        s.set("health", 12).unwrap();
        s.set("mob spawn chance", 0.025).unwrap();
        s.set("drops", vec!["rat tail".to_string(), String::new(), "a-b_c\\d".to_string()])
            .unwrap();
        s.set("levels", vec![1i64, -2, 3]).unwrap();
        s.set("empty", Vec::<i64>::new()).unwrap();
        s.set("img", Value::LongText("  /\\_/\\\n ( o.o )\n# not a comment".into()))
            .unwrap();
        s.add_property("solid").unwrap();
        s.add_property("wild thing").unwrap();
        s
    }

    #[test]
    fn block_round_trips() {
        let s = sample();
        let text = s.to_block();
        let back = AttrStore::parse(&text).unwrap();
        assert_eq!(back, s);
        assert_eq!(back.to_block(), text);
    }

    #[test]
    fn dashes_and_underscores_read_as_spaces() {
        let s = AttrStore::parse(
            "# header\n/begin/\n  String name rat_tail\n  String[] spawns big-rat\n  double mob-spawn-chance 0.5\n/end/\n",
        )
        .unwrap();
        assert_eq!(s.str("name").unwrap(), "rat tail");
        assert_eq!(s.str_array("spawns").unwrap(), vec!["big rat".to_string()]);
        assert_eq!(s.float("mob spawn chance").unwrap(), 0.5);
    }

    #[test]
    fn variables_and_properties_never_share_a_name() {
        let mut s = AttrStore::new();
        s.add_property("solid").unwrap();
        assert!(matches!(s.set("solid", 1), Err(Error::NameConflict(_))));
        s.set("speed", 3).unwrap();
        assert!(matches!(s.add_property("speed"), Err(Error::NameConflict(_))));
    }

    #[test]
    fn lookups_and_types() {
        let mut s = sample();
        assert!(matches!(s.get("nope"), Err(Error::UnknownAttribute(_))));
        assert!(matches!(s.remove("nope"), Err(Error::UnknownAttribute(_))));
        assert!(matches!(s.int("name"), Err(Error::InvalidType { .. })));
        assert!(matches!(s.set("bad", f64::NAN), Err(Error::InvalidType { .. })));
        assert!(matches!(
            s.set("img2", Value::LongText("x".into())),
            Err(Error::InvalidType { .. })
        ));
        assert_eq!(s.float("health").unwrap(), 12.0);
        assert_eq!(s.remove("health").unwrap(), Value::Int(12));
        assert!(!s.has_variable("health"));
    }

    #[test]
    fn array_reads_are_copies() {
        let s = sample();
        let mut a = s.int_array("levels").unwrap();
        a[0] = 99;
        assert_eq!(s.int_array("levels").unwrap()[0], 1);

        let mut c = s.clone();
        c.set("levels", vec![7i64]).unwrap();
        assert_eq!(s.int_array("levels").unwrap(), vec![1, -2, 3]);
    }

    #[test]
    fn malformed_blocks_report_line_numbers() {
        let err = AttrStore::parse("/begin/\nint speed fast\n/end/\n").unwrap_err();
        assert!(matches!(err, Error::MalformedConfig { line: 2, .. }));

        let err = AttrStore::parse("/begin/\nint speed 3\n").unwrap_err();
        assert!(matches!(err, Error::MalformedConfig { .. }));

        let err = AttrStore::parse("/begin/\nweird speed 3\n/end/\n").unwrap_err();
        assert!(matches!(err, Error::MalformedConfig { line: 2, .. }));
    }

    #[test]
    fn reader_stops_at_sentinel() {
        let text = "/begin/\nint a 1\n/end/\n/stop/\n/begin/\nint b 2\n/end/\n";
        let mut r = BlockReader::new(text);
        assert!(r.next_block(Some("/stop/")).unwrap().is_some());
        assert!(r.next_block(Some("/stop/")).unwrap().is_none());
        let b = r.next_block(None).unwrap().unwrap();
        assert_eq!(b.int("b").unwrap(), 2);
        assert!(r.next_block(None).unwrap().is_none());
    }
}
