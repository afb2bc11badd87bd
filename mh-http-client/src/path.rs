//! Path queries over parsed response documents
//!
//! A [`JsonPath`] is either parsed from a string such as
//! `$.tabs.items.subtabs[0].items.categories` or assembled with the builder
//! methods. Builder keys are taken verbatim, so values like session ids never
//! need quoting.
//!
//! Supported segments:
//!
//! - `.name` and `['name']` / `["name"]` select an object field
//! - `[N]` selects an array element, negative `N` counts from the end
//! - `.*` and `[*]` select every array element or object value
//! - `[?(@.field == literal)]` keeps elements whose `field` equals the literal
//!   (quoted string, number, `true`, `false` or `null`)

use crate::error::ExtractError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(i64),
    Wildcard,
    Filter { field: String, equals: Value },
}

/// A compiled path expression
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

/// What a caller accepts when a path is expected to resolve to a list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rows {
    /// A present but empty list is a valid, zero-length result
    AllowEmpty,
    /// The list must hold at least one row
    NonEmpty,
}

impl JsonPath {
    /// The document root, `$`
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Append an object field selector
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(name.into()));
        self
    }

    /// Append an array index selector
    pub fn index(mut self, index: i64) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    /// Append a wildcard selector
    pub fn wildcard(mut self) -> Self {
        self.segments.push(Segment::Wildcard);
        self
    }

    /// Append a `[?(@.field == value)]` filter
    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.segments.push(Segment::Filter {
            field: field.into(),
            equals: value.into(),
        });
        self
    }

    /// Evaluate against a document, returning every match in document order
    pub fn select<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![document];

        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                match (segment, node) {
                    (Segment::Key(name), Value::Object(map)) => next.extend(map.get(name)),
                    (Segment::Index(index), Value::Array(items)) => {
                        let resolved = if *index < 0 {
                            items.len() as i64 + index
                        } else {
                            *index
                        };
                        if let Ok(position) = usize::try_from(resolved) {
                            next.extend(items.get(position));
                        }
                    }
                    (Segment::Wildcard, Value::Array(items)) => next.extend(items.iter()),
                    (Segment::Wildcard, Value::Object(map)) => next.extend(map.values()),
                    (Segment::Filter { field, equals }, Value::Array(items)) => next.extend(
                        items
                            .iter()
                            .filter(|item| item.get(field.as_str()) == Some(equals)),
                    ),
                    (Segment::Filter { field, equals }, Value::Object(map)) => next.extend(
                        map.values()
                            .filter(|item| item.get(field.as_str()) == Some(equals)),
                    ),
                    _ => {}
                }
            }

            if next.is_empty() {
                return next;
            }
            current = next;
        }

        current
    }
}

/// Resolve a path that must match exactly one value
pub fn extract_one<'a>(document: &'a Value, path: &JsonPath) -> Result<&'a Value, ExtractError> {
    let mut matches = path.select(document);
    match matches.len() {
        0 => Err(ExtractError::NotFound {
            path: path.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        n => Err(ExtractError::Ambiguous {
            path: path.to_string(),
            matches: n,
        }),
    }
}

/// Resolve a path that must match at least one value
pub fn extract_all<'a>(
    document: &'a Value,
    path: &JsonPath,
) -> Result<Vec<&'a Value>, ExtractError> {
    let matches = path.select(document);
    if matches.is_empty() {
        return Err(ExtractError::NotFound {
            path: path.to_string(),
        });
    }
    Ok(matches)
}

/// Resolve a path that must point at exactly one list
///
/// An absent list is always [`ExtractError::NotFound`]; whether an empty list
/// is acceptable is decided by `rows`.
pub fn extract_rows<'a>(
    document: &'a Value,
    path: &JsonPath,
    rows: Rows,
) -> Result<&'a [Value], ExtractError> {
    let items = extract_one(document, path)?
        .as_array()
        .ok_or_else(|| ExtractError::NotAList {
            path: path.to_string(),
        })?;

    if items.is_empty() && rows == Rows::NonEmpty {
        return Err(ExtractError::EmptyCollection {
            path: path.to_string(),
        });
    }
    Ok(items)
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            match segment {
                Segment::Key(name) if is_identifier(name) => write!(f, ".{name}")?,
                Segment::Key(name) => write!(f, "[{}]", quote(name))?,
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Wildcard => write!(f, "[*]")?,
                Segment::Filter { field, equals } => {
                    let literal = match equals {
                        Value::String(text) => quote(text),
                        other => other.to_string(),
                    };
                    write!(f, "[?(@.{field} == {literal})]")?
                }
            }
        }
        Ok(())
    }
}

impl FromStr for JsonPath {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::new(s).parse()
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_identifier_char)
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn quote(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<JsonPath, ExtractError> {
        self.skip_whitespace();
        if !self.eat('$') {
            return Err(self.error("must start with `$`"));
        }

        let mut segments = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.pos += 1;
                    if self.eat('*') {
                        segments.push(Segment::Wildcard);
                    } else {
                        let name = self.identifier();
                        if name.is_empty() {
                            return Err(self.error("expected a field name after `.`"));
                        }
                        segments.push(Segment::Key(name));
                    }
                }
                '[' => {
                    self.pos += 1;
                    segments.push(self.bracket()?);
                }
                other => return Err(self.error(format!("unexpected `{other}`"))),
            }
        }

        Ok(JsonPath { segments })
    }

    fn bracket(&mut self) -> Result<Segment, ExtractError> {
        self.skip_whitespace();
        let segment = match self.peek() {
            Some('*') => {
                self.pos += 1;
                Segment::Wildcard
            }
            Some('\'' | '"') => Segment::Key(self.quoted()?),
            Some('?') => {
                self.pos += 1;
                self.filter()?
            }
            Some(c) if c == '-' || c.is_ascii_digit() => Segment::Index(self.integer()?),
            _ => return Err(self.error("expected an index, name, `*` or filter inside `[]`")),
        };

        self.skip_whitespace();
        if !self.eat(']') {
            return Err(self.error("missing `]`"));
        }
        Ok(segment)
    }

    fn filter(&mut self) -> Result<Segment, ExtractError> {
        self.skip_whitespace();
        if !self.eat('(') {
            return Err(self.error("expected `(` after `?`"));
        }
        self.skip_whitespace();
        if !(self.eat('@') && self.eat('.')) {
            return Err(self.error("filters must start with `@.`"));
        }
        let field = self.identifier();
        if field.is_empty() {
            return Err(self.error("expected a field name in filter"));
        }
        self.skip_whitespace();
        if !(self.eat('=') && self.eat('=')) {
            return Err(self.error("only `==` filters are supported"));
        }
        self.skip_whitespace();
        let equals = self.literal()?;
        self.skip_whitespace();
        if !self.eat(')') {
            return Err(self.error("missing `)` in filter"));
        }
        Ok(Segment::Filter { field, equals })
    }

    fn literal(&mut self) -> Result<Value, ExtractError> {
        match self.peek() {
            Some('\'' | '"') => Ok(Value::String(self.quoted()?)),
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
                {
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                match serde_json::from_str::<Value>(&text) {
                    Ok(number @ Value::Number(_)) => Ok(number),
                    _ => Err(self.error(format!("invalid number `{text}`"))),
                }
            }
            _ => match self.identifier().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                other => Err(self.error(format!("invalid literal `{other}`"))),
            },
        }
    }

    fn quoted(&mut self) -> Result<String, ExtractError> {
        let quote = self.chars[self.pos];
        self.pos += 1;

        let mut out = String::new();
        loop {
            match self.next() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => match self.next() {
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn integer(&mut self) -> Result<i64, ExtractError> {
        let start = self.pos;
        self.eat('-');
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map_err(|_| self.error(format!("invalid index `{text}`")))
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_identifier_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, reason: impl Into<String>) -> ExtractError {
        ExtractError::InvalidPath {
            path: self.input.to_string(),
            reason: format!("{} at position {}", reason.into(), self.pos),
        }
    }
}
