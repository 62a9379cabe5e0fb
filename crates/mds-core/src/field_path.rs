use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldPathSegment {
    Key(String),
    Index(usize),
}

/// Location of a value inside a document, rendered as `$.key[0]['odd key']`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldPath {
    segments: Vec<FieldPathSegment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn from_segments(segments: Vec<FieldPathSegment>) -> Self {
        Self { segments }
    }

    pub fn child_key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(FieldPathSegment::Key(key.into()));
        Self { segments }
    }

    pub fn child_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(FieldPathSegment::Index(index));
        Self { segments }
    }

    pub fn segments(&self) -> &[FieldPathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolves the path against `document`; `None` as soon as a parent is missing
    /// or has the wrong kind.
    pub fn lookup<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let mut current = document;
        for segment in &self.segments {
            current = match (segment, current) {
                (FieldPathSegment::Key(key), Value::Object(object)) => object.get(key)?,
                (FieldPathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl Default for FieldPath {
    fn default() -> Self {
        Self::root()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldPathParseError {
    #[error("field path must not be empty")]
    Empty,
    #[error("unexpected end of field path")]
    UnexpectedEnd,
    #[error("invalid index segment")]
    InvalidIndex,
    #[error("invalid key segment")]
    InvalidKey,
    #[error("unterminated quoted key")]
    UnterminatedQuote,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
}

impl std::str::FromStr for FieldPath {
    type Err = FieldPathParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(FieldPathParseError::Empty);
        }

        let mut chars = input.chars().peekable();
        let mut segments = Vec::new();
        if chars.peek() == Some(&'$') {
            chars.next();
        } else {
            segments.push(FieldPathSegment::Key(read_identifier(&mut chars)?));
        }

        while let Some(c) = chars.next() {
            match c {
                '.' => segments.push(FieldPathSegment::Key(read_identifier(&mut chars)?)),
                '[' => {
                    let segment = match chars.peek() {
                        Some('\'') | Some('"') => FieldPathSegment::Key(read_quoted(&mut chars)?),
                        Some(_) => FieldPathSegment::Index(read_index(&mut chars)?),
                        None => return Err(FieldPathParseError::UnexpectedEnd),
                    };
                    match chars.next() {
                        Some(']') => segments.push(segment),
                        Some(other) => return Err(FieldPathParseError::UnexpectedChar(other)),
                        None => return Err(FieldPathParseError::UnexpectedEnd),
                    }
                }
                other => return Err(FieldPathParseError::UnexpectedChar(other)),
            }
        }

        Ok(FieldPath::from_segments(segments))
    }
}

fn read_identifier(chars: &mut Peekable<Chars<'_>>) -> Result<String, FieldPathParseError> {
    let mut key = String::new();
    while let Some(&c) = chars.peek() {
        if !is_identifier_char(c) {
            break;
        }
        key.push(c);
        chars.next();
    }
    if key.is_empty() {
        return match chars.peek() {
            None => Err(FieldPathParseError::UnexpectedEnd),
            Some(_) => Err(FieldPathParseError::InvalidKey),
        };
    }
    Ok(key)
}

fn read_index(chars: &mut Peekable<Chars<'_>>) -> Result<usize, FieldPathParseError> {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits.parse::<usize>().map_err(|_| FieldPathParseError::InvalidIndex)
}

fn read_quoted(chars: &mut Peekable<Chars<'_>>) -> Result<String, FieldPathParseError> {
    let Some(quote) = chars.next() else {
        return Err(FieldPathParseError::UnexpectedEnd);
    };
    let mut key = String::new();
    loop {
        match chars.next() {
            Some('\\') => match chars.next() {
                Some(escaped) => key.push(escaped),
                None => return Err(FieldPathParseError::UnterminatedQuote),
            },
            Some(c) if c == quote => return Ok(key),
            Some(c) => key.push(c),
            None => return Err(FieldPathParseError::UnterminatedQuote),
        }
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(is_identifier_char)
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            match segment {
                FieldPathSegment::Key(key) if is_plain_key(key) => write!(f, ".{key}")?,
                FieldPathSegment::Key(key) => {
                    let escaped = key.replace('\\', "\\\\").replace('\'', "\\'");
                    write!(f, "['{escaped}']")?
                }
                FieldPathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "field_path_test.rs"]
mod tests;
