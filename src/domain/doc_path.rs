use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// One navigation step of a document path expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathStep {
    Key(String),
    Index(usize),
    Wildcard,
}

/// Parsed document path (`paths.'/user'.post.security.httpTestScheme[0][0]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocPath {
    steps: Vec<PathStep>,
}

impl DocPath {
    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    /// Parses a dotted/bracketed expression.
    ///
    /// An empty expression or `$` addresses the root; a leading `$.` is ignored.
    pub fn parse(input: &str) -> Result<Self, DocPathError> {
        let mut cursor = 0;
        if input.starts_with('$') {
            cursor = 1;
            if input.len() > 1 && !matches!(input.as_bytes()[1], b'.' | b'[') {
                return Err(DocPathError::new(
                    input,
                    1,
                    "expected `.` or `[` after `$`".to_string(),
                ));
            }
        }

        let bytes = input.as_bytes();
        let mut steps = Vec::new();
        let mut expect_key = cursor == 0;
        let mut after_dot = false;

        while cursor < bytes.len() {
            match bytes[cursor] {
                b'[' if !after_dot => {
                    let (step, next) = parse_bracket(input, cursor)?;
                    steps.push(step);
                    cursor = next;
                    expect_key = false;
                }
                b'.' if !expect_key => {
                    cursor += 1;
                    if cursor >= bytes.len() {
                        return Err(DocPathError::new(
                            input,
                            cursor,
                            "path cannot end with `.`".to_string(),
                        ));
                    }
                    expect_key = true;
                    after_dot = true;
                }
                _ if expect_key => {
                    let (key, next) = parse_key(input, cursor)?;
                    steps.push(PathStep::Key(key));
                    cursor = next;
                    expect_key = false;
                    after_dot = false;
                }
                other => {
                    return Err(DocPathError::new(
                        input,
                        cursor,
                        format!("unexpected `{}`", other as char),
                    ));
                }
            }
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Path made of the first `len` steps.
    pub fn prefix(&self, len: usize) -> DocPath {
        Self {
            steps: self.steps[..len.min(self.steps.len())].to_vec(),
        }
    }
}

fn parse_bracket(input: &str, start: usize) -> Result<(PathStep, usize), DocPathError> {
    let bytes = input.as_bytes();
    let mut cursor = start + 1;
    if cursor >= bytes.len() {
        return Err(DocPathError::new(
            input,
            cursor,
            "path cannot end inside `[`".to_string(),
        ));
    }

    if bytes[cursor] == b'*' {
        cursor += 1;
        if cursor >= bytes.len() || bytes[cursor] != b']' {
            return Err(DocPathError::new(
                input,
                cursor,
                "expected `]` after `*`".to_string(),
            ));
        }
        return Ok((PathStep::Wildcard, cursor + 1));
    }

    if matches!(bytes[cursor], b'\'' | b'"') {
        let (key, next) = parse_quoted(input, cursor)?;
        if next >= bytes.len() || bytes[next] != b']' {
            return Err(DocPathError::new(
                input,
                next,
                "expected `]` after quoted key".to_string(),
            ));
        }
        return Ok((PathStep::Key(key), next + 1));
    }

    let index_start = cursor;
    while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
        cursor += 1;
    }
    if index_start == cursor {
        return Err(DocPathError::new(
            input,
            cursor,
            "expected numeric index, `*` or quoted key".to_string(),
        ));
    }
    if cursor >= bytes.len() || bytes[cursor] != b']' {
        return Err(DocPathError::new(
            input,
            cursor,
            "expected `]`".to_string(),
        ));
    }
    let index = input[index_start..cursor]
        .parse::<usize>()
        .map_err(|error| DocPathError::new(input, index_start, format!("invalid index: {error}")))?;
    Ok((PathStep::Index(index), cursor + 1))
}

fn parse_key(input: &str, start: usize) -> Result<(String, usize), DocPathError> {
    let bytes = input.as_bytes();
    if matches!(bytes[start], b'\'' | b'"') {
        return parse_quoted(input, start);
    }

    let mut cursor = start;
    while cursor < bytes.len() && is_plain_key_byte(bytes[cursor]) {
        cursor += 1;
    }
    if cursor == start {
        return Err(DocPathError::new(
            input,
            start,
            format!("expected key, found `{}`", bytes[start] as char),
        ));
    }
    Ok((input[start..cursor].to_string(), cursor))
}

fn parse_quoted(input: &str, start: usize) -> Result<(String, usize), DocPathError> {
    let quote = input.as_bytes()[start] as char;
    let mut key = String::new();
    let mut escaped = false;
    for (offset, ch) in input[start + 1..].char_indices() {
        if escaped {
            key.push(ch);
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if ch == quote {
            return Ok((key, start + 1 + offset + ch.len_utf8()));
        }
        key.push(ch);
    }
    Err(DocPathError::new(
        input,
        start,
        "unterminated quoted key".to_string(),
    ))
}

fn is_plain_key_byte(byte: u8) -> bool {
    !matches!(byte, b'.' | b'[' | b']' | b'\'' | b'"') && !byte.is_ascii_whitespace()
}

fn needs_quotes(key: &str, leading: bool) -> bool {
    key.is_empty() || (leading && key.starts_with('$')) || !key.bytes().all(is_plain_key_byte)
}

impl fmt::Display for DocPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return formatter.write_str("$");
        }
        for (position, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Key(key) => {
                    if position > 0 {
                        formatter.write_str(".")?;
                    }
                    if needs_quotes(key, position == 0) {
                        let escaped = key.replace('\\', "\\\\").replace('\'', "\\'");
                        write!(formatter, "'{escaped}'")?;
                    } else {
                        formatter.write_str(key)?;
                    }
                }
                PathStep::Index(index) => write!(formatter, "[{index}]")?,
                PathStep::Wildcard => formatter.write_str("[*]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for DocPath {
    type Err = DocPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DocPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid path expression `{input}` at byte {offset}: {reason}")]
pub struct DocPathError {
    input: String,
    offset: usize,
    reason: String,
}

impl DocPathError {
    fn new(input: &str, offset: usize, reason: String) -> Self {
        Self {
            input: input.to_string(),
            offset,
            reason,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}
