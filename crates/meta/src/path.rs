//! Path expressions for `PathExtraction` fields
//!
//! Supports the JSONPath subset catalogs actually use: an optional leading
//! `$`, dotted member access (`.name`), quoted member access (`['name']`)
//! and array indexing (`[0]`).

use metamorph_core::{EngineError, EngineResult};
use serde_json::Value;
use std::iter::Peekable;
use std::str::Chars;

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl JsonPath {
    /// Parse a path expression
    pub fn parse(expr: &str) -> EngineResult<Self> {
        let trimmed = expr.trim();
        let mut chars = trimmed.chars().peekable();
        let mut segments = Vec::new();

        if chars.peek() == Some(&'$') {
            chars.next();
        } else if let Some(c) = chars.peek() {
            // Bare leading member, e.g. "color.name"
            if *c != '.' && *c != '[' {
                segments.push(PathSegment::Key(read_ident(&mut chars, expr)?));
            }
        }

        while let Some(c) = chars.next() {
            match c {
                '.' => segments.push(PathSegment::Key(read_ident(&mut chars, expr)?)),
                '[' => segments.push(read_bracket(&mut chars, expr)?),
                other => {
                    return Err(parse_error(
                        expr,
                        format!("unexpected character '{}'", other),
                    ));
                }
            }
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// Walk the path through a document; `None` when any step is absent
    pub fn apply<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(document, |current, segment| match segment {
                PathSegment::Key(key) => current.as_object()?.get(key),
                PathSegment::Index(index) => current.as_array()?.get(*index),
            })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check if the path addresses the whole document
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl std::fmt::Display for JsonPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn read_ident(chars: &mut Peekable<Chars<'_>>, expr: &str) -> EngineResult<String> {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if c == '.' || c == '[' {
            break;
        }
        if c.is_whitespace() || c == ']' {
            return Err(parse_error(
                expr,
                format!("unexpected character '{}' in member name", c),
            ));
        }
        ident.push(c);
        chars.next();
    }
    if ident.is_empty() {
        return Err(parse_error(expr, "empty member name"));
    }
    Ok(ident)
}

fn read_bracket(chars: &mut Peekable<Chars<'_>>, expr: &str) -> EngineResult<PathSegment> {
    match chars.peek().copied() {
        Some(quote @ ('\'' | '"')) => {
            chars.next();
            let mut key = String::new();
            loop {
                match chars.next() {
                    Some(c) if c == quote => break,
                    Some(c) => key.push(c),
                    None => return Err(parse_error(expr, "unterminated quoted member")),
                }
            }
            if chars.next() != Some(']') {
                return Err(parse_error(expr, "expected ']' after quoted member"));
            }
            Ok(PathSegment::Key(key))
        }
        Some(_) => {
            let mut digits = String::new();
            loop {
                match chars.next() {
                    Some(']') => break,
                    Some(c) => digits.push(c),
                    None => return Err(parse_error(expr, "unterminated index")),
                }
            }
            digits
                .trim()
                .parse::<usize>()
                .map(PathSegment::Index)
                .map_err(|_| parse_error(expr, format!("invalid index '{}'", digits)))
        }
        None => Err(parse_error(expr, "unterminated bracket")),
    }
}

fn parse_error(expr: &str, message: impl Into<String>) -> EngineError {
    EngineError::PathExtraction {
        path: expr.to_string(),
        message: message.into(),
    }
}

// ============================================================================
// Tests
// ============================================================================
