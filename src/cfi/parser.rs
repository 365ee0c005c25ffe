//! CFI Parser
//!
//! Parses EPUB CFI strings into structured [`Cfi`] values.
//!
//! Grammar (simplified):
//! ```text
//! cfi        = ["#"] "epubcfi(" body ")" | body
//! body       = path | path "," path "," path
//! path       = ["/"] step (("/" | "!" ["/"]) step)* ["!"]
//! step       = number [assertion] [offset]
//! assertion  = "[" text [";" text] "]"
//! offset     = ":" number ["[" text "]"]
//!            | "~" float ["@" float ":" float]
//!            | "@" float ":" float
//! ```
//!
//! The leading `/` of a path group is optional, so `epubcfi(6/4)` reads the
//! same as `epubcfi(/6/4)` and range suffixes may be written `,2/1:1`.
//!
//! The body is first split on top-level commas into one or three path
//! groups, each group is split on top-level `/` and `!` into step tokens,
//! and every token is compiled into a [`Step`] on its own. Separators inside
//! brackets do not count; `^` escapes the next character inside a bracket.

use super::address::Cfi;
use super::error::{CfiError, ParseErrorKind, Result};
use super::types::{Offset, SpatialPoint, Step};

const SCHEME_PREFIX: &str = "epubcfi(";

/// Parse a CFI string into a Cfi
///
/// Accepts `epubcfi(...)`, `#epubcfi(...)` or a bare path.
pub fn parse(input: &str) -> Result<Cfi> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CfiError::invalid(input, ParseErrorKind::Empty));
    }

    let body = unwrap_scheme(input)?;
    let groups = split_top_level(body, &[',']);
    tracing::trace!(groups = groups.len(), "split CFI into path groups");

    match groups.as_slice() {
        [path] => Ok(Cfi::from_steps(parse_steps(path)?)),
        [prefix, start, end] => {
            let prefix = parse_steps(prefix)?;
            let start = parse_range_suffix(start)?;
            let end = parse_range_suffix(end)?;
            Ok(Cfi::from_range_parts(prefix, start, end))
        }
        _ => Err(CfiError::invalid(
            body,
            ParseErrorKind::RangeSeparators(groups.len() - 1),
        )),
    }
}

/// Parse a CFI string, returning None on failure
pub fn try_parse(input: &str) -> Option<Cfi> {
    parse(input).ok()
}

/// Strip the optional fragment marker and `epubcfi(...)` wrapper
fn unwrap_scheme(input: &str) -> Result<&str> {
    let unhashed = input.strip_prefix('#').unwrap_or(input);
    if unhashed.is_empty() {
        return Err(CfiError::invalid(input, ParseErrorKind::Empty));
    }
    match unhashed.strip_prefix(SCHEME_PREFIX) {
        Some(inner) => inner
            .strip_suffix(')')
            .ok_or_else(|| CfiError::invalid(input, ParseErrorKind::MissingClosingParen)),
        None => Ok(unhashed),
    }
}

/// Positions of separator characters that sit outside bracketed assertions
fn top_level_positions(input: &str, separators: &[char]) -> Vec<(usize, char)> {
    let mut positions = Vec::new();
    let mut in_bracket = false;
    let mut escaped = false;

    for (pos, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '^' if in_bracket => escaped = true,
            '[' if !in_bracket => in_bracket = true,
            ']' if in_bracket => in_bracket = false,
            c if !in_bracket && separators.contains(&c) => positions.push((pos, c)),
            _ => {}
        }
    }

    positions
}

fn split_top_level<'a>(input: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (pos, sep) in top_level_positions(input, separators) {
        parts.push(&input[start..pos]);
        start = pos + sep.len_utf8();
    }
    parts.push(&input[start..]);
    parts
}

fn parse_range_suffix(group: &str) -> Result<Vec<Step>> {
    let steps = parse_steps(group)?;
    if steps.is_empty() {
        return Err(CfiError::invalid(group, ParseErrorKind::EmptyRangeSuffix));
    }
    Ok(steps)
}

/// Split a path group into step tokens and compile each one
///
/// A `!` separator marks the step before it as an indirector. It may be
/// followed by `/` or end the group.
pub(crate) fn parse_steps(group: &str) -> Result<Vec<Step>> {
    if group.is_empty() {
        return Ok(Vec::new());
    }

    let body = group.strip_prefix('/').unwrap_or(group);
    let mut steps = Vec::new();
    let mut start = 0;
    let mut after_indirector = false;

    for (pos, sep) in top_level_positions(body, &['/', '!']) {
        let token = &body[start..pos];
        start = pos + 1;

        if token.is_empty() {
            // `!/` is a single boundary
            if sep == '/' && after_indirector {
                after_indirector = false;
                continue;
            }
            return Err(CfiError::invalid(group, ParseErrorKind::EmptyStep));
        }

        let step = compile_step(token)?;
        if sep == '!' {
            let step = step
                .into_indirector()
                .map_err(|_| CfiError::invalid(token, ParseErrorKind::OffsetOnIndirector))?;
            steps.push(step);
            after_indirector = true;
        } else {
            steps.push(step);
            after_indirector = false;
        }
    }

    let tail = &body[start..];
    if !tail.is_empty() {
        steps.push(compile_step(tail)?);
    } else if !after_indirector {
        return Err(CfiError::invalid(group, ParseErrorKind::EmptyStep));
    }

    tracing::trace!(steps = steps.len(), "compiled path group");
    Ok(steps)
}

/// Compile one step token (no separators) into a Step
fn compile_step(token: &str) -> Result<Step> {
    let mut cursor = Cursor::new(token);

    let index = cursor
        .digits()
        .ok_or_else(|| CfiError::invalid(token, ParseErrorKind::ExpectedNumber))?
        .parse::<u32>()
        .map_err(|_| CfiError::invalid(token, ParseErrorKind::IndexOverflow))?;

    let (qualifier, mut text_qualifier) = if cursor.peek() == Some('[') {
        let (qualifier, text) = cursor.assertion(true)?;
        (Some(qualifier), text)
    } else {
        (None, None)
    };

    let offset = match cursor.peek() {
        None => Offset::None,
        Some(':') => {
            cursor.advance();
            let offset = cursor
                .digits()
                .and_then(|d| d.parse::<u32>().ok())
                .ok_or_else(|| {
                    CfiError::invalid(token, ParseErrorKind::InvalidCharacterOffset)
                })?;
            // Trailing assertion form: `:42[text]`
            if cursor.peek() == Some('[') {
                let (text, _) = cursor.assertion(false)?;
                if text_qualifier.is_some() {
                    return Err(CfiError::invalid(
                        token,
                        ParseErrorKind::DuplicateTextQualifier,
                    ));
                }
                text_qualifier = Some(text);
            }
            Offset::Character {
                offset,
                text_qualifier: text_qualifier.take().filter(|t| !t.is_empty()),
            }
        }
        Some('~') => {
            cursor.advance();
            let seconds = cursor.float(ParseErrorKind::InvalidTemporalOffset)?;
            if cursor.skip_if('@') {
                Offset::SpatioTemporal {
                    seconds,
                    point: cursor.point()?,
                }
            } else {
                Offset::Temporal { seconds }
            }
        }
        Some('@') => {
            cursor.advance();
            Offset::Spatial {
                point: cursor.point()?,
            }
        }
        Some(ch) => return Err(CfiError::invalid(token, ParseErrorKind::UnexpectedChar(ch))),
    };

    if let Some(ch) = cursor.peek() {
        return Err(CfiError::invalid(token, ParseErrorKind::UnexpectedChar(ch)));
    }
    if text_qualifier.is_some_and(|t| !t.is_empty()) {
        return Err(CfiError::invalid(token, ParseErrorKind::OrphanTextQualifier));
    }

    Ok(Step::from_parts(index, qualifier, offset, false))
}

/// Cursor over a single step token
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, kind: ParseErrorKind) -> CfiError {
        CfiError::invalid(self.input, kind)
    }

    /// Consume a run of ASCII digits
    fn digits(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance();
        }
        if self.pos == start {
            None
        } else {
            Some(&self.input[start..self.pos])
        }
    }

    /// Parse `digits ["." digits]`
    ///
    /// Digit runs too long for an `f64` are rejected rather than read as
    /// infinity, which could not be written back out.
    fn float(&mut self, kind: ParseErrorKind) -> Result<f64> {
        let start = self.pos;
        self.digits().ok_or_else(|| self.error(kind))?;
        if self.skip_if('.') {
            self.digits().ok_or_else(|| self.error(kind))?;
        }
        self.input[start..self.pos]
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| self.error(kind))
    }

    fn point(&mut self) -> Result<SpatialPoint> {
        let x = self.float(ParseErrorKind::InvalidSpatialOffset)?;
        if !self.skip_if(':') {
            return Err(self.error(ParseErrorKind::InvalidSpatialOffset));
        }
        let y = self.float(ParseErrorKind::InvalidSpatialOffset)?;
        Ok(SpatialPoint::new(x, y))
    }

    /// Parse a bracketed assertion, unescaping `^`
    ///
    /// With `split_text`, the first unescaped `;` separates the qualifier
    /// from the text qualifier.
    fn assertion(&mut self, split_text: bool) -> Result<(String, Option<String>)> {
        self.advance(); // '['
        let mut qualifier = String::new();
        let mut text: Option<String> = None;
        let mut escaped = false;

        while let Some(ch) = self.advance() {
            if escaped {
                text.as_mut().unwrap_or(&mut qualifier).push(ch);
                escaped = false;
                continue;
            }
            match ch {
                '^' => escaped = true,
                ']' => return Ok((qualifier, text)),
                '[' => return Err(self.error(ParseErrorKind::UnexpectedBracket)),
                ';' if split_text && text.is_none() => text = Some(String::new()),
                _ => text.as_mut().unwrap_or(&mut qualifier).push(ch),
            }
        }

        Err(self.error(ParseErrorKind::UnclosedBracket))
    }
}
