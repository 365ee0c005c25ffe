//! The CFI address value
//!
//! A [`Cfi`] is either a single path or a range. A range stores the shared
//! prefix in `components` plus two non-empty divergent suffixes, so it
//! logically denotes the two paths `components + start` and
//! `components + end`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use super::error::{CfiError, CompositionError, Result};
use super::parser;
use super::types::Step;

/// A complete EPUB CFI
///
/// Format: `epubcfi(/6/4[chap01ref]!/4/2/22/3:268)`, or for a range
/// `epubcfi(/6/4!/4/10,/2/1:1,/3:4)`.
///
/// Moving out with [`std::mem::take`] leaves an empty, valid address behind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cfi {
    /// The whole path, or the shared prefix of a range
    components: Vec<Step>,
    /// Divergent suffixes, present only for ranges
    range: Option<RangeSuffixes>,
}

/// The two divergent halves of a range. Both are non-empty.
#[derive(Debug, Clone, PartialEq)]
struct RangeSuffixes {
    start: Vec<Step>,
    end: Vec<Step>,
}

impl Cfi {
    /// Create an empty CFI
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a CFI from a single path of steps
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            components: steps,
            range: None,
        }
    }

    /// Parse a CFI string (see [`parser::parse`])
    pub fn parse(input: &str) -> Result<Self> {
        parser::parse(input)
    }

    /// Assemble a range from already validated parts
    pub(crate) fn from_range_parts(prefix: Vec<Step>, start: Vec<Step>, end: Vec<Step>) -> Self {
        debug_assert!(!start.is_empty() && !end.is_empty());
        Self {
            components: prefix,
            range: Some(RangeSuffixes { start, end }),
        }
    }

    /// Combine a base path and two full endpoint paths into a range
    ///
    /// Both endpoints must start with every step of `base` and extend past
    /// it. The shared prefix of the result is exactly `base`.
    pub fn from_range(base: &Cfi, start: &Cfi, end: &Cfi) -> Result<Self> {
        if base.is_range() || start.is_range() || end.is_range() {
            return Err(CompositionError::NestedRange.into());
        }

        let prefix = &base.components;
        let suffix_of = |endpoint: &Cfi| -> Result<Vec<Step>> {
            if !endpoint.components.starts_with(prefix) {
                return Err(CompositionError::PrefixMismatch(endpoint.to_string()).into());
            }
            let suffix = endpoint.components[prefix.len()..].to_vec();
            if suffix.is_empty() {
                return Err(CompositionError::EmptySuffix.into());
            }
            Ok(suffix)
        };

        let start = suffix_of(start)?;
        let end = suffix_of(end)?;
        Ok(Self::from_range_parts(prefix.clone(), start, end))
    }

    /// Build a range between two locations, deriving the longest shared prefix
    ///
    /// The prefix stops one step short of either endpoint so both suffixes
    /// stay non-empty.
    pub fn range_between(start: &Cfi, end: &Cfi) -> Result<Self> {
        if start.is_range() || end.is_range() {
            return Err(CompositionError::NestedRange.into());
        }
        if start.components.is_empty() || end.components.is_empty() {
            return Err(CompositionError::EmptySuffix.into());
        }

        let common = start
            .components
            .iter()
            .zip(end.components.iter())
            .take_while(|(a, b)| a == b)
            .count()
            .min(start.components.len() - 1)
            .min(end.components.len() - 1);

        Ok(Self::from_range_parts(
            start.components[..common].to_vec(),
            start.components[common..].to_vec(),
            end.components[common..].to_vec(),
        ))
    }

    /// Check if this CFI represents a range (text selection)
    pub fn is_range(&self) -> bool {
        self.range.is_some()
    }

    /// Check if this CFI addresses nothing at all
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.range.is_none()
    }

    /// Reset to the empty CFI
    pub fn clear(&mut self) {
        self.components.clear();
        self.range = None;
    }

    /// The path, or the shared prefix of a range
    pub fn components(&self) -> &[Step] {
        &self.components
    }

    /// Start suffix of a range; empty for a single path
    pub fn range_start(&self) -> &[Step] {
        self.range
            .as_ref()
            .map(|r| r.start.as_slice())
            .unwrap_or_default()
    }

    /// End suffix of a range; empty for a single path
    pub fn range_end(&self) -> &[Step] {
        self.range
            .as_ref()
            .map(|r| r.end.as_slice())
            .unwrap_or_default()
    }

    /// The full start location (prefix + start suffix), or a copy of a path
    pub fn start(&self) -> Cfi {
        Self::from_steps([self.components(), self.range_start()].concat())
    }

    /// The full end location (prefix + end suffix), or a copy of a path
    pub fn end(&self) -> Cfi {
        Self::from_steps([self.components(), self.range_end()].concat())
    }

    /// Number of addressable steps
    ///
    /// For a range this is the shared prefix plus the longer suffix, which is
    /// the index space [`Cfi::sub_cfi`] walks.
    pub fn total_components(&self) -> usize {
        self.components.len()
            + self
                .range
                .as_ref()
                .map_or(0, |r| r.start.len().max(r.end.len()))
    }

    /// The steps from `from_index` onward
    ///
    /// Indices past [`Cfi::total_components`] yield an empty CFI. On a range,
    /// an index inside the shared prefix keeps the range. Past the prefix both
    /// suffixes are trimmed together; once one runs out only the other
    /// remains, as a single path.
    pub fn sub_cfi(&self, from_index: usize) -> Cfi {
        let Some(range) = &self.range else {
            return Self::from_steps(
                self.components
                    .get(from_index..)
                    .map(<[Step]>::to_vec)
                    .unwrap_or_default(),
            );
        };

        let prefix_len = self.components.len();
        if from_index <= prefix_len {
            return Self {
                components: self.components[from_index..].to_vec(),
                range: Some(range.clone()),
            };
        }

        let skip = from_index - prefix_len;
        let start = range.start.get(skip..).unwrap_or_default();
        let end = range.end.get(skip..).unwrap_or_default();
        match (start.is_empty(), end.is_empty()) {
            (false, false) => Self::from_range_parts(Vec::new(), start.to_vec(), end.to_vec()),
            (false, true) => Self::from_steps(start.to_vec()),
            (true, false) => Self::from_steps(end.to_vec()),
            (true, true) => Self::new(),
        }
    }

    /// Replace this CFI with the parse of `input`
    ///
    /// On failure `self` is left untouched.
    pub fn assign(&mut self, input: &str) -> Result<&mut Self> {
        *self = parser::parse(input)?;
        Ok(self)
    }

    /// Extend the path with the steps of `other`
    ///
    /// Used to continue an address across a document boundary; the caller
    /// makes sure `self` ends with the matching indirector step. Fails,
    /// leaving both operands unchanged, if either one is a range.
    pub fn append(&mut self, other: &Cfi) -> Result<&mut Self> {
        if self.is_range() {
            return Err(CompositionError::AppendToRange.into());
        }
        if other.is_range() {
            return Err(CompositionError::AppendRange.into());
        }
        self.components.extend(other.components.iter().cloned());
        Ok(self)
    }

    /// Parse `input` and append it
    pub fn append_str(&mut self, input: &str) -> Result<&mut Self> {
        let other = parser::parse(input)?;
        self.append(&other)
    }

    /// Non-mutating [`Cfi::append`]
    pub fn join(&self, other: &Cfi) -> Result<Cfi> {
        let mut joined = self.clone();
        joined.append(other)?;
        Ok(joined)
    }

    /// Compare against text, propagating parse failures
    ///
    /// `==` against a string treats malformed text as unequal instead.
    pub fn try_eq_str(&self, input: &str) -> Result<bool> {
        Ok(parser::parse(input)? == *self)
    }

    /// The path text without the `epubcfi(...)` wrapper
    pub fn path_string(&self) -> String {
        let mut out = String::new();
        write_steps(&mut out, &self.components);
        if let Some(ref range) = self.range {
            out.push(',');
            write_steps(&mut out, &range.start);
            out.push(',');
            write_steps(&mut out, &range.end);
        }
        out
    }

    /// Path text for a slice of the components, clamped to the valid range
    pub fn steps_to_string(&self, steps: Range<usize>) -> String {
        let end = steps.end.min(self.components.len());
        let start = steps.start.min(end);
        let mut out = String::new();
        write_steps(&mut out, &self.components[start..end]);
        out
    }

    /// Get the spine index if this CFI references a spine item
    ///
    /// Standard EPUB CFIs start with `/6/N`, where `/6` is the spine element
    /// of the package document and `N = 2 * (spine_index + 1)`.
    pub fn spine_index(&self) -> Option<u32> {
        match self.components.as_slice() {
            [spine, item, ..] if spine.index() == 6 => Some((item.index() / 2).saturating_sub(1)),
            _ => None,
        }
    }
}

fn write_steps(out: &mut String, steps: &[Step]) {
    use std::fmt::Write;
    for step in steps {
        // Writing into a String cannot fail
        let _ = write!(out, "{}", step);
    }
}

impl fmt::Display for Cfi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epubcfi({})", self.path_string())
    }
}

impl FromStr for Cfi {
    type Err = CfiError;

    fn from_str(s: &str) -> Result<Self> {
        parser::parse(s)
    }
}

impl TryFrom<&str> for Cfi {
    type Error = CfiError;

    fn try_from(s: &str) -> Result<Self> {
        parser::parse(s)
    }
}

// Text equality: malformed text never equals a CFI

impl PartialEq<str> for Cfi {
    fn eq(&self, other: &str) -> bool {
        parser::parse(other).is_ok_and(|parsed| parsed == *self)
    }
}

impl PartialEq<&str> for Cfi {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

impl PartialEq<String> for Cfi {
    fn eq(&self, other: &String) -> bool {
        *self == *other.as_str()
    }
}

impl PartialEq<Cfi> for str {
    fn eq(&self, other: &Cfi) -> bool {
        *other == *self
    }
}

impl PartialEq<Cfi> for &str {
    fn eq(&self, other: &Cfi) -> bool {
        *other == **self
    }
}

impl Serialize for Cfi {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cfi {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parser::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfi::types::Offset;

    fn cfi(s: &str) -> Cfi {
        Cfi::parse(s).unwrap()
    }

    #[test]
    fn test_simple_cfi_display() {
        let cfi = Cfi::from_steps(vec![
            Step::new(6),
            Step::new(4).into_indirector().unwrap(),
            Step::new(4),
            Step::new(2),
        ]);

        assert_eq!(cfi.to_string(), "epubcfi(/6/4!/4/2)");
        assert_eq!(cfi.path_string(), "/6/4!/4/2");
    }

    #[test]
    fn test_cfi_with_character_offset() {
        let cfi = Cfi::from_steps(vec![
            Step::new(6),
            Step::with_id(4, "chap01"),
            Step::new(10).with_offset(Offset::character(5)).unwrap(),
        ]);
        assert_eq!(cfi.to_string(), "epubcfi(/6/4[chap01]/10:5)");
    }

    #[test]
    fn test_empty_cfi() {
        let empty = Cfi::new();
        assert!(empty.is_empty());
        assert!(!empty.is_range());
        assert_eq!(empty.total_components(), 0);
        assert_eq!(empty.to_string(), "epubcfi()");
        assert_eq!(cfi("epubcfi()"), empty);
    }

    #[test]
    fn test_clear_resets_range() {
        let mut range = cfi("epubcfi(/6/4,/2,/4)");
        range.clear();
        assert!(range.is_empty());
        assert!(!range.is_range());
    }

    #[test]
    fn test_take_leaves_empty() {
        let mut source = cfi("epubcfi(/6/4!/4)");
        let moved = std::mem::take(&mut source);
        assert!(source.is_empty());
        assert_eq!(moved.total_components(), 3);
    }

    #[test]
    fn test_from_range() {
        let base = cfi("/6/4!/4/10");
        let start = cfi("/6/4!/4/10/2/1:1");
        let end = cfi("/6/4!/4/10/3:4");

        let range = Cfi::from_range(&base, &start, &end).unwrap();
        assert!(range.is_range());
        assert_eq!(range.components(), base.components());
        assert_eq!(range.start(), start);
        assert_eq!(range.end(), end);
        assert_eq!(range.to_string(), "epubcfi(/6/4!/4/10,/2/1:1,/3:4)");
    }

    #[test]
    fn test_from_range_rejects_bad_operands() {
        let base = cfi("/6/4");
        let ranged = cfi("/6/4,/2,/4");

        let err = Cfi::from_range(&ranged, &base, &base).unwrap_err();
        assert_eq!(err, CfiError::Composition(CompositionError::NestedRange));

        let err = Cfi::from_range(&base, &cfi("/6/6/2"), &cfi("/6/4/2")).unwrap_err();
        assert!(matches!(
            err,
            CfiError::Composition(CompositionError::PrefixMismatch(_))
        ));

        let err = Cfi::from_range(&base, &base, &cfi("/6/4/2")).unwrap_err();
        assert_eq!(err, CfiError::Composition(CompositionError::EmptySuffix));
    }

    #[test]
    fn test_range_between_derives_prefix() {
        let range = Cfi::range_between(&cfi("/6/4!/4/2/1:3"), &cfi("/6/4!/4/6/1:9")).unwrap();
        assert_eq!(range.to_string(), "epubcfi(/6/4!/4,/2/1:3,/6/1:9)");

        // Identical endpoints still keep one step per suffix
        let point = cfi("/6/4/2");
        let range = Cfi::range_between(&point, &point).unwrap();
        assert_eq!(range.components().len(), 2);
        assert_eq!(range.range_start(), &[Step::new(2)]);
    }

    #[test]
    fn test_append() {
        let mut package = cfi("epubcfi(/6/4[chap01]!)");
        let content = cfi("epubcfi(/4/10:5)");
        package.append(&content).unwrap();

        assert_eq!(package.to_string(), "epubcfi(/6/4[chap01]!/4/10:5)");
        assert!(!package.is_range());
    }

    #[test]
    fn test_append_str_and_join() {
        let base = cfi("/6/4!");
        let joined = base.join(&cfi("/2")).unwrap();
        assert_eq!(joined, "epubcfi(/6/4!/2)");
        assert_eq!(base.total_components(), 2);

        let mut grown = base.clone();
        grown.append_str("/2/1:3").unwrap().append_str("/5").unwrap();
        assert_eq!(grown.total_components(), 5);

        assert!(grown.append_str("/x").is_err());
        assert_eq!(grown.total_components(), 5);
    }

    #[test]
    fn test_append_rejects_ranges() {
        let mut single = cfi("/6/4!");
        let mut ranged = cfi("/6/4!/4,/2,/6");

        let err = single.append(&ranged).unwrap_err();
        assert_eq!(err, CfiError::Composition(CompositionError::AppendRange));
        assert_eq!(single, cfi("/6/4!"));

        let err = ranged.append(&single).unwrap_err();
        assert_eq!(err, CfiError::Composition(CompositionError::AppendToRange));
        assert_eq!(ranged, cfi("/6/4!/4,/2,/6"));
    }

    #[test]
    fn test_sub_cfi() {
        let full = cfi("epubcfi(/6/4!/4/10)");
        assert_eq!(full.sub_cfi(2), cfi("/4/10"));
        assert_eq!(full.sub_cfi(0), full);
        assert!(full.sub_cfi(4).is_empty());
        assert!(full.sub_cfi(9).is_empty());
    }

    #[test]
    fn test_sub_cfi_on_range() {
        // prefix 2, start 3, end 1 => 5 addressable steps
        let range = cfi("/6/4!,/4/2/1:3,/6");
        assert_eq!(range.total_components(), 5);

        let inside = range.sub_cfi(1);
        assert!(inside.is_range());
        assert_eq!(inside.to_string(), "epubcfi(/4!,/4/2/1:3,/6)");

        let at_prefix_end = range.sub_cfi(2);
        assert!(at_prefix_end.is_range());
        assert!(at_prefix_end.components().is_empty());
        assert_eq!(at_prefix_end.total_components(), 3);

        let past = range.sub_cfi(3);
        assert!(!past.is_range());
        assert_eq!(past, cfi("/2/1:3"));

        assert!(range.sub_cfi(5).is_empty());
        assert!(range.sub_cfi(6).is_empty());
    }

    #[test]
    fn test_sub_cfi_on_range_keeps_both_suffixes() {
        let range = cfi("/6,/4/2/1,/8/2");
        let sub = range.sub_cfi(2);
        assert!(sub.is_range());
        assert_eq!(sub.range_start(), cfi("/2/1").components());
        assert_eq!(sub.range_end(), cfi("/2").components());
        assert!(range.sub_cfi(3).total_components() == 1);
    }

    #[test]
    fn test_assign() {
        let mut target = cfi("/6/4");
        target.assign("epubcfi(/6/8!/2)").unwrap();
        assert_eq!(target, cfi("/6/8!/2"));

        let err = target.assign("epubcfi(/6/x)").unwrap_err();
        assert!(err.parse_kind().is_some());
        assert_eq!(target, cfi("/6/8!/2"));
    }

    #[test]
    fn test_text_equality() {
        let value = cfi("epubcfi(/6/4[chap01]/10:5)");
        assert!(value == "epubcfi(/6/4[chap01]/10:5)");
        assert!(value == "/6/4[chap01]/10:5");
        assert!("epubcfi(/6/4[chap01]/10:5)" == value);
        assert!(value != "epubcfi(/6/4/10:5)");
        assert!(value == String::from("/6/4[chap01]/10:5"));
    }

    #[test]
    fn test_text_equality_with_malformed_text() {
        let value = cfi("epubcfi(/6/4)");
        assert!(value != "epubcfi(/6/a)");
        assert!(value.try_eq_str("epubcfi(/6/a)").is_err());
        assert!(value.try_eq_str("epubcfi(/6/4)").unwrap());
        assert!(!value.try_eq_str("epubcfi(/6/6)").unwrap());
    }

    #[test]
    fn test_range_equality_requires_matching_shape() {
        let single = cfi("/6/4/2/4");
        let range = cfi("/6/4,/2,/4");
        assert_ne!(single, range);
        assert_ne!(range, cfi("/6/4,/2,/6"));
        assert_eq!(range, cfi("epubcfi(/6/4,/2,/4)"));
    }

    #[test]
    fn test_steps_to_string() {
        let value = cfi("/6/4[chap01]!/4/10:5");
        assert_eq!(value.steps_to_string(0..2), "/6/4[chap01]!");
        assert_eq!(value.steps_to_string(2..10), "/4/10:5");
        assert_eq!(value.steps_to_string(7..9), "");
    }

    #[test]
    fn test_spine_index_extraction() {
        assert_eq!(cfi("/6/4!/4").spine_index(), Some(1));
        assert_eq!(cfi("/6/2").spine_index(), Some(0));
        assert_eq!(cfi("/4/2").spine_index(), None);
        assert_eq!(cfi("/6").spine_index(), None);
    }

    #[test]
    fn test_serde_uses_string_form() {
        let value = cfi("epubcfi(/6/4!/4/2,/1:0,/1:10)");
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"epubcfi(/6/4!/4/2,/1:0,/1:10)\"");

        let back: Cfi = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);

        assert!(serde_json::from_str::<Cfi>("\"epubcfi(/x)\"").is_err());
    }
}
