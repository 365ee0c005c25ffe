//! CFI step types
//!
//! A CFI path is an ordered list of steps. Each step names a child position,
//! optionally asserts an identifier, optionally carries a terminal offset and
//! may mark a crossing into a referenced document.
//!
//! Reference: <https://idpf.org/epub/linking/cfi/epub-cfi.html>

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use super::error::{CfiError, ParseErrorKind, Result};

/// Characters that must be escaped with `^` inside a bracketed assertion
const ESCAPED_CHARS: [char; 4] = ['^', '[', ']', ';'];

/// A single step in a CFI path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Child position. Even values are elements, odd values sit between them.
    index: u32,
    /// Optional ID assertion `[id]`
    #[serde(skip_serializing_if = "Option::is_none")]
    qualifier: Option<String>,
    offset: Offset,
    /// Evaluation continues in the document this step references (`!`)
    indirector: bool,
}

/// Terminal offset of a step
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Offset {
    #[default]
    None,
    /// `:n`, with an optional assertion about the text at that offset
    #[serde(rename_all = "camelCase")]
    Character {
        offset: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        text_qualifier: Option<String>,
    },
    /// `~s`, time in seconds for audio/video
    Temporal { seconds: f64 },
    /// `@x:y`, position within an image
    Spatial { point: SpatialPoint },
    /// `~s@x:y`
    SpatioTemporal { seconds: f64, point: SpatialPoint },
}

/// Spatial offset for images (percentage-based, 0.0-100.0 by convention)
///
/// Points are totally ordered in reading order: `x` first, then `y`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SpatialPoint {
    pub x: f64,
    pub y: f64,
}

impl SpatialPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Normalize negative zero so that `-0.0` and `0.0` order as equal
fn ordering_key(value: f64) -> f64 {
    value + 0.0
}

impl Ord for SpatialPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        ordering_key(self.x)
            .total_cmp(&ordering_key(other.x))
            .then_with(|| ordering_key(self.y).total_cmp(&ordering_key(other.y)))
    }
}

impl PartialOrd for SpatialPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SpatialPoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SpatialPoint {}

impl Offset {
    /// Character offset without a text qualifier
    pub fn character(offset: u32) -> Self {
        Offset::Character {
            offset,
            text_qualifier: None,
        }
    }

    /// Character offset asserting the text found there
    pub fn character_with_text(offset: u32, text: impl Into<String>) -> Self {
        Offset::Character {
            offset,
            text_qualifier: non_empty(text.into()),
        }
    }

    pub fn temporal(seconds: f64) -> Self {
        Offset::Temporal { seconds }
    }

    pub fn spatial(x: f64, y: f64) -> Self {
        Offset::Spatial {
            point: SpatialPoint::new(x, y),
        }
    }

    pub fn spatio_temporal(seconds: f64, x: f64, y: f64) -> Self {
        Offset::SpatioTemporal {
            seconds,
            point: SpatialPoint::new(x, y),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Offset::None)
    }

    /// Check that every float is finite and non-negative, folding `-0.0`
    /// into `0.0`, so the offset can be written out and parsed back
    fn validated(self) -> Result<Self> {
        let check = |value: f64, kind: ParseErrorKind| {
            if value.is_finite() && value >= 0.0 {
                Ok(value + 0.0)
            } else {
                Err(CfiError::invalid(value.to_string(), kind))
            }
        };
        let point = |p: SpatialPoint| -> Result<SpatialPoint> {
            Ok(SpatialPoint::new(
                check(p.x, ParseErrorKind::InvalidSpatialOffset)?,
                check(p.y, ParseErrorKind::InvalidSpatialOffset)?,
            ))
        };

        Ok(match self {
            Offset::Temporal { seconds } => Offset::Temporal {
                seconds: check(seconds, ParseErrorKind::InvalidTemporalOffset)?,
            },
            Offset::Spatial { point: p } => Offset::Spatial { point: point(p)? },
            Offset::SpatioTemporal { seconds, point: p } => Offset::SpatioTemporal {
                seconds: check(seconds, ParseErrorKind::InvalidTemporalOffset)?,
                point: point(p)?,
            },
            other => other,
        })
    }
}

impl Step {
    /// Create a plain step
    pub fn new(index: u32) -> Self {
        Self {
            index,
            qualifier: None,
            offset: Offset::None,
            indirector: false,
        }
    }

    /// Create a step with an ID assertion
    pub fn with_id(index: u32, id: impl Into<String>) -> Self {
        Self::new(index).with_qualifier(id)
    }

    /// Attach an ID assertion. An empty string clears it.
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = non_empty(qualifier.into());
        self
    }

    /// Attach a terminal offset, replacing any previous one
    ///
    /// Fails if the step is an indirector, or if a temporal or spatial value
    /// is negative, NaN or infinite.
    pub fn with_offset(mut self, offset: Offset) -> Result<Self> {
        if self.indirector && !offset.is_none() {
            return Err(CfiError::invalid(
                self.to_string(),
                ParseErrorKind::OffsetOnIndirector,
            ));
        }
        self.offset = offset.validated()?;
        Ok(self)
    }

    /// Mark this step as crossing into a referenced document
    ///
    /// Fails if the step carries an offset.
    pub fn into_indirector(mut self) -> Result<Self> {
        if !self.offset.is_none() {
            return Err(CfiError::invalid(
                self.to_string(),
                ParseErrorKind::OffsetOnIndirector,
            ));
        }
        self.indirector = true;
        Ok(self)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn offset(&self) -> &Offset {
        &self.offset
    }

    pub fn is_indirector(&self) -> bool {
        self.indirector
    }

    /// Check if this step addresses an element (even index)
    pub fn is_element(&self) -> bool {
        self.index % 2 == 0
    }

    pub fn character_offset(&self) -> Option<u32> {
        match self.offset {
            Offset::Character { offset, .. } => Some(offset),
            _ => None,
        }
    }

    pub fn text_qualifier(&self) -> Option<&str> {
        match &self.offset {
            Offset::Character { text_qualifier, .. } => text_qualifier.as_deref(),
            _ => None,
        }
    }

    pub fn temporal_offset(&self) -> Option<f64> {
        match self.offset {
            Offset::Temporal { seconds } | Offset::SpatioTemporal { seconds, .. } => {
                Some(seconds)
            }
            _ => None,
        }
    }

    pub fn spatial_offset(&self) -> Option<SpatialPoint> {
        match self.offset {
            Offset::Spatial { point } | Offset::SpatioTemporal { point, .. } => Some(point),
            _ => None,
        }
    }

    /// Assemble a step whose invariants the caller has already checked
    pub(crate) fn from_parts(
        index: u32,
        qualifier: Option<String>,
        offset: Offset,
        indirector: bool,
    ) -> Self {
        debug_assert!(!(indirector && !offset.is_none()));
        Self {
            index,
            qualifier: qualifier.and_then(non_empty),
            offset,
            indirector,
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    for ch in text.chars() {
        if ESCAPED_CHARS.contains(&ch) {
            write!(f, "^")?;
        }
        write!(f, "{}", ch)?;
    }
    Ok(())
}

// Display implementations for serialization

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.index)?;

        let text_qualifier = self.text_qualifier();
        if self.qualifier.is_some() || text_qualifier.is_some() {
            write!(f, "[")?;
            if let Some(ref qualifier) = self.qualifier {
                write_escaped(f, qualifier)?;
            }
            if let Some(text) = text_qualifier {
                write!(f, ";")?;
                write_escaped(f, text)?;
            }
            write!(f, "]")?;
        }

        write!(f, "{}", self.offset)?;

        if self.indirector {
            write!(f, "!")?;
        }
        Ok(())
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::None => Ok(()),
            Offset::Character { offset, .. } => write!(f, ":{}", offset),
            Offset::Temporal { seconds } => write!(f, "~{}", seconds),
            Offset::Spatial { point } => write!(f, "@{}", point),
            Offset::SpatioTemporal { seconds, point } => write!(f, "~{}@{}", seconds, point),
        }
    }
}

impl fmt::Display for SpatialPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_display() {
        assert_eq!(Step::new(6).to_string(), "/6");
        assert_eq!(Step::with_id(4, "chap01").to_string(), "/4[chap01]");

        let step = Step::new(10).with_offset(Offset::character(5)).unwrap();
        assert_eq!(step.to_string(), "/10:5");
    }

    #[test]
    fn test_indirector_display() {
        let step = Step::with_id(4, "chap01").into_indirector().unwrap();
        assert_eq!(step.to_string(), "/4[chap01]!");
        assert!(step.is_indirector());
    }

    #[test]
    fn test_text_qualifier_embedded_in_bracket() {
        let step = Step::with_id(3, "para")
            .with_offset(Offset::character_with_text(12, "hello"))
            .unwrap();
        assert_eq!(step.to_string(), "/3[para;hello]:12");

        let bare = Step::new(3)
            .with_offset(Offset::character_with_text(12, "hello"))
            .unwrap();
        assert_eq!(bare.to_string(), "/3[;hello]:12");
        assert_eq!(bare.text_qualifier(), Some("hello"));
    }

    #[test]
    fn test_escaped_assertion() {
        let step = Step::with_id(4, "a]b;c^d");
        assert_eq!(step.to_string(), "/4[a^]b^;c^^d]");
    }

    #[test]
    fn test_temporal_and_spatial_display() {
        let step = Step::new(2).with_offset(Offset::temporal(12.5)).unwrap();
        assert_eq!(step.to_string(), "/2~12.5");

        let step = Step::new(2).with_offset(Offset::spatial(50.5, 25.0)).unwrap();
        assert_eq!(step.to_string(), "/2@50.5:25");

        let step = Step::new(2)
            .with_offset(Offset::spatio_temporal(3.0, 10.0, 20.25))
            .unwrap();
        assert_eq!(step.to_string(), "/2~3@10:20.25");
        assert_eq!(step.temporal_offset(), Some(3.0));
        assert_eq!(step.spatial_offset(), Some(SpatialPoint::new(10.0, 20.25)));
    }

    #[test]
    fn test_indirector_rejects_offset() {
        let err = Step::new(4)
            .into_indirector()
            .unwrap()
            .with_offset(Offset::character(1))
            .unwrap_err();
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::OffsetOnIndirector));

        let err = Step::new(4)
            .with_offset(Offset::temporal(1.0))
            .unwrap()
            .into_indirector()
            .unwrap_err();
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::OffsetOnIndirector));
    }

    #[test]
    fn test_rejects_unprintable_media_offsets() {
        let kind_of = |offset: Offset| Step::new(2).with_offset(offset).unwrap_err().parse_kind();

        assert_eq!(
            kind_of(Offset::temporal(f64::NAN)),
            Some(ParseErrorKind::InvalidTemporalOffset)
        );
        assert_eq!(
            kind_of(Offset::temporal(f64::INFINITY)),
            Some(ParseErrorKind::InvalidTemporalOffset)
        );
        assert_eq!(
            kind_of(Offset::temporal(-0.5)),
            Some(ParseErrorKind::InvalidTemporalOffset)
        );
        assert_eq!(
            kind_of(Offset::spatial(-1.0, 2.0)),
            Some(ParseErrorKind::InvalidSpatialOffset)
        );
        assert_eq!(
            kind_of(Offset::spatial(1.0, f64::NEG_INFINITY)),
            Some(ParseErrorKind::InvalidSpatialOffset)
        );
        assert_eq!(
            kind_of(Offset::spatio_temporal(1.0, 2.0, f64::NAN)),
            Some(ParseErrorKind::InvalidSpatialOffset)
        );
        assert_eq!(
            kind_of(Offset::spatio_temporal(f64::NAN, 2.0, 3.0)),
            Some(ParseErrorKind::InvalidTemporalOffset)
        );
    }

    #[test]
    fn test_negative_zero_offset_prints_as_zero() {
        let step = Step::new(2)
            .with_offset(Offset::spatio_temporal(-0.0, -0.0, 1.0))
            .unwrap();
        assert_eq!(step.to_string(), "/2~0@0:1");
        assert_eq!(step, step.clone());
    }

    #[test]
    fn test_empty_qualifier_is_none() {
        assert_eq!(Step::with_id(4, "").qualifier(), None);
        assert_eq!(Step::new(4), Step::with_id(4, ""));
    }

    #[test]
    fn test_step_equality_compares_populated_fields() {
        assert_ne!(Step::new(4), Step::with_id(4, "x"));
        assert_ne!(
            Step::new(4),
            Step::new(4).with_offset(Offset::character(0)).unwrap()
        );
        assert_ne!(Step::new(4), Step::new(4).into_indirector().unwrap());
        assert_eq!(Step::with_id(4, "x"), Step::with_id(4, "x"));
    }

    #[test]
    fn test_point_ordering_is_lexicographic() {
        let a = SpatialPoint::new(10.0, 90.0);
        let b = SpatialPoint::new(20.0, 0.0);
        let c = SpatialPoint::new(20.0, 5.0);

        assert!(a < b);
        assert!(b < c);
        assert!(c > a);
        assert!(a <= a);
        assert!(c >= b);
        assert_ne!(a, b);
        assert_eq!(SpatialPoint::new(0.0, 1.0), SpatialPoint::new(-0.0, 1.0));
    }
}
